//! Shared HTTP response handling for the hosted backends

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::error;

use crate::error::{Error, Result};

/// Send a request, mapping transport failures and non-2xx statuses to `BackendUnavailable`
///
/// Request URLs are stripped from transport errors since some backends take
/// credentials in the query string.
pub(crate) async fn send(provider: &str, request: RequestBuilder) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::backend_source(provider, e.without_url()))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        error!("{} API error: {} - {}", provider, status, error_text);
        return Err(Error::backend(
            provider,
            format!("API error: {} - {}", status, error_text),
        ));
    }

    Ok(response)
}

/// Decode a JSON body, mapping malformed payloads to `BackendUnavailable`
pub(crate) async fn json<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| Error::backend_source(provider, e.without_url()))
}

/// Look up an API key: explicit value first, then the environment
pub(crate) fn resolve_api_key(explicit: Option<String>, env_var: &str) -> Option<String> {
    explicit
        .filter(|key| !key.trim().is_empty())
        .or_else(|| std::env::var(env_var).ok().filter(|key| !key.trim().is_empty()))
}

pub(crate) fn missing_key(provider: &str) -> Error {
    Error::backend(provider, "API key not set")
}
