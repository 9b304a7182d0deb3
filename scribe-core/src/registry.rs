//! Capability registry
//!
//! Built once at startup and shared read-only behind an `Arc`. Entries are
//! kept per task kind in registration order; lookups return the first entry
//! that satisfies the requested language pair.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::providers::{Summarizer, Transcriber, Translator};
use crate::types::{CapabilityDescriptor, LanguageCode, TaskKind};

/// A provider bound to the capability it fulfils
#[derive(Clone)]
pub enum Provider {
    Transcriber(Arc<dyn Transcriber>),
    Summarizer(Arc<dyn Summarizer>),
    Translator(Arc<dyn Translator>),
}

impl Provider {
    pub fn kind(&self) -> TaskKind {
        match self {
            Provider::Transcriber(_) => TaskKind::Transcribe,
            Provider::Summarizer(_) => TaskKind::Summarize,
            Provider::Translator(_) => TaskKind::Translate,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Provider::Transcriber(p) => p.name(),
            Provider::Summarizer(p) => p.name(),
            Provider::Translator(p) => p.name(),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self {
            Provider::Transcriber(p) => p.is_configured(),
            Provider::Summarizer(p) => p.is_configured(),
            Provider::Translator(p) => p.is_configured(),
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider")
            .field(&self.kind())
            .field(&self.name())
            .finish()
    }
}

/// A registry entry
#[derive(Debug, Clone)]
pub struct RegisteredCapability {
    descriptor: CapabilityDescriptor,
    provider: Provider,
}

impl RegisteredCapability {
    pub fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

/// Providers keyed by capability kind
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<TaskKind, Vec<RegisteredCapability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider; entries cannot be replaced or removed afterwards
    pub fn register(&mut self, descriptor: CapabilityDescriptor, provider: Provider) -> Result<()> {
        if descriptor.kind != provider.kind() {
            return Err(Error::Config(format!(
                "{} provider {} registered as {}",
                provider.kind(),
                provider.name(),
                descriptor.kind
            )));
        }
        if descriptor.identifier.trim().is_empty() {
            return Err(Error::Config(format!(
                "{} capability needs an identifier",
                descriptor.kind
            )));
        }

        if let Provider::Translator(translator) = &provider {
            if descriptor.supported_languages.is_empty() {
                return Err(Error::Config(format!(
                    "translator {} has no target languages",
                    descriptor.identifier
                )));
            }
            let offered = translator.supported_languages();
            if let Some(missing) = descriptor
                .supported_languages
                .iter()
                .find(|lang| !offered.contains(*lang))
            {
                return Err(Error::Config(format!(
                    "translator {} cannot produce {}",
                    descriptor.identifier, missing
                )));
            }
        }

        info!(
            "Registered {} capability {} ({})",
            descriptor.kind,
            descriptor.identifier,
            provider.name()
        );

        self.entries
            .entry(descriptor.kind)
            .or_default()
            .push(RegisteredCapability {
                descriptor,
                provider,
            });
        Ok(())
    }

    /// Find the provider for `kind`, optionally producing `target`
    pub fn resolve(
        &self,
        kind: TaskKind,
        target: Option<&LanguageCode>,
    ) -> Result<&RegisteredCapability> {
        self.resolve_pair(kind, None, target)
    }

    /// Find the provider for `kind` that accepts `source` and produces `target`
    pub fn resolve_pair(
        &self,
        kind: TaskKind,
        source: Option<&LanguageCode>,
        target: Option<&LanguageCode>,
    ) -> Result<&RegisteredCapability> {
        let entries = self
            .entries
            .get(&kind)
            .filter(|entries| !entries.is_empty())
            .ok_or(Error::UnsupportedCapability(kind))?;

        let paired: Vec<&RegisteredCapability> = entries
            .iter()
            .filter(|entry| source.is_none_or(|s| entry.descriptor.accepts_source(s)))
            .collect();

        if let (true, Some(source)) = (paired.is_empty(), source) {
            let sources: BTreeSet<String> = entries
                .iter()
                .filter_map(|entry| entry.descriptor.source_language.as_ref())
                .map(ToString::to_string)
                .collect();
            return Err(Error::UnsupportedLanguage {
                language: source.to_string(),
                supported: sources.into_iter().collect(),
            });
        }

        let Some(target) = target else {
            return paired
                .first()
                .copied()
                .ok_or(Error::UnsupportedCapability(kind));
        };

        if let Some(entry) = paired
            .iter()
            .copied()
            .find(|entry| entry.descriptor.supports_target(target))
        {
            return Ok(entry);
        }

        let supported: BTreeSet<String> = paired
            .iter()
            .flat_map(|entry| entry.descriptor.supported_languages.iter())
            .map(ToString::to_string)
            .collect();
        Err(Error::UnsupportedLanguage {
            language: target.to_string(),
            supported: supported.into_iter().collect(),
        })
    }

    pub fn is_registered(&self, kind: TaskKind) -> bool {
        self.entries.get(&kind).is_some_and(|e| !e.is_empty())
    }

    /// Descriptors of every entry, grouped by kind in registration order
    pub fn descriptors(&self) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.entries
            .values()
            .flat_map(|entries| entries.iter().map(|entry| &entry.descriptor))
    }

    /// Every translation target any registered translator produces
    pub fn translation_targets(&self) -> BTreeSet<LanguageCode> {
        self.entries
            .get(&TaskKind::Translate)
            .into_iter()
            .flatten()
            .flat_map(|entry| entry.descriptor.supported_languages.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
