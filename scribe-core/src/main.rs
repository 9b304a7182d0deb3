use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use scribe::{
    AudioHandle, LanguageCode, LengthBounds, ProcessingInput, ProcessingResult, ScribeConfig,
    ScribeService, Task, TextBlob,
};

#[derive(Parser)]
#[command(name = "scribe", about = "Transcribe, summarize and translate content")]
struct Cli {
    /// Configuration file (defaults to the stock providers)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe a WAV file
    Transcribe {
        file: PathBuf,

        /// Language spoken in the recording (e.g. "en")
        #[arg(short, long)]
        language: Option<String>,

        /// Names, terms or context to guide the recognizer
        #[arg(short, long)]
        prompt: Option<String>,
    },
    /// Summarize text
    Summarize {
        /// Text to summarize
        text: Option<String>,

        /// Read the text from a file instead
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        #[arg(long, default_value_t = 30)]
        min_words: usize,

        #[arg(long, default_value_t = 150)]
        max_words: usize,
    },
    /// Translate text
    Translate {
        text: String,

        /// Target language code
        #[arg(long)]
        to: String,

        /// Language of the text, when known
        #[arg(long)]
        from: Option<String>,
    },
    /// Run several tasks in sequence, each on the previous output
    Pipeline {
        /// Audio file when the first step is transcribe, text otherwise
        input: String,

        /// Step such as "transcribe", "summarize", "summarize:20-60" or "translate:fr"
        #[arg(long = "step", required = true)]
        steps: Vec<String>,
    },
    /// List the registered capabilities
    Capabilities,
    /// Print the default configuration as TOML
    DefaultConfig,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // a missing .env is fine
    match dotenvy::dotenv() {
        Err(e) if !e.not_found() => warn!("Ignoring unreadable .env: {}", e),
        _ => {}
    }

    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::DefaultConfig = cli.command {
        print!("{}", ScribeConfig::default().to_toml_string()?);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => ScribeConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ScribeConfig::default(),
    };

    let service = ScribeService::from_config(&config)?;

    match cli.command {
        Commands::Transcribe {
            file,
            language,
            prompt,
        } => {
            let task = Task::Transcribe {
                language_hint: language.as_deref().map(str::parse::<LanguageCode>).transpose()?,
                prompt,
            };
            let result = service
                .process(ProcessingInput::Audio(AudioHandle::file(file)), task)
                .await?;
            print_results(&[result], cli.json)?;
        }
        Commands::Summarize {
            text,
            file,
            min_words,
            max_words,
        } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(file)) => read_text(&file)?,
                (None, None) => bail!("pass the text to summarize or --file"),
            };
            let task = Task::Summarize(LengthBounds::new(min_words, max_words)?);
            let result = service.process(ProcessingInput::text(text), task).await?;
            print_results(&[result], cli.json)?;
        }
        Commands::Translate { text, to, from } => {
            let mut blob = TextBlob::new(text);
            if let Some(from) = from {
                blob = blob.with_language(from.parse()?);
            }
            let target: LanguageCode = to.parse()?;
            let result = service
                .process(ProcessingInput::Text(blob), Task::translate(target))
                .await?;
            print_results(&[result], cli.json)?;
        }
        Commands::Pipeline { input, steps } => {
            let steps = steps
                .iter()
                .map(|s| s.parse::<Task>())
                .collect::<scribe::Result<Vec<_>>>()?;
            let input = match steps.first() {
                Some(Task::Transcribe { .. }) => ProcessingInput::Audio(AudioHandle::file(input)),
                _ => ProcessingInput::text(input),
            };

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });

            match service
                .process_pipeline_cancellable(input, &steps, &cancel)
                .await
            {
                Ok(results) => print_results(&results, cli.json)?,
                Err(err) => {
                    print_results(&err.completed, cli.json)?;
                    return Err(err.into());
                }
            }
        }
        Commands::Capabilities => {
            for descriptor in service.registry().descriptors() {
                if cli.json {
                    println!("{}", serde_json::to_string(descriptor)?);
                    continue;
                }
                let targets: Vec<&str> = descriptor
                    .supported_languages
                    .iter()
                    .map(LanguageCode::as_str)
                    .collect();
                match (&descriptor.source_language, targets.is_empty()) {
                    (_, true) => println!("{:<11} {}", descriptor.kind, descriptor.identifier),
                    (Some(source), false) => println!(
                        "{:<11} {} ({} -> {})",
                        descriptor.kind,
                        descriptor.identifier,
                        source,
                        targets.join(", ")
                    ),
                    (None, false) => println!(
                        "{:<11} {} (-> {})",
                        descriptor.kind,
                        descriptor.identifier,
                        targets.join(", ")
                    ),
                }
            }
        }
        Commands::DefaultConfig => {}
    }

    Ok(())
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn print_results(results: &[ProcessingResult], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    let many = results.len() > 1;
    for result in results {
        if many {
            println!("[{}]", result.task);
        }
        println!("{}", result.output.text);
        if many {
            println!();
        }
    }
    Ok(())
}
