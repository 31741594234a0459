//! Command-line front end for argument-map scoring.
//!
//! Reads prompt/completion pairs as JSON Lines and writes one result line
//! per input. Logs go to stderr so stdout stays machine readable.

mod config;
mod records;

use anyhow::{Context, Result};
use argmap::ai::{HfClassifier, OpenAiModel, RateLimited};
use argmap::details::{embed, extract, protocol};
use argmap::pipeline::stage::SVG_ARGMAP;
use argmap::{score_with_cancel, ArgmapError, Artifact, ArtifactData, DebugState, Registry};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{load_score_config, with_overrides, Settings};
use records::{parse_line, OutputRecord};

const EMBEDDED_COMPLETION: &str = "embedded_completion";

#[derive(Parser)]
#[command(name = "argmap")]
#[command(about = "Reconstruct and score the argument behind model completions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score prompt/completion pairs from a JSON Lines file (or stdin)
    Score {
        /// Input file; `-` reads stdin
        #[arg(long, default_value = "-")]
        input: PathBuf,

        /// JSON scoring config
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Metric to compute (repeatable, replaces the configured list)
        #[arg(long = "metric")]
        metrics: Vec<String>,

        /// Artifact to include (repeatable, replaces the configured list)
        #[arg(long = "artifact")]
        artifacts: Vec<String>,

        /// Append reasoning and map as <details> blocks to each completion
        #[arg(long)]
        embed: bool,
    },

    /// List all products that can be requested
    Products,

    /// Split a message with embedded details into its parts
    Extract {
        /// File holding the message; `-` reads stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },
}

#[derive(Serialize)]
struct ProductInfo<'a> {
    key: &'a str,
    kind: String,
    description: &'a str,
    requires: &'a [String],
}

#[derive(Serialize)]
struct ExtractedMessage {
    response: String,
    reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    svg: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,argmap=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Score {
            input,
            config,
            output,
            metrics,
            artifacts,
            embed,
        } => {
            let config = with_overrides(load_score_config(config.as_deref())?, &artifacts, &metrics);
            run_score(&input, output.as_deref(), &config, embed).await
        }
        Commands::Products => list_products(),
        Commands::Extract { input } => {
            let mut text = String::new();
            tokio::io::AsyncReadExt::read_to_string(&mut open_input(&input).await?, &mut text).await?;
            let parts = extract(&text).context("no reasoning block found")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&ExtractedMessage {
                    response: parts.response,
                    reasoning: parts.reasoning,
                    svg: parts.svg,
                })?
            );
            Ok(())
        }
    }
}

async fn open_input(path: &Path) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Box::new(file))
}

fn list_products() -> Result<()> {
    let registry = Registry::builtin();
    let products: Vec<ProductInfo<'_>> = registry
        .keys()
        .filter_map(|key| registry.get(key))
        .map(|spec| ProductInfo {
            key: &spec.key,
            kind: format!("{:?}", spec.kind()).to_lowercase(),
            description: &spec.description,
            requires: &spec.requires,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&products)?);
    Ok(())
}

/// Add the completion with embedded reasoning and map as an artifact.
fn attach_embedded(state: &mut DebugState, completion: &str) -> argmap::Result<()> {
    let message = embed(completion, &protocol(state), state.text(SVG_ARGMAP))?;
    state.push_artifact(Artifact::new(
        EMBEDDED_COMPLETION,
        "Completion with embedded details",
        ArtifactData::Text(message),
    ));
    Ok(())
}

async fn run_score(
    input: &Path,
    output: Option<&Path>,
    config: &argmap::ScoreConfig,
    embed_details: bool,
) -> Result<()> {
    let settings = Settings::from_env()?;
    let model = RateLimited::per_second(OpenAiModel::from_env()?, settings.requests_per_second)?;
    let classifier =
        RateLimited::per_second(HfClassifier::from_env()?, settings.requests_per_second)?;
    info!(model = model.inner().model(), classifier = classifier.inner().url(), "backends ready");

    // Ctrl-C cancels the running analysis; finished lines are kept.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let mut writer: Box<dyn tokio::io::AsyncWrite + Unpin + Send> = match output {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let mut lines = BufReader::new(open_input(input).await?).lines();
    let mut number = 0;
    let (mut scored, mut failed) = (0usize, 0usize);
    while let Some(line) = lines.next_line().await? {
        number += 1;
        let Some(record) = parse_line(&line, number)? else {
            continue;
        };

        let result = score_with_cancel(
            &model,
            &classifier,
            &record.prompt,
            &record.completion,
            config,
            cancel.clone(),
        )
        .await;

        let out = match result {
            Ok(mut state) => {
                let embedded = if embed_details {
                    attach_embedded(&mut state, &record.completion)
                } else {
                    Ok(())
                };
                match embedded {
                    Ok(()) => {
                        scored += 1;
                        OutputRecord::scored(number, record.id, state)
                    }
                    Err(e) => {
                        warn!(line = number, error = %e, "embedding failed");
                        failed += 1;
                        OutputRecord::failed(number, record.id, e)
                    }
                }
            }
            Err(ArgmapError::Cancelled { completed }) => {
                warn!(line = number, ?completed, "stopped before finishing");
                break;
            }
            Err(e @ ArgmapError::Config(_)) => return Err(e.into()),
            Err(e) => {
                warn!(line = number, error = %e, "scoring failed");
                failed += 1;
                OutputRecord::failed(number, record.id, e)
            }
        };

        let mut json = serde_json::to_string(&out)?;
        json.push('\n');
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;
    }

    info!(scored, failed, "done");
    Ok(())
}
