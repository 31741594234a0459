use anyhow::{Context, Result};
use argmap::ScoreConfig;
use dotenvy::dotenv;
use std::env;
use std::path::Path;

/// Backend settings loaded from environment variables
#[derive(Debug, Clone)]
pub struct Settings {
    pub requests_per_second: u32,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            requests_per_second: env::var("ARGMAP_REQUESTS_PER_SECOND")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("ARGMAP_REQUESTS_PER_SECOND must be a valid number")?,
        })
    }
}

/// Read a JSON scoring config; missing fields take their defaults.
pub fn load_score_config(path: Option<&Path>) -> Result<ScoreConfig> {
    let Some(path) = path else {
        return Ok(ScoreConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
}

/// Apply `--artifact` / `--metric` overrides on top of the file config.
pub fn with_overrides(mut config: ScoreConfig, artifacts: &[String], metrics: &[String]) -> ScoreConfig {
    if !artifacts.is_empty() {
        config = config.with_artifacts(artifacts.iter().cloned());
    }
    if !metrics.is_empty() {
        config = config.with_metrics(metrics.iter().cloned());
    }
    config
}
