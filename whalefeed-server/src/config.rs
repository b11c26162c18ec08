//! TOML file configuration structures.
//!
//! These structs directly map to the `whalefeed.toml` file format.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;
use whalefeed_core::pipeline::PipelineConfig;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub source: SourceSection,
    /// USD price per token contract address.
    #[serde(default)]
    pub prices: HashMap<String, f64>,
    /// Display name per account address.
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("valid default address")
}

/// Pipeline tuning section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_ledger_capacity")]
    pub ledger_capacity: usize,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_release_interval_ms")]
    pub release_interval_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

fn default_ledger_capacity() -> usize {
    1000
}
fn default_buffer_capacity() -> usize {
    10_000
}
fn default_batch_size() -> usize {
    10
}
fn default_release_interval_ms() -> u64 {
    2000
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_prune_interval_secs() -> u64 {
    60
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            ledger_capacity: default_ledger_capacity(),
            buffer_capacity: default_buffer_capacity(),
            batch_size: default_batch_size(),
            release_interval_ms: default_release_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

impl PipelineSection {
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            ledger_capacity: self.ledger_capacity,
            buffer_capacity: self.buffer_capacity,
            batch_size: self.batch_size,
            release_interval: Duration::from_millis(self.release_interval_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            prune_interval: Duration::from_secs(self.prune_interval_secs),
        }
    }
}

/// How payloads enter the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// The webhook POST pushes directly into the pipeline.
    #[default]
    Push,
    /// A remote intake endpoint is polled for its latest stored payload.
    Poll,
}

/// Ingestion source section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSection {
    #[serde(default)]
    pub mode: SourceMode,
    /// Poll read-side URL; required in poll mode.
    #[serde(default)]
    pub endpoint: Option<Url>,
}

impl FileConfig {
    fn validate(&self) -> anyhow::Result<()> {
        if self.source.mode == SourceMode::Poll && self.source.endpoint.is_none() {
            anyhow::bail!("source.mode = \"poll\" requires source.endpoint");
        }
        Ok(())
    }
}

/// Load and validate the configuration file.
pub fn load(path: &Path) -> anyhow::Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: FileConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[pipeline]
ledger_capacity = 500
batch_size = 5
release_interval_ms = 1000

[source]
mode = "poll"
endpoint = "http://intake.internal:8080/api/transactions"

[prices]
"0x6982508145454ce325ddbe47a25d4ec3d2311933" = 0.0000012

[labels]
"0x28c6c06298d514db089934071355e5743bf21d60" = "Binance 14"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.pipeline.ledger_capacity, 500);
        assert_eq!(config.pipeline.batch_size, 5);
        assert_eq!(config.pipeline.release_interval_ms, 1000);
        // Unset fields keep their defaults.
        assert_eq!(config.pipeline.buffer_capacity, 10_000);
        assert_eq!(config.pipeline.prune_interval_secs, 60);
        assert_eq!(config.source.mode, SourceMode::Poll);
        assert!(config.source.endpoint.is_some());
        assert_eq!(config.prices.len(), 1);
        assert_eq!(
            config.labels["0x28c6c06298d514db089934071355e5743bf21d60"],
            "Binance 14"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen.port(), 8080);
        assert_eq!(config.source.mode, SourceMode::Push);
        assert_eq!(config.pipeline.ledger_capacity, 1000);
        assert_eq!(config.pipeline.batch_size, 10);
        assert_eq!(config.pipeline.release_interval_ms, 2000);
        assert!(config.prices.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_mode_requires_endpoint() {
        let config: FileConfig = toml::from_str("[source]\nmode = \"poll\"\n").unwrap();
        assert!(config.validate().is_err());
    }
}
