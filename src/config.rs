//! Data-miner YAML configuration: the schema this cache's key/format
//! conventions are inherited from, kept here as a read compatibility
//! surface (the miner itself is out of scope for this crate).
//!
//! Grounded on `examples/original_source/cmd/dataminer/config/{config,reader}.go`.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Mirrors the data-miner's YAML schema field-for-field so an
/// operator's existing miner config can be read directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MinerConfig {
    /// Frames (at 100ms resolution) retained per blob before rollover.
    pub orderbook_frames: u32,
    /// Frames of overlap reserved at a blob boundary for a clean handoff.
    pub changeover_frames: u32,
    pub buffer: u32,
    /// `"bin"`, `"msgpack"`, or `"json"` — parsed with `codec::Format`.
    pub format: String,
    pub symbols: Vec<String>,
    pub filepath: String,
    /// `1`/`0` rather than a bool, matching the source's YAML schema.
    pub aws: u8,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub bucket_name: String,
    pub logger: u8,
    #[serde(default)]
    pub log_filepath: String,
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig {
            orderbook_frames: 10 * 60 * 5,
            changeover_frames: 10 * 10,
            buffer: 0,
            format: String::new(),
            symbols: Vec::new(),
            filepath: "temp".to_string(),
            aws: 0,
            key: String::new(),
            secret: String::new(),
            region: String::new(),
            bucket_name: String::new(),
            logger: 0,
            log_filepath: String::new(),
        }
    }
}

/// Reads a miner config file, falling back to `MinerConfig::default()`
/// on any failure (missing file, unreadable, malformed YAML) — the
/// source treats a broken config as "run with defaults", not a fatal
/// startup error, and this keeps that behavior.
pub fn read_config_from_file(path: impl AsRef<Path>) -> MinerConfig {
    let path = path.as_ref();

    if !path.exists() {
        tracing::info!(path = %path.display(), "miner config file not found, using defaults");
        return MinerConfig::default();
    }

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read miner config, using defaults");
            return MinerConfig::default();
        }
    };

    match serde_yaml::from_slice(&bytes) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "miner config loaded");
            config
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to parse miner config, using defaults");
            MinerConfig::default()
        }
    }
}
