//! Run manifest: what went into a run and what came out, written next to its outputs.

use std::{collections::BTreeMap, fs::File, io::Read, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{config::OverlayConfig, crs::Crs};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHash {
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub tool: String,
    pub version: String,
    pub command: String,
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<OverlayConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    pub inputs: BTreeMap<String, FileHash>,
    pub counts: BTreeMap<String, usize>,
}

impl RunManifest {
    pub fn new(command: &str) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            command: command.to_string(),
            created: Utc::now(),
            config: None,
            crs: None,
            inputs: BTreeMap::new(),
            counts: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, config: &OverlayConfig) -> Self {
        self.config = Some(*config);
        self
    }

    pub fn with_crs(mut self, crs: &Crs) -> Self {
        self.crs = Some(crs.to_string());
        self
    }

    /// Record the SHA-256 digest of an input file, keyed by its path as given.
    pub fn add_input(&mut self, path: &Path) -> Result<()> {
        self.inputs.insert(path.display().to_string(), FileHash { sha256: sha256_file(path)? });
        Ok(())
    }

    pub fn add_count(&mut self, name: &str, count: usize) {
        self.counts.insert(name.to_string(), count);
    }

    /// Write the manifest as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("[manifest] Failed to serialize run manifest")?;
        std::fs::write(path, json)
            .with_context(|| format!("[manifest] Failed to write {}", path.display()))
    }
}

/// Hex-encoded SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("[manifest] Failed to open {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 1 << 16];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 { break }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
