pub mod extract;
pub mod interpolate;
pub mod shift;

use std::path::{Path, PathBuf};

use anyhow::Result;
use areal::OverlayConfig;

/// Config from `--config` if given, otherwise defaults.
pub fn load_config(cli: &crate::cli::Cli) -> Result<OverlayConfig> {
    match &cli.config {
        Some(path) => OverlayConfig::from_json_file(path),
        None => Ok(OverlayConfig::default()),
    }
}

/// `out.csv` -> `out.manifest.json`
pub fn manifest_path(output: &Path) -> PathBuf {
    output.with_extension("manifest.json")
}
