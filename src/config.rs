use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Denominator used to turn an overlap area into a weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// `overlap_area / target_area`: fractions over each target sum to 1.
    #[default]
    TargetArea,
    /// `overlap_area / source_area`: each source value is split without loss, so
    /// totals are conserved wherever the targets cover the source.
    SourceArea,
}

/// Geometry-engine settings threaded through every overlay operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Fragments smaller than this fraction of their target's area are left out of the sum.
    pub min_fragment_fraction: f64,
    /// Overlap fractions up to `1 + fraction_tolerance` are clamped to exactly 1.
    pub fraction_tolerance: f64,
    /// Repair invalid polygons up front instead of failing with `InvalidGeometry`.
    pub repair_invalid: bool,
    /// Padding applied to R-tree envelopes when gathering overlap candidates.
    pub bbox_padding: f64,
    /// How overlap areas are normalized before weighting source values.
    pub weighting: Weighting,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            min_fragment_fraction: 1e-9,
            fraction_tolerance: 1e-6,
            repair_invalid: true,
            bbox_padding: 0.0,
            weighting: Weighting::TargetArea,
        }
    }
}

impl OverlayConfig {
    /// Read a config from a JSON file. Missing keys fall back to their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("[config] Failed to read config file: {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("[config] Failed to parse config file: {}", path.display()))
    }

    /// Returns true if a fragment of `area` should count toward a target of `target_area`.
    #[inline]
    pub fn keeps_fragment(&self, area: f64, target_area: f64) -> bool {
        area > 0.0 && area >= self.min_fragment_fraction * target_area
    }

    /// Clamp floating-point overshoot of an overlap fraction.
    /// Returns the adjusted fraction and whether it exceeded the tolerance.
    #[inline]
    pub fn clamp_fraction(&self, fraction: f64) -> (f64, bool) {
        if fraction <= 1.0 { (fraction, false) }
        else if fraction <= 1.0 + self.fraction_tolerance { (1.0, false) }
        else { (fraction, true) }
    }
}
