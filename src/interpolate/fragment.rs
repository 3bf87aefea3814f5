use geo::{Area, BooleanOps, BoundingRect};
use tracing::{debug, warn};

use crate::{
    config::{OverlayConfig, Weighting},
    crs::ensure_common_projected,
    error::{ArealError, Result},
    layer::Layer,
};

/// The intersection of one target feature with one source feature.
/// `target` and `source` are row indices into the two layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapFragment {
    pub target: usize,
    pub source: usize,
    /// Planar area of the intersection, in squared CRS units.
    pub area: f64,
    /// `area` over the target feature's area, clamped per `OverlayConfig::clamp_fraction`.
    pub fraction: f64,
    /// `area` over the source feature's area, clamped the same way.
    pub source_fraction: f64,
}

impl OverlapFragment {
    /// Weight applied to the source value under `weighting`.
    #[inline]
    pub fn weight(&self, weighting: Weighting) -> f64 {
        match weighting {
            Weighting::TargetArea => self.fraction,
            Weighting::SourceArea => self.source_fraction,
        }
    }
}

/// Intersect every target feature with every overlapping source feature.
///
/// Both layers must share a projected CRS and hold valid polygons (see `Layer::validate`).
/// Fragments are ordered by target row, then source row.
pub fn overlay(source: &Layer, target: &Layer, config: &OverlayConfig) -> Result<Vec<OverlapFragment>> {
    ensure_common_projected(source.crs(), target.crs())?;
    for layer in [source, target] {
        if let Some(&i) = layer.geoms().invalid_indices().first() {
            return Err(ArealError::InvalidGeometry {
                id: layer.ids()[i].clone(),
                reason: "polygon must be repaired before overlay".to_string(),
            });
        }
    }
    overlay_valid(source, target, config)
}

/// `overlay` for layers already checked for CRS and validity.
pub(crate) fn overlay_valid(source: &Layer, target: &Layer, config: &OverlayConfig) -> Result<Vec<OverlapFragment>> {
    let mut fragments = Vec::new();
    let mut excluded = 0usize;
    let mut clamped = 0usize;

    for (t, shape) in target.geoms().shapes().iter().enumerate() {
        let target_area = target.geoms().area(t);
        if target_area <= 0.0 {
            return Err(ArealError::EmptyGeometry(target.ids()[t].clone()));
        }
        let Some(rect) = shape.bounding_rect() else { continue };

        let mut candidates = source.geoms().candidates(&rect, config.bbox_padding).collect::<Vec<_>>();
        candidates.sort_unstable();

        for s in candidates {
            let area = shape.intersection(&source.geoms().shapes()[s]).unsigned_area();
            if !config.keeps_fragment(area, target_area) {
                if area > 0.0 { excluded += 1 }
                continue;
            }

            let mut clamp = |raw: f64| {
                let (fraction, exceeded) = config.clamp_fraction(raw);
                if exceeded {
                    warn!(target = %target.ids()[t], source = %source.ids()[s], fraction, "overlap fraction exceeds 1 beyond tolerance");
                } else if fraction != raw {
                    clamped += 1;
                }
                fraction
            };
            let fraction = clamp(area / target_area);
            let source_fraction = clamp(area / source.geoms().area(s));

            fragments.push(OverlapFragment { target: t, source: s, area, fraction, source_fraction });
        }
    }

    debug!(fragments = fragments.len(), excluded, clamped, "computed overlap fragments");
    Ok(fragments)
}
