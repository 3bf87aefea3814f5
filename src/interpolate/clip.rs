use geo::{Area, MultiPolygon};
use tracing::{debug, info};

use crate::{
    config::OverlayConfig,
    crs::Crs,
    error::{ArealError, Result},
    layer::Layer,
};

/// A single dissolved shape that truncates other layers to a common extent.
#[derive(Debug, Clone)]
pub struct ClipBoundary {
    shape: MultiPolygon<f64>,
    crs: Crs,
}

impl ClipBoundary {
    pub fn new(shape: MultiPolygon<f64>, crs: Crs) -> Self {
        Self { shape, crs }
    }

    #[inline] pub fn shape(&self) -> &MultiPolygon<f64> { &self.shape }

    #[inline] pub fn crs(&self) -> &Crs { &self.crs }

    #[inline] pub fn area(&self) -> f64 { self.shape.unsigned_area() }

    /// Intersect each feature of `layer` with the boundary, keeping its attributes.
    /// Features entirely outside the boundary are dropped.
    pub fn clip(&self, layer: &Layer, config: &OverlayConfig) -> Result<Layer> {
        if !layer.crs().is_equivalent(&self.crs) {
            return Err(ArealError::CrsMismatch(layer.crs().to_string(), self.crs.to_string()));
        }

        let (rows, shapes): (Vec<_>, Vec<_>) = layer.geoms()
            .clip(&self.shape, config.bbox_padding)
            .into_iter()
            .unzip();

        info!(kept = rows.len(), dropped = layer.len() - rows.len(), "clipped layer to boundary");
        layer.select(&rows, shapes)
    }
}

impl Layer {
    /// Union every feature into one boundary shape, discarding attributes.
    pub fn dissolve(&self) -> ClipBoundary {
        let boundary = ClipBoundary::new(self.geoms().union(), self.crs().clone());
        debug!(features = self.len(), parts = boundary.shape.0.len(), area = boundary.area(), "dissolved layer");
        boundary
    }
}

/// Dissolve `reference` into a boundary and clip each of `others` to it.
///
/// Every layer is checked (and repaired per `config`) first. The output layers are in
/// the same order as `others` and cover no more than the reference layer's extent.
pub fn clip_to_common_extent(reference: &Layer, others: &[Layer], config: &OverlayConfig) -> Result<Vec<Layer>> {
    let boundary = reference.clone().validate(config)?.dissolve();
    others.iter()
        .map(|layer| boundary.clip(&layer.clone().validate(config)?, config))
        .collect()
}
