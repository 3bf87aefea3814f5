use ahash::AHashMap;
use geo::{MultiPolygon, Point};
use polars::{frame::DataFrame, prelude::{DataType, IdxCa, IdxSize, NamedFrom}};
use tracing::{info, warn};

use crate::{
    config::OverlayConfig,
    crs::Crs,
    error::{ArealError, Result},
    geom::Geometries,
    layer::FeatureId,
};

/// A polygon layer: one row per feature, with an identifier, a geometry, and attributes.
/// Row `i` of `data` describes `ids[i]` and `geoms.shapes()[i]`.
#[derive(Debug, Clone)]
pub struct Layer {
    ids: Vec<FeatureId>,
    index: AHashMap<FeatureId, u32>, // Map between feature ids and contiguous row indices.
    geoms: Geometries,
    data: DataFrame,
}

impl Layer {
    /// Build a layer, checking that ids are unique and every table has one row per feature.
    /// An attribute table with no columns stands for "no attributes".
    pub fn new(ids: Vec<FeatureId>, shapes: Vec<MultiPolygon<f64>>, data: DataFrame, crs: Crs) -> Result<Self> {
        if shapes.len() != ids.len() {
            return Err(ArealError::LengthMismatch { what: "geometries", expected: ids.len(), actual: shapes.len() });
        }
        if data.width() > 0 && data.height() != ids.len() {
            return Err(ArealError::LengthMismatch { what: "attribute rows", expected: ids.len(), actual: data.height() });
        }

        let mut index = AHashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i as u32).is_some() {
                return Err(ArealError::DuplicateId(id.clone()));
            }
        }

        Ok(Self { ids, index, geoms: Geometries::new(shapes, crs), data })
    }

    #[inline] pub fn len(&self) -> usize { self.ids.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    #[inline] pub fn ids(&self) -> &[FeatureId] { &self.ids }

    #[inline] pub fn geoms(&self) -> &Geometries { &self.geoms }

    #[inline] pub fn crs(&self) -> &Crs { self.geoms.crs() }

    #[inline] pub fn data(&self) -> &DataFrame { &self.data }

    /// Row index of the feature with the given id.
    #[inline]
    pub fn index_of(&self, id: &FeatureId) -> Option<usize> {
        self.index.get(id).map(|&i| i as usize)
    }

    /// Values of a numeric attribute, one per feature. Nulls read as zero.
    pub fn attribute(&self, name: &str) -> Result<Vec<f64>> {
        let column = self.data.column(name)
            .map_err(|_| ArealError::MissingAttribute(name.to_string()))?
            .cast(&DataType::Float64)?;
        Ok(column.f64()?.into_iter().map(|v| v.unwrap_or(0.0)).collect())
    }

    /// Sum of a numeric attribute over all features.
    pub fn total(&self, name: &str) -> Result<f64> {
        Ok(self.attribute(name)?.iter().sum())
    }

    /// Fail unless every named attribute exists and is numeric.
    pub fn require_attributes(&self, names: &[String]) -> Result<()> {
        for name in names {
            let column = self.data.column(name)
                .map_err(|_| ArealError::MissingAttribute(name.clone()))?;
            if !column.dtype().is_primitive_numeric() {
                return Err(ArealError::MissingAttribute(format!("{name} (not numeric: {})", column.dtype())));
            }
        }
        Ok(())
    }

    /// Keep the given rows, replacing their geometries with `shapes` (one per row).
    pub(crate) fn select(&self, rows: &[usize], shapes: Vec<MultiPolygon<f64>>) -> Result<Layer> {
        let ids = rows.iter().map(|&i| self.ids[i].clone()).collect();
        let data = if self.data.width() == 0 { DataFrame::empty() } else {
            let idx = IdxCa::new("idx".into(), rows.iter().map(|&i| i as IdxSize).collect::<Vec<_>>());
            self.data.take(&idx)?
        };
        Layer::new(ids, shapes, data, self.crs().clone())
    }

    /// Same features and attributes with new geometries.
    pub(crate) fn with_geoms(&self, geoms: Geometries) -> Layer {
        Layer {
            ids: self.ids.clone(),
            index: self.index.clone(),
            geoms,
            data: self.data.clone(),
        }
    }

    /// Reproject the layer into `target`.
    pub fn to_crs(&self, target: &Crs) -> Result<Layer> {
        Ok(self.with_geoms(self.geoms.to_crs(target)?))
    }

    /// Reproject into a metric CRS (local UTM zone) if the layer is geographic.
    pub fn to_metric(&self) -> Result<Layer> {
        self.to_crs(&self.geoms.metric_crs())
    }

    /// Spatial join: the id of the feature containing each point, if any.
    pub fn locate(&self, points: &[Point<f64>]) -> Vec<Option<&FeatureId>> {
        self.geoms.locate_points(points).into_iter()
            .map(|hit| hit.map(|i| &self.ids[i]))
            .collect()
    }

    /// Check polygon validity, repairing invalid shapes when the config allows it.
    pub fn validate(self, config: &OverlayConfig) -> Result<Layer> {
        let invalid = self.geoms.invalid_indices();
        if invalid.is_empty() { return Ok(self) }

        if !config.repair_invalid {
            return Err(ArealError::InvalidGeometry {
                id: self.ids[invalid[0]].clone(),
                reason: format!("fails OGC validity ({} invalid features in layer)", invalid.len()),
            });
        }

        warn!(count = invalid.len(), first = %self.ids[invalid[0]], "repairing invalid geometries");
        let Layer { ids, index, geoms, data } = self;
        let geoms = geoms.repaired(&invalid);

        let still_invalid = geoms.invalid_indices();
        if let Some(&i) = still_invalid.first() {
            return Err(ArealError::InvalidGeometry {
                id: ids[i].clone(),
                reason: "geometry could not be repaired".to_string(),
            });
        }

        info!(repaired = invalid.len(), "geometries repaired");
        Ok(Layer { ids, index, geoms, data })
    }
}
