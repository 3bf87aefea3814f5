use geo::Rect;
use rstar::{RTreeObject, AABB};

/// A bounding box in an R-tree, associated with a MultiPolygon by index.
#[derive(Debug, Clone)]
pub(super) struct BoundingBox {
    idx: usize, // Index of corresponding MultiPolygon in shapes
    bbox: Rect<f64>,
}

impl BoundingBox {
    pub(super) fn new(idx: usize, bbox: Rect<f64>) -> Self {
        Self { idx, bbox }
    }

    /// Get the index of the corresponding MultiPolygon.
    #[inline] pub(super) fn idx(&self) -> usize { self.idx }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// Envelope of `rect` grown by `padding` on every side.
#[inline]
pub(super) fn padded_envelope(rect: &Rect<f64>, padding: f64) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [rect.min().x - padding, rect.min().y - padding],
        [rect.max().x + padding, rect.max().y + padding],
    )
}
