use geo::{Area, BooleanOps, BoundingRect, MultiPolygon};

use crate::geom::Geometries;

/// Union a list of MultiPolygons by merging pairs until one remains.
/// Pairwise merging keeps intermediate shapes small compared to a left fold.
pub(crate) fn union_all(mut shapes: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    shapes.retain(|shape| !shape.0.is_empty());
    while shapes.len() > 1 {
        let mut merged = Vec::with_capacity(shapes.len().div_ceil(2));
        let mut iter = shapes.into_iter();
        while let Some(a) = iter.next() {
            merged.push(match iter.next() {
                Some(b) => a.union(&b),
                None => a,
            });
        }
        shapes = merged;
    }
    shapes.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

impl Geometries {
    /// Compute the union of all MultiPolygons into a single MultiPolygon.
    pub fn union(&self) -> MultiPolygon<f64> {
        union_all(self.shapes().to_vec())
    }

    /// Intersect every shape with `boundary`.
    /// Returns `(index, piece)` for shapes that keep a positive area, in index order.
    pub fn clip(&self, boundary: &MultiPolygon<f64>, padding: f64) -> Vec<(usize, MultiPolygon<f64>)> {
        let Some(rect) = boundary.bounding_rect() else { return Vec::new() };

        let mut hits = self.candidates(&rect, padding).collect::<Vec<_>>();
        hits.sort_unstable();

        hits.into_iter()
            .map(|i| (i, self.shapes()[i].intersection(boundary)))
            .filter(|(_, piece)| piece.unsigned_area() > 0.0)
            .collect()
    }
}
