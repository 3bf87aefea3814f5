use geo::{Area, BoundingRect, Coord, MultiPolygon, Rect};
use rstar::RTree;

use crate::crs::Crs;
use crate::geom::BoundingBox;

use super::bbox::padded_envelope;

/// An ordered collection of MultiPolygons sharing one CRS, indexed by an R-tree.
#[derive(Debug, Clone)]
pub struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
    crs: Crs,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty shapes are kept in place but never returned as overlap candidates.
    pub fn new(shapes: Vec<MultiPolygon<f64>>, crs: Crs) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(i, shape)| shape.bounding_rect().map(|rect| BoundingBox::new(i, rect)))
                    .collect()
            ),
            shapes,
            crs,
        }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    /// Check if there are no MultiPolygons.
    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    #[inline] pub fn crs(&self) -> &Crs { &self.crs }

    /// Planar area of shape `idx`, in squared CRS units.
    #[inline] pub fn area(&self, idx: usize) -> f64 { self.shapes[idx].unsigned_area() }

    /// Indices of shapes whose bounding boxes intersect `rect` grown by `padding`.
    pub fn candidates(&self, rect: &Rect<f64>, padding: f64) -> impl Iterator<Item = usize> + '_ {
        self.rtree.locate_in_envelope_intersecting(&padded_envelope(rect, padding))
            .map(|bbox| bbox.idx())
    }

    /// Compute the bounding rectangle of all MultiPolygons.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.shapes.iter()
            .filter_map(|shape| shape.bounding_rect())
            .reduce(|a, b| Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                }
            ))
    }

    /// Consume and return the shapes.
    #[inline] pub(crate) fn into_shapes(self) -> Vec<MultiPolygon<f64>> { self.shapes }
}
