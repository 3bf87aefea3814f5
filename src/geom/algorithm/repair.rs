use geo::{orient::Direction, unary_union, BooleanOps, Coord, LineString, MultiPolygon, Orient, Polygon, Validation};

use crate::geom::Geometries;

/// Drop repeated and non-finite coordinates and close the ring.
/// Returns `None` when fewer than three distinct vertices remain.
fn clean_ring(ring: &LineString<f64>) -> Option<LineString<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len() + 1);
    for &coord in ring.0.iter().filter(|c| c.x.is_finite() && c.y.is_finite()) {
        if coords.last() != Some(&coord) { coords.push(coord) }
    }
    if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
        if first != last { coords.push(first) }
    }

    (coords.len() >= 4).then_some(LineString(coords))
}

fn clean_polygon(polygon: &Polygon<f64>) -> Option<Polygon<f64>> {
    let exterior = clean_ring(polygon.exterior())?;
    let interiors = polygon.interiors().iter().filter_map(clean_ring).collect();
    Some(Polygon::new(exterior, interiors))
}

/// Split one polygon into simple pieces under the even-odd rule.
/// A self-crossing ring becomes its lobes; holes are subtracted.
fn split_even_odd(polygon: Polygon<f64>) -> Vec<Polygon<f64>> {
    MultiPolygon::new(vec![polygon])
        .union(&MultiPolygon::new(vec![]))
        .0.into_iter()
        .map(|piece| piece.orient(Direction::Default))
        .collect()
}

/// Rebuild a MultiPolygon so it passes OGC validity: clean rings, split each part into
/// simple pieces, then merge overlapping pieces by their union.
pub(crate) fn repair_multipolygon(shape: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let pieces = shape.0.iter()
        .filter_map(clean_polygon)
        .flat_map(split_even_odd)
        .collect::<Vec<_>>();
    if pieces.is_empty() { return MultiPolygon::new(vec![]) }
    unary_union(&pieces)
}

impl Geometries {
    /// Indices of shapes that fail the OGC validity rules.
    pub fn invalid_indices(&self) -> Vec<usize> {
        self.shapes().iter().enumerate()
            .filter(|(_, shape)| !shape.is_valid())
            .map(|(i, _)| i)
            .collect()
    }

    /// Repair the shapes at `indices`, rebuilding the spatial index.
    pub fn repaired(self, indices: &[usize]) -> Self {
        if indices.is_empty() { return self }
        let crs = self.crs().clone();
        let mut shapes = self.into_shapes();
        for &i in indices {
            shapes[i] = repair_multipolygon(&shapes[i]);
        }
        Geometries::new(shapes, crs)
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, Area, LineString, MultiPolygon, Polygon, Validation};

    use super::repair_multipolygon;
    use crate::{crs::Crs, geom::Geometries};

    #[test]
    fn bowtie_is_invalid_then_repaired() {
        // Self-intersecting "bowtie": two unit triangles meeting at (1, 1).
        let bowtie = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 2.0), (x: 2.0, y: 0.0), (x: 0.0, y: 2.0)];
        let shape = MultiPolygon::new(vec![bowtie]);
        assert!(!shape.is_valid());

        let fixed = repair_multipolygon(&shape);
        assert!(fixed.is_valid());
        assert!((fixed.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn overlapping_parts_merge_into_union() {
        let a = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        let b = polygon![(x: 1.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 2.0), (x: 1.0, y: 2.0)];
        let fixed = repair_multipolygon(&MultiPolygon::new(vec![a, b]));
        assert!(fixed.is_valid());
        assert!((fixed.unsigned_area() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn holes_survive_repair() {
        let outer = LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0), (0.0, 0.0)]);
        let hole = LineString::from(vec![(1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 1.0), (1.0, 1.0)]);
        let fixed = repair_multipolygon(&MultiPolygon::new(vec![Polygon::new(outer, vec![hole])]));
        assert!(fixed.is_valid());
        assert!((fixed.unsigned_area() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_vertices_are_dropped() {
        let square = polygon![
            (x: 0.0, y: 0.0), (x: 0.0, y: 0.0), (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0), (x: 0.0, y: 1.0),
        ];
        let fixed = repair_multipolygon(&MultiPolygon::new(vec![square]));
        assert!(fixed.is_valid());
        assert!((fixed.unsigned_area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_ring_vanishes() {
        let sliver = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)];
        let fixed = repair_multipolygon(&MultiPolygon::new(vec![sliver]));
        assert!(fixed.0.is_empty());
    }

    #[test]
    fn only_invalid_shapes_are_flagged() {
        let ok = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        // Two parts whose interiors overlap.
        let a = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        let b = polygon![(x: 1.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 2.0), (x: 1.0, y: 2.0)];
        let geoms = Geometries::new(
            vec![MultiPolygon::new(vec![ok]), MultiPolygon::new(vec![a, b])],
            Crs::from_epsg(5070).unwrap(),
        );
        let invalid = geoms.invalid_indices();
        assert_eq!(invalid, vec![1]);
        let geoms = geoms.repaired(&invalid);
        assert!(geoms.invalid_indices().is_empty());
        assert!((geoms.area(1) - 6.0).abs() < 1e-9);
    }
}
