use geo::{BoundingRect, Contains, Point};

use crate::geom::Geometries;

impl Geometries {
    /// For each point, find the index of the shape that contains it.
    /// Points on no shape (or only on a boundary) map to `None`.
    pub fn locate_points(&self, points: &[Point<f64>]) -> Vec<Option<usize>> {
        points.iter()
            .map(|pt| {
                let rect = pt.bounding_rect();
                let mut hits = self.candidates(&rect, 0.0)
                    .filter(|&j| self.shapes()[j].contains(pt))
                    .collect::<Vec<_>>();
                hits.sort_unstable();
                hits.first().copied()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon, Point};

    use crate::{crs::Crs, geom::Geometries};

    #[test]
    fn points_join_to_containing_shape() {
        let a = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let b = polygon![(x: 1.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 1.0, y: 1.0)];
        let geoms = Geometries::new(
            vec![MultiPolygon::new(vec![a]), MultiPolygon::new(vec![b])],
            Crs::from_epsg(5070).unwrap(),
        );

        let located = geoms.locate_points(&[
            Point::new(0.5, 0.5),
            Point::new(1.5, 0.25),
            Point::new(3.0, 3.0),
        ]);
        assert_eq!(located, vec![Some(0), Some(1), None]);
    }
}
