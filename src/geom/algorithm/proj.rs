use geo::Coord;
use tracing::debug;

use crate::crs::{Crs, Reprojector};
use crate::error::Result;
use crate::geom::Geometries;

impl Geometries {
    /// Reproject all shapes into `target`. A no-op when the CRS is already equivalent.
    pub fn to_crs(&self, target: &Crs) -> Result<Geometries> {
        if self.crs().is_equivalent(target) {
            return Ok(self.clone());
        }

        debug!(from = %self.crs(), to = %target, shapes = self.len(), "reprojecting geometries");
        let reprojector = Reprojector::new(self.crs(), target)?;
        let shapes = self.shapes().iter()
            .map(|shape| reprojector.multipolygon(shape))
            .collect::<Result<Vec<_>>>()?;

        Ok(Geometries::new(shapes, target.clone()))
    }

    /// Metric CRS suitable for area arithmetic: the current CRS if already projected,
    /// otherwise the UTM zone containing the center of the shapes' bounds.
    pub fn metric_crs(&self) -> Crs {
        if self.crs().is_projected() { return self.crs().clone() }

        let center = if let Some(b) = self.bounds() { b.center() }
        else { Coord { x: -104.0, y: 45.0 } }; // US geographic center (fallback)

        Crs::utm_for(center, self.crs().datum())
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, Area, MultiPolygon};

    use crate::{crs::Crs, geom::Geometries};

    #[test]
    fn lon_lat_square_gets_metric_area() {
        // 0.01° x 0.01° near 45°N: ~787 m x ~1112 m.
        let square = polygon![(x: -93.01, y: 45.0), (x: -93.0, y: 45.0), (x: -93.0, y: 45.01), (x: -93.01, y: 45.01)];
        let geoms = Geometries::new(vec![MultiPolygon::new(vec![square])], Crs::from_epsg(4326).unwrap());

        let metric = geoms.metric_crs();
        assert_eq!(metric.epsg(), Some(32615));

        let projected = geoms.to_crs(&metric).unwrap();
        let area = projected.shapes()[0].unsigned_area();
        assert!(area > 0.85e6 && area < 0.9e6, "area = {area}");
    }

    #[test]
    fn projected_layer_keeps_its_crs() {
        let geoms = Geometries::new(vec![], Crs::from_epsg(5070).unwrap());
        assert_eq!(geoms.metric_crs().epsg(), Some(5070));
        assert_eq!(geoms.to_crs(&Crs::from_epsg(5070).unwrap()).unwrap().len(), 0);
    }
}
