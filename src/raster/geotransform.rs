use serde::{Deserialize, Serialize};

/// Affine mapping between grid cells and world coordinates.
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// North-up grids have zero rotation and a negative `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl GeoTransform {
    /// North-up transform with the upper-left corner at `(origin_x, origin_y)`.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self { origin_x, origin_y, pixel_width, pixel_height, row_rotation: 0.0, col_rotation: 0.0 }
    }

    /// From GDAL order `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    /// World coordinates of the center of cell `(row, col)`.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let (c, r) = (col as f64 + 0.5, row as f64 + 0.5);
        (
            self.origin_x + c * self.pixel_width + r * self.row_rotation,
            self.origin_y + c * self.col_rotation + r * self.pixel_height,
        )
    }

    /// Fractional `(col, row)` grid position of a world coordinate.
    /// Returns NaNs for a degenerate (non-invertible) transform.
    pub fn world_to_grid(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-12 { return (f64::NAN, f64::NAN) }

        let (dx, dy) = (x - self.origin_x, y - self.origin_y);
        (
            (self.pixel_height * dx - self.row_rotation * dy) / det,
            (-self.col_rotation * dx + self.pixel_width * dy) / det,
        )
    }

    /// The `(row, col)` cell containing a world coordinate on a `rows x cols` grid.
    pub fn cell_of(&self, x: f64, y: f64, rows: usize, cols: usize) -> Option<(usize, usize)> {
        let (col, row) = self.world_to_grid(x, y);
        let (col, row) = (col.floor(), row.floor());
        (col >= 0.0 && row >= 0.0 && col < cols as f64 && row < rows as f64)
            .then(|| (row as usize, col as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::GeoTransform;

    #[test]
    fn center_maps_back_to_its_cell() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);
        let (x, y) = gt.cell_center(10, 5);
        assert_eq!((x, y), (155.0, 95.0));
        assert_eq!(gt.cell_of(x, y, 20, 20), Some((10, 5)));
    }

    #[test]
    fn outside_grid_has_no_cell() {
        let gt = GeoTransform::from_gdal([0.0, 1.0, 0.0, 3.0, 0.0, -1.0]);
        assert_eq!(gt.cell_of(0.5, 2.5, 3, 3), Some((0, 0)));
        assert_eq!(gt.cell_of(-0.1, 2.5, 3, 3), None);
        assert_eq!(gt.cell_of(0.5, 3.5, 3, 3), None);
        assert_eq!(gt.cell_of(3.0, 1.0, 3, 3), None);
    }
}
