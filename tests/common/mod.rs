#![allow(dead_code)]

use areal::{Crs, Layer};
use geo::{polygon, MultiPolygon};
use polars::{frame::DataFrame, prelude::Column};

#[track_caller]
pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!((actual - expected).abs() <= tol, "expected {expected} ± {tol}, got {actual}");
}

pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]])
}

/// Layer in EPSG:26915 with an optional single Float64 attribute.
pub fn layer(ids: &[&str], shapes: Vec<MultiPolygon<f64>>, attr: Option<(&str, Vec<f64>)>) -> Layer {
    let data = match attr {
        Some((name, values)) => DataFrame::new(vec![Column::new(name.into(), values)]).unwrap(),
        None => DataFrame::empty(),
    };
    Layer::new(ids.iter().map(|&id| id.into()).collect(), shapes, data, Crs::from_epsg(26915).unwrap()).unwrap()
}

/// 3x3 grid of unit squares over [0, 3] x [0, 3] with counts 1..=9.
pub fn grid() -> Layer {
    let mut ids = Vec::new();
    let mut shapes = Vec::new();
    for row in 0..3 {
        for col in 0..3 {
            ids.push(format!("g{row}{col}"));
            shapes.push(rect(col as f64, row as f64, col as f64 + 1.0, row as f64 + 1.0));
        }
    }
    let ids = ids.iter().map(String::as_str).collect::<Vec<_>>();
    layer(&ids, shapes, Some(("count", (1..=9).map(f64::from).collect())))
}
