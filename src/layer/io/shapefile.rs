use std::{fs, path::{Path, PathBuf}};

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use polars::prelude::AnyValue;
use shapefile::{dbase::{FieldValue, Record}, PolygonRing, Reader, Shape};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::{crs::Crs, layer::{FeatureId, Layer}};

use super::build_columns;

impl Layer {
    /// Load a polygon layer from a `.shp` file (with its `.dbf` and optional `.prj`),
    /// or from a `.zip` archive containing one.
    ///
    /// Feature ids come from the `id_field` attribute, or from record order when `None`.
    /// Without a `.prj` the layer is assumed to be NAD83 lon/lat (EPSG:4269).
    pub fn read_shapefile(path: &Path, id_field: Option<&str>) -> Result<Self> {
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip")) {
            let dir = tempfile::tempdir().context("[layer::io::shapefile] Failed to create temp dir")?;
            extract_zip(path, dir.path())?;
            let shp = find_shapefile(dir.path())?;
            return read_shapefile_at(&shp, id_field);
        }
        read_shapefile_at(path, id_field)
    }
}

fn read_shapefile_at(path: &Path, id_field: Option<&str>) -> Result<Layer> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[layer::io::shapefile] Failed to open shapefile: {}", path.display()))?;

    let mut ids = Vec::new();
    let mut shapes = Vec::new();
    let mut rows = Vec::new();

    for (i, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.context("[layer::io::shapefile] Error reading shape+record")?;

        let id = match id_field {
            Some(field) => record_id(&record, field)
                .ok_or_else(|| anyhow!("record {i} has no usable {field:?} field"))?,
            None => i.to_string(),
        };

        ids.push(FeatureId::from(id));
        shapes.push(shape_to_multipolygon(shape)
            .with_context(|| format!("record {i} in {}", path.display()))?);
        rows.push(record_to_row(record));
    }

    let crs = read_prj(path)?;
    debug!(path = %path.display(), features = ids.len(), crs = %crs, "read shapefile");

    Ok(Layer::new(ids, shapes, build_columns(rows)?, crs)?)
}

/// Read the `.prj` sidecar next to `path`, defaulting to NAD83 lon/lat when absent.
fn read_prj(path: &Path) -> Result<Crs> {
    let prj = path.with_extension("prj");
    if !prj.exists() {
        warn!(path = %path.display(), "no .prj sidecar; assuming EPSG:4269");
        return Ok(Crs::from_epsg(4269)?);
    }
    let wkt = fs::read_to_string(&prj)
        .with_context(|| format!("[layer::io::shapefile] Failed to read {}", prj.display()))?;
    Ok(Crs::from_prj_wkt(&wkt)?)
}

fn record_id(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        FieldValue::Character(Some(s)) => Some(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => Some(format_number(*n)),
        FieldValue::Integer(n) => Some(n.to_string()),
        FieldValue::Double(n) => Some(format_number(*n)),
        _ => None,
    }
}

/// Integral numbers print without a trailing ".0" so they match ids stored as text.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 { format!("{}", n as i64) } else { n.to_string() }
}

/// Convert a dBase record to `(field, value)` cells, sorted by field name.
fn record_to_row(record: Record) -> Vec<(String, AnyValue<'static>)> {
    let mut row = record.into_iter()
        .map(|(field, value)| {
            let cell = match value {
                FieldValue::Character(Some(s)) => AnyValue::StringOwned(s.trim().into()),
                FieldValue::Numeric(Some(n)) => AnyValue::Float64(n),
                FieldValue::Float(Some(n)) => AnyValue::Float64(n as f64),
                FieldValue::Integer(n) => AnyValue::Float64(n as f64),
                FieldValue::Double(n) => AnyValue::Float64(n),
                FieldValue::Currency(n) => AnyValue::Float64(n),
                FieldValue::Logical(Some(b)) => AnyValue::Boolean(b),
                _ => AnyValue::Null,
            };
            (field, cell)
        })
        .collect::<Vec<_>>();
    row.sort_by(|a, b| a.0.cmp(&b.0));
    row
}

fn shape_to_multipolygon(shape: Shape) -> Result<MultiPolygon<f64>> {
    match shape {
        Shape::Polygon(polygon) => Ok(shp_to_geo(&polygon)),
        Shape::NullShape => Ok(MultiPolygon::new(vec![])),
        other => bail!("found non-Polygon shape in layer: {:?}", other.shapetype()),
    }
}

/// Convert shapefile::Polygon to geo::MultiPolygon<f64>.
/// Shapefile stores each exterior ring followed by its holes.
fn shp_to_geo(polygon: &shapefile::Polygon) -> MultiPolygon<f64> {
    fn to_linestring(points: &[shapefile::Point]) -> LineString<f64> {
        let mut coords = points.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect::<Vec<_>>();
        if !coords.is_empty() && coords[0] != coords[coords.len() - 1] {
            coords.push(coords[0]);
        }
        LineString(coords)
    }

    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for ring in polygon.rings() {
        match ring {
            PolygonRing::Outer(points) => {
                if let Some(ext) = exterior.replace(to_linestring(points)) {
                    polygons.push(Polygon::new(ext, std::mem::take(&mut holes)));
                }
            }
            PolygonRing::Inner(points) => holes.push(to_linestring(points)),
        }
    }
    if let Some(ext) = exterior {
        polygons.push(Polygon::new(ext, holes));
    }

    MultiPolygon::new(polygons)
}

/// Extracts the given `.zip` file to the target directory.
fn extract_zip(zip_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = fs::File::open(zip_path)
        .with_context(|| format!("[layer::io::shapefile] Failed to open {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("[layer::io::shapefile] Failed to read zip archive {}", zip_path.display()))?;
    archive.extract(dest_dir)
        .with_context(|| format!("[layer::io::shapefile] Failed to extract {}", zip_path.display()))
}

/// Locate the single `.shp` file under `dir`.
fn find_shapefile(dir: &Path) -> Result<PathBuf> {
    let mut found = WalkDir::new(dir).into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("shp")))
        .collect::<Vec<_>>();

    match found.len() {
        0 => bail!("[layer::io::shapefile] No .shp file found in archive"),
        1 => Ok(found.remove(0)),
        n => bail!("[layer::io::shapefile] Archive holds {n} .shp files; expected exactly one"),
    }
}
