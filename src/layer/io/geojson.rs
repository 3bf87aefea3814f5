use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use polars::prelude::{AnyValue, Column};
use serde_json::{json, Map, Value};

use crate::{crs::Crs, layer::{FeatureId, Layer}};

use super::build_columns;

impl Layer {
    /// Load a polygon layer from a GeoJSON FeatureCollection.
    ///
    /// Feature ids come from the `id_field` property when given, otherwise from the
    /// feature's `id` member, otherwise from the feature's position. The CRS is taken from
    /// `crs` when given, then from a legacy `crs` member, and defaults to EPSG:4326.
    pub fn read_geojson(path: &Path, id_field: Option<&str>, crs: Option<Crs>) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("[layer::io::geojson] Failed to read {}", path.display()))?;
        Self::from_geojson_bytes(&bytes, id_field, crs)
            .with_context(|| format!("[layer::io::geojson] Failed to load layer from {}", path.display()))
    }

    /// Load a polygon layer from GeoJSON bytes.
    pub fn from_geojson_bytes(bytes: &[u8], id_field: Option<&str>, crs: Option<Crs>) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes).context("Failed to parse GeoJSON")?;
        let features = value["features"].as_array()
            .ok_or_else(|| anyhow!("GeoJSON is not a FeatureCollection"))?;

        let crs = match crs {
            Some(crs) => crs,
            None => match legacy_crs_code(&value) {
                Some(code) => Crs::from_epsg(code)?,
                None => Crs::from_epsg(4326)?,
            },
        };

        let mut ids = Vec::with_capacity(features.len());
        let mut shapes = Vec::with_capacity(features.len());
        let mut rows = Vec::with_capacity(features.len());

        for (i, feature) in features.iter().enumerate() {
            let properties = feature["properties"].as_object().cloned().unwrap_or_default();

            let id = match id_field {
                Some(field) => properties.get(field)
                    .and_then(value_to_id)
                    .ok_or_else(|| anyhow!("feature {i} has no usable {field:?} property"))?,
                None => value_to_id(&feature["id"]).unwrap_or_else(|| i.to_string()),
            };

            ids.push(FeatureId::from(id));
            shapes.push(parse_geometry(&feature["geometry"])
                .with_context(|| format!("invalid geometry in feature {i}"))?);
            rows.push(properties);
        }

        let data = build_columns(rows.iter().map(|row| {
            row.iter().filter_map(|(key, value)| {
                let cell = match value {
                    Value::Number(n) => AnyValue::Float64(n.as_f64()?),
                    Value::String(s) => AnyValue::StringOwned(s.as_str().into()),
                    Value::Bool(b) => AnyValue::Boolean(*b),
                    _ => AnyValue::Null,
                };
                Some((key.clone(), cell))
            }).collect()
        }).collect())?;

        Ok(Layer::new(ids, shapes, data, crs)?)
    }

    /// Write the layer as a GeoJSON FeatureCollection with all attribute columns as properties.
    pub fn write_geojson(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec(&self.to_geojson()?)
            .context("[layer::io::geojson] Failed to serialize GeoJSON")?;
        std::fs::write(path, bytes)
            .with_context(|| format!("[layer::io::geojson] Failed to write {}", path.display()))
    }

    /// Export the layer as a GeoJSON FeatureCollection value.
    pub fn to_geojson(&self) -> Result<Value> {
        let columns = self.data().get_columns();

        let features = self.ids().iter().zip(self.geoms().shapes()).enumerate()
            .map(|(i, (id, shape))| {
                let mut properties = Map::new();
                for column in columns {
                    properties.insert(column.name().to_string(), cell_to_json(column, i)?);
                }
                Ok(json!({
                    "type": "Feature",
                    "id": id.as_str(),
                    "geometry": multipolygon_to_geojson(shape),
                    "properties": properties,
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut collection = json!({
            "type": "FeatureCollection",
            "features": features,
        });
        if let Some(code) = self.crs().epsg().filter(|&code| code != 4326) {
            collection["crs"] = json!({
                "type": "name",
                "properties": { "name": format!("urn:ogc:def:crs:EPSG::{code}") },
            });
        }
        Ok(collection)
    }
}

/// Identifier text from a string or number property.
fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// EPSG code from a pre-RFC 7946 `"crs": {"properties": {"name": ...}}` member.
fn legacy_crs_code(value: &Value) -> Option<u32> {
    let name = value["crs"]["properties"]["name"].as_str()?;
    if name.ends_with("CRS84") { return Some(4326) }
    name.rsplit(':').next()?.parse().ok()
}

fn cell_to_json(column: &Column, row: usize) -> Result<Value> {
    Ok(match column.get(row)? {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => json!(b),
        AnyValue::String(s) => json!(s),
        AnyValue::StringOwned(s) => json!(s.as_str()),
        value if column.dtype().is_primitive_numeric() => {
            json!(value.extract::<f64>().ok_or_else(|| anyhow!("non-numeric value in column {}", column.name()))?)
        }
        value => json!(value.to_string()),
    })
}

/// Parse a GeoJSON Polygon or MultiPolygon geometry. A null geometry becomes an empty shape.
fn parse_geometry(geometry: &Value) -> Result<MultiPolygon<f64>> {
    if geometry.is_null() { return Ok(MultiPolygon::new(vec![])) }

    let coords = geometry["coordinates"].as_array()
        .ok_or_else(|| anyhow!("geometry has no coordinates"))?;

    match geometry["type"].as_str() {
        Some("Polygon") => Ok(MultiPolygon::new(vec![parse_polygon(coords)?])),
        Some("MultiPolygon") => Ok(MultiPolygon::new(coords.iter()
            .map(|polygon| parse_polygon(polygon.as_array()
                .ok_or_else(|| anyhow!("invalid MultiPolygon member"))?))
            .collect::<Result<Vec<_>>>()?)),
        Some(other) => bail!("unsupported geometry type {other:?} (expected Polygon or MultiPolygon)"),
        None => bail!("geometry has no type"),
    }
}

/// Parse `[exterior, hole, hole, ...]` ring arrays.
fn parse_polygon(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| parse_ring(ring.as_array()
        .ok_or_else(|| anyhow!("invalid polygon ring"))?));
    let exterior = rings.next()
        .ok_or_else(|| anyhow!("polygon is missing its exterior ring"))??;
    Ok(Polygon::new(exterior, rings.collect::<Result<Vec<_>>>()?))
}

/// Parse a ring from `[[x, y], [x, y], ...]`, closing it if needed.
fn parse_ring(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = coords.iter()
        .map(|pair| {
            let x = pair[0].as_f64().ok_or_else(|| anyhow!("invalid coordinate: x must be a number"))?;
            let y = pair[1].as_f64().ok_or_else(|| anyhow!("invalid coordinate: y must be a number"))?;
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>>>()?;

    if !points.is_empty() && points[0] != points[points.len() - 1] {
        points.push(points[0]);
    }
    Ok(LineString(points))
}

/// Convert a MultiPolygon to a GeoJSON geometry value.
fn multipolygon_to_geojson(shape: &MultiPolygon<f64>) -> Value {
    let polygons = shape.0.iter()
        .map(|polygon| std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .map(|ring| ring.coords().map(|c| vec![c.x, c.y]).collect::<Vec<_>>())
            .collect::<Vec<_>>())
        .collect::<Vec<_>>();

    json!({
        "type": "MultiPolygon",
        "coordinates": polygons,
    })
}
