use std::path::Path;

use anyhow::{anyhow, bail, Context};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use geo::Point;
use ndarray::{Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::{
    crs::Crs,
    error::{ArealError, Result},
    raster::GeoTransform,
};

/// A stack of same-shaped grids, one band per date.
#[derive(Debug, Clone)]
pub struct RasterSeries {
    transform: GeoTransform,
    crs: Crs,
    dates: Vec<NaiveDate>,
    bands: Array3<f64>, // band x row x col
    nodata: Option<f64>,
}

impl RasterSeries {
    pub fn new(transform: GeoTransform, crs: Crs, dates: Vec<NaiveDate>, bands: Array3<f64>, nodata: Option<f64>) -> Result<Self> {
        if bands.len_of(Axis(0)) != dates.len() {
            return Err(ArealError::LengthMismatch { what: "raster bands", expected: dates.len(), actual: bands.len_of(Axis(0)) });
        }
        Ok(Self { transform, crs, dates, bands, nodata })
    }

    #[inline] pub fn transform(&self) -> &GeoTransform { &self.transform }

    #[inline] pub fn crs(&self) -> &Crs { &self.crs }

    #[inline] pub fn dates(&self) -> &[NaiveDate] { &self.dates }

    #[inline] pub fn nodata(&self) -> Option<f64> { self.nodata }

    /// `(rows, cols)` of every band.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.bands.len_of(Axis(1)), self.bands.len_of(Axis(2)))
    }

    /// Position of `date` on the time axis.
    pub fn band_index(&self, date: NaiveDate) -> Result<usize> {
        self.dates.iter().position(|&d| d == date)
            .ok_or(ArealError::MissingTemporalMatch(date))
    }

    /// The grid for `date`.
    pub fn band(&self, date: NaiveDate) -> Result<ArrayView2<'_, f64>> {
        Ok(self.bands.index_axis(Axis(0), self.band_index(date)?))
    }

    /// Value of the cell containing `point` (in the raster's CRS) on `date`.
    /// Nodata and NaN cells give `None`; points off the grid fail with `OutOfBounds`.
    pub fn sample(&self, date: NaiveDate, point: Point<f64>) -> Result<Option<f64>> {
        let band = self.band_index(date)?;
        let (rows, cols) = self.shape();
        let (row, col) = self.transform.cell_of(point.x(), point.y(), rows, cols)
            .ok_or(ArealError::OutOfBounds { x: point.x(), y: point.y() })?;

        let value = self.bands[[band, row, col]];
        Ok((!value.is_nan() && Some(value) != self.nodata).then_some(value))
    }

    /// Load a series from its JSON form.
    ///
    /// The time axis is either `dates` (ISO dates) or a CF-style `time` block such as
    /// `{"units": "days since 2020-01-01", "values": [0, 1, 2]}`. `values` holds every
    /// band in order, each row-major.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("[raster::series] Failed to read {}", path.display()))?;
        let file: SeriesFile = serde_json::from_slice(&bytes)
            .with_context(|| format!("[raster::series] Failed to parse {}", path.display()))?;
        file.into_series()
            .with_context(|| format!("[raster::series] Invalid raster series {}", path.display()))
    }

    /// Write the series in the JSON form read by `from_json_file`.
    pub fn write_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let (rows, cols) = self.shape();
        let t = &self.transform;
        let file = SeriesFile {
            transform: [t.origin_x, t.pixel_width, t.row_rotation, t.origin_y, t.col_rotation, t.pixel_height],
            epsg: self.crs.epsg(),
            proj4: if self.crs.epsg().is_some() { None } else { self.crs.proj4().map(str::to_string) },
            nodata: self.nodata,
            dates: Some(self.dates.clone()),
            time: None,
            rows,
            cols,
            values: self.bands.iter().copied().collect(),
        };
        let bytes = serde_json::to_vec(&file).context("[raster::series] Failed to serialize raster series")?;
        std::fs::write(path, bytes)
            .with_context(|| format!("[raster::series] Failed to write {}", path.display()))
    }
}

#[derive(Serialize, Deserialize)]
struct SeriesFile {
    transform: [f64; 6],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    epsg: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proj4: Option<String>,
    #[serde(default)]
    nodata: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dates: Option<Vec<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<CfTime>,
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct CfTime {
    units: String,
    values: Vec<f64>,
}

impl SeriesFile {
    fn into_series(self) -> anyhow::Result<RasterSeries> {
        let crs = match (self.epsg, self.proj4) {
            (Some(code), _) => Crs::from_epsg(code)?,
            (None, Some(proj4)) => Crs::from_proj4(&proj4),
            (None, None) => bail!("raster series needs an `epsg` or `proj4` CRS"),
        };

        let dates = match (self.dates, self.time) {
            (Some(dates), _) => dates,
            (None, Some(time)) => cf_dates(&time.units, &time.values)?,
            (None, None) => bail!("raster series needs `dates` or a `time` axis"),
        };

        let bands = Array3::from_shape_vec((dates.len(), self.rows, self.cols), self.values)
            .map_err(|e| anyhow!("values do not fill {} bands of {}x{}: {e}", dates.len(), self.rows, self.cols))?;

        Ok(RasterSeries::new(GeoTransform::from_gdal(self.transform), crs, dates, bands, self.nodata)?)
    }
}

/// Convert CF offsets (`"<unit> since <reference>"`) into calendar dates.
/// Only the standard (Gregorian) calendar is supported.
pub(crate) fn cf_dates(units: &str, offsets: &[f64]) -> anyhow::Result<Vec<NaiveDate>> {
    let (unit, reference) = units.split_once(" since ")
        .ok_or_else(|| anyhow!("CF time units must look like \"days since 2000-01-01\", got {units:?}"))?;

    let seconds = match unit.trim().to_ascii_lowercase().as_str() {
        "days" | "day" | "d" => 86_400.0,
        "hours" | "hour" | "h" => 3_600.0,
        "minutes" | "minute" | "min" => 60.0,
        "seconds" | "second" | "s" => 1.0,
        other => bail!("unsupported CF time unit {other:?}"),
    };

    let reference = reference.trim().trim_end_matches('Z');
    let start = NaiveDateTime::parse_from_str(reference, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(reference, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDate::parse_from_str(reference, "%Y-%m-%d").map(|d| d.and_time(Default::default())))
        .with_context(|| format!("invalid CF reference time {reference:?}"))?;

    offsets.iter()
        .map(|&v| {
            if !v.is_finite() { bail!("CF time offset {v} is not a finite number") }
            let delta = Duration::try_seconds((v * seconds).round() as i64)
                .ok_or_else(|| anyhow!("CF time offset {v} out of range"))?;
            let date = start.checked_add_signed(delta)
                .ok_or_else(|| anyhow!("CF time offset {v} {unit} overflows the calendar"))?;
            Ok(date.date())
        })
        .collect()
}
