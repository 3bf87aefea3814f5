use std::{collections::BTreeMap, path::Path};

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use geo::Point;
use polars::{frame::DataFrame, prelude::{Column, DataType}};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::{
    crs::{Crs, Reprojector},
    error::{ArealError, Result},
    layer,
    raster::RasterSeries,
};

/// One position along a moving path, in the raster's CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub point: Point<f64>,
}

/// A raster value read at one observation. `value` is `None` for nodata or off-grid points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSample {
    pub date: NaiveDate,
    pub point: Point<f64>,
    pub value: Option<f64>,
}

/// A date whose observations could not be sampled.
#[derive(Debug)]
pub struct TrackFailure {
    pub date: NaiveDate,
    pub observations: usize,
    pub error: ArealError,
}

/// Samples from every date that resolved, plus the dates that did not.
#[derive(Debug, Default)]
pub struct TrackExtraction {
    /// Ordered by date, then by position in the input track.
    pub samples: Vec<TrackSample>,
    pub failures: Vec<TrackFailure>,
}

/// Sample `series` along `track`.
///
/// Observations are grouped by date and each date is sampled independently (in parallel).
/// A date missing from the time axis becomes a `TrackFailure` while the other dates still
/// produce samples.
pub fn extract_track(series: &RasterSeries, track: &[Observation]) -> TrackExtraction {
    let mut by_date: BTreeMap<NaiveDate, Vec<Point<f64>>> = BTreeMap::new();
    for obs in track {
        by_date.entry(obs.date).or_default().push(obs.point);
    }

    let results = by_date.into_par_iter()
        .map(|(date, points)| extract_date(series, date, &points)
            .map_err(|error| TrackFailure { date, observations: points.len(), error }))
        .collect::<Vec<_>>();

    let mut extraction = TrackExtraction::default();
    for result in results {
        match result {
            Ok(samples) => extraction.samples.extend(samples),
            Err(failure) => {
                warn!(date = %failure.date, observations = failure.observations, error = %failure.error, "skipping date");
                extraction.failures.push(failure);
            }
        }
    }

    info!(samples = extraction.samples.len(), failed_dates = extraction.failures.len(), "extracted track");
    extraction
}

/// Sample one date's band at every point.
fn extract_date(series: &RasterSeries, date: NaiveDate, points: &[Point<f64>]) -> Result<Vec<TrackSample>> {
    series.band_index(date)?;
    points.iter()
        .map(|&point| {
            let value = match series.sample(date, point) {
                Ok(value) => value,
                Err(ArealError::OutOfBounds { .. }) => None,
                Err(e) => return Err(e),
            };
            Ok(TrackSample { date, point, value })
        })
        .collect()
}

/// Move observations from `from` into the CRS of `series`. A no-op when they already match.
pub fn reproject_track(track: &[Observation], from: &Crs, series: &RasterSeries) -> Result<Vec<Observation>> {
    if from.is_equivalent(series.crs()) { return Ok(track.to_vec()) }

    let reprojector = Reprojector::new(from, series.crs())?;
    track.iter()
        .map(|obs| Ok(Observation { date: obs.date, point: reprojector.point(obs.point)? }))
        .collect()
}

/// Read observations from a CSV with `date` (YYYY-MM-DD), `x` and `y` columns.
pub fn read_track_csv(path: &Path) -> anyhow::Result<Vec<Observation>> {
    let df = layer::read_csv(path, Some("date"))?;
    let column = |name: &str| df.column(name)
        .map_err(|_| anyhow!("[raster::track] {} has no {name:?} column", path.display()));

    let dates = column("date")?.str()?;
    let xs = column("x")?.cast(&DataType::Float64)?;
    let ys = column("y")?.cast(&DataType::Float64)?;

    dates.into_iter().zip(xs.f64()?).zip(ys.f64()?)
        .enumerate()
        .map(|(row, ((date, x), y))| {
            let (Some(date), Some(x), Some(y)) = (date, x, y) else {
                return Err(anyhow!("[raster::track] Missing value in row {row} of {}", path.display()));
            };
            let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .with_context(|| format!("[raster::track] Invalid date {date:?} in row {row}"))?;
            Ok(Observation { date, point: Point::new(x, y) })
        })
        .collect()
}

impl TrackExtraction {
    /// Samples as a `date, x, y, value` table; missing values are null.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Column::new("date".into(), self.samples.iter().map(|s| s.date.format("%Y-%m-%d").to_string()).collect::<Vec<_>>()),
            Column::new("x".into(), self.samples.iter().map(|s| s.point.x()).collect::<Vec<_>>()),
            Column::new("y".into(), self.samples.iter().map(|s| s.point.y()).collect::<Vec<_>>()),
            Column::new("value".into(), self.samples.iter().map(|s| s.value).collect::<Vec<_>>()),
        ])?)
    }

    pub fn write_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut df = self.to_dataframe()?;
        layer::write_csv(&mut df, path)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use geo::Point;
    use ndarray::Array3;

    use super::{extract_track, read_track_csv, reproject_track, Observation};
    use crate::{crs::Crs, error::ArealError, raster::{GeoTransform, RasterSeries}};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    fn series() -> RasterSeries {
        let bands = Array3::from_shape_fn((3, 1, 2), |(b, _, c)| (b * 10 + c) as f64);
        RasterSeries::new(GeoTransform::new(0.0, 1.0, 1.0, -1.0), Crs::from_epsg(4326).unwrap(), vec![day(1), day(2), day(4)], bands, None).unwrap()
    }

    #[test]
    fn missing_date_fails_alone() {
        let track = vec![
            Observation { date: day(4), point: Point::new(0.5, 0.5) },
            Observation { date: day(1), point: Point::new(1.5, 0.5) },
            Observation { date: day(3), point: Point::new(0.5, 0.5) },
            Observation { date: day(1), point: Point::new(9.0, 0.5) },
        ];

        let extraction = extract_track(&series(), &track);
        let values = extraction.samples.iter().map(|s| (s.date, s.value)).collect::<Vec<_>>();
        assert_eq!(values, vec![(day(1), Some(1.0)), (day(1), None), (day(4), Some(20.0))]);

        assert_eq!(extraction.failures.len(), 1);
        assert_eq!(extraction.failures[0].date, day(3));
        assert!(matches!(extraction.failures[0].error, ArealError::MissingTemporalMatch(d) if d == day(3)));
    }

    #[test]
    fn track_csv_reads_dates_and_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.csv");
        std::fs::write(&path, "date,x,y\n2020-01-02,0.5,0.5\n2020-01-04,1.5,0.25\n").unwrap();

        let track = read_track_csv(&path).unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track[1].date, day(4));
        assert_eq!(track[1].point, Point::new(1.5, 0.25));
    }

    #[test]
    fn track_moves_into_raster_crs() {
        let utm = RasterSeries::new(
            GeoTransform::new(400_000.0, 5_000_000.0, 1_000.0, -1_000.0),
            Crs::from_epsg(32615).unwrap(),
            vec![day(1)],
            Array3::zeros((1, 1, 1)),
            None,
        ).unwrap();
        let track = [Observation { date: day(1), point: Point::new(-93.0, 45.0) }];

        let moved = reproject_track(&track, &Crs::from_epsg(4326).unwrap(), &utm).unwrap();
        assert_eq!(moved[0].date, day(1));
        // Central meridian of zone 15 is -93, so easting is the false easting.
        assert!((moved[0].point.x() - 500_000.0).abs() < 1.0);
        assert!((moved[0].point.y() - 4_983_000.0).abs() < 2_000.0);

        let same = reproject_track(&track, &Crs::from_epsg(4326).unwrap(), &series()).unwrap();
        assert_eq!(same, track.to_vec());
    }
}
