use anyhow::Result;
use areal::{extract_track, read_track_csv, reproject_track, Crs, RasterSeries, RunManifest};
use tracing::info;

use crate::cli::{Cli, ExtractArgs};

pub fn run(_cli: &Cli, args: &ExtractArgs) -> Result<()> {
    let series = RasterSeries::from_json_file(&args.raster)?;
    let mut track = read_track_csv(&args.track)?;
    if let Some(code) = args.track_epsg {
        track = reproject_track(&track, &Crs::from_epsg(code)?, &series)?;
    }
    info!(bands = series.dates().len(), observations = track.len(), "loaded raster and track");

    let extraction = extract_track(&series, &track);
    extraction.write_csv(&args.output)?;

    let mut manifest = RunManifest::new("extract").with_crs(series.crs());
    manifest.add_input(&args.raster)?;
    manifest.add_input(&args.track)?;
    manifest.add_count("samples", extraction.samples.len());
    manifest.add_count("failed_dates", extraction.failures.len());
    manifest.write(&super::manifest_path(&args.output))
}
