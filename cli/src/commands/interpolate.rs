use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use areal::{clip_to_common_extent, interpolate, Layer, RunManifest, Weighting};
use tracing::info;

use crate::cli::{Cli, InterpolateArgs};

pub fn run(cli: &Cli, args: &InterpolateArgs) -> Result<()> {
    let mut config = super::load_config(cli)?;
    if let Some(fraction) = args.min_fragment_fraction { config.min_fragment_fraction = fraction }
    if args.no_repair { config.repair_invalid = false }
    if args.source_weights { config.weighting = Weighting::SourceArea }

    let mut source = read_layer(&args.source, args.source_id.as_deref())?;
    let mut target = read_layer(&args.target, args.target_id.as_deref())?;
    let mut reference = args.reference.as_deref()
        .map(|path| read_layer(path, None))
        .transpose()?;

    if args.to_metric {
        let metric = target.geoms().metric_crs();
        info!(crs = %metric, "reprojecting layers");
        source = source.to_crs(&metric)?;
        target = target.to_crs(&metric)?;
        reference = reference.map(|layer| layer.to_crs(&metric)).transpose()?;
    }

    if let Some(reference) = &reference {
        let mut clipped = clip_to_common_extent(reference, &[source, target], &config)?;
        target = clipped.pop().ok_or_else(|| anyhow!("clipping returned no target layer"))?;
        source = clipped.pop().ok_or_else(|| anyhow!("clipping returned no source layer"))?;
    }

    let mut estimates = interpolate(&source, &target, &args.attributes, &config)?;
    for spec in &args.shares {
        let (name, numerator, denominators) = parse_share(spec)?;
        estimates = estimates.with_share(name, numerator, &denominators)?;
    }
    if args.fill_missing {
        estimates = estimates.fill_missing(&target);
    }

    let id_col = args.target_id.as_deref().unwrap_or("id");
    estimates.write_csv(&args.output, id_col)?;
    info!(rows = estimates.len(), path = %args.output.display(), "wrote estimates");

    let mut manifest = RunManifest::new("interpolate").with_config(&config).with_crs(target.crs());
    for path in [Some(&args.source), Some(&args.target), args.reference.as_ref()].into_iter().flatten() {
        manifest.add_input(path)?;
    }
    manifest.add_count("source_features", source.len());
    manifest.add_count("target_features", target.len());
    manifest.add_count("estimates", estimates.len());
    manifest.write(&super::manifest_path(&args.output))?;

    Ok(())
}

/// Read a layer by file extension.
fn read_layer(path: &Path, id_field: Option<&str>) -> Result<Layer> {
    let ext = path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "geojson" | "json" => Layer::read_geojson(path, id_field, None),
        "shp" | "zip" => Layer::read_shapefile(path, id_field),
        _ => bail!("unsupported layer format: {}", path.display()),
    }
    .with_context(|| format!("[interpolate] Failed to load layer {}", path.display()))
}

/// Parse `name=numerator/den1+den2`.
fn parse_share(spec: &str) -> Result<(&str, &str, Vec<&str>)> {
    let (name, ratio) = spec.split_once('=')
        .ok_or_else(|| anyhow!("share must look like name=num/den1+den2, got {spec:?}"))?;
    let (numerator, denominators) = ratio.split_once('/')
        .ok_or_else(|| anyhow!("share must look like name=num/den1+den2, got {spec:?}"))?;
    Ok((name, numerator, denominators.split('+').collect()))
}
