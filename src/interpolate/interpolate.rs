use tracing::info;

use crate::{
    config::OverlayConfig,
    crs::ensure_common_projected,
    error::Result,
    interpolate::{fragment::overlay_valid, Estimates},
    layer::Layer,
};

/// Redistribute `attributes` from `source` onto `target` by fractional area of overlap.
///
/// Each source value is weighted by its overlap with each target feature, then summed per
/// target. The weight is `overlap_area / target_area` by default, or `overlap_area /
/// source_area` under `Weighting::SourceArea`. Targets that overlap no source feature
/// receive no row; see `Estimates::require` and `Estimates::fill_missing`.
///
/// The attributes must be extensive quantities (counts). Rates or densities are
/// redistributed the same way without complaint and give wrong answers.
///
/// Both layers must share a projected CRS and should already be clipped to a common
/// extent. Invalid polygons are repaired or rejected according to `config`.
pub fn interpolate(source: &Layer, target: &Layer, attributes: &[String], config: &OverlayConfig) -> Result<Estimates> {
    ensure_common_projected(source.crs(), target.crs())?;
    source.require_attributes(attributes)?;

    let source = source.clone().validate(config)?;
    let target = target.clone().validate(config)?;

    let values = attributes.iter()
        .map(|name| source.attribute(name))
        .collect::<Result<Vec<_>>>()?;

    let fragments = overlay_valid(&source, &target, config)?;

    // Per-target sums; `None` until the target receives a fragment.
    let mut sums: Vec<Option<Vec<f64>>> = vec![None; target.len()];
    for fragment in &fragments {
        let row = sums[fragment.target].get_or_insert_with(|| vec![0.0; attributes.len()]);
        for (a, column) in values.iter().enumerate() {
            row[a] += column[fragment.source] * fragment.weight(config.weighting);
        }
    }

    let (ids, rows): (Vec<_>, Vec<_>) = sums.into_iter().enumerate()
        .filter_map(|(t, row)| row.map(|row| (target.ids()[t].clone(), row)))
        .unzip();

    let columns = (0..attributes.len())
        .map(|a| rows.iter().map(|row| row[a]).collect())
        .collect();

    info!(
        targets = target.len(),
        estimated = ids.len(),
        fragments = fragments.len(),
        attributes = attributes.len(),
        "interpolated attributes"
    );
    Estimates::new(ids, attributes.to_vec(), columns)
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};
    use polars::{frame::DataFrame, prelude::Column};

    use super::interpolate;
    use crate::{config::{OverlayConfig, Weighting}, crs::Crs, error::ArealError, layer::{FeatureId, Layer}};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]])
    }

    fn source() -> Layer {
        Layer::new(
            vec!["S1".into(), "S2".into()],
            vec![rect(0.0, 0.0, 2.0, 1.0), rect(2.0, 0.0, 4.0, 1.0)],
            DataFrame::new(vec![
                Column::new("dem".into(), vec![40.0, 10.0]),
                Column::new("name".into(), vec!["north", "south"]),
            ]).unwrap(),
            Crs::from_epsg(26915).unwrap(),
        ).unwrap()
    }

    #[test]
    fn straddling_target_collects_from_both_sources() {
        let target = Layer::new(
            vec!["T".into(), "far".into()],
            vec![rect(1.0, 0.0, 3.0, 1.0), rect(10.0, 0.0, 11.0, 1.0)],
            DataFrame::empty(),
            Crs::from_epsg(26915).unwrap(),
        ).unwrap();

        let est = interpolate(&source(), &target, &["dem".to_string()], &OverlayConfig::default()).unwrap();
        assert_eq!(est.ids(), &[FeatureId::new("T")]);
        // Half of T lies in each source: 40 * 0.5 + 10 * 0.5.
        let dem = est.get(&FeatureId::new("T"), "dem").unwrap().unwrap();
        assert!((dem - 25.0).abs() < 1e-9, "dem = {dem}");
        assert!(matches!(est.require(&FeatureId::new("far")), Err(ArealError::EmptyResult(_))));
    }

    #[test]
    fn source_weighting_splits_without_loss() {
        let target = Layer::new(
            vec!["W".into(), "E".into()],
            vec![rect(0.0, 0.0, 1.0, 1.0), rect(1.0, 0.0, 4.0, 1.0)],
            DataFrame::empty(),
            Crs::from_epsg(26915).unwrap(),
        ).unwrap();
        let config = OverlayConfig { weighting: Weighting::SourceArea, ..Default::default() };

        let est = interpolate(&source(), &target, &["dem".to_string()], &config).unwrap();
        let west = est.get(&FeatureId::new("W"), "dem").unwrap().unwrap();
        assert!((west - 20.0).abs() < 1e-9, "west = {west}");
        assert!((est.total("dem").unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn text_attributes_cannot_be_interpolated() {
        let result = interpolate(&source(), &source(), &["name".to_string()], &OverlayConfig::default());
        assert!(matches!(result, Err(ArealError::MissingAttribute(_))));
    }
}
