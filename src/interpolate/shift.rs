use std::{collections::BTreeSet, path::Path};

use polars::{frame::DataFrame, prelude::Column};

use crate::{
    error::Result,
    interpolate::Estimates,
    layer::{self, FeatureId},
};

/// Change in one attribute between two estimate tables for a single target.
#[derive(Debug, Clone, PartialEq)]
pub struct Shift {
    pub id: FeatureId,
    /// `a - b`, or `None` when either side has no row or an undefined (NaN) value.
    pub value: Option<f64>,
}

/// Per-target difference `a[key] - b[key]`, joined on target id and ordered by id.
///
/// Ids found in only one table are kept with a missing value rather than a zero.
pub fn attribute_shift(a: &Estimates, b: &Estimates, key: &str) -> Result<Vec<Shift>> {
    let value = |est: &Estimates, id: &FeatureId| -> Result<Option<f64>> {
        Ok(est.get(id, key)?.filter(|v| !v.is_nan()))
    };

    let ids = a.ids().iter().chain(b.ids()).collect::<BTreeSet<_>>();
    ids.into_iter()
        .map(|id| Ok(Shift {
            id: id.clone(),
            value: value(a, id)?.zip(value(b, id)?).map(|(x, y)| x - y),
        }))
        .collect()
}

/// Tabulate shifts as `id_col` plus a nullable Float64 `value_col`.
pub fn shifts_to_dataframe(shifts: &[Shift], id_col: &str, value_col: &str) -> Result<DataFrame> {
    Ok(DataFrame::new(vec![
        Column::new(id_col.into(), shifts.iter().map(|s| s.id.as_str()).collect::<Vec<_>>()),
        Column::new(value_col.into(), shifts.iter().map(|s| s.value).collect::<Vec<_>>()),
    ])?)
}

/// Write shifts to a CSV file; missing values are written as empty cells.
pub fn write_shifts_csv(shifts: &[Shift], path: &Path, id_col: &str, value_col: &str) -> anyhow::Result<()> {
    let mut df = shifts_to_dataframe(shifts, id_col, value_col)?;
    layer::write_csv(&mut df, path)
}
