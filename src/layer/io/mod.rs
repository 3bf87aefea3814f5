mod csv;
mod geojson;
mod shapefile;

pub(crate) use csv::{read_csv, write_csv};

use ahash::AHashSet;
use anyhow::Result;
use polars::{frame::DataFrame, prelude::{AnyValue, Column}};

/// Build an attribute table from per-feature `(field, value)` rows.
///
/// Columns appear in first-seen order. A column whose non-null values are all numbers
/// becomes Float64, all booleans becomes Boolean, anything else becomes String.
/// Fields missing from a row are null.
fn build_columns(rows: Vec<Vec<(String, AnyValue<'static>)>>) -> Result<DataFrame> {
    let mut seen = AHashSet::new();
    let names = rows.iter()
        .flat_map(|row| row.iter().map(|(name, _)| name))
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect::<Vec<_>>();

    if names.is_empty() { return Ok(DataFrame::empty()) }

    let cell = |row: &[(String, AnyValue<'static>)], name: &str| -> AnyValue<'static> {
        row.iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.clone())
            .unwrap_or(AnyValue::Null)
    };

    let columns = names.iter()
        .map(|name| {
            let cells = rows.iter().map(|row| cell(row.as_slice(), name.as_str())).collect::<Vec<_>>();
            let non_null = || cells.iter().filter(|v| !v.is_null());

            if non_null().all(|v| matches!(v, AnyValue::Float64(_))) {
                Column::new(name.as_str().into(), cells.iter().map(|v| v.extract::<f64>()).collect::<Vec<_>>())
            } else if non_null().all(|v| matches!(v, AnyValue::Boolean(_))) {
                Column::new(name.as_str().into(), cells.iter()
                    .map(|v| match v { AnyValue::Boolean(b) => Some(*b), _ => None })
                    .collect::<Vec<_>>())
            } else {
                Column::new(name.as_str().into(), cells.iter()
                    .map(|v| match v {
                        AnyValue::Null => None,
                        AnyValue::StringOwned(s) => Some(s.to_string()),
                        other => Some(other.to_string()),
                    })
                    .collect::<Vec<_>>())
            }
        })
        .collect::<Vec<_>>();

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use polars::prelude::{AnyValue, DataType};

    use super::build_columns;

    #[test]
    fn mixed_rows_infer_column_types() {
        let rows = vec![
            vec![("DEM".to_string(), AnyValue::Float64(10.0)), ("NAME".to_string(), AnyValue::StringOwned("Ward 1".into()))],
            vec![("NAME".to_string(), AnyValue::StringOwned("Ward 2".into())), ("DEM".to_string(), AnyValue::Null)],
            vec![("DEM".to_string(), AnyValue::Float64(5.0)), ("OPEN".to_string(), AnyValue::Boolean(true))],
        ];
        let df = build_columns(rows).unwrap();

        assert_eq!(df.height(), 3);
        let names = df.get_column_names().iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["DEM", "NAME", "OPEN"]);
        assert_eq!(df.column("DEM").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("NAME").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("OPEN").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(df.column("DEM").unwrap().null_count(), 1);
    }

    #[test]
    fn no_fields_gives_empty_table() {
        assert_eq!(build_columns(vec![vec![], vec![]]).unwrap().width(), 0);
    }
}
