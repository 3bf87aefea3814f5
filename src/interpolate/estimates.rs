use std::path::Path;

use ahash::AHashMap;
use anyhow::Context;
use polars::{frame::DataFrame, prelude::{Column, DataType}};

use crate::{
    error::{ArealError, Result},
    layer::{self, FeatureId, Layer},
};

/// Interpolated attribute values, one row per target feature that received estimates.
///
/// Values are stored column by column: `values[c][r]` is attribute `columns[c]` for `ids[r]`.
#[derive(Debug, Clone)]
pub struct Estimates {
    ids: Vec<FeatureId>,
    index: AHashMap<FeatureId, usize>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl Estimates {
    /// Build a table from ids, column names and per-column values.
    pub fn new(ids: Vec<FeatureId>, columns: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        if values.len() != columns.len() {
            return Err(ArealError::LengthMismatch { what: "estimate columns", expected: columns.len(), actual: values.len() });
        }
        if let Some(bad) = values.iter().find(|column| column.len() != ids.len()) {
            return Err(ArealError::LengthMismatch { what: "estimate rows", expected: ids.len(), actual: bad.len() });
        }

        let mut index = AHashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(ArealError::DuplicateId(id.clone()));
            }
        }

        Ok(Self { ids, index, columns, values })
    }

    #[inline] pub fn len(&self) -> usize { self.ids.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    #[inline] pub fn ids(&self) -> &[FeatureId] { &self.ids }

    #[inline] pub fn columns(&self) -> &[String] { &self.columns }

    #[inline] pub fn contains(&self, id: &FeatureId) -> bool { self.index.contains_key(id) }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns.iter().position(|c| c == name)
            .ok_or_else(|| ArealError::MissingAttribute(name.to_string()))
    }

    /// All values of one attribute, in row order.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        Ok(&self.values[self.column_index(name)?])
    }

    /// Value of `attr` for target `id`, or `None` when the target has no row.
    pub fn get(&self, id: &FeatureId, attr: &str) -> Result<Option<f64>> {
        let c = self.column_index(attr)?;
        Ok(self.index.get(id).map(|&r| self.values[c][r]))
    }

    /// Row values for target `id` in column order.
    /// Fails with `EmptyResult` when the target received no overlapping fragments.
    pub fn require(&self, id: &FeatureId) -> Result<Vec<f64>> {
        let &r = self.index.get(id).ok_or_else(|| ArealError::EmptyResult(id.clone()))?;
        Ok(self.values.iter().map(|column| column[r]).collect())
    }

    /// Sum of an attribute over all rows.
    pub fn total(&self, name: &str) -> Result<f64> {
        Ok(self.column(name)?.iter().sum())
    }

    /// One row per feature of `target`, in its order. Targets with no estimate get zeros.
    pub fn fill_missing(&self, target: &Layer) -> Estimates {
        let rows = target.ids().iter().map(|id| self.index.get(id).copied()).collect::<Vec<_>>();
        let values = self.values.iter()
            .map(|column| rows.iter().map(|row| row.map_or(0.0, |r| column[r])).collect())
            .collect();

        Estimates {
            ids: target.ids().to_vec(),
            index: target.ids().iter().cloned().enumerate().map(|(i, id)| (id, i)).collect(),
            columns: self.columns.clone(),
            values,
        }
    }

    /// Add a `name` column holding `numerator / sum(denominators)`.
    /// Rows whose denominator sums to zero get NaN.
    pub fn with_share(mut self, name: &str, numerator: &str, denominators: &[&str]) -> Result<Estimates> {
        if self.columns.iter().any(|c| c == name) {
            return Err(ArealError::DuplicateColumn(name.to_string()));
        }

        let num = self.column_index(numerator)?;
        let dens = denominators.iter().map(|d| self.column_index(d)).collect::<Result<Vec<_>>>()?;

        let share = (0..self.len())
            .map(|r| {
                let total = dens.iter().map(|&c| self.values[c][r]).sum::<f64>();
                if total == 0.0 { f64::NAN } else { self.values[num][r] / total }
            })
            .collect();

        self.columns.push(name.to_string());
        self.values.push(share);
        Ok(self)
    }

    /// Convert to a DataFrame with the ids in `id_col` followed by one Float64 column per attribute.
    pub fn to_dataframe(&self, id_col: &str) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Column::new(id_col.into(), self.ids.iter().map(|id| id.as_str()).collect::<Vec<_>>()));
        for (name, values) in self.columns.iter().zip(&self.values) {
            columns.push(Column::new(name.as_str().into(), values.clone()));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Build a table from a DataFrame. `id_col` supplies the ids; every other numeric
    /// column becomes an attribute (nulls read as NaN). Non-numeric columns are skipped.
    pub fn from_dataframe(df: &DataFrame, id_col: &str) -> Result<Estimates> {
        let ids = df.column(id_col)
            .map_err(|_| ArealError::MissingAttribute(id_col.to_string()))?
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, id)| id.map(FeatureId::new)
                .ok_or_else(|| ArealError::MissingAttribute(format!("{id_col} (null at row {row})"))))
            .collect::<Result<Vec<_>>>()?;

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for column in df.get_columns() {
            if column.name().as_str() == id_col || !column.dtype().is_primitive_numeric() { continue }
            let column_values = column.cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            columns.push(column.name().to_string());
            values.push(column_values);
        }

        Estimates::new(ids, columns, values)
    }

    /// Read an estimates table from CSV. The id column is read as text.
    pub fn read_csv(path: &Path, id_col: &str) -> anyhow::Result<Estimates> {
        let df = layer::read_csv(path, Some(id_col))?;
        Estimates::from_dataframe(&df, id_col)
            .with_context(|| format!("[interpolate::estimates] Invalid estimates table {}", path.display()))
    }

    /// Write the table to CSV with ids in `id_col`.
    pub fn write_csv(&self, path: &Path, id_col: &str) -> anyhow::Result<()> {
        let mut df = self.to_dataframe(id_col)?;
        layer::write_csv(&mut df, path)
    }
}

impl PartialEq for Estimates {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids && self.columns == other.columns && self.values == other.values
    }
}

#[cfg(test)]
mod tests {
    use geo::MultiPolygon;
    use polars::frame::DataFrame;

    use super::Estimates;
    use crate::{crs::Crs, error::ArealError, layer::{FeatureId, Layer}};

    fn votes() -> Estimates {
        Estimates::new(
            vec!["A".into(), "B".into()],
            vec!["dem".to_string(), "rep".to_string()],
            vec![vec![30.0, 0.0], vec![10.0, 0.0]],
        ).unwrap()
    }

    #[test]
    fn absent_target_is_empty_result() {
        let est = votes();
        assert_eq!(est.get(&FeatureId::new("A"), "dem").unwrap(), Some(30.0));
        assert_eq!(est.get(&FeatureId::new("Z"), "dem").unwrap(), None);
        assert!(matches!(est.require(&FeatureId::new("Z")), Err(ArealError::EmptyResult(id)) if id.as_str() == "Z"));
        assert!(matches!(est.get(&FeatureId::new("A"), "green"), Err(ArealError::MissingAttribute(_))));
    }

    #[test]
    fn share_of_two_party_total() {
        let est = votes().with_share("dem_share", "dem", &["dem", "rep"]).unwrap();
        assert_eq!(est.get(&FeatureId::new("A"), "dem_share").unwrap(), Some(0.75));
        assert!(est.get(&FeatureId::new("B"), "dem_share").unwrap().unwrap().is_nan());
    }

    #[test]
    fn fill_missing_follows_target_order() {
        let target = Layer::new(
            vec!["C".into(), "A".into()],
            vec![MultiPolygon::new(vec![]), MultiPolygon::new(vec![])],
            DataFrame::empty(),
            Crs::from_epsg(5070).unwrap(),
        ).unwrap();

        let filled = votes().fill_missing(&target);
        assert_eq!(filled.ids(), &[FeatureId::new("C"), FeatureId::new("A")]);
        assert_eq!(filled.column("dem").unwrap(), &[0.0, 30.0]);
    }

    #[test]
    fn csv_round_trip_keeps_text_ids() {
        let est = Estimates::new(
            vec!["007".into(), "010".into()],
            vec!["count".to_string()],
            vec![vec![1.5, 2.5]],
        ).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("est.csv");
        est.write_csv(&path, "GEOID").unwrap();

        let back = Estimates::read_csv(&path, "GEOID").unwrap();
        assert_eq!(back, est);
    }
}
