use std::{fs::File, path::Path, sync::Arc};

use ahash::AHashMap;
use anyhow::{anyhow, bail, Context, Result};
use polars::{
    frame::DataFrame,
    io::{SerReader, SerWriter},
    prelude::{CsvReadOptions, CsvWriter, DataType, Field, IdxCa, IdxSize, NamedFrom, Schema},
};

use crate::layer::Layer;

/// Read a CSV file into a DataFrame, forcing `key` (when given) to be read as text
/// so identifiers keep their leading zeros.
pub(crate) fn read_csv(path: &Path, key: Option<&str>) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[layer::io::csv] Failed to open CSV file: {}", path.display()))?;

    let schema = key.map(|key| Arc::new(Schema::from_iter([Field::new(key.into(), DataType::String)])));
    CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(schema)
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("[layer::io::csv] Failed to read CSV from {}", path.display()))
}

/// Write a DataFrame to a CSV file.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[layer::io::csv] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(df)
        .with_context(|| format!("[layer::io::csv] Failed to write CSV to {}", path.display()))
}

impl Layer {
    /// Attach the columns of a CSV table to this layer, matching the CSV's `key` column
    /// against feature ids. Features with no CSV row get nulls; CSV rows with no feature
    /// are ignored.
    pub fn join_csv(&self, path: &Path, key: &str) -> Result<Layer> {
        let table = read_csv(path, Some(key))?;
        self.join_table(&table, key)
            .with_context(|| format!("[layer::io::csv] Failed to join {}", path.display()))
    }

    /// Attach the columns of `table` to this layer by matching `table[key]` to feature ids.
    pub fn join_table(&self, table: &DataFrame, key: &str) -> Result<Layer> {
        let keys = table.column(key)
            .map_err(|_| anyhow!("join table has no {key:?} column"))?
            .cast(&DataType::String)?;

        let mut rows = AHashMap::with_capacity(table.height());
        for (row, value) in keys.str()?.into_iter().enumerate() {
            let Some(value) = value else { continue };
            if rows.insert(value.to_string(), row as IdxSize).is_some() {
                bail!("join key {value:?} appears more than once");
            }
        }

        let idx = IdxCa::new("idx".into(), self.ids().iter()
            .map(|id| rows.get(id.as_str()).copied())
            .collect::<Vec<_>>());
        let joined = table.drop(key)?.take(&idx)?;

        let data = if self.data().width() == 0 { joined } else {
            for name in joined.get_column_names() {
                if self.data().column(name.as_str()).is_ok() {
                    bail!("column {name:?} already exists on the layer");
                }
            }
            self.data().hstack(joined.get_columns())?
        };

        Ok(Layer::new(self.ids().to_vec(), self.geoms().shapes().to_vec(), data, self.crs().clone())?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use geo::{polygon, MultiPolygon};
    use polars::frame::DataFrame;

    use crate::{crs::Crs, layer::Layer};

    fn blocks() -> Layer {
        let square = |x: f64| MultiPolygon::new(vec![polygon![(x: x, y: 0.0), (x: x + 1.0, y: 0.0), (x: x + 1.0, y: 1.0), (x: x, y: 1.0)]]);
        Layer::new(
            vec!["001".into(), "002".into(), "003".into()],
            vec![square(0.0), square(1.0), square(2.0)],
            DataFrame::empty(),
            Crs::from_epsg(5070).unwrap(),
        ).unwrap()
    }

    #[test]
    fn join_keeps_leading_zeros_and_fills_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "GEOID,pop\n003,30\n001,10\n999,5").unwrap();
        drop(file);

        let joined = blocks().join_csv(&path, "GEOID").unwrap();
        assert_eq!(joined.data().width(), 1);
        assert_eq!(joined.attribute("pop").unwrap(), vec![10.0, 0.0, 30.0]);
        assert_eq!(joined.data().column("pop").unwrap().null_count(), 1);
    }

    #[test]
    fn duplicate_join_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.csv");
        std::fs::write(&path, "GEOID,pop\n001,1\n001,2\n").unwrap();
        assert!(blocks().join_csv(&path, "GEOID").is_err());
    }
}
