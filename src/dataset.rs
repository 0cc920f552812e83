//! Read side of the processed tables, for downstream consumers.
//!
//! A [`DatasetBundle`] is loaded once and handed around by reference; it
//! never changes after construction.

use crate::error::Result;
use crate::pipeline::orchestrator::StorageLayout;
use crate::pipeline::processing::tables::{Row, TableSchema};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub rows: Vec<Row>,
}

impl Table {
    /// First row, which is the header when the source table had one.
    pub fn header(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Rows after the first.
    pub fn body(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or_default()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetBundle {
    tables: Vec<Table>,
}

impl DatasetBundle {
    /// Load every table named in `schema` from the processed directory.
    pub fn load(layout: &StorageLayout, schema: &TableSchema) -> Result<Self> {
        let tables = schema
            .tables
            .iter()
            .map(|name| {
                let path = layout.processed_path(name);
                let mut reader = csv::ReaderBuilder::new()
                    .has_headers(false)
                    .flexible(true)
                    .from_path(&path)?;
                let rows = reader
                    .records()
                    .map(|record| Ok(record?.iter().map(str::to_string).collect()))
                    .collect::<Result<Vec<Row>>>()?;
                Ok(Table {
                    name: name.clone(),
                    rows,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tables })
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}
