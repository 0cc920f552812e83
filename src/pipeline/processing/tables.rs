//! Extraction of the data tables from the Montréal statistics page.
//!
//! The page layout is controlled upstream and changes without notice. The
//! extractor therefore checks the number of data tables against the schema and
//! refuses to write anything when it differs: a layout change invalidates every
//! assumption about what the columns mean.

use crate::constants::{
    DEFAULT_INFO_BGCOLOR, DEFAULT_SCHEMA_SOURCE, DEFAULT_TABLE_CLASS, DEFAULT_TABLE_FILES,
};
use crate::error::{Result, ScraperError};
use crate::pipeline::processing::cell::normalize_cell;
use crate::pipeline::storage::{SaveOutcome, VersionedStore};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Expected shape of the source document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableSchema {
    /// Cached document under `sources/` to extract from.
    pub source: String,
    /// CSS class carried by every content table.
    pub table_class: String,
    /// Background colour of the cells used by textual call-out boxes.
    pub info_bgcolor: String,
    /// Output file per data table, in document order.
    pub tables: Vec<String>,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            source: DEFAULT_SCHEMA_SOURCE.to_string(),
            table_class: DEFAULT_TABLE_CLASS.to_string(),
            info_bgcolor: DEFAULT_INFO_BGCOLOR.to_string(),
            tables: DEFAULT_TABLE_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TableSchema {
    pub fn expected_count(&self) -> usize {
        self.tables.len()
    }
}

/// One row of cells. Rows of a table may differ in length.
pub type Row = Vec<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTable {
    pub file_name: String,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    Written {
        path: PathBuf,
        save: SaveOutcome,
    },
    /// The versioned store refused the new content; the old file is untouched.
    Rejected {
        path: PathBuf,
        reason: String,
    },
}

struct Selectors {
    tables: Selector,
    info_cell: Selector,
    prose: Selector,
    row: Selector,
    cell: Selector,
}

impl Selectors {
    fn for_schema(schema: &TableSchema) -> Result<Self> {
        Ok(Self {
            tables: selector(&format!("table.{}", schema.table_class))?,
            info_cell: selector("td[bgcolor]")?,
            prose: selector("p, h4")?,
            row: selector("tr")?,
            cell: selector("th, td")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ScraperError::Config(format!("invalid selector '{}': {:?}", css, e)))
}

/// Parse `html` into the tables named by `schema`.
///
/// Fails with `SchemaMismatch` unless exactly `schema.expected_count()` data
/// tables are found.
pub fn parse_tables(html: &str, schema: &TableSchema) -> Result<Vec<ExtractedTable>> {
    let sel = Selectors::for_schema(schema)?;
    let document = Html::parse_document(html);

    let candidates: Vec<ElementRef> = document.select(&sel.tables).collect();
    let data_tables: Vec<ElementRef> = candidates
        .iter()
        .copied()
        .filter(|t| is_data_table(t, &sel, schema))
        .collect();
    debug!(
        "Found {} '{}' tables, {} of them data tables",
        candidates.len(),
        schema.table_class,
        data_tables.len()
    );

    if data_tables.len() != schema.expected_count() {
        crate::observability::metrics::extract::schema_mismatch();
        return Err(ScraperError::SchemaMismatch {
            source_name: schema.source.clone(),
            found: data_tables.len(),
            expected: schema.expected_count(),
        });
    }

    Ok(schema
        .tables
        .iter()
        .zip(data_tables)
        .map(|(file_name, table)| ExtractedTable {
            file_name: file_name.clone(),
            rows: table_rows(&table, &sel),
        })
        .collect())
}

// Some content tables hold text instead of data, but they are easy to spot:
// call-out boxes use a coloured cell, prose uses paragraphs and sub-headings.
fn is_data_table(table: &ElementRef, sel: &Selectors, schema: &TableSchema) -> bool {
    let is_callout = table.select(&sel.info_cell).any(|td| {
        td.value()
            .attr("bgcolor")
            .map_or(false, |c| c.trim().eq_ignore_ascii_case(&schema.info_bgcolor))
    });
    let is_prose = table.select(&sel.prose).next().is_some();
    !is_callout && !is_prose
}

fn table_rows(table: &ElementRef, sel: &Selectors) -> Vec<Row> {
    table
        .select(&sel.row)
        .map(|tr| {
            tr.select(&sel.cell)
                .map(|cell| normalize_cell(&cell.text().collect::<String>()))
                .collect::<Row>()
        })
        .filter(|row| !row.is_empty())
        .collect()
}

/// Serialize ragged rows as CSV without padding.
pub fn rows_to_csv(rows: &[Row]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ScraperError::Io(e.into_error()))
}

/// Extract every table of `html` and save each one under `processed_dir`.
///
/// Nothing is written on a schema mismatch. A rejected write of one table does
/// not prevent writing the others.
#[instrument(skip(html, schema, store), fields(source = %schema.source))]
pub fn extract(
    html: &str,
    schema: &TableSchema,
    store: &VersionedStore,
    processed_dir: &Path,
) -> Result<Vec<TableOutcome>> {
    let tables = parse_tables(html, schema)?;

    let mut outcomes = Vec::with_capacity(tables.len());
    for table in tables {
        let path = processed_dir.join(&table.file_name);
        let csv = rows_to_csv(&table.rows)?;
        match store.save(&path, &csv) {
            Ok(save) => {
                crate::observability::metrics::extract::table_written();
                info!("Wrote {} rows to {}", table.rows.len(), path.display());
                outcomes.push(TableOutcome::Written { path, save });
            }
            Err(e @ ScraperError::StaleOrSuspiciousWrite { .. }) => {
                warn!("Keeping previous {}: {}", path.display(), e);
                outcomes.push(TableOutcome::Rejected {
                    path,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(outcomes)
}
