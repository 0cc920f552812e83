use crate::config::{Config, SourceEntry, SourceFailurePolicy};
use crate::constants::{DEFAULT_CHARSET, PROCESSED_DIR, SOURCES_DIR};
use crate::error::{Result, ScraperError};
use crate::pipeline::ingestion::Fetcher;
use crate::pipeline::lock::RunLock;
use crate::pipeline::processing::{extract, TableOutcome};
use crate::pipeline::status::{RunPhase, StatusFile};
use crate::pipeline::storage::{SaveOutcome, VersionedStore};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn};

/// Paths making up one storage directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.root.join(SOURCES_DIR)
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join(PROCESSED_DIR)
    }

    pub fn source_path(&self, name: &str) -> PathBuf {
        self.sources_dir().join(name)
    }

    pub fn processed_path(&self, name: &str) -> PathBuf {
        self.processed_dir().join(name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Do not fetch anything, only process the cached documents.
    pub local_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Saved { save: SaveOutcome, bytes: usize },
    /// Fetched, but smaller than the cached copy, which was kept.
    Rejected { reason: String },
    Failed { reason: String },
    /// Not fetched (local mode).
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub name: String,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    pub tables: Vec<TableOutcome>,
}

impl RunReport {
    pub fn sources_failed(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s.outcome, SourceOutcome::Failed { .. }))
            .count()
    }

    pub fn tables_written(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| matches!(t, TableOutcome::Written { .. }))
            .count()
    }
}

/// One pass of the ingestion pipeline: lock, fetch every source, extract the
/// tables, unlock.
pub struct Pipeline {
    config: Config,
    layout: StorageLayout,
    fetcher: Fetcher,
    store: VersionedStore,
}

impl Pipeline {
    pub fn new(config: Config, layout: StorageLayout, fetcher: Fetcher) -> Self {
        Self {
            config,
            layout,
            fetcher,
            store: VersionedStore::new(),
        }
    }

    /// Run the pipeline while holding the run lock on the storage root.
    ///
    /// Fails without touching anything if another run holds the lock.
    pub fn run(&self, options: &RunOptions) -> Result<RunReport> {
        let lock = RunLock::acquire(self.layout.root())?;
        let mut status = StatusFile::start(self.layout.root())?;

        let result = self.run_locked(options, &mut status);
        let recorded = match &result {
            Ok(_) => status.set_phase(RunPhase::Finished),
            Err(e) => status.fail(&e.to_string()),
        };
        if let Err(e) = recorded {
            warn!("Could not update run status: {}", e);
        }

        lock.release();
        result
    }

    fn run_locked(&self, options: &RunOptions, status: &mut StatusFile) -> Result<RunReport> {
        let mut report = RunReport::default();

        if options.local_only {
            info!(
                "Local mode, not fetching {} sources",
                self.config.sources.len()
            );
            report.sources = self
                .config
                .sources
                .iter()
                .map(|s| SourceReport {
                    name: s.name.clone(),
                    outcome: SourceOutcome::Skipped,
                })
                .collect();
        } else {
            status.set_phase(RunPhase::Fetching)?;
            for entry in &self.config.sources {
                let outcome = self.refresh_source(entry)?;
                report.sources.push(SourceReport {
                    name: entry.name.clone(),
                    outcome,
                });
            }
        }

        status.set_phase(RunPhase::Extracting)?;
        let schema = &self.config.schema;
        let html = read_cached(&self.layout.source_path(&schema.source))?;
        report.tables = extract(&html, schema, &self.store, &self.layout.processed_dir())?;

        info!(
            "Run finished: {} sources failed, {}/{} tables written",
            report.sources_failed(),
            report.tables_written(),
            report.tables.len()
        );
        Ok(report)
    }

    /// Fetch and save one source. Failures are returned as outcomes unless the
    /// configured policy is to abort the run.
    fn refresh_source(&self, entry: &SourceEntry) -> Result<SourceOutcome> {
        let span = info_span!("source", name = %entry.name);
        let _enter = span.enter();

        match self.fetch_and_save(entry) {
            Ok(outcome) => Ok(outcome),
            Err(e @ ScraperError::StaleOrSuspiciousWrite { .. }) => {
                warn!("Not updating {}: {}", entry.name, e);
                Ok(SourceOutcome::Rejected {
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                crate::observability::metrics::sources::fetch_failure(&entry.name);
                error!("Failed to refresh {}: {}", entry.name, e);
                match self.config.on_source_failure {
                    SourceFailurePolicy::Skip => Ok(SourceOutcome::Failed {
                        reason: e.to_string(),
                    }),
                    SourceFailurePolicy::Abort => Err(e),
                }
            }
        }
    }

    fn fetch_and_save(&self, entry: &SourceEntry) -> Result<SourceOutcome> {
        let data = self.fetcher.fetch(&entry.url)?;
        crate::observability::metrics::sources::payload_bytes(&entry.name, data.len());
        let save = self.store.save(&self.layout.source_path(&entry.name), &data)?;
        Ok(SourceOutcome::Saved {
            save,
            bytes: data.len(),
        })
    }
}

fn read_cached(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("cannot read cached document {}: {}", path.display(), e),
        )
    })?;
    String::from_utf8(bytes).map_err(|_| ScraperError::Encoding {
        url: path.display().to_string(),
        charset: DEFAULT_CHARSET.to_string(),
    })
}
