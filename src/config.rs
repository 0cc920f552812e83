use crate::constants::{
    DEFAULT_FETCH_ATTEMPTS, DEFAULT_RETRY_DELAY_MS, DEFAULT_SOURCES, DEFAULT_TIMEOUT_SECONDS,
    DEFAULT_USER_AGENT,
};
use crate::error::{Result, ScraperError};
use crate::pipeline::ingestion::fetcher::FetchPolicy;
use crate::pipeline::processing::tables::TableSchema;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Source registry, fetched in this order.
    pub sources: Vec<SourceEntry>,
    pub fetch: FetchConfig,
    pub schema: TableSchema,
    pub on_source_failure: SourceFailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceEntry {
    /// File name under `sources/`.
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub attempts: u32,
    pub retry_delay_ms: u64,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

/// What to do with the rest of the run when one source cannot be fetched or saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFailurePolicy {
    #[default]
    Skip,
    Abort,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES
                .iter()
                .map(|(name, url)| SourceEntry {
                    name: name.to_string(),
                    url: url.to_string(),
                })
                .collect(),
            fetch: FetchConfig::default(),
            schema: TableSchema::default(),
            on_source_failure: SourceFailurePolicy::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_FETCH_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn policy(&self) -> FetchPolicy {
        FetchPolicy {
            attempts: self.attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            check_file_name(&source.name, "source name")?;
            if !seen.insert(source.name.as_str()) {
                return Err(ScraperError::Config(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
            reqwest::Url::parse(&source.url).map_err(|e| {
                ScraperError::Config(format!("invalid url for '{}': {}", source.name, e))
            })?;
        }

        if self.fetch.attempts == 0 {
            return Err(ScraperError::Config(
                "fetch.attempts must be at least 1".into(),
            ));
        }

        check_file_name(&self.schema.source, "schema source")?;
        if self.schema.tables.is_empty() {
            return Err(ScraperError::Config(
                "schema.tables must name at least one output file".into(),
            ));
        }
        let mut outputs = HashSet::new();
        for table in &self.schema.tables {
            check_file_name(table, "schema table")?;
            if !outputs.insert(table.as_str()) {
                return Err(ScraperError::Config(format!(
                    "duplicate schema table '{}'",
                    table
                )));
            }
        }
        Ok(())
    }
}

// Names end up joined onto storage directories, so they must stay inside them.
fn check_file_name(name: &str, what: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if bad {
        return Err(ScraperError::Config(format!(
            "{} '{}' is not a plain file name",
            what, name
        )));
    }
    Ok(())
}
