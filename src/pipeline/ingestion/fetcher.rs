use crate::app::ports::HttpClientPort;
use crate::constants::{DEFAULT_CHARSET, DEFAULT_FETCH_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
use crate::error::{Result, ScraperError};
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::Regex;
use std::thread;
use std::time::Duration;
use tracing::{debug, instrument, warn};

static CHARSET_PAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*"?([\w-]+)"#).expect("valid charset regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Total number of requests made before giving up, at least 1.
    pub attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub retry_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_FETCH_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// Outcome of one failed request.
enum AttemptError {
    /// Worth another try: transport error or non-200 status.
    Retry(String),
    /// Retrying cannot help, e.g. the payload cannot be decoded.
    Abort(ScraperError),
}

/// Retrieves remote documents, retrying unreliable sources and normalizing
/// every payload to UTF-8.
pub struct Fetcher {
    client: Box<dyn HttpClientPort>,
    policy: FetchPolicy,
}

impl Fetcher {
    pub fn new(client: Box<dyn HttpClientPort>, policy: FetchPolicy) -> Self {
        Self { client, policy }
    }

    /// Get the data at `url` as UTF-8 bytes.
    #[instrument(skip(self))]
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let attempts = self.policy.attempts.max(1);
        let mut last_reason = String::new();

        for attempt in 1..=attempts {
            let reason = match self.attempt(url) {
                Ok(bytes) => return Ok(bytes),
                Err(AttemptError::Abort(e)) => return Err(e),
                Err(AttemptError::Retry(reason)) => reason,
            };

            warn!("Attempt {}/{} for {} failed: {}", attempt, attempts, url, reason);
            last_reason = reason;
            if attempt < attempts && !self.policy.retry_delay.is_zero() {
                thread::sleep(self.policy.retry_delay);
            }
        }

        Err(ScraperError::FetchFailure {
            url: url.to_string(),
            attempts,
            reason: last_reason,
        })
    }

    fn attempt(&self, url: &str) -> std::result::Result<Vec<u8>, AttemptError> {
        let resp = match self.client.get(url) {
            Ok(resp) => resp,
            Err(e) => {
                crate::observability::metrics::sources::request_error(url);
                return Err(AttemptError::Retry(e));
            }
        };

        if !resp.is_ok() {
            crate::observability::metrics::sources::request_error(url);
            return Err(AttemptError::Retry(format!("HTTP status {}", resp.status)));
        }

        crate::observability::metrics::sources::request_success(url);
        debug!("Fetched {} bytes from {}", resp.bytes.len(), url);
        normalize_encoding(resp.bytes, resp.content_type.as_deref(), url)
            .map_err(AttemptError::Abort)
    }
}

/// Charset label declared in a Content-Type header, `utf-8` when there is none.
pub fn charset_of(content_type: Option<&str>) -> &str {
    content_type
        .and_then(|ct| CHARSET_PAT.captures(ct))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(DEFAULT_CHARSET)
}

/// Decode `data` using the charset from `content_type` and re-encode it as UTF-8.
///
/// Decoding is strict: malformed input or an unknown label is an error rather
/// than a lossy conversion.
pub fn normalize_encoding(data: Vec<u8>, content_type: Option<&str>, url: &str) -> Result<Vec<u8>> {
    let charset = charset_of(content_type);
    let encoding_error = || ScraperError::Encoding {
        url: url.to_string(),
        charset: charset.to_string(),
    };

    let encoding = Encoding::for_label(charset.as_bytes()).ok_or_else(encoding_error)?;
    if encoding == UTF_8 {
        return match String::from_utf8(data) {
            Ok(text) => Ok(text.into_bytes()),
            Err(_) => Err(encoding_error()),
        };
    }

    let text = encoding
        .decode_without_bom_handling_and_without_replacement(&data)
        .ok_or_else(encoding_error)?;
    Ok(text.into_owned().into_bytes())
}
