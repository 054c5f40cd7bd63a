//! Validator configuration
//!
//! Built once per validation run and passed explicitly to every component.
//! The workspace config file (`evoclaw/config.json`) contributes extra
//! journal source names via its `sources` object, and may tune the
//! validators through an optional `validation` block:
//!
//! ```json
//! {
//!   "sources": {"telegram": {"enabled": true}},
//!   "validation": {"future_skew_secs": 300, "match_prefix_len": 30}
//! }
//! ```

use crate::error::{EvoError, EvoResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Journal sources recognised without any configuration
pub const BUILTIN_SOURCES: &[&str] = &[
    "conversation",
    "moltbook",
    "x",
    "heartbeat",
    "flush_harvest",
    "other",
];

/// Sections every persona document must contain
pub const DEFAULT_REQUIRED_SECTIONS: &[&str] = &[
    "## Personality",
    "## Philosophy",
    "## Boundaries",
    "## Continuity",
];

/// Prefix length used to pair "before" and "after" bullets
pub const DEFAULT_MATCH_PREFIX_LEN: usize = 30;

/// Immutable configuration shared by all validators in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Recognised journal sources
    pub sources: BTreeSet<String>,
    /// Mandatory document sections (full header lines)
    pub required_sections: Vec<String>,
    /// Prefix length for fuzzy bullet pairing
    pub match_prefix_len: usize,
    /// Clock skew tolerated before a timestamp counts as future
    pub future_skew: chrono::Duration,
    /// Unreflected notable entries tolerated before warning
    pub notable_backlog: usize,
    /// Wall-clock budget per validator in orchestrated runs
    pub timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            sources: BUILTIN_SOURCES.iter().map(|s| (*s).to_string()).collect(),
            required_sections: DEFAULT_REQUIRED_SECTIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            match_prefix_len: DEFAULT_MATCH_PREFIX_LEN,
            future_skew: chrono::Duration::seconds(300),
            notable_backlog: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    sources: Map<String, Value>,
    #[serde(default)]
    validation: ValidationTuning,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ValidationTuning {
    future_skew_secs: Option<i64>,
    match_prefix_len: Option<usize>,
    notable_backlog: Option<usize>,
    required_sections: Option<Vec<String>>,
    timeout_secs: Option<u64>,
}

impl ValidatorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With additional sources
    #[must_use]
    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    /// With match prefix length
    #[inline]
    #[must_use]
    pub fn with_match_prefix_len(mut self, len: usize) -> Self {
        self.match_prefix_len = len;
        self
    }

    /// With notable backlog tolerance
    #[inline]
    #[must_use]
    pub fn with_notable_backlog(mut self, backlog: usize) -> Self {
        self.notable_backlog = backlog;
        self
    }

    /// With per-validator timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether `source` is recognised
    #[inline]
    #[must_use]
    pub fn is_known_source(&self, source: &str) -> bool {
        self.sources.contains(source)
    }

    /// Build from config file text
    ///
    /// # Errors
    /// Returns [`EvoError::Config`] if the text is not a JSON object of the
    /// expected shape.
    pub fn from_json_str(text: &str) -> EvoResult<Self> {
        let file: ConfigFile = serde_json::from_str(text)
            .map_err(|e| EvoError::Config(format!("invalid config: {e}")))?;
        Ok(Self::from_file(file))
    }

    /// Load from a config file
    ///
    /// # Errors
    /// Returns [`EvoError::Io`] if unreadable, [`EvoError::Config`] if malformed.
    pub fn load(path: &Path) -> EvoResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EvoError::io(path, e))?;
        Self::from_json_str(&text)
    }

    /// Load when a path is given and readable; otherwise defaults
    ///
    /// A missing file is silent; any other failure is logged and ignored.
    #[must_use]
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(config) => {
                tracing::debug!(
                    "loaded config from {} ({} sources)",
                    path.display(),
                    config.sources.len()
                );
                config
            }
            Err(e) if e.is_not_found() => Self::default(),
            Err(e) => {
                tracing::warn!("ignoring unusable config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn from_file(file: ConfigFile) -> Self {
        let mut config = Self::default().with_sources(file.sources.keys().cloned());
        let tuning = file.validation;
        if let Some(secs) = tuning.future_skew_secs {
            config.future_skew = chrono::Duration::seconds(secs.max(0));
        }
        if let Some(len) = tuning.match_prefix_len.filter(|len| *len > 0) {
            config.match_prefix_len = len;
        }
        if let Some(backlog) = tuning.notable_backlog {
            config.notable_backlog = backlog;
        }
        if let Some(sections) = tuning.required_sections {
            config.required_sections = sections;
        }
        if let Some(secs) = tuning.timeout_secs.filter(|secs| *secs > 0) {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }
}
