use std::{num::NonZeroUsize, path::Path, time::Duration};

use md_blocks::InconsistencyPolicy;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;
use crate::policy::ReparsePolicy;

const DEFAULT_THRESHOLD: usize = 32;
const DEFAULT_RENDER_INTERVAL_MS: u64 = 50;
const DEFAULT_HIGHLIGHT_CACHE_CAPACITY: usize = 256;
pub(crate) const DEFAULT_HIGHLIGHT_THREADS: usize = 2;

/// Tunables of the parsing pipeline. Every field is optional in the JSON
/// form and falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Characters a snapshot must grow by before it is parsed again
    pub threshold: usize,

    /// Minimum delay between redraws, for the rendering layer
    pub render_interval_ms: u64,

    /// Maximum number of highlighted code blocks kept around
    pub highlight_cache_capacity: usize,

    /// Threads highlighting code blocks next to the parser
    pub highlight_threads: usize,

    /// How to treat a snapshot that does not extend the previous one
    pub inconsistency: InconsistencyPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            threshold: DEFAULT_THRESHOLD,
            render_interval_ms: DEFAULT_RENDER_INTERVAL_MS,
            highlight_cache_capacity: DEFAULT_HIGHLIGHT_CACHE_CAPACITY,
            highlight_threads: DEFAULT_HIGHLIGHT_THREADS,
            inconsistency: InconsistencyPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&contents)?;
        config.validate()?;

        info!("loaded pipeline config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.highlight_threads == 0 {
            return Err(Error::config("highlight_threads must be at least 1"));
        }

        self.cache_capacity().map(|_| ())
    }

    pub fn cache_capacity(&self) -> Result<NonZeroUsize, Error> {
        NonZeroUsize::new(self.highlight_cache_capacity)
            .ok_or_else(|| Error::config("highlight_cache_capacity must be at least 1"))
    }

    pub fn reparse_policy(&self) -> ReparsePolicy {
        ReparsePolicy::new(self.threshold)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let file = write_config(r#"{ "threshold": 8 }"#);
        let config = PipelineConfig::load(file.path()).unwrap();

        assert_eq!(config.threshold, 8);
        assert_eq!(config.render_interval(), Duration::from_millis(50));
        assert_eq!(config.highlight_cache_capacity, 256);
        assert_eq!(config.highlight_threads, 2);
        assert_eq!(config.inconsistency, InconsistencyPolicy::Reject);
        assert_eq!(config.reparse_policy().threshold(), 8);
    }

    #[test]
    fn test_inconsistency_policy_names() {
        let file = write_config(r#"{ "inconsistency": "resync" }"#);
        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.inconsistency, InconsistencyPolicy::Resync);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let file = write_config(r#"{ "highlight_cache_capacity": 0 }"#);
        let err = PipelineConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }

    #[test]
    fn test_zero_highlight_threads_is_rejected() {
        let config = PipelineConfig {
            highlight_threads: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_json() {
        let file = write_config("{ threshold: ");
        assert!(matches!(
            PipelineConfig::load(file.path()),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PipelineConfig::load(dir.path().join("nope.json")),
            Err(Error::Io(_))
        ));
    }
}
