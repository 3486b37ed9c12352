use crate::error::{OrmError, OrmResult};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Configuration for a [`crate::Session`].
///
/// Defaults: debug logging off, autocommit on, no statement timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Log every statement (with backend name) at `INFO` on `dictorm.sql`.
    pub debug: bool,
    /// Commit after every mutating CRUD call.
    pub autocommit: bool,
    /// Per-attempt statement timeout. `None` means no timeout (default).
    #[serde(rename = "query_timeout_ms", deserialize_with = "millis")]
    pub query_timeout: Option<Duration>,
    /// Truncate logged SQL (in bytes, on a char boundary). `None` disables truncation.
    pub max_log_sql_length: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debug: false,
            autocommit: true,
            query_timeout: None,
            max_log_sql_length: Some(200),
        }
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

fn parse_bool(key: &str, raw: &str) -> OrmResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(OrmError::Config(format!("{key}: expected a boolean, got '{other}'"))),
    }
}

impl SessionConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable statement logging.
    pub fn debug(mut self, on: bool) -> Self {
        self.debug = on;
        self
    }

    /// Enable or disable commit-after-mutation.
    pub fn autocommit(mut self, on: bool) -> Self {
        self.autocommit = on;
        self
    }

    /// Set the per-attempt statement timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_log_sql_length(mut self, len: usize) -> Self {
        self.max_log_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_log_sql_length = None;
        self
    }

    /// Read overrides from `DICTORM_DEBUG`, `DICTORM_AUTOCOMMIT` and
    /// `DICTORM_QUERY_TIMEOUT_MS`; unset variables keep their defaults.
    pub fn from_env() -> OrmResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`SessionConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OrmResult<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup("DICTORM_DEBUG") {
            config.debug = parse_bool("DICTORM_DEBUG", &raw)?;
        }
        if let Some(raw) = lookup("DICTORM_AUTOCOMMIT") {
            config.autocommit = parse_bool("DICTORM_AUTOCOMMIT", &raw)?;
        }
        if let Some(raw) = lookup("DICTORM_QUERY_TIMEOUT_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                OrmError::Config(format!(
                    "DICTORM_QUERY_TIMEOUT_MS: expected milliseconds, got '{raw}'"
                ))
            })?;
            config.query_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert!(!config.debug);
        assert!(config.autocommit);
        assert!(config.query_timeout.is_none());
    }

    #[test]
    fn env_overrides() {
        let config = SessionConfig::from_lookup(lookup(&[
            ("DICTORM_DEBUG", "yes"),
            ("DICTORM_AUTOCOMMIT", "0"),
            ("DICTORM_QUERY_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();
        assert!(config.debug);
        assert!(!config.autocommit);
        assert_eq!(config.query_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn env_rejects_garbage() {
        let err = SessionConfig::from_lookup(lookup(&[("DICTORM_DEBUG", "maybe")])).unwrap_err();
        assert!(matches!(err, OrmError::Config(_)));
        let err =
            SessionConfig::from_lookup(lookup(&[("DICTORM_QUERY_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, OrmError::Config(_)));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"debug": true, "query_timeout_ms": 250}"#).unwrap();
        assert!(config.debug);
        assert!(config.autocommit);
        assert_eq!(config.query_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.max_log_sql_length, Some(200));
    }
}
