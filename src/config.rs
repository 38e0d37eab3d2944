//! Engine configuration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Default byte budget for the serialized [`SharedState`](crate::SharedState).
pub const DEFAULT_STATE_BUDGET_BYTES: usize = 1000;

/// Default number of keywords kept from trend discovery.
pub const DEFAULT_KEYWORD_LIMIT: usize = 10;

/// Tunables for a [`WorkflowEngine`](crate::WorkflowEngine).
///
/// Loadable from JSON; missing fields take their defaults.
///
/// ```rust
/// use content_workflow::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::from_json(r#"{"keyword_limit": 5, "stage_timeout_ms": 30000}"#).unwrap();
/// assert_eq!(config.keyword_limit, 5);
/// assert_eq!(config.state_budget_bytes, 1000);
/// assert_eq!(config.stage_timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum serialized size of the shared state after each stage.
    pub state_budget_bytes: usize,
    /// Maximum number of keywords the discovery projection keeps.
    pub keyword_limit: usize,
    /// Upper bound on a single stage invocation. `None` waits forever.
    #[serde(
        rename = "stage_timeout_ms",
        serialize_with = "serialize_timeout_ms",
        deserialize_with = "deserialize_timeout_ms"
    )]
    pub stage_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_budget_bytes: DEFAULT_STATE_BUDGET_BYTES,
            keyword_limit: DEFAULT_KEYWORD_LIMIT,
            stage_timeout: None,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the shared state byte budget.
    #[must_use]
    pub fn with_state_budget_bytes(mut self, bytes: usize) -> Self {
        self.state_budget_bytes = bytes;
        self
    }

    /// Set the keyword limit.
    #[must_use]
    pub fn with_keyword_limit(mut self, limit: usize) -> Self {
        self.keyword_limit = limit;
        self
    }

    /// Set the per-stage timeout.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }
}

fn serialize_timeout_ms<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    value
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .serialize(s)
}

fn deserialize_timeout_ms<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.stage_timeout.is_none());
    }

    #[test]
    fn test_from_json_reports_malformed_input() {
        let config = EngineConfig::from_json(r#"{"state_budget_bytes": 512}"#).unwrap();
        assert_eq!(config.state_budget_bytes, 512);
        assert_eq!(config.keyword_limit, DEFAULT_KEYWORD_LIMIT);

        let err = EngineConfig::from_json(r#"{"keyword_limit": "ten"}"#).unwrap_err();
        assert!(matches!(err, crate::Error::Json(_)));
        assert!(err.to_string().starts_with("JSON error:"));
    }

    #[test]
    fn test_roundtrip_timeout() {
        let config = EngineConfig::default()
            .with_state_budget_bytes(400)
            .with_stage_timeout(Duration::from_millis(250));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["stage_timeout_ms"], 250);

        let back: EngineConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
