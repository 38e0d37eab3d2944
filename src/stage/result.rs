//! Stage results and the helpers stages use to build them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// The outcome of one stage invocation.
///
/// A business failure is reported with `success == false` and a readable
/// `error`, not by returning `Err` from [`Stage::execute`](crate::Stage::execute).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    /// Whether the stage succeeded.
    pub success: bool,
    /// Output handed to the next stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Human-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Time spent, as measured by the stage.
    #[serde(default)]
    pub duration_ms: u64,
    /// Provider cost of the invocation, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_units: Option<u64>,
}

impl StageResult {
    /// A successful result carrying `data`.
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// A failed result carrying `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Set the measured duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Set the provider cost.
    #[must_use]
    pub fn with_cost_units(mut self, cost_units: u64) -> Self {
        self.cost_units = Some(cost_units);
        self
    }

    /// Convert into a plain `Result` over the output data.
    ///
    /// A successful result without data yields `Value::Null`.
    pub fn into_result(self) -> Result<Value> {
        if self.success {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(Error::Message(
                self.error.unwrap_or_else(|| "stage reported failure".to_string()),
            ))
        }
    }
}

/// Rough token count for a prompt or completion: one token per four chars.
#[must_use]
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builders() {
        let r = StageResult::ok(json!({"k": 1}))
            .with_duration_ms(12)
            .with_cost_units(3);
        assert!(r.success);
        assert_eq!(r.data, Some(json!({"k": 1})));
        assert_eq!(r.duration_ms, 12);
        assert_eq!(r.cost_units, Some(3));

        let r = StageResult::failure("boom");
        assert!(!r.success);
        assert_eq!(r.error.as_deref(), Some("boom"));
        assert!(r.data.is_none());
    }

    #[test]
    fn test_into_result() {
        assert_eq!(StageResult::ok("x").into_result().unwrap(), json!("x"));
        let err = StageResult::failure("bad").into_result().unwrap_err();
        assert_eq!(err.to_string(), "bad");
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(StageResult::ok(1).with_duration_ms(5)).unwrap();
        assert_eq!(json, json!({"success": true, "data": 1, "durationMs": 5}));
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
