//! Cross-stage shared state.
//!
//! [`SharedState`] is the small context bag every stage can read. The engine
//! owns it for the duration of a run, updates it through the projection rule
//! after each successful stage, and keeps its serialized form under a byte
//! budget by dropping keywords.
//!
//! The budget is a best-effort cap: only `keywords` is ever truncated, so a
//! state whose string fields alone exceed the budget stays oversized.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Context shared by every stage of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SharedState {
    /// Keywords discovered early in the pipeline, most relevant first.
    pub keywords: Vec<String>,
    /// Who the content is written for.
    pub target_audience: String,
    /// What the content should achieve.
    pub content_goal: String,
    /// Voice to write in.
    pub brand_tone: String,
    /// Primary publishing platform.
    pub platform: String,
}

impl SharedState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the keyword list.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set the target audience.
    #[must_use]
    pub fn with_target_audience(mut self, audience: impl Into<String>) -> Self {
        self.target_audience = audience.into();
        self
    }

    /// Set the content goal.
    #[must_use]
    pub fn with_content_goal(mut self, goal: impl Into<String>) -> Self {
        self.content_goal = goal.into();
        self
    }

    /// Set the brand tone.
    #[must_use]
    pub fn with_brand_tone(mut self, tone: impl Into<String>) -> Self {
        self.brand_tone = tone.into();
        self
    }

    /// Set the platform.
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Byte length of the compact JSON serialization.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        // Plain strings and a string list cannot fail to serialize.
        serde_json::to_vec(self).map_or(0, |bytes| bytes.len())
    }

    /// Drop keywords from the end until the state fits in `max_bytes`.
    ///
    /// Returns the number of keywords dropped.
    pub fn enforce_budget(&mut self, max_bytes: usize) -> usize {
        let before = self.keywords.len();
        let mut size = self.serialized_size();
        while size > max_bytes && !self.keywords.is_empty() {
            self.keywords.pop();
            size = self.serialized_size();
        }

        let dropped = before - self.keywords.len();
        if dropped > 0 {
            warn!(
                dropped,
                kept = self.keywords.len(),
                size,
                max_bytes,
                "shared state over budget, truncated keywords"
            );
        }
        if size > max_bytes {
            warn!(size, max_bytes, "shared state still over budget without keywords");
        }
        dropped
    }
}
