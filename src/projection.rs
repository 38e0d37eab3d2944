//! Projection of stage outputs onto [`SharedState`].
//!
//! Each stage may have one projection function that copies a small part of
//! its output into shared state. Most stages have none, which keeps the
//! shared payload small.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{SharedState, StageId};

/// Limits handed to every projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionLimits {
    /// Maximum number of keywords a projection should keep.
    pub keyword_limit: usize,
}

/// A function that merges a stage's output into the shared state.
pub type Projection = Arc<dyn Fn(&Value, &mut SharedState, &ProjectionLimits) + Send + Sync>;

/// Projection functions keyed by stage.
#[derive(Clone, Default)]
pub struct ProjectionTable {
    projections: HashMap<StageId, Projection>,
}

impl ProjectionTable {
    /// A table with no projections.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The projections of the content pipeline: keywords from trend discovery,
    /// audience and goal from content planning.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table.insert(StageId::TrendKeyword, project_keywords);
        table.insert(StageId::ContentPlanning, project_plan);
        table
    }

    /// Add or replace the projection for `stage`.
    pub fn insert<F>(&mut self, stage: StageId, f: F)
    where
        F: Fn(&Value, &mut SharedState, &ProjectionLimits) + Send + Sync + 'static,
    {
        self.projections.insert(stage, Arc::new(f));
    }

    /// Remove the projection for `stage`, if any.
    pub fn remove(&mut self, stage: StageId) -> Option<Projection> {
        self.projections.remove(&stage)
    }

    /// Whether `stage` has a projection.
    #[must_use]
    pub fn contains(&self, stage: StageId) -> bool {
        self.projections.contains_key(&stage)
    }

    /// Apply the projection for `stage`. Returns `false` if it has none.
    pub fn apply(
        &self,
        stage: StageId,
        output: &Value,
        state: &mut SharedState,
        limits: &ProjectionLimits,
    ) -> bool {
        match self.projections.get(&stage) {
            Some(projection) => {
                projection(output, state, limits);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ProjectionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stages: Vec<_> = self.projections.keys().collect();
        stages.sort();
        f.debug_struct("ProjectionTable")
            .field("stages", &stages)
            .finish()
    }
}

/// Keywords may be plain strings or objects with a `keyword` field.
fn project_keywords(output: &Value, state: &mut SharedState, limits: &ProjectionLimits) {
    let Some(items) = output.get("keywords").and_then(Value::as_array) else {
        return;
    };

    state.keywords = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("keyword").and_then(Value::as_str),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .take(limits.keyword_limit)
        .map(str::to_string)
        .collect();
}

fn project_plan(output: &Value, state: &mut SharedState, _limits: &ProjectionLimits) {
    if let Some(audience) = non_empty_str(output, &["targetAudience", "target_audience"]) {
        state.target_audience = audience.to_string();
    }
    if let Some(goal) = non_empty_str(output, &["contentGoal", "content_goal"]) {
        state.content_goal = goal.to_string();
    }
}

fn non_empty_str<'a>(output: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| output.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LIMITS: ProjectionLimits = ProjectionLimits { keyword_limit: 3 };

    #[test]
    fn test_keywords_bounded_to_limit() {
        let table = ProjectionTable::builtin();
        let mut state = SharedState::new();
        let output = json!({"keywords": ["a", {"keyword": "b", "volume": 10}, "", 7, "c", "d"]});

        assert!(table.apply(StageId::TrendKeyword, &output, &mut state, &LIMITS));
        assert_eq!(state.keywords, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_keywords_untouched_without_array() {
        let table = ProjectionTable::builtin();
        let mut state = SharedState::new().with_keywords(["keep"]);
        table.apply(StageId::TrendKeyword, &json!({"keywords": "nope"}), &mut state, &LIMITS);
        assert_eq!(state.keywords, vec!["keep"]);
    }

    #[test]
    fn test_plan_overwrites_audience_and_goal() {
        let table = ProjectionTable::builtin();
        let mut state = SharedState::new()
            .with_target_audience("old")
            .with_content_goal("old goal");

        table.apply(
            StageId::ContentPlanning,
            &json!({"target_audience": "founders", "contentGoal": ""}),
            &mut state,
            &LIMITS,
        );
        assert_eq!(state.target_audience, "founders");
        assert_eq!(state.content_goal, "old goal");
    }

    #[test]
    fn test_other_stages_contribute_nothing() {
        let table = ProjectionTable::builtin();
        let mut state = SharedState::new();
        let output = json!({"keywords": ["x"], "targetAudience": "y"});
        assert!(!table.apply(StageId::Copywriting, &output, &mut state, &LIMITS));
        assert_eq!(state, SharedState::new());
    }

    #[test]
    fn test_custom_projection_replaces_builtin() {
        let mut table = ProjectionTable::builtin();
        table.insert(StageId::TrendKeyword, |_: &Value, state: &mut SharedState, _: &ProjectionLimits| {
            state.platform = "custom".to_string();
        });
        let mut state = SharedState::new();
        table.apply(StageId::TrendKeyword, &json!({"keywords": ["a"]}), &mut state, &LIMITS);
        assert_eq!(state.platform, "custom");
        assert!(state.keywords.is_empty());

        assert!(table.remove(StageId::TrendKeyword).is_some());
        assert!(!table.contains(StageId::TrendKeyword));
    }
}
