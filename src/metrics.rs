//! Metrics collected over one run.

use serde::{Deserialize, Serialize};

/// Aggregated metrics for a single run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Number of stages that completed successfully.
    pub stages_completed: usize,
    /// Sum of the durations reported by completed stages.
    pub total_duration_ms: u64,
    /// Sum of the costs reported by completed stages.
    pub total_cost_units: u64,
    /// Failure messages, at most one per run since runs stop at the first.
    pub failures: Vec<String>,
}

impl RunMetrics {
    /// Record a completed stage.
    pub fn record_stage(&mut self, duration_ms: u64, cost_units: Option<u64>) {
        self.stages_completed += 1;
        self.total_duration_ms = self.total_duration_ms.saturating_add(duration_ms);
        if let Some(cost) = cost_units {
            self.total_cost_units = self.total_cost_units.saturating_add(cost);
        }
    }

    /// Record a failure message.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.failures.push(error.into());
    }

    /// Check if there were any failures.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates() {
        let mut m = RunMetrics::default();
        m.record_stage(10, Some(3));
        m.record_stage(5, None);
        assert_eq!(m.stages_completed, 2);
        assert_eq!(m.total_duration_ms, 15);
        assert_eq!(m.total_cost_units, 3);
        assert!(!m.has_failures());

        m.record_failure("boom");
        assert!(m.has_failures());
    }
}
