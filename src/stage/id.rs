//! Stage identifiers and per-stage status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// One processing stage ("agent") of the content pipeline.
///
/// The set is fixed at build time. Variants serialize and display in
/// snake_case, e.g. `trend_keyword`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Trend and keyword discovery.
    TrendKeyword,
    /// Content planning.
    ContentPlanning,
    /// Search engine optimization.
    SeoOptimization,
    /// Copywriting.
    Copywriting,
    /// Long-form blog writing.
    BlogWriting,
    /// Visual design briefs.
    VisualDesign,
    /// Local search optimization.
    LocalSeo,
    /// Answer engine (FAQ) optimization.
    AeoOptimization,
    /// Marketing funnel design.
    FunnelDesign,
    /// Brand and quality supervision.
    BrandSupervisor,
    /// Multi-platform deployment.
    MultiPlatformDeploy,
}

impl StageId {
    /// Every stage, in content pipeline order.
    pub const ALL: [StageId; 11] = [
        StageId::TrendKeyword,
        StageId::ContentPlanning,
        StageId::SeoOptimization,
        StageId::Copywriting,
        StageId::BlogWriting,
        StageId::VisualDesign,
        StageId::LocalSeo,
        StageId::AeoOptimization,
        StageId::FunnelDesign,
        StageId::BrandSupervisor,
        StageId::MultiPlatformDeploy,
    ];

    /// The snake_case wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::TrendKeyword => "trend_keyword",
            StageId::ContentPlanning => "content_planning",
            StageId::SeoOptimization => "seo_optimization",
            StageId::Copywriting => "copywriting",
            StageId::BlogWriting => "blog_writing",
            StageId::VisualDesign => "visual_design",
            StageId::LocalSeo => "local_seo",
            StageId::AeoOptimization => "aeo_optimization",
            StageId::FunnelDesign => "funnel_design",
            StageId::BrandSupervisor => "brand_supervisor",
            StageId::MultiPlatformDeploy => "multi_platform_deploy",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::UnknownStage(s.to_string()))
    }
}

/// Lifecycle of a stage within one run.
///
/// `Idle -> Processing -> {Completed | Error}`; nothing leaves a terminal
/// state until the next run resets the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Not started.
    #[default]
    Idle,
    /// Currently executing.
    Processing,
    /// Finished successfully.
    Completed,
    /// Failed, panicked, timed out or was cancelled mid-flight.
    Error,
}

impl StageStatus {
    /// Returns true for `Completed` and `Error`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}
