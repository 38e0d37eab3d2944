//! Pipeline definitions.
//!
//! A [`PipelineDefinition`] is the ordered list of stages a run walks, each
//! with the stages it depends on. The engine uses
//! [`PipelineDefinition::content_pipeline`] unless told otherwise.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, StageId};

/// One entry of a pipeline: a stage and the stages it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTemplate {
    /// The stage to run.
    pub id: StageId,
    /// Stages that must be completed before this one starts.
    #[serde(default)]
    pub dependencies: Vec<StageId>,
}

impl StageTemplate {
    /// A template with no dependencies.
    #[must_use]
    pub fn new(id: StageId) -> Self {
        Self {
            id,
            dependencies: Vec::new(),
        }
    }

    /// Declare the stages this one depends on.
    #[must_use]
    pub fn depends_on(mut self, dependencies: impl IntoIterator<Item = StageId>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }
}

/// An ordered list of stage templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDefinition {
    stages: Vec<StageTemplate>,
}

impl PipelineDefinition {
    /// Build a validated definition.
    ///
    /// The list must be non-empty, name each stage at most once, and list
    /// every dependency before the stage that depends on it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use content_workflow::{PipelineDefinition, StageTemplate, StageId};
    ///
    /// let ok = PipelineDefinition::new(vec![
    ///     StageTemplate::new(StageId::TrendKeyword),
    ///     StageTemplate::new(StageId::Copywriting).depends_on([StageId::TrendKeyword]),
    /// ]);
    /// assert!(ok.is_ok());
    ///
    /// let backwards = PipelineDefinition::new(vec![
    ///     StageTemplate::new(StageId::Copywriting).depends_on([StageId::TrendKeyword]),
    ///     StageTemplate::new(StageId::TrendKeyword),
    /// ]);
    /// assert!(backwards.is_err());
    /// ```
    pub fn new(stages: Vec<StageTemplate>) -> Result<Self> {
        if stages.is_empty() {
            return Err(Error::InvalidPipeline("pipeline has no stages".to_string()));
        }

        let mut seen: HashSet<StageId> = HashSet::with_capacity(stages.len());
        for template in &stages {
            for dep in &template.dependencies {
                if *dep == template.id {
                    return Err(Error::InvalidPipeline(format!(
                        "stage '{}' depends on itself",
                        template.id
                    )));
                }
                if !seen.contains(dep) {
                    return Err(Error::InvalidPipeline(format!(
                        "stage '{}' depends on '{dep}', which is not declared before it",
                        template.id
                    )));
                }
            }
            if !seen.insert(template.id) {
                return Err(Error::InvalidPipeline(format!(
                    "stage '{}' appears more than once",
                    template.id
                )));
            }
        }

        Ok(Self { stages })
    }

    /// Build a definition without validating it.
    ///
    /// Out-of-order dependencies are then caught at run time as
    /// [`Error::DependencyNotMet`].
    #[must_use]
    pub fn from_templates_unchecked(stages: Vec<StageTemplate>) -> Self {
        Self { stages }
    }

    /// The eleven-stage content pipeline.
    #[must_use]
    pub fn content_pipeline() -> Self {
        use StageId::*;

        Self {
            stages: vec![
                StageTemplate::new(TrendKeyword),
                StageTemplate::new(ContentPlanning).depends_on([TrendKeyword]),
                StageTemplate::new(SeoOptimization).depends_on([ContentPlanning]),
                StageTemplate::new(Copywriting).depends_on([SeoOptimization]),
                StageTemplate::new(BlogWriting).depends_on([Copywriting]),
                StageTemplate::new(VisualDesign).depends_on([Copywriting]),
                StageTemplate::new(LocalSeo).depends_on([SeoOptimization]),
                StageTemplate::new(AeoOptimization).depends_on([BlogWriting]),
                StageTemplate::new(FunnelDesign).depends_on([Copywriting]),
                StageTemplate::new(BrandSupervisor).depends_on([BlogWriting, VisualDesign]),
                StageTemplate::new(MultiPlatformDeploy).depends_on([BrandSupervisor]),
            ],
        }
    }

    /// The templates in run order.
    #[must_use]
    pub fn stages(&self) -> &[StageTemplate] {
        &self.stages
    }

    /// Stage identifiers in run order.
    pub fn ids(&self) -> impl Iterator<Item = StageId> + '_ {
        self.stages.iter().map(|t| t.id)
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the definition has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for PipelineDefinition {
    fn default() -> Self {
        Self::content_pipeline()
    }
}
