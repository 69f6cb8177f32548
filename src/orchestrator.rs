use std::fmt;

use crate::{
    capabilities::{AgentConfig, ImageImprover, ProblemSolver},
    codec::ImageReference,
    config::GeminiConfig,
    errors::{AgentError, PipelineError},
    intent::{ImageClassifier, Verdict},
    providers::GenerativeClient,
};
use serde::Serialize;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Classifying,
    Solving,
    Improving,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Classifying => "classifying",
            PipelineStage::Solving => "solving",
            PipelineStage::Improving => "improving",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteOutcome {
    Answer { text: String },
    ImprovedImage { image: ImageReference },
}

impl RouteOutcome {
    pub fn event_name(&self) -> &'static str {
        match self {
            RouteOutcome::Answer { .. } => "agent.answer",
            RouteOutcome::ImprovedImage { .. } => "agent.improved_image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineModels {
    pub classifier: String,
    pub solver: String,
    pub image: String,
}

impl From<&GeminiConfig> for PipelineModels {
    fn from(config: &GeminiConfig) -> Self {
        Self {
            classifier: config.classifier_model.clone(),
            solver: config.solver_model.clone(),
            image: config.image_model.clone(),
        }
    }
}

/// Classify, then either solve or improve.
///
/// Holds only the client and model names. Agents are built per submission,
/// so concurrent `route` calls share nothing mutable.
pub struct PipelineRouter<C> {
    client: C,
    models: PipelineModels,
}

impl<C: GenerativeClient> PipelineRouter<C> {
    pub fn new(client: C, models: PipelineModels) -> Self {
        Self { client, models }
    }

    pub async fn route(&self, image: &ImageReference) -> Result<RouteOutcome, PipelineError> {
        let span = info_span!("submission", id = %Uuid::new_v4());
        self.run(image).instrument(span).await
    }

    async fn run(&self, image: &ImageReference) -> Result<RouteOutcome, PipelineError> {
        let mut stage = PipelineStage::Idle;

        advance(&mut stage, PipelineStage::Classifying);
        let verdict = ImageClassifier::new(&self.client, AgentConfig::new(&self.models.classifier))
            .classify(image)
            .await
            .map_err(|err| fail(stage, err))?;

        let outcome = match verdict {
            Verdict::Problem => {
                advance(&mut stage, PipelineStage::Solving);
                let text = ProblemSolver::new(&self.client, AgentConfig::new(&self.models.solver))
                    .solve(image)
                    .await
                    .map_err(|err| fail(stage, err))?;
                RouteOutcome::Answer { text }
            }
            Verdict::Drawing => {
                advance(&mut stage, PipelineStage::Improving);
                let config = AgentConfig::new(&self.models.image).with_image(image.clone());
                let image = ImageImprover::new(&self.client, config)
                    .improve()
                    .await
                    .map_err(|err| fail(stage, err))?;
                RouteOutcome::ImprovedImage { image }
            }
        };

        advance(&mut stage, PipelineStage::Done);
        Ok(outcome)
    }
}

/// Inbound entry point for the UI: one submission, one result or one error.
pub async fn process_image<C: GenerativeClient>(
    router: &PipelineRouter<C>,
    image: &ImageReference,
) -> Result<RouteOutcome, PipelineError> {
    router.route(image).await
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    info!(target: "pipeline_router", from = %stage, to = %next, "阶段切换");
    *stage = next;
}

fn fail(stage: PipelineStage, err: AgentError) -> PipelineError {
    error!(
        target: "pipeline_router",
        %stage,
        to = %PipelineStage::Failed,
        error = %err,
        "AI 处理流程失败"
    );
    PipelineError::new(stage, err)
}
