mod improver;
mod solver;

pub use improver::{IMPROVER_PROMPT, ImageImprover, extract_first_image};
pub use solver::{ProblemSolver, SOLVER_PROMPT};

use crate::codec::ImageReference;

/// Per-agent settings, fixed once the agent is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub model: String,
    pub image: Option<ImageReference>,
}

impl AgentConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImageReference) -> Self {
        self.image = Some(image);
        self
    }
}
