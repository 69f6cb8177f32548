use std::fmt;

use crate::{
    capabilities::AgentConfig,
    codec::ImageReference,
    errors::{AgentError, Result},
    providers::{GenerationRequest, GenerativeClient, Prompt},
};
use tracing::{debug, info};

pub const CLASSIFIER_PROMPT: &str = "Given the following image, determine that the image contains problem or drawing. If it contains a problem then return true otherwise return false.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Problem,
    Drawing,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Problem => "problem",
            Verdict::Drawing => "drawing",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maps a classifier reply to a verdict.
///
/// Case-insensitive substring match: `true` means problem, `false` means
/// drawing. Neither or both is an error, never a guess.
pub fn parse_verdict(reply: &str) -> Result<Verdict> {
    let normalized = reply.to_lowercase();

    match (normalized.contains("true"), normalized.contains("false")) {
        (true, false) => Ok(Verdict::Problem),
        (false, true) => Ok(Verdict::Drawing),
        _ => Err(AgentError::AmbiguousClassification {
            reply: reply.to_string(),
        }),
    }
}

pub struct ImageClassifier<'a, C> {
    client: &'a C,
    config: AgentConfig,
}

impl<'a, C: GenerativeClient> ImageClassifier<'a, C> {
    pub fn new(client: &'a C, config: AgentConfig) -> Self {
        Self { client, config }
    }

    pub async fn classify(&self, image: &ImageReference) -> Result<Verdict> {
        let prompt = Prompt::new()
            .text(CLASSIFIER_PROMPT)
            .media(image.clone(), image.mime_type());

        let reply = self
            .client
            .generate(GenerationRequest::new(&self.config.model, prompt))
            .await?;

        let text = reply.as_text().unwrap_or_default();
        debug!(target: "image_classifier", reply = %text, "收到分类结果");

        let verdict = parse_verdict(&text)?;
        info!(target: "image_classifier", %verdict, "图片分类完成");

        Ok(verdict)
    }
}
