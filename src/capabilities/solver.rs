use crate::{
    capabilities::AgentConfig,
    codec::ImageReference,
    errors::{AgentError, Result},
    providers::{GenerationRequest, GenerativeClient, Prompt},
};
use tracing::info;

pub const SOLVER_PROMPT: &str =
    "Given the following image of question, your job is to provide answer to that problem.";

pub struct ProblemSolver<'a, C> {
    client: &'a C,
    config: AgentConfig,
}

impl<'a, C: GenerativeClient> ProblemSolver<'a, C> {
    pub fn new(client: &'a C, config: AgentConfig) -> Self {
        Self { client, config }
    }

    pub async fn solve(&self, image: &ImageReference) -> Result<String> {
        let prompt = Prompt::new()
            .text(SOLVER_PROMPT)
            .media(image.clone(), image.mime_type());

        let reply = self
            .client
            .generate(GenerationRequest::new(&self.config.model, prompt))
            .await?;

        let answer = reply
            .as_text()
            .filter(|text| !text.trim().is_empty())
            .ok_or(AgentError::EmptyAnswer)?;

        info!(target: "problem_solver", chars = answer.chars().count(), "已生成答案");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        PromptPart,
        testing::{ScriptedClient, image_part, structured},
    };

    fn image() -> ImageReference {
        ImageReference::embedded("image/png", "AAAA")
    }

    #[tokio::test]
    async fn returns_reply_text_verbatim() {
        let client = ScriptedClient::new().text("42");
        let solver = ProblemSolver::new(&client, AgentConfig::new("gemini-2.0-flash"));

        assert_eq!(solver.solve(&image()).await.unwrap(), "42");

        let requests = client.requests();
        assert_eq!(
            requests[0].prompt.parts()[0],
            PromptPart::Text(SOLVER_PROMPT.to_string())
        );
    }

    #[tokio::test]
    async fn empty_or_blank_reply_is_an_error() {
        for client in [
            ScriptedClient::new().text(""),
            ScriptedClient::new().text("  \n"),
            ScriptedClient::new().reply(structured(vec![])),
            ScriptedClient::new().reply(structured(vec![vec![image_part("image/png", "AAAA")]])),
        ] {
            let solver = ProblemSolver::new(&client, AgentConfig::new("m"));
            assert!(matches!(
                solver.solve(&image()).await,
                Err(AgentError::EmptyAnswer)
            ));
        }
    }
}
