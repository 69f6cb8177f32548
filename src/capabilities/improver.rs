use crate::{
    capabilities::AgentConfig,
    codec::{ImageReference, PNG},
    errors::{AgentError, Result},
    providers::{GenerationReply, GenerationRequest, GenerativeClient, Modality, Prompt, ReplyPart},
};
use tracing::{debug, info, warn};

pub const IMPROVER_PROMPT: &str =
    "Improve the following image while keeping the original structure same.";

/// Turns a free-form drawing into an enhanced image.
///
/// The source image is part of the agent config. Without one, `improve`
/// fails before anything is sent upstream.
pub struct ImageImprover<'a, C> {
    client: &'a C,
    config: AgentConfig,
}

impl<'a, C: GenerativeClient> ImageImprover<'a, C> {
    pub fn new(client: &'a C, config: AgentConfig) -> Self {
        Self { client, config }
    }

    pub async fn improve(&self) -> Result<ImageReference> {
        let source = self
            .config
            .image
            .as_ref()
            .filter(|image| !image.is_empty())
            .ok_or(AgentError::MissingInput)?;

        let prompt = Prompt::new()
            .text(IMPROVER_PROMPT)
            .media(source.clone(), PNG);
        let request = GenerationRequest::new(&self.config.model, prompt)
            .with_modalities(&[Modality::Text, Modality::Image]);

        let reply = self.client.generate(request).await?;

        match extract_first_image(&reply) {
            Some(image) => {
                info!(target: "image_improver", mime_type = image.mime_type(), "已生成优化后的图片");
                Ok(image)
            }
            None => {
                warn!(target: "image_improver", "模型响应中没有图片片段");
                debug!(target: "image_improver", reply = ?reply.as_text(), "模型返回的文本内容");
                Err(AgentError::NoImageInResponse)
            }
        }
    }
}

/// First image part of the first entry that has any parts at all.
///
/// Leading text parts are skipped. Later entries are not consulted once a
/// populated entry is found, and flat-text replies never yield an image.
pub fn extract_first_image(reply: &GenerationReply) -> Option<ImageReference> {
    let entry = reply
        .as_parts()?
        .iter()
        .find(|entry| !entry.parts.is_empty())?;

    entry.parts.iter().find_map(|part| match part {
        ReplyPart::InlineData { mime_type, data }
            if mime_type.starts_with("image/") && !data.is_empty() =>
        {
            Some(ImageReference::Embedded {
                mime_type: mime_type.clone(),
                data: data.clone(),
            })
        }
        _ => None,
    })
}
