pub mod gemini;

#[cfg(test)]
pub(crate) mod testing;

use std::{future::Future, sync::Arc};

use crate::{codec::ImageReference, errors::ServiceError};

/// Adapter over a remote multimodal generation service.
///
/// One call is one outbound request. Implementations must not retry.
pub trait GenerativeClient: Send + Sync {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> impl Future<Output = Result<GenerationReply, ServiceError>> + Send;
}

impl<C: GenerativeClient> GenerativeClient for Arc<C> {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> impl Future<Output = Result<GenerationReply, ServiceError>> + Send {
        (**self).generate(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    Media {
        image: ImageReference,
        content_type: String,
    },
}

/// Ordered prompt parts. Instruction text goes before the media it describes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    parts: Vec<PromptPart>,
}

impl Prompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(PromptPart::Text(text.into()));
        self
    }

    pub fn media(mut self, image: ImageReference, content_type: impl Into<String>) -> Self {
        self.parts.push(PromptPart::Media {
            image,
            content_type: content_type.into(),
        });
        self
    }

    pub fn parts(&self) -> &[PromptPart] {
        &self.parts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "TEXT",
            Modality::Image => "IMAGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: Prompt,
    pub modalities: Vec<Modality>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: Prompt) -> Self {
        Self {
            model: model.into(),
            prompt,
            modalities: vec![Modality::Text],
        }
    }

    pub fn with_modalities(mut self, modalities: &[Modality]) -> Self {
        self.modalities = modalities.to_vec();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPart {
    Text(String),
    InlineData { mime_type: String, data: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyEntry {
    pub parts: Vec<ReplyPart>,
    pub finish_reason: Option<String>,
}

impl ReplyEntry {
    pub fn new(parts: Vec<ReplyPart>) -> Self {
        Self {
            parts,
            finish_reason: None,
        }
    }
}

/// Reply exactly as the service shaped it: flat text or structured entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationReply {
    Text(String),
    Structured(Vec<ReplyEntry>),
}

impl GenerationReply {
    /// Flat text, or the text parts of the first populated entry joined together.
    pub fn as_text(&self) -> Option<String> {
        match self {
            GenerationReply::Text(text) => Some(text.clone()),
            GenerationReply::Structured(entries) => {
                let entry = entries.iter().find(|entry| !entry.parts.is_empty())?;
                let texts: Vec<&str> = entry
                    .parts
                    .iter()
                    .filter_map(|part| match part {
                        ReplyPart::Text(text) => Some(text.as_str()),
                        ReplyPart::InlineData { .. } => None,
                    })
                    .collect();

                if texts.is_empty() {
                    None
                } else {
                    Some(texts.concat())
                }
            }
        }
    }

    pub fn as_parts(&self) -> Option<&[ReplyEntry]> {
        match self {
            GenerationReply::Text(_) => None,
            GenerationReply::Structured(entries) => Some(entries),
        }
    }
}
