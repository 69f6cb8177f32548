use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    codec::ImageReference,
    config::GeminiConfig,
    errors::{ImageError, ServiceError},
    providers::{
        GenerationReply, GenerationRequest, GenerativeClient, PromptPart, ReplyEntry, ReplyPart,
    },
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Gemini `generateContent` over plain REST.
///
/// The credential is captured once at construction. `file://` attachments are
/// read and inlined before the request leaves the process.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl GeminiClient {
    pub fn from_config(config: &GeminiConfig) -> Result<Self, ServiceError> {
        let http_client = HttpClient::builder()
            .user_agent("SketchAgent/0.1")
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_url, model)
    }
}

impl GenerativeClient for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationReply, ServiceError> {
        let payload = GeminiRequest::build(&request).await?;

        debug!(
            target: "gemini",
            model = %request.model,
            parts = request.prompt.parts().len(),
            "发送 generateContent 请求"
        );

        let response = self
            .http_client
            .post(self.endpoint(&request.model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message: upstream_error_message(&body),
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| ServiceError::malformed(format!("解析 Gemini 响应失败: {e}")))?;

        Ok(parsed.into_reply())
    }
}

fn upstream_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY_CHARS).collect())
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

impl GeminiRequest {
    async fn build(request: &GenerationRequest) -> Result<Self, ServiceError> {
        let mut parts = Vec::with_capacity(request.prompt.parts().len());

        for part in request.prompt.parts() {
            match part {
                PromptPart::Text(text) => parts.push(GeminiRequestPart::Text { text: text.clone() }),
                PromptPart::Media {
                    image,
                    content_type,
                } => {
                    let data = match image.resolve().await? {
                        ImageReference::Embedded { data, .. } => data,
                        ImageReference::Local { path, .. } => {
                            return Err(ImageError::UnsupportedUri(path.display().to_string()).into());
                        }
                    };
                    parts.push(GeminiRequestPart::InlineData {
                        inline_data: GeminiInlineData {
                            mime_type: content_type.clone(),
                            data,
                        },
                    });
                }
            }
        }

        Ok(Self {
            contents: vec![GeminiContent { role: "user", parts }],
            generation_config: GeminiGenerationConfig {
                response_modalities: request.modalities.iter().map(|m| m.as_str()).collect(),
            },
        })
    }
}

#[derive(Serialize, Debug)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiRequestPart>,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    #[serde(default)]
    data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

impl GeminiResponse {
    fn into_reply(self) -> GenerationReply {
        if self.candidates.is_empty() {
            if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
                warn!(target: "gemini", %reason, "请求被 Gemini 拦截, 没有返回候选结果");
            }
        }

        let entries = self
            .candidates
            .into_iter()
            .map(|candidate| ReplyEntry {
                parts: candidate
                    .content
                    .map(|content| {
                        content
                            .parts
                            .into_iter()
                            .filter_map(GeminiReplyPart::into_part)
                            .collect()
                    })
                    .unwrap_or_default(),
                finish_reason: candidate.finish_reason,
            })
            .collect::<Vec<_>>();

        debug!(
            target: "gemini",
            candidates = entries.len(),
            finish_reasons = ?entries.iter().map(|e| e.finish_reason.as_deref()).collect::<Vec<_>>(),
            "收到 Gemini 响应"
        );

        GenerationReply::Structured(entries)
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiReplyContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

// Variant order matters for untagged decoding.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum GeminiReplyPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: GeminiInlineData,
    },
    Other(Value),
}

impl GeminiReplyPart {
    fn into_part(self) -> Option<ReplyPart> {
        match self {
            GeminiReplyPart::Text { text } => Some(ReplyPart::Text(text)),
            GeminiReplyPart::InlineData { inline_data } => Some(ReplyPart::InlineData {
                mime_type: inline_data.mime_type,
                data: inline_data.data,
            }),
            GeminiReplyPart::Other(value) => {
                debug!(target: "gemini", part = %value, "跳过未知类型的响应片段");
                None
            }
        }
    }
}
