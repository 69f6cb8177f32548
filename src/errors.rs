use thiserror::Error;

use crate::orchestrator::PipelineStage;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("不支持的图片地址: {0} (仅支持 data: 与 file:// 地址)")]
    UnsupportedUri(String),

    #[error("data URI 格式错误: {0}")]
    MalformedDataUri(String),

    #[error("无法确定图片类型: {0}")]
    UnknownMimeType(String),

    #[error("图片 Base64 解码失败: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("读取图片失败: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the remote generation call itself. Never retried.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("网络请求失败: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("生成服务返回状态码 {status}: {message}")]
    Status { status: u16, message: String },

    #[error("生成服务响应格式错误: {0}")]
    MalformedEnvelope(String),

    #[error("无法准备图片附件: {0}")]
    Attachment(#[from] ImageError),
}

impl ServiceError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEnvelope(msg.into())
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("生成服务调用失败: {0}")]
    Service(#[from] ServiceError),

    #[error("分类结果不明确, 期望 true 或 false, 实际返回: {reply:?}")]
    AmbiguousClassification { reply: String },

    #[error("模型没有返回任何答案")]
    EmptyAnswer,

    #[error("缺少需要优化的源图片")]
    MissingInput,

    #[error("模型响应中没有图片")]
    NoImageInResponse,

    #[error("图片处理失败: {0}")]
    Image(#[from] ImageError),
}

impl AgentError {
    /// Stable identifier used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Service(_) => "service_error",
            AgentError::AmbiguousClassification { .. } => "ambiguous_classification",
            AgentError::EmptyAnswer => "empty_answer",
            AgentError::MissingInput => "missing_input",
            AgentError::NoImageInResponse => "no_image_in_response",
            AgentError::Image(_) => "invalid_image",
        }
    }
}

/// The only error surfaced by the router, whichever stage failed.
#[derive(Debug, Error)]
#[error("AI 处理图片失败 ({stage} 阶段), 请稍后重试")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: AgentError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: AgentError) -> Self {
        Self { stage, source }
    }

    pub fn cause(&self) -> &AgentError {
        &self.source
    }
}
