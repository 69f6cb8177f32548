use std::{collections::VecDeque, sync::Mutex};

use crate::{
    errors::ServiceError,
    providers::{GenerationReply, GenerationRequest, GenerativeClient, ReplyEntry, ReplyPart},
};

/// Test double that replays scripted replies in order and records every request.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Result<GenerationReply, ServiceError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, reply: GenerationReply) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply));
        self
    }

    pub(crate) fn text(self, text: &str) -> Self {
        self.reply(GenerationReply::Text(text.to_string()))
    }

    pub(crate) fn fail(self, err: ServiceError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl GenerativeClient for ScriptedClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationReply, ServiceError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::malformed("no scripted reply left")))
    }
}

pub(crate) fn text_part(text: &str) -> ReplyPart {
    ReplyPart::Text(text.to_string())
}

pub(crate) fn image_part(mime_type: &str, data: &str) -> ReplyPart {
    ReplyPart::InlineData {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    }
}

pub(crate) fn structured(entries: Vec<Vec<ReplyPart>>) -> GenerationReply {
    GenerationReply::Structured(entries.into_iter().map(ReplyEntry::new).collect())
}
