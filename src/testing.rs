//! In-process gateway doubles for exercising pipelines and routes without a network.

use crate::llm::{ChatGateway, ChatRequest, ReplyEnvelope, UpstreamError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays a fixed sequence of replies and records every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<ReplyEnvelope, UpstreamError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Result<ReplyEnvelope, UpstreamError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Script built from raw `message` objects.
    pub fn with_messages(messages: Vec<Value>) -> Self {
        Self::new(
            messages
                .iter()
                .map(|m| Ok(ReplyEnvelope::from_message(m)))
                .collect(),
        )
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatGateway for ScriptedGateway {
    async fn complete(&self, request: &ChatRequest) -> Result<ReplyEnvelope, UpstreamError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| Err(UpstreamError::new(None, "no scripted reply left")))
    }
}
