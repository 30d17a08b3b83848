//! Deterministic provider for tests

use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, Result, StopReason,
    TokenUsage,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Provider that replays queued replies in order and records every request
///
/// Once the queue is empty the fallback reply (if any) is returned, otherwise
/// the call fails with `RequestFailed`.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    /// Create a provider with the given replies
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply used after the queue runs dry
    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of completions served
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| LLMError::RequestFailed("script exhausted".to_string()))?;

        Ok(CompletionResponse {
            message: Message::assistant(next),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
