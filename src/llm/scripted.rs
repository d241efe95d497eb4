//! Deterministic completion service for unit tests.
//!
//! Replays a fixed list of answers in order and records every prompt it
//! receives.

use crate::llm::TextCompletionService;
use crate::types::{PipelineError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One recorded `complete` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
}

pub struct ScriptedCompletion {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl ScriptedCompletion {
    pub fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Answers given as plain strings, all successful.
    pub fn answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(answers.into_iter().map(|a| Ok(a.into())).collect())
    }

    /// Sleep before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

#[async_trait]
impl TextCompletionService for ScriptedCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                system: system.to_string(),
                user: user.to_string(),
            });
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .responses
            .lock()
            .map_err(|_| PipelineError::generation("scripted responses poisoned"))?
            .pop_front();

        next.unwrap_or_else(|| Err(PipelineError::generation("no scripted response left")))
    }

    fn provider(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_errors() {
        let service = ScriptedCompletion::answers(["first", "second"]);
        assert_eq!(service.complete("s", "u1").await.unwrap(), "first");
        assert_eq!(service.complete("s", "u2").await.unwrap(), "second");
        assert!(service.complete("s", "u3").await.is_err());

        let calls = service.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].user, "u2");
    }
}
