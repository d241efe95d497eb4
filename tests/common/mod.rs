//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use percolate_sql::llm::TextCompletionService;
use percolate_sql::{PipelineError, Result};
use rusqlite::Connection;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

/// One prompt pair received by [`ScriptedModel`].
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Completion service that replays fixed answers in order.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<Prompt>>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(answers.into_iter().map(|a| Ok(a.into())).collect())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextCompletionService for ScriptedModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(Prompt {
            system: system.to_string(),
            user: user.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PipelineError::generation("no scripted answer left")))
    }
}

/// Service records database with 25 defects.
pub fn service_records() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample_service_records.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE defects (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL,
             failure_count INTEGER NOT NULL,
             last_seen TEXT
         );",
    )
    .unwrap();
    for i in 0..25 {
        conn.execute(
            "INSERT INTO defects (name, failure_count, last_seen) VALUES (?1, ?2, ?3)",
            rusqlite::params![format!("Defect {:02}", i), (i * 7) % 31, "2024-05-01"],
        )
        .unwrap();
    }
    (dir, path)
}
