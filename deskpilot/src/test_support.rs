//! Doubles for the executor and the model, shared by the unit tests.

use crate::error::ModelError;
use crate::executor::{Executor, Invocation, Outcome};
use crate::fallback::model::{ModelBackend, ModelLoader, Prompt};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Records every invocation and answers each with the same outcome
pub struct RecordingExecutor {
    outcome: Outcome,
    calls: Mutex<Vec<Invocation>>,
}

impl RecordingExecutor {
    pub fn succeeding() -> Self {
        Self::with_outcome(Outcome::Completed {
            success: true,
            output: String::new(),
        })
    }

    pub fn with_outcome(outcome: Outcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn run(&self, invocation: &Invocation) -> Outcome {
        self.calls.lock().unwrap().push(invocation.clone());
        self.outcome.clone()
    }
}

/// Model that fails a set number of loads, then answers from a queue of replies
pub struct ScriptedModel {
    load_failures: Mutex<usize>,
    failure_reason: String,
    loads: AtomicUsize,
    backend: Arc<ScriptedBackend>,
}

pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(replies: &[&str]) -> Self {
        Self::scripted(
            0,
            "",
            replies.iter().map(|reply| Ok(reply.to_string())).collect(),
        )
    }

    pub fn failing_loads(count: usize, reason: &str) -> Self {
        Self::scripted(count, reason, VecDeque::new())
    }

    pub fn failing_requests(message: &str) -> Self {
        Self::scripted(
            0,
            "",
            VecDeque::from([Err(ModelError::Request(message.to_string()))]),
        )
    }

    fn scripted(
        load_failures: usize,
        reason: &str,
        replies: VecDeque<Result<String, ModelError>>,
    ) -> Self {
        Self {
            load_failures: Mutex::new(load_failures),
            failure_reason: reason.to_string(),
            loads: AtomicUsize::new(0),
            backend: Arc::new(ScriptedBackend {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// User texts the model was asked about, in order
    pub fn prompts(&self) -> Vec<String> {
        self.backend.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelLoader for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn load(&self) -> anyhow::Result<Arc<dyn ModelBackend>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to pile up behind the load.
        tokio::task::yield_now().await;
        let mut failures = self.load_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            anyhow::bail!("{}", self.failure_reason);
        }
        let backend: Arc<dyn ModelBackend> = self.backend.clone();
        Ok(backend)
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn complete(&self, prompt: &Prompt<'_>) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.user.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
