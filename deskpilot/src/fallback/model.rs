//! Lazily loaded model handle and the OpenAI-compatible backend behind it.

use crate::error::ModelError;
use crate::llm_client::{create_client, describe_error};
use crate::settings::ModelSettings;
use anyhow::Context;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionTool, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use log::{debug, error, info};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};

/// One completion request: instruction, user text and the functions on offer
#[derive(Debug, Clone, Copy)]
pub struct Prompt<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub tools: &'a [Value],
    pub max_new_tokens: u32,
}

/// A loaded model that turns a prompt into generated text
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn complete(&self, prompt: &Prompt<'_>) -> Result<String, ModelError>;
}

/// Produces a backend on first use
#[async_trait]
pub trait ModelLoader: Send + Sync {
    fn model_id(&self) -> &str;
    async fn load(&self) -> anyhow::Result<Arc<dyn ModelBackend>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

/// Loads the model at most once per success. Concurrent first callers wait on the
/// same load; a failed load is retried by the next caller.
pub struct ModelHandle {
    loader: Arc<dyn ModelLoader>,
    state: Mutex<ModelState>,
    backend: tokio::sync::Mutex<Option<Arc<dyn ModelBackend>>>,
}

impl ModelHandle {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            state: Mutex::new(ModelState::Unloaded),
            backend: tokio::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> ModelState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: ModelState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn model_id(&self) -> &str {
        self.loader.model_id()
    }

    /// Return the loaded backend, loading it first if needed
    pub async fn ensure_loaded(&self) -> Result<Arc<dyn ModelBackend>, ModelError> {
        let mut slot = self.backend.lock().await;
        if let Some(backend) = slot.as_ref() {
            return Ok(backend.clone());
        }

        self.set_state(ModelState::Loading);
        info!("Loading model {}...", self.model_id());
        match self.loader.load().await {
            Ok(backend) => {
                *slot = Some(backend.clone());
                self.set_state(ModelState::Ready);
                info!("Model {} loaded", self.model_id());
                Ok(backend)
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                error!("Failed to load model {}: {}", self.model_id(), reason);
                self.set_state(ModelState::Failed(reason.clone()));
                Err(ModelError::Unavailable {
                    model: self.model_id().to_string(),
                    reason,
                })
            }
        }
    }
}

/// Connects to an OpenAI-compatible chat completions server
pub struct OpenAiLoader {
    settings: ModelSettings,
}

impl OpenAiLoader {
    pub fn new(settings: ModelSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ModelLoader for OpenAiLoader {
    fn model_id(&self) -> &str {
        &self.settings.model_id
    }

    async fn load(&self) -> anyhow::Result<Arc<dyn ModelBackend>> {
        let client = create_client(&self.settings)?;
        if self.settings.verify_on_load {
            let model = client
                .models()
                .retrieve(&self.settings.model_id)
                .await
                .map_err(|e| anyhow::anyhow!(describe_error(&e, &self.settings.model_id)))
                .with_context(|| format!("Model server at {}", self.settings.base_url))?;
            debug!("Model server reports {} (owned by {})", model.id, model.owned_by);
        }
        let backend: Arc<dyn ModelBackend> = Arc::new(OpenAiBackend {
            client,
            model_id: self.settings.model_id.clone(),
        });
        Ok(backend)
    }
}

pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model_id: String,
}

impl OpenAiBackend {
    fn build_request(
        &self,
        prompt: &Prompt<'_>,
    ) -> Result<async_openai::types::CreateChatCompletionRequest, ModelError> {
        let invalid = |e: &dyn std::fmt::Display| ModelError::Request(e.to_string());

        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt.system)
            .build()
            .map_err(|e| invalid(&e))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.user)
            .build()
            .map_err(|e| invalid(&e))?;
        let tools: Vec<ChatCompletionTool> =
            serde_json::from_value(Value::Array(prompt.tools.to_vec())).map_err(|e| invalid(&e))?;

        CreateChatCompletionRequestArgs::default()
            .model(&self.model_id)
            .messages(vec![
                ChatCompletionRequestMessage::System(system),
                ChatCompletionRequestMessage::User(user),
            ])
            .tools(tools)
            .max_completion_tokens(prompt.max_new_tokens)
            .build()
            .map_err(|e| invalid(&e))
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    async fn complete(&self, prompt: &Prompt<'_>) -> Result<String, ModelError> {
        let request = self.build_request(prompt)?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ModelError::Request(describe_error(&e, &self.model_id)))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| ModelError::Request("Response has no choices".to_string()))?;
        let message = serde_json::to_value(&choice.message)
            .map_err(|e| ModelError::Request(e.to_string()))?;
        Ok(completion_text(&message))
    }
}

/// Generated text of a response message. Structured tool calls are rendered back
/// into `call:name(args)` form so one parser handles both shapes.
pub fn completion_text(message: &Value) -> String {
    let mut text = message["content"].as_str().unwrap_or_default().to_string();
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let function = &call["function"];
            let Some(name) = function["name"].as_str() else {
                continue;
            };
            let arguments = function["arguments"].as_str().unwrap_or("{}");
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&format!("call:{}({})", name, arguments));
        }
    }
    text
}
