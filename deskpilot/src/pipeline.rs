//! Two-stage resolution: keyword router first, model fallback second.

use crate::actions::Handlers;
use crate::error::ModelError;
use crate::executor::{Executor, SystemExecutor};
use crate::fallback::model::{ModelHandle, ModelLoader, ModelState, OpenAiLoader};
use crate::fallback::Fallback;
use crate::response_log::ResponseLog;
use crate::router;
use crate::settings::AppSettings;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

pub struct Pipeline {
    handlers: Handlers,
    fallback: Fallback,
}

impl Pipeline {
    pub fn new(
        settings: &AppSettings,
        executor: Arc<dyn Executor>,
        loader: Arc<dyn ModelLoader>,
    ) -> Self {
        let handlers = Handlers::new(executor, settings.search_url.clone());
        let model = Arc::new(ModelHandle::new(loader));
        let fallback = Fallback::new(model, handlers.clone(), settings.model.max_new_tokens);
        Self { handlers, fallback }
    }

    /// Pipeline against the real host and the configured model server
    pub fn from_settings(settings: &AppSettings) -> Self {
        let executor = Arc::new(SystemExecutor::new(Duration::from_secs(
            settings.command_timeout_secs,
        )));
        let loader = Arc::new(OpenAiLoader::new(settings.model.clone()));
        Self::new(settings, executor, loader)
    }

    pub fn model_state(&self) -> ModelState {
        self.fallback.model_state()
    }

    pub async fn preload_model(&self) -> Result<(), ModelError> {
        self.fallback.preload().await
    }

    /// Handle one request and return every status line it produced
    pub async fn process(&self, text: &str) -> Result<Vec<String>, ModelError> {
        let mut log = ResponseLog::new();
        match router::route(text) {
            Some(action) => self.handlers.execute(&action, &mut log).await,
            None => {
                debug!("No keyword rule matched, asking the model");
                self.fallback.resolve(text, &mut log).await?;
            }
        }
        Ok(log.into_lines())
    }
}
