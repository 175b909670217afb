//! Model fallback: ask a small function-calling model what to do when no keyword
//! rule matched, then dispatch its answer.

pub mod call_parser;
pub mod model;
pub mod tool_schema;

use crate::actions::{clamp_level, Action, Handlers, SystemAction, UNKNOWN_APP};
use crate::catalog::{find_known_app, find_settings_page, match_known_app, match_settings_page};
use crate::error::ModelError;
use crate::response_log::ResponseLog;
use call_parser::{parse_call, Arguments, ParsedCall};
use log::{debug, info, warn};
use model::{ModelHandle, ModelState, Prompt};
use serde_json::Value;
use std::sync::Arc;
use tool_schema::{tool_schema, SYSTEM_INSTRUCTION};

pub const COULD_NOT_UNDERSTAND: &str =
    "Sorry, I couldn't understand that. Try being more specific.";

const DEFAULT_LEVEL: i64 = 50;

/// A function call the model is allowed to make
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelCall {
    OpenSettings(String),
    OpenApp(String),
    SetVolume(i64),
    SetBrightness(i64),
    SystemAction(String),
    WebSearch(String),
}

fn string_arg(args: &Arguments, key: &str) -> String {
    match args.get(key) {
        Some(Value::String(value)) => value.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn level_arg(args: &Arguments, key: &str) -> i64 {
    match args.get(key) {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f.round() as i64))
            .unwrap_or(DEFAULT_LEVEL),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(DEFAULT_LEVEL),
        _ => DEFAULT_LEVEL,
    }
}

impl ModelCall {
    /// Map a parsed call onto a known function, filling in defaults.
    /// `None` if the function name is not one the model was offered.
    pub fn from_parsed(call: &ParsedCall) -> Option<Self> {
        let args = &call.args;
        let model_call = match call.name.as_str() {
            "open_settings" => ModelCall::OpenSettings(string_arg(args, "setting").to_lowercase()),
            "open_app" => ModelCall::OpenApp(string_arg(args, "app_name")),
            "set_volume" => ModelCall::SetVolume(level_arg(args, "level")),
            "set_brightness" => ModelCall::SetBrightness(level_arg(args, "level")),
            "system_action" => ModelCall::SystemAction(string_arg(args, "action").to_lowercase()),
            "web_search" => ModelCall::WebSearch(string_arg(args, "query")),
            _ => return None,
        };
        Some(model_call)
    }

    /// Resolve to a concrete action. Unknown symbolic values are reported to `log`.
    pub fn into_action(self, log: &mut ResponseLog) -> Option<Action> {
        match self {
            ModelCall::OpenSettings(key) => {
                match find_settings_page(&key).or_else(|| match_settings_page(&key)) {
                    Some(page) => Some(Action::OpenSettings(page)),
                    None => {
                        log.push(format!("Unknown setting: {}", key));
                        None
                    }
                }
            }
            ModelCall::OpenApp(name) => {
                if name.is_empty() {
                    log.push(UNKNOWN_APP);
                    return None;
                }
                let app = find_known_app(&name).or_else(|| match_known_app(&name.to_lowercase()));
                Some(match app {
                    Some(app) => Action::LaunchApp(app),
                    None => Action::LaunchUnknownApp(name),
                })
            }
            ModelCall::SetVolume(level) => Some(Action::SetVolume(clamp_level(level))),
            ModelCall::SetBrightness(level) => Some(Action::SetBrightness(clamp_level(level))),
            ModelCall::SystemAction(name) => {
                let action = match name.as_str() {
                    "shutdown" => Action::System(SystemAction::Shutdown),
                    "restart" => Action::System(SystemAction::Restart),
                    "sleep" => Action::System(SystemAction::Sleep),
                    "lock" => Action::System(SystemAction::Lock),
                    "screenshot" => Action::System(SystemAction::Screenshot),
                    "mute" => Action::ToggleMute,
                    _ => {
                        log.push(format!("Unknown action: {}", name));
                        return None;
                    }
                };
                Some(action)
            }
            ModelCall::WebSearch(query) => Some(Action::WebSearch(query)),
        }
    }
}

/// Second resolution stage, run only when the keyword router gives up
pub struct Fallback {
    model: Arc<ModelHandle>,
    handlers: Handlers,
    max_new_tokens: u32,
}

impl Fallback {
    pub fn new(model: Arc<ModelHandle>, handlers: Handlers, max_new_tokens: u32) -> Self {
        Self {
            model,
            handlers,
            max_new_tokens,
        }
    }

    pub fn model_state(&self) -> ModelState {
        self.model.state()
    }

    /// Load the model ahead of the first request
    pub async fn preload(&self) -> Result<(), ModelError> {
        self.model.ensure_loaded().await.map(|_| ())
    }

    /// Ask the model to handle `text`. Only a model that cannot be loaded is an
    /// error; everything else ends up in `log` and reports unhandled.
    pub async fn resolve(&self, text: &str, log: &mut ResponseLog) -> Result<bool, ModelError> {
        let backend = self.model.ensure_loaded().await?;
        debug!("Thinking about '{}'", text);

        let prompt = Prompt {
            system: SYSTEM_INSTRUCTION,
            user: text,
            tools: tool_schema(),
            max_new_tokens: self.max_new_tokens,
        };
        let completion = match backend.complete(&prompt).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Model request failed: {}", e);
                log.push(e.to_string());
                return Ok(false);
            }
        };
        debug!("Model completion: {:?}", completion);

        let Some(call) = parse_call(&completion) else {
            log.push(COULD_NOT_UNDERSTAND);
            return Ok(false);
        };
        info!(
            "Model chose: {}({})",
            call.name,
            Value::Object(call.args.clone())
        );

        let Some(model_call) = ModelCall::from_parsed(&call) else {
            log.push(format!("Unknown function: {}", call.name));
            return Ok(false);
        };
        let Some(action) = model_call.into_action(log) else {
            return Ok(false);
        };
        self.handlers.execute(&action, log).await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Invocation;
    use crate::test_support::{RecordingExecutor, ScriptedModel};
    use serde_json::json;

    fn fallback(
        model: &Arc<ScriptedModel>,
        executor: &Arc<RecordingExecutor>,
    ) -> Fallback {
        Fallback::new(
            Arc::new(ModelHandle::new(model.clone())),
            Handlers::new(executor.clone(), "https://www.google.com/search?q="),
            128,
        )
    }

    fn parsed(name: &str, args: Value) -> ParsedCall {
        ParsedCall {
            name: name.to_string(),
            args: args.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_defaults_for_missing_arguments() {
        assert_eq!(
            ModelCall::from_parsed(&parsed("set_volume", json!({}))),
            Some(ModelCall::SetVolume(50))
        );
        assert_eq!(
            ModelCall::from_parsed(&parsed("set_brightness", json!({"level": "70"}))),
            Some(ModelCall::SetBrightness(70))
        );
        assert_eq!(
            ModelCall::from_parsed(&parsed("web_search", json!({}))),
            Some(ModelCall::WebSearch(String::new()))
        );
        assert_eq!(ModelCall::from_parsed(&parsed("make_coffee", json!({}))), None);
    }

    #[test]
    fn test_levels_are_clamped() {
        let mut log = ResponseLog::new();
        assert_eq!(
            ModelCall::SetVolume(150).into_action(&mut log),
            Some(Action::SetVolume(100))
        );
        assert_eq!(
            ModelCall::SetBrightness(-20).into_action(&mut log),
            Some(Action::SetBrightness(0))
        );
        assert!(log.is_empty());
    }

    #[test]
    fn test_unknown_symbolic_values_are_logged() {
        let mut log = ResponseLog::new();
        assert_eq!(
            ModelCall::SystemAction("explode".to_string()).into_action(&mut log),
            None
        );
        assert_eq!(
            ModelCall::OpenSettings("warp drive".to_string()).into_action(&mut log),
            None
        );
        assert_eq!(
            log.lines(),
            ["Unknown action: explode", "Unknown setting: warp drive"]
        );
    }

    #[test]
    fn test_open_app_falls_back_to_unknown_launch() {
        let mut log = ResponseLog::new();
        match ModelCall::OpenApp("Chrome".to_string()).into_action(&mut log) {
            Some(Action::LaunchApp(app)) => assert_eq!(app.name, "chrome"),
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(
            ModelCall::OpenApp("obsidian".to_string()).into_action(&mut log),
            Some(Action::LaunchUnknownApp("obsidian".to_string()))
        );
    }

    #[tokio::test]
    async fn test_volume_call_dispatches_handler() {
        let model = Arc::new(ScriptedModel::replying(&[r#"call:set_volume({"level": 42})"#]));
        let executor = Arc::new(RecordingExecutor::succeeding());
        let mut log = ResponseLog::new();

        let handled = fallback(&model, &executor)
            .resolve("make it a bit louder please", &mut log)
            .await
            .unwrap();

        assert!(handled);
        assert_eq!(log.lines(), ["Volume set to ~42%"]);
        assert!(matches!(executor.calls()[0], Invocation::PowerShell(_)));
        assert_eq!(model.prompts(), ["make it a bit louder please"]);
    }

    #[tokio::test]
    async fn test_reply_without_call_is_not_understood() {
        let model = Arc::new(ScriptedModel::replying(&["I am not sure what you mean."]));
        let executor = Arc::new(RecordingExecutor::succeeding());
        let mut log = ResponseLog::new();

        let handled = fallback(&model, &executor)
            .resolve("xyzzy plugh", &mut log)
            .await
            .unwrap();

        assert!(!handled);
        assert_eq!(log.lines(), [COULD_NOT_UNDERSTAND]);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_function_is_logged() {
        let model = Arc::new(ScriptedModel::replying(&["call:order_pizza{size:<escape>large<escape>}"]));
        let executor = Arc::new(RecordingExecutor::succeeding());
        let mut log = ResponseLog::new();

        let handled = fallback(&model, &executor)
            .resolve("get me a pizza", &mut log)
            .await
            .unwrap();

        assert!(!handled);
        assert_eq!(log.lines(), ["Unknown function: order_pizza"]);
    }

    #[tokio::test]
    async fn test_request_failure_is_logged_not_raised() {
        let model = Arc::new(ScriptedModel::failing_requests("Request timed out"));
        let executor = Arc::new(RecordingExecutor::succeeding());
        let mut log = ResponseLog::new();

        let handled = fallback(&model, &executor)
            .resolve("anything", &mut log)
            .await
            .unwrap();

        assert!(!handled);
        assert_eq!(
            log.lines(),
            ["completion request failed: Request timed out"]
        );
    }

    #[tokio::test]
    async fn test_load_failure_propagates() {
        let model = Arc::new(ScriptedModel::failing_loads(1, "no server"));
        let executor = Arc::new(RecordingExecutor::succeeding());
        let fallback = fallback(&model, &executor);
        let mut log = ResponseLog::new();

        let err = fallback.resolve("anything", &mut log).await.unwrap_err();
        assert!(matches!(err, ModelError::Unavailable { .. }));
        assert!(log.is_empty());
        assert_eq!(
            fallback.model_state(),
            ModelState::Failed("no server".to_string())
        );
    }
}
