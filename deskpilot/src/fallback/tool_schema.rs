//! The functions offered to the model.
//!
//! Kept deliberately small: a few hundred million parameters cannot pick reliably
//! from a long list.

use once_cell::sync::Lazy;
use serde_json::{json, Value};

pub const SYSTEM_INSTRUCTION: &str =
    "You are a laptop assistant. Call the best function for the user's request.";

fn function(name: &str, description: &str, param: &str, kind: &str, about: &str) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": {
                "type": "object",
                "properties": {
                    param: { "type": kind, "description": about }
                },
                "required": [param]
            }
        }
    })
}

static TOOL_SCHEMA: Lazy<Vec<Value>> = Lazy::new(|| {
    vec![
        function(
            "open_settings",
            "Open a Windows settings page",
            "setting",
            "string",
            "Which setting to open: bluetooth, wifi, display, sound, network, power, battery, privacy, camera, microphone, apps, update",
        ),
        function(
            "open_app",
            "Open an application",
            "app_name",
            "string",
            "Application name like chrome, notepad, calculator, spotify, edge, explorer, terminal",
        ),
        function(
            "set_volume",
            "Set system volume to a level between 0 and 100",
            "level",
            "integer",
            "Volume level 0-100",
        ),
        function(
            "set_brightness",
            "Set screen brightness to a level between 0 and 100",
            "level",
            "integer",
            "Brightness level 0-100",
        ),
        function(
            "system_action",
            "Perform a system action",
            "action",
            "string",
            "Action: shutdown, restart, sleep, lock, screenshot, mute",
        ),
        function(
            "web_search",
            "Search the web",
            "query",
            "string",
            "Search query",
        ),
    ]
});

/// Tool declarations in OpenAI `tools` format
pub fn tool_schema() -> &'static [Value] {
    &TOOL_SCHEMA
}

pub fn tool_names() -> impl Iterator<Item = &'static str> {
    TOOL_SCHEMA
        .iter()
        .filter_map(|tool| tool["function"]["name"].as_str())
}
