//! Known applications database for launching apps by spoken name.
//!
//! Contains a curated list of common Windows applications with the recipe used to
//! start each one. Several names may share a recipe (synonyms).

use super::longest_match;
use crate::executor::Invocation;

/// How an application gets started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// Executable started directly
    Program(&'static str),
    /// Target resolved by the shell's `start` builtin (App Paths, PATH)
    Start(&'static str),
    /// Protocol URI handled by a registered app
    Uri(&'static str),
}

impl Launch {
    pub fn invocation(&self) -> Invocation {
        match self {
            Launch::Program(program) => Invocation::Spawn {
                program: program.to_string(),
                args: Vec::new(),
            },
            Launch::Start(target) => Invocation::Shell(format!("start \"\" {}", target)),
            Launch::Uri(uri) => Invocation::OpenUri(uri.to_string()),
        }
    }
}

/// A known application and its launch recipe
#[derive(Debug, PartialEq, Eq)]
pub struct KnownApp {
    pub name: &'static str,
    pub launch: Launch,
}

const fn app(name: &'static str, launch: Launch) -> KnownApp {
    KnownApp { name, launch }
}

static KNOWN_APPS: &[KnownApp] = &[
    // === Built-in tools ===
    app("notepad", Launch::Program("notepad.exe")),
    app("calculator", Launch::Program("calc.exe")),
    app("calc", Launch::Program("calc.exe")),
    app("paint", Launch::Program("mspaint.exe")),
    app("file explorer", Launch::Program("explorer.exe")),
    app("explorer", Launch::Program("explorer.exe")),
    app("files", Launch::Program("explorer.exe")),
    app("task manager", Launch::Program("taskmgr.exe")),
    app("control panel", Launch::Program("control")),
    app("snipping tool", Launch::Program("snippingtool.exe")),
    // === Terminals ===
    app("command prompt", Launch::Start("cmd")),
    app("cmd", Launch::Start("cmd")),
    app("terminal", Launch::Start("wt")),
    app("powershell", Launch::Start("powershell")),
    // === Browsers ===
    app("chrome", Launch::Start("chrome")),
    app("google chrome", Launch::Start("chrome")),
    app("edge", Launch::Start("msedge")),
    app("firefox", Launch::Start("firefox")),
    app("browser", Launch::Start("msedge")),
    // === Office ===
    app("word", Launch::Start("winword")),
    app("excel", Launch::Start("excel")),
    app("powerpoint", Launch::Start("powerpnt")),
    app("outlook", Launch::Start("outlook")),
    // === Development ===
    app("vscode", Launch::Start("code")),
    app("vs code", Launch::Start("code")),
    app("code", Launch::Start("code")),
    // === Chat/Messaging ===
    app("teams", Launch::Uri("msteams:")),
    app("discord", Launch::Uri("discord:")),
    app("whatsapp", Launch::Uri("whatsapp:")),
    app("telegram", Launch::Uri("tg:")),
    app("slack", Launch::Uri("slack:")),
    app("zoom", Launch::Uri("zoommtg:")),
    // === Media & Store apps ===
    app("spotify", Launch::Uri("spotify:")),
    app("photos", Launch::Uri("ms-photos:")),
    app("maps", Launch::Uri("bingmaps:")),
    app("weather", Launch::Uri("bingweather:")),
    app("clock", Launch::Uri("ms-clock:")),
    app("calendar", Launch::Uri("outlookcal:")),
    app("settings", Launch::Uri("ms-settings:")),
    app("store", Launch::Uri("ms-windows-store:")),
    app("xbox", Launch::Uri("xbox:")),
    app("movies", Launch::Uri("mswindowsvideo:")),
    app("music", Launch::Uri("mswindowsmusic:")),
];

/// Get the list of known applications
pub fn known_applications() -> &'static [KnownApp] {
    KNOWN_APPS
}

/// Look up a known app by its exact name
pub fn find_known_app(name: &str) -> Option<&'static KnownApp> {
    let name = name.trim().to_lowercase();
    KNOWN_APPS.iter().find(|app| app.name == name)
}

/// Longest known app name mentioned anywhere in `text`
pub fn match_known_app(text: &str) -> Option<&'static KnownApp> {
    longest_match(text, KNOWN_APPS, |app| app.name)
}
