//! Deterministic keyword router.
//!
//! [`route`] scans lowercased text against fixed phrase groups in a fixed order and
//! returns the first [`Action`] that matches. It never runs anything itself.

use crate::actions::{
    clamp_level, clamp_timeout, Action, Folder, Maintenance, MediaKey, NetworkCommand,
    Productivity, SystemAction, WindowCommand,
};
use crate::catalog::{
    contains_any, contains_phrase, find_known_app, match_feature, match_known_app,
    match_settings_page, Feature,
};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

const ON_CUES: &[&str] = &["turn on", "enable", "activate", "switch on", "start "];
const OFF_CUES: &[&str] = &["turn off", "disable", "deactivate", "switch off", "stop "];
const SEARCH_CUES: &[&str] = &["search", "google", "look up", "find"];

static VOLUME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:set\s+)?volume\s+(?:to\s+)?(-?\d+)").unwrap());
static BRIGHTNESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:set\s+)?brightness\s+(?:to\s+)?(-?\d+)").unwrap());
static SCREEN_TIMEOUT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:screen|display|monitor)\s+timeout\s+(?:to\s+)?(\d+)").unwrap()
});
static SLEEP_TIMEOUT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bsleep\s+(?:timeout|after)\s+(?:to\s+)?(\d+)").unwrap());
static RESOLUTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bresolution\s+(?:to\s+)?(\d{3,5})\s*(?:x|by|\*)\s*(\d{3,5})").unwrap()
});
static PLAY_QUERY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bplay\s+(.+?)(?:\s+on\s+spotify)?\s*$").unwrap());
static KILL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:kill|end task|terminate|force close|close)\s+(?:the\s+)?(.+)").unwrap()
});
static PING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bping\s+([\w.\-]+)").unwrap());
static SEARCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:please\s+)?(?:search|google|look up|find)\s+(?:for\s+)?(.+)").unwrap()
});
static OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:open|go to|visit|browse|launch|show)\s+(?:the\s+|my\s+)?(.+)").unwrap()
});
static LEADING_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:please\s+)?(?:open|launch|start)\b").unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?[\w.-]+\.\w{2,}(?:/\S*)?$").unwrap()
});

/// Parse a captured integer, saturating instead of failing on overflow
fn parse_number(digits: &str) -> i64 {
    digits.parse().unwrap_or(if digits.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn capture_number(re: &Regex, text: &str) -> Option<i64> {
    re.captures(text).map(|caps| parse_number(&caps[1]))
}

/// Resolve free text to an action, or `None` if no keyword rule applies
pub fn route(text: &str) -> Option<Action> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    let action = toggle(&text)
        .or_else(|| numeric(&text))
        .or_else(|| adjustment(&text))
        .or_else(|| fixed_phrase(&text))
        .or_else(|| open_or_search(&text));

    match &action {
        Some(action) => debug!("Router matched '{}' -> {:?}", text, action),
        None => debug!("Router found no rule for '{}'", text),
    }
    action
}

fn toggle(text: &str) -> Option<Action> {
    let on = contains_any(text, ON_CUES);
    let off = contains_any(text, OFF_CUES);
    if !on && !off {
        return None;
    }
    let (phrase, feature) = match_feature(text)?;
    debug!("Toggle phrase '{}' -> {:?}", phrase, feature);
    Some(Action::Toggle { feature, on })
}

fn numeric(text: &str) -> Option<Action> {
    if let Some(level) = capture_number(&VOLUME_RE, text) {
        return Some(Action::SetVolume(clamp_level(level)));
    }
    if let Some(level) = capture_number(&BRIGHTNESS_RE, text) {
        return Some(Action::SetBrightness(clamp_level(level)));
    }
    if let Some(minutes) = capture_number(&SCREEN_TIMEOUT_RE, text) {
        return Some(Action::ScreenTimeout(clamp_timeout(minutes)));
    }
    if let Some(minutes) = capture_number(&SLEEP_TIMEOUT_RE, text) {
        return Some(Action::SleepTimeout(clamp_timeout(minutes)));
    }
    RESOLUTION_RE.captures(text).map(|caps| Action::Resolution {
        width: parse_number(&caps[1]).clamp(0, u32::MAX as i64) as u32,
        height: parse_number(&caps[2]).clamp(0, u32::MAX as i64) as u32,
    })
}

fn adjustment(text: &str) -> Option<Action> {
    let volume = if contains_any(text, &["max volume", "full volume"]) {
        Some(100)
    } else if contains_any(text, &["volume up", "increase volume", "louder"]) {
        Some(80)
    } else if contains_any(
        text,
        &["volume down", "decrease volume", "lower volume", "quieter"],
    ) {
        Some(30)
    } else {
        None
    };
    if let Some(level) = volume {
        return Some(Action::SetVolume(level));
    }

    let brightness = if contains_any(text, &["max brightness", "full brightness"]) {
        Some(100)
    } else if contains_any(text, &["brighter", "increase brightness", "brightness up"]) {
        Some(80)
    } else if contains_any(
        text,
        &["dimmer", "dim", "decrease brightness", "brightness down"],
    ) {
        Some(30)
    } else {
        None
    };
    brightness.map(Action::SetBrightness)
}

fn fixed_phrase(text: &str) -> Option<Action> {
    media(text)
        .or_else(|| window(text))
        .or_else(|| process(text))
        .or_else(|| system_power(text))
        .or_else(|| maintenance(text))
        .or_else(|| accessibility(text))
        .or_else(|| productivity(text))
        .or_else(|| network(text))
        .or_else(|| folder(text))
}

fn media(text: &str) -> Option<Action> {
    if contains_any(text, &["mute", "unmute", "silence"]) {
        return Some(Action::ToggleMute);
    }
    if contains_any(text, &["next track", "next song", "skip song", "skip track"]) {
        return Some(Action::Media(MediaKey::Next));
    }
    if contains_any(
        text,
        &["previous track", "previous song", "last track", "last song"],
    ) {
        return Some(Action::Media(MediaKey::Previous));
    }
    if contains_any(text, &["stop music", "stop the music", "stop playback"]) {
        return Some(Action::Media(MediaKey::Stop));
    }

    const BARE: &[&str] = &["play", "pause", "resume", "play pause", "play/pause"];
    const TARGETS: &[&str] = &["music", "media", "the music", "the media"];
    let transport = BARE.iter().any(|verb| {
        text == *verb
            || TARGETS
                .iter()
                .any(|target| text == format!("{} {}", verb, target))
    });
    if transport || contains_any(text, &["pause music", "pause the music"]) {
        return Some(Action::Media(MediaKey::PlayPause));
    }

    // "open play store" names an app, not something to play.
    if LEADING_OPEN_RE.is_match(text) {
        return None;
    }
    let caps = PLAY_QUERY_RE.captures(text)?;
    let query = caps[1].trim().to_string();
    if query.is_empty() {
        return None;
    }
    Some(Action::PlayQuery {
        on_spotify: contains_phrase(text, "spotify"),
        query,
    })
}

fn window(text: &str) -> Option<Action> {
    const RULES: &[(&[&str], WindowCommand)] = &[
        (&["new virtual desktop", "new desktop"], WindowCommand::NewDesktop),
        (
            &["close virtual desktop", "close desktop"],
            WindowCommand::CloseDesktop,
        ),
        (&["show desktop", "minimize all"], WindowCommand::ShowDesktop),
        (&["maximize", "maximise"], WindowCommand::Maximize),
        (&["minimize", "minimise"], WindowCommand::Minimize),
        (&["snap left"], WindowCommand::SnapLeft),
        (&["snap right"], WindowCommand::SnapRight),
        (&["switch window", "switch windows", "alt tab"], WindowCommand::SwitchWindow),
        (&["task view"], WindowCommand::TaskView),
        (
            &["close window", "close this window", "close the window"],
            WindowCommand::CloseWindow,
        ),
    ];
    RULES
        .iter()
        .find(|(phrases, _)| contains_any(text, phrases))
        .map(|(_, command)| Action::Window(*command))
}

fn process(text: &str) -> Option<Action> {
    if contains_any(text, &["window", "desktop", "virtual"]) {
        return None;
    }
    let caps = KILL_RE.captures(text)?;
    let name = caps[1].trim();
    if name.is_empty() {
        return None;
    }
    Some(Action::KillProcess(name.to_string()))
}

fn system_power(text: &str) -> Option<Action> {
    // Asking for a settings page must never power anything down.
    if contains_phrase(text, "settings") {
        return None;
    }
    let action = if contains_any(text, &["screenshot", "screen shot", "snip"]) {
        SystemAction::Screenshot
    } else if contains_phrase(text, "lock")
        && contains_any(text, &["screen", "computer", "pc", "laptop", "my"])
    {
        SystemAction::Lock
    } else if contains_any(text, &["cancel shutdown", "abort shutdown", "cancel shut down"]) {
        SystemAction::CancelShutdown
    } else if contains_any(text, &["shut down", "shutdown"]) {
        SystemAction::Shutdown
    } else if contains_any(text, &["restart", "reboot"]) {
        SystemAction::Restart
    } else if contains_phrase(text, "hibernate") {
        SystemAction::Hibernate
    } else if contains_phrase(text, "sleep") {
        SystemAction::Sleep
    } else if contains_any(text, &["log off", "logoff", "sign out"]) {
        SystemAction::LogOff
    } else {
        return None;
    };
    Some(Action::System(action))
}

fn maintenance(text: &str) -> Option<Action> {
    let task = if contains_any(text, &["virus scan", "quick scan", "scan for viruses"]) {
        Maintenance::VirusScan
    } else if contains_any(text, &["disk cleanup", "clean up disk", "clean disk"]) {
        Maintenance::DiskCleanup
    } else if contains_any(text, &["empty recycle bin", "empty the recycle bin", "empty trash"]) {
        Maintenance::EmptyRecycleBin
    } else if contains_any(text, &["check for updates", "check updates"]) {
        Maintenance::CheckUpdates
    } else {
        return None;
    };
    Some(Action::Maintenance(task))
}

fn accessibility(text: &str) -> Option<Action> {
    if contains_phrase(text, "zoom in") {
        return Some(Action::Zoom { zoom_in: true });
    }
    if contains_phrase(text, "zoom out") {
        return Some(Action::Zoom { zoom_in: false });
    }
    // Off requests were already handled by the toggle rules.
    let feature = match match_feature(text)? {
        (_, feature @ (Feature::Magnifier | Feature::Narrator | Feature::OnScreenKeyboard)) => {
            feature
        }
        _ => return None,
    };
    Some(Action::Toggle { feature, on: true })
}

fn productivity(text: &str) -> Option<Action> {
    let tool = if contains_phrase(text, "emoji") {
        Productivity::EmojiPanel
    } else if contains_phrase(text, "clipboard history") {
        Productivity::ClipboardHistory
    } else if contains_any(
        text,
        &["new note", "sticky note", "sticky notes", "take a note"],
    ) {
        Productivity::StickyNotes
    } else if contains_any(text, &["timer", "alarm"]) {
        Productivity::Timer
    } else if contains_phrase(text, "calendar") {
        return find_known_app("calendar").map(Action::LaunchApp);
    } else {
        return None;
    };
    Some(Action::Productivity(tool))
}

fn network(text: &str) -> Option<Action> {
    if let Some(caps) = PING_RE.captures(text) {
        return Some(Action::Network(NetworkCommand::Ping(caps[1].to_string())));
    }
    let command = if contains_any(text, &["my ip", "ip address"]) {
        NetworkCommand::IpAddress
    } else if contains_any(text, &["flush dns", "clear dns"]) {
        NetworkCommand::FlushDns
    } else if contains_any(
        text,
        &["wifi networks", "wi-fi networks", "wireless networks", "available networks"],
    ) {
        NetworkCommand::WifiNetworks
    } else {
        return None;
    };
    Some(Action::Network(command))
}

fn folder(text: &str) -> Option<Action> {
    if contains_any(text, SEARCH_CUES) {
        return None;
    }
    const RULES: &[(&[&str], Folder)] = &[
        (&["recycle bin", "trash"], Folder::RecycleBin),
        (&["downloads", "download folder"], Folder::Downloads),
        (&["documents", "documents folder"], Folder::Documents),
        (&["desktop folder"], Folder::Desktop),
        (&["pictures", "pictures folder"], Folder::Pictures),
        (&["music folder"], Folder::Music),
        (&["videos", "videos folder"], Folder::Videos),
        (&["home folder", "user folder"], Folder::Home),
    ];
    RULES
        .iter()
        .find(|(phrases, _)| contains_any(text, phrases))
        .map(|(_, folder)| Action::OpenFolder(*folder))
}

fn open_or_search(text: &str) -> Option<Action> {
    if let Some(caps) = SEARCH_RE.captures(text) {
        let query = caps[1].trim();
        if !query.is_empty() {
            return Some(Action::WebSearch(query.to_string()));
        }
    }

    if let Some(caps) = OPEN_RE.captures(text) {
        let object = caps[1].trim();
        if !object.is_empty() {
            return Some(open_object(object));
        }
    }

    if contains_phrase(text, "settings") {
        if let Some(page) = match_settings_page(text) {
            return Some(Action::OpenSettings(page));
        }
    }
    match_known_app(text).map(Action::LaunchApp)
}

/// Resolve the object of an open/visit verb
fn open_object(object: &str) -> Action {
    if URL_RE.is_match(object) {
        return Action::OpenWebsite(object.to_string());
    }
    if let Some(page) = match_settings_page(object) {
        return Action::OpenSettings(page);
    }
    if let Some(app) = match_known_app(object) {
        return Action::LaunchApp(app);
    }
    Action::WebSearch(object.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_routes() {
        assert_eq!(
            route("Turn on Bluetooth"),
            Some(Action::Toggle {
                feature: Feature::Bluetooth,
                on: true
            })
        );
        assert_eq!(
            route("please disable wi-fi"),
            Some(Action::Toggle {
                feature: Feature::Wifi,
                on: false
            })
        );
    }

    #[test]
    fn test_longest_toggle_phrase_wins() {
        assert_eq!(
            route("turn off mobile hotspot"),
            Some(Action::Toggle {
                feature: Feature::Hotspot,
                on: false
            })
        );
        assert_eq!(
            route("enable airplane mode"),
            Some(Action::Toggle {
                feature: Feature::AirplaneMode,
                on: true
            })
        );
    }

    #[test]
    fn test_on_cue_wins_over_off_cue() {
        assert_eq!(
            route("stop the timer and turn on night light"),
            Some(Action::Toggle {
                feature: Feature::NightLight,
                on: true
            })
        );
    }

    #[test]
    fn test_cue_without_feature_falls_through() {
        assert_eq!(route("turn on the coffee maker"), None);
        assert_eq!(route("enable volume 40"), Some(Action::SetVolume(40)));
    }

    #[test]
    fn test_numeric_levels_are_clamped() {
        assert_eq!(route("set volume to 150"), Some(Action::SetVolume(100)));
        assert_eq!(route("volume -20"), Some(Action::SetVolume(0)));
        assert_eq!(route("brightness to 70"), Some(Action::SetBrightness(70)));
        assert_eq!(
            route("volume 99999999999999999999999"),
            Some(Action::SetVolume(100))
        );
    }

    #[test]
    fn test_timeouts_and_resolution() {
        assert_eq!(route("screen timeout to 10"), Some(Action::ScreenTimeout(10)));
        assert_eq!(route("sleep after 900"), Some(Action::SleepTimeout(300)));
        assert_eq!(
            route("change resolution to 1920 x 1080"),
            Some(Action::Resolution {
                width: 1920,
                height: 1080
            })
        );
    }

    #[test]
    fn test_adjustment_presets() {
        assert_eq!(route("louder"), Some(Action::SetVolume(80)));
        assert_eq!(route("max volume"), Some(Action::SetVolume(100)));
        assert_eq!(route("make it quieter"), Some(Action::SetVolume(30)));
        assert_eq!(route("dim the screen"), Some(Action::SetBrightness(30)));
        assert_eq!(route("full brightness"), Some(Action::SetBrightness(100)));
    }

    #[test]
    fn test_media_routes() {
        assert_eq!(route("mute"), Some(Action::ToggleMute));
        assert_eq!(route("pause"), Some(Action::Media(MediaKey::PlayPause)));
        assert_eq!(route("resume music"), Some(Action::Media(MediaKey::PlayPause)));
        assert_eq!(route("next song"), Some(Action::Media(MediaKey::Next)));
        assert_eq!(
            route("play lofi beats on spotify"),
            Some(Action::PlayQuery {
                query: "lofi beats".to_string(),
                on_spotify: true
            })
        );
        assert_eq!(
            route("play bohemian rhapsody"),
            Some(Action::PlayQuery {
                query: "bohemian rhapsody".to_string(),
                on_spotify: false
            })
        );
    }

    #[test]
    fn test_window_routes_before_process_kill() {
        assert_eq!(
            route("close window"),
            Some(Action::Window(WindowCommand::CloseWindow))
        );
        assert_eq!(
            route("close virtual desktop"),
            Some(Action::Window(WindowCommand::CloseDesktop))
        );
        assert_eq!(
            route("show desktop"),
            Some(Action::Window(WindowCommand::ShowDesktop))
        );
    }

    #[test]
    fn test_process_kill() {
        assert_eq!(
            route("kill chrome"),
            Some(Action::KillProcess("chrome".to_string()))
        );
        assert_eq!(
            route("force close the discord"),
            Some(Action::KillProcess("discord".to_string()))
        );
    }

    #[test]
    fn test_system_power() {
        assert_eq!(
            route("take a screenshot"),
            Some(Action::System(SystemAction::Screenshot))
        );
        assert_eq!(
            route("lock my computer"),
            Some(Action::System(SystemAction::Lock))
        );
        assert_eq!(
            route("cancel shutdown"),
            Some(Action::System(SystemAction::CancelShutdown))
        );
        assert_eq!(
            route("shut down"),
            Some(Action::System(SystemAction::Shutdown))
        );
        assert_eq!(route("sign out"), Some(Action::System(SystemAction::LogOff)));
    }

    #[test]
    fn test_settings_requests_never_power_down() {
        let action = route("open lock screen settings").unwrap();
        match action {
            Action::OpenSettings(page) => assert_eq!(page.key, "lock screen"),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_misc_categories() {
        assert_eq!(
            route("run a quick scan"),
            Some(Action::Maintenance(Maintenance::VirusScan))
        );
        assert_eq!(route("zoom in"), Some(Action::Zoom { zoom_in: true }));
        assert_eq!(
            route("open magnifier"),
            Some(Action::Toggle {
                feature: Feature::Magnifier,
                on: true
            })
        );
        assert_eq!(
            route("show emoji panel"),
            Some(Action::Productivity(Productivity::EmojiPanel))
        );
        assert_eq!(
            route("ping google.com"),
            Some(Action::Network(NetworkCommand::Ping("google.com".to_string())))
        );
        assert_eq!(
            route("what is my ip"),
            Some(Action::Network(NetworkCommand::IpAddress))
        );
        assert_eq!(route("open downloads"), Some(Action::OpenFolder(Folder::Downloads)));
    }

    #[test]
    fn test_open_object_resolution_order() {
        assert_eq!(
            route("go to github.com"),
            Some(Action::OpenWebsite("github.com".to_string()))
        );
        match route("open bluetooth settings") {
            Some(Action::OpenSettings(page)) => assert_eq!(page.key, "bluetooth"),
            other => panic!("unexpected action {:?}", other),
        }
        match route("launch google chrome") {
            Some(Action::LaunchApp(app)) => assert_eq!(app.name, "google chrome"),
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(
            route("open the rust book"),
            Some(Action::WebSearch("rust book".to_string()))
        );
    }

    #[test]
    fn test_app_names_containing_verbs() {
        match route("open play store") {
            Some(Action::LaunchApp(app)) => assert_eq!(app.name, "store"),
            other => panic!("unexpected action {:?}", other),
        }
        match route("please launch google chrome") {
            Some(Action::LaunchApp(app)) => assert_eq!(app.name, "google chrome"),
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(
            route("please google rust lifetimes"),
            Some(Action::WebSearch("rust lifetimes".to_string()))
        );
    }

    #[test]
    fn test_inflected_phrases() {
        assert_eq!(
            route("keep wifi disabled"),
            Some(Action::Toggle {
                feature: Feature::Wifi,
                on: false
            })
        );
        assert_eq!(
            route("take screenshots"),
            Some(Action::System(SystemAction::Screenshot))
        );
    }

    #[test]
    fn test_search_and_bare_phrases() {
        assert_eq!(
            route("search for pictures of cats"),
            Some(Action::WebSearch("pictures of cats".to_string()))
        );
        match route("notepad") {
            Some(Action::LaunchApp(app)) => assert_eq!(app.name, "notepad"),
            other => panic!("unexpected action {:?}", other),
        }
        match route("display settings") {
            Some(Action::OpenSettings(page)) => assert_eq!(page.key, "display"),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_text() {
        assert_eq!(route("xyzzy plugh"), None);
        assert_eq!(route("   "), None);
    }
}
