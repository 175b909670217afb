//! Features with distinct on and off recipes.

use super::longest_match;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Bluetooth,
    Wifi,
    AirplaneMode,
    NightLight,
    Hotspot,
    Location,
    DarkMode,
    BatterySaver,
    FocusAssist,
    Magnifier,
    Narrator,
    OnScreenKeyboard,
    HighContrast,
}

impl Feature {
    pub fn label(self) -> &'static str {
        match self {
            Feature::Bluetooth => "Bluetooth",
            Feature::Wifi => "WiFi",
            Feature::AirplaneMode => "airplane mode",
            Feature::NightLight => "night light",
            Feature::Hotspot => "hotspot",
            Feature::Location => "location",
            Feature::DarkMode => "dark mode",
            Feature::BatterySaver => "battery saver",
            Feature::FocusAssist => "focus assist",
            Feature::Magnifier => "magnifier",
            Feature::Narrator => "narrator",
            Feature::OnScreenKeyboard => "on-screen keyboard",
            Feature::HighContrast => "high contrast",
        }
    }
}

static TOGGLE_PHRASES: &[(&str, Feature)] = &[
    ("bluetooth", Feature::Bluetooth),
    ("wifi", Feature::Wifi),
    ("wi-fi", Feature::Wifi),
    ("wireless", Feature::Wifi),
    ("airplane", Feature::AirplaneMode),
    ("airplane mode", Feature::AirplaneMode),
    ("flight mode", Feature::AirplaneMode),
    ("night light", Feature::NightLight),
    ("nightlight", Feature::NightLight),
    ("hotspot", Feature::Hotspot),
    ("mobile hotspot", Feature::Hotspot),
    ("location", Feature::Location),
    ("dark mode", Feature::DarkMode),
    ("dark theme", Feature::DarkMode),
    ("battery saver", Feature::BatterySaver),
    ("energy saver", Feature::BatterySaver),
    ("focus assist", Feature::FocusAssist),
    ("do not disturb", Feature::FocusAssist),
    ("magnifier", Feature::Magnifier),
    ("narrator", Feature::Narrator),
    ("on-screen keyboard", Feature::OnScreenKeyboard),
    ("on screen keyboard", Feature::OnScreenKeyboard),
    ("high contrast", Feature::HighContrast),
];

/// Longest toggleable feature phrase mentioned in `text`
pub fn match_feature(text: &str) -> Option<(&'static str, Feature)> {
    longest_match(text, TOGGLE_PHRASES, |entry| entry.0).copied()
}
