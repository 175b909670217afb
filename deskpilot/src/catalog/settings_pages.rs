//! Windows Settings pages reachable by name.

use super::longest_match;

#[derive(Debug, PartialEq, Eq)]
pub struct SettingsPage {
    pub key: &'static str,
    pub uri: &'static str,
}

const fn page(key: &'static str, uri: &'static str) -> SettingsPage {
    SettingsPage { key, uri }
}

pub static SETTINGS_PAGES: &[SettingsPage] = &[
    page("bluetooth", "ms-settings:bluetooth"),
    page("wifi", "ms-settings:network-wifi"),
    page("network", "ms-settings:network"),
    page("airplane", "ms-settings:network-airplanemode"),
    page("vpn", "ms-settings:network-vpn"),
    page("hotspot", "ms-settings:network-mobilehotspot"),
    page("proxy", "ms-settings:network-proxy"),
    page("display", "ms-settings:display"),
    page("night light", "ms-settings:nightlight"),
    page("sound", "ms-settings:sound"),
    page("notifications", "ms-settings:notifications"),
    page("focus", "ms-settings:quiethours"),
    page("power", "ms-settings:powersleep"),
    page("battery", "ms-settings:batterysaver"),
    page("storage", "ms-settings:storagesense"),
    page("personalization", "ms-settings:personalization"),
    page("background", "ms-settings:personalization-background"),
    page("colors", "ms-settings:personalization-colors"),
    page("lock screen", "ms-settings:lockscreen"),
    page("themes", "ms-settings:themes"),
    page("high contrast", "ms-settings:easeofaccess-highcontrast"),
    page("taskbar", "ms-settings:taskbar"),
    page("start menu", "ms-settings:personalization-start"),
    page("accounts", "ms-settings:yourinfo"),
    page("date", "ms-settings:dateandtime"),
    page("time", "ms-settings:dateandtime"),
    page("language", "ms-settings:regionlanguage"),
    page("keyboard", "ms-settings:keyboard"),
    page("mouse", "ms-settings:mousetouchpad"),
    page("touchpad", "ms-settings:devices-touchpad"),
    page("printer", "ms-settings:printers"),
    page("camera", "ms-settings:privacy-webcam"),
    page("microphone", "ms-settings:privacy-microphone"),
    page("location", "ms-settings:privacy-location"),
    page("apps", "ms-settings:appsfeatures"),
    page("default apps", "ms-settings:defaultapps"),
    page("startup", "ms-settings:startupapps"),
    page("update", "ms-settings:windowsupdate"),
    page("windows update", "ms-settings:windowsupdate"),
    page("recovery", "ms-settings:recovery"),
    page("about", "ms-settings:about"),
    page("clipboard", "ms-settings:clipboard"),
    page("remote desktop", "ms-settings:remotedesktop"),
    page("accessibility", "ms-settings:easeofaccess"),
    page("privacy", "ms-settings:privacy"),
    page("developer", "ms-settings:developers"),
    page("security", "windowsdefender:"),
    page("gaming", "ms-settings:gaming-gamebar"),
    page("fonts", "ms-settings:fonts"),
];

/// Exact lookup by page key
pub fn find_settings_page(key: &str) -> Option<&'static SettingsPage> {
    let key = key.trim().to_lowercase();
    SETTINGS_PAGES.iter().find(|page| page.key == key)
}

/// Longest page key mentioned anywhere in `text`
pub fn match_settings_page(text: &str) -> Option<&'static SettingsPage> {
    longest_match(text, SETTINGS_PAGES, |page| page.key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_settings_page() {
        let page = find_settings_page("Bluetooth ").unwrap();
        assert_eq!(page.uri, "ms-settings:bluetooth");
        assert!(find_settings_page("warp drive").is_none());
    }

    #[test]
    fn test_longer_key_beats_shorter_one() {
        let page = match_settings_page("open windows update settings").unwrap();
        assert_eq!(page.key, "windows update");

        let page = match_settings_page("show the lock screen settings").unwrap();
        assert_eq!(page.key, "lock screen");
    }
}
