//! Static phrase tables: settings pages, known applications and toggleable
//! features. All tables are immutable and share the same matching rules.

pub mod known_apps;
pub mod settings_pages;
pub mod toggles;

pub use known_apps::{find_known_app, known_applications, match_known_app, KnownApp, Launch};
pub use settings_pages::{find_settings_page, match_settings_page, SettingsPage};
pub use toggles::{match_feature, Feature};

const INFLECTIONS: &[&str] = &["s", "es", "d", "ed", "ing"];

/// True if `phrase` occurs in `text` without being glued to a neighbouring word.
///
/// The boundary check only applies on sides where the phrase itself ends in an
/// alphanumeric character, so cue phrases like `"start "` still match "start the
/// music". A short inflection may follow the phrase ("disabled", "screenshots").
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let check_start = phrase.chars().next().is_some_and(char::is_alphanumeric);
    let check_end = phrase.chars().next_back().is_some_and(char::is_alphanumeric);

    text.match_indices(phrase).any(|(pos, _)| {
        let before_ok = !check_start
            || text[..pos]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = !check_end || ends_word(&text[pos + phrase.len()..]);
        before_ok && after_ok
    })
}

fn ends_word(rest: &str) -> bool {
    let at_boundary = |s: &str| s.chars().next().map_or(true, |c| !c.is_alphanumeric());
    at_boundary(rest)
        || INFLECTIONS
            .iter()
            .any(|suffix| rest.strip_prefix(suffix).is_some_and(at_boundary))
}

/// True if any of `phrases` occurs in `text`
pub fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| contains_phrase(text, phrase))
}

/// Pick the entry whose phrase is the longest one contained in `text`.
///
/// Ties keep declaration order, so a table lists its preferred synonym first.
pub fn longest_match<'a, T>(
    text: &str,
    entries: &'a [T],
    phrase_of: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    let mut best: Option<(&T, usize)> = None;
    for entry in entries {
        let phrase = phrase_of(entry);
        if !contains_phrase(text, phrase) {
            continue;
        }
        match best {
            Some((_, len)) if len >= phrase.len() => {}
            _ => best = Some((entry, phrase.len())),
        }
    }
    best.map(|(entry, _)| entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_phrase_respects_word_boundaries() {
        assert!(contains_phrase("turn on bluetooth", "bluetooth"));
        assert!(contains_phrase("make it dim please", "dim"));
        assert!(!contains_phrase("change the dimension", "dim"));
        assert!(!contains_phrase("scan this barcode", "code"));
        assert!(contains_phrase("open vs code", "code"));
        assert!(contains_phrase("turn on wi-fi", "wi-fi"));
        assert!(contains_phrase("start the music", "start "));
        assert!(!contains_phrase("anything", ""));
    }

    #[test]
    fn test_inflected_forms_match() {
        assert!(contains_phrase("keep wifi disabled", "disable"));
        assert!(contains_phrase("take screenshots", "screenshot"));
        assert!(contains_phrase("show my downloads", "download"));
        assert!(contains_phrase("stop mirroring now", "mirror"));
        assert!(!contains_phrase("change the dimension", "dim"));
        assert!(!contains_phrase("a lightweight theme", "light"));
    }

    #[test]
    fn test_later_occurrence_can_satisfy_boundary() {
        assert!(contains_phrase("dimension dim", "dim"));
    }

    #[test]
    fn test_longest_phrase_wins() {
        let table = [("light", 1), ("night light", 2), ("night", 3)];
        let hit = longest_match("turn on the night light", &table, |e| e.0);
        assert_eq!(hit.map(|e| e.1), Some(2));

        let hit = longest_match("turn on the light", &table, |e| e.0);
        assert_eq!(hit.map(|e| e.1), Some(1));
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let table = [("wifi", "first"), ("calc", "second")];
        let hit = longest_match("calc and wifi", &table, |e| e.0);
        assert_eq!(hit.map(|e| e.1), Some("first"));
    }

    #[test]
    fn test_no_match() {
        let table = [("bluetooth", ())];
        assert!(longest_match("xyzzy plugh", &table, |e| e.0).is_none());
    }
}
