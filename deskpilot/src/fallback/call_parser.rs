//! Parsing of `call:name(args)` expressions out of raw model output.
//!
//! Small models are sloppy about argument syntax, so arguments go through an
//! ordered list of extraction strategies. Each one contributes only keys that no
//! earlier strategy produced.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub type Arguments = Map<String, Value>;

const ESCAPE_MARKER: &str = "<escape>";

static CALL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"call:(\w+)\s*([({])").unwrap());
static ESCAPED_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(\w+):\s*<escape>(.*?)<escape>").unwrap());
static QUOTED_INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""(\w+)":\s*(-?\d+)"#).unwrap());
static QUOTED_BOOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)"(\w+)":\s*(true|false)"#).unwrap());
static BARE_INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+):\s*(-?\d+)").unwrap());

/// A function call found in model output
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCall {
    pub name: String,
    pub args: Arguments,
}

type Strategy = fn(&str) -> Arguments;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("strict json", strict_json),
    ("escaped strings", escaped_strings),
    ("quoted integers", quoted_integers),
    ("quoted booleans", quoted_booleans),
    ("bare integers", bare_integers),
];

/// Find the first call expression in `text` and extract its arguments
pub fn parse_call(text: &str) -> Option<ParsedCall> {
    let (name, blob) = find_call(text)?;
    Some(ParsedCall {
        name: name.to_string(),
        args: extract_arguments(blob),
    })
}

/// Locate `call:name(` or `call:name{` and return the name and argument blob.
///
/// Parenthesised blobs are returned without the parentheses, brace blobs keep their
/// braces so they still read as a JSON object. Output cut off by the token cap
/// yields everything up to the end of the text.
pub fn find_call(text: &str) -> Option<(&str, &str)> {
    let caps = CALL_RE.captures(text)?;
    let name = caps.get(1)?.as_str();
    let open = caps.get(2)?;
    let rest = &text[open.start()..];
    let end = closing_index(rest).unwrap_or(rest.len());
    let blob = if open.as_str() == "(" {
        &rest[1..end]
    } else {
        &rest[..(end + 1).min(rest.len())]
    };
    Some((name, blob.trim()))
}

/// Byte index of the bracket closing the one at index 0.
///
/// Brackets inside `"..."` strings or `<escape>...<escape>` spans do not count.
fn closing_index(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut in_escape = false;
    let mut escaped = false;
    let mut skip_until = 0;
    for (idx, c) in text.char_indices() {
        if idx < skip_until {
            continue;
        }
        if text[idx..].starts_with(ESCAPE_MARKER) && !in_string {
            in_escape = !in_escape;
            skip_until = idx + ESCAPE_MARKER.len();
            continue;
        }
        if in_escape {
            continue;
        }
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Run every strategy in order, merging keys not seen before
pub fn extract_arguments(blob: &str) -> Arguments {
    let mut args = Arguments::new();
    for (name, strategy) in STRATEGIES {
        let found = strategy(blob);
        if !found.is_empty() {
            log::debug!("Argument strategy '{}' found {:?}", name, found);
        }
        for (key, value) in found {
            args.entry(key).or_insert(value);
        }
    }
    args
}

fn strict_json(blob: &str) -> Arguments {
    match serde_json::from_str::<Value>(&blob.replace(ESCAPE_MARKER, "\"")) {
        Ok(Value::Object(map)) => map,
        _ => Arguments::new(),
    }
}

fn escaped_strings(blob: &str) -> Arguments {
    ESCAPED_PAIR_RE
        .captures_iter(blob)
        .map(|caps| (caps[1].to_string(), Value::String(caps[2].to_string())))
        .collect()
}

fn integer_value(digits: &str) -> Option<Value> {
    digits.parse::<i64>().ok().map(Value::from)
}

fn quoted_integers(blob: &str) -> Arguments {
    QUOTED_INT_RE
        .captures_iter(blob)
        .filter_map(|caps| Some((caps[1].to_string(), integer_value(&caps[2])?)))
        .collect()
}

fn quoted_booleans(blob: &str) -> Arguments {
    QUOTED_BOOL_RE
        .captures_iter(blob)
        .map(|caps| {
            let value = caps[2].eq_ignore_ascii_case("true");
            (caps[1].to_string(), Value::Bool(value))
        })
        .collect()
}

fn bare_integers(blob: &str) -> Arguments {
    BARE_INT_RE
        .captures_iter(blob)
        .filter_map(|caps| Some((caps[1].to_string(), integer_value(&caps[2])?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_arguments() {
        let call = parse_call(r#"call:set_volume({"level": 42})"#).unwrap();
        assert_eq!(call.name, "set_volume");
        assert_eq!(call.args.get("level"), Some(&json!(42)));
    }

    #[test]
    fn test_escape_marker_arguments() {
        let call = parse_call("call:open_app(app_name: <escape>chrome<escape>)").unwrap();
        assert_eq!(call.name, "open_app");
        assert_eq!(call.args.len(), 1);
        assert_eq!(call.args.get("app_name"), Some(&json!("chrome")));
    }

    #[test]
    fn test_brace_delimited_call() {
        let text = "<start_function_call>call:web_search{query:<escape>rust (lang) docs<escape>}<end_function_call>";
        let call = parse_call(text).unwrap();
        assert_eq!(call.name, "web_search");
        assert_eq!(call.args.get("query"), Some(&json!("rust (lang) docs")));
    }

    #[test]
    fn test_escaped_json_object() {
        let call = parse_call("call:open_settings{<escape>setting<escape>: <escape>display<escape>}")
            .unwrap();
        assert_eq!(call.args.get("setting"), Some(&json!("display")));
    }

    #[test]
    fn test_brackets_inside_escaped_values() {
        let call = parse_call("call:web_search{query:<escape>smiley :)<escape>}").unwrap();
        assert_eq!(call.args.get("query"), Some(&json!("smiley :)")));

        let call = parse_call("call:open_settings(setting: <escape>display}<escape>)").unwrap();
        assert_eq!(call.args.get("setting"), Some(&json!("display}")));
    }

    #[test]
    fn test_nested_braces_are_balanced() {
        let (name, blob) =
            find_call(r#"sure! call:set_brightness({"level": 30, "opts": {"x": 1}}) done"#)
                .unwrap();
        assert_eq!(name, "set_brightness");
        assert_eq!(blob, r#"{"level": 30, "opts": {"x": 1}}"#);
    }

    #[test]
    fn test_truncated_output_uses_rest_of_text() {
        let call = parse_call(r#"call:set_volume({"level": 65, "#).unwrap();
        assert_eq!(call.args.get("level"), Some(&json!(65)));
    }

    #[test]
    fn test_fallback_strategies_merge_unseen_keys() {
        let args = extract_arguments(r#"level: 20, "muted": TRUE, "level": 70"#);
        assert_eq!(args.get("level"), Some(&json!(70)));
        assert_eq!(args.get("muted"), Some(&json!(true)));

        let args = extract_arguments("level: -5");
        assert_eq!(args.get("level"), Some(&json!(-5)));
    }

    #[test]
    fn test_no_call_expression() {
        assert!(parse_call("I think you want the volume higher.").is_none());
        assert!(parse_call("call: set_volume 42").is_none());
    }
}
