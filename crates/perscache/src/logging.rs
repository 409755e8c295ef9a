//! Helpers for call tracing

use std::fmt;

use serde_json::Value;

/// Longest preview of an argument or result written to trace logs
pub const MAX_PREVIEW_LEN: usize = 200;

/// Debug rendering of a value, cut to [`MAX_PREVIEW_LEN`] characters
pub fn preview<T: fmt::Debug + ?Sized>(value: &T) -> String {
    trim(format!("{value:?}"))
}

/// Bound arguments rendered as `name=json` pairs, cut like [`preview`]
pub fn preview_args(bound: &[(String, Value)]) -> String {
    let rendered = bound
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ");
    trim(rendered)
}

fn trim(mut text: String) -> String {
    if let Some((cut, _)) = text.char_indices().nth(MAX_PREVIEW_LEN) {
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_values_untouched() {
        assert_eq!(preview(&(1, "a")), "(1, \"a\")");
    }

    #[test]
    fn test_long_values_trimmed() {
        let long = "x".repeat(500);
        let shown = preview(long.as_str());
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), MAX_PREVIEW_LEN + 3);
    }

    #[test]
    fn test_preview_args() {
        let bound = vec![
            ("key".to_string(), Value::from("abc")),
            ("limit".to_string(), Value::from(3)),
        ];
        assert_eq!(preview_args(&bound), "key=\"abc\", limit=3");
    }

    #[test]
    fn test_trim_respects_char_boundaries() {
        let text = "é".repeat(300);
        let shown = trim(text);
        assert_eq!(shown.chars().count(), MAX_PREVIEW_LEN + 3);
    }
}
