//! Best-effort extraction of structured payloads from free-form model text.
//!
//! Models wrap their answers in prose, markdown, and apologies; these
//! heuristics pull out the likely payload. They never fail: absence of a
//! match is a normal outcome, not an error.

/// Returns the widest `{...}` span in `text`: from the first `{` to the last
/// `}`. `None` when no such span exists.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Returns the widest `[...]` span in `text`: from the first `[` to the last
/// `]`. `None` when no such span exists.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Extracts bullet-point content from line-oriented text.
///
/// Each line is trimmed and stripped of a single leading `-` marker; empty
/// lines are dropped. Order and duplicates are preserved.
pub fn extract_bullet_points(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .map(|line| line.strip_prefix('-').map(str::trim_start).unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    mod json_object {
        use super::*;

        #[test]
        fn extracts_object_with_surrounding_text() {
            assert_eq!(
                extract_json_object(r#"hello { "a": 1 } world"#),
                Some(r#"{ "a": 1 }"#)
            );
        }

        #[test]
        fn extracts_bare_object() {
            let object = r#"{"key": "value", "nested": {"inner": true}}"#;
            assert_eq!(extract_json_object(object), Some(object));
        }

        #[test]
        fn spans_to_the_last_closing_brace() {
            let text = r#"{"a": 1} trailing {"b": 2}"#;
            assert_eq!(extract_json_object(text), Some(text));
        }

        #[test]
        fn returns_none_without_braces() {
            assert_eq!(extract_json_object("no braces here"), None);
            assert_eq!(
                extract_json_object(r#"hello world! [ "val 1", "val 2" ] end"#),
                None
            );
        }

        #[test]
        fn returns_none_for_inverted_braces() {
            assert_eq!(extract_json_object("} backwards {"), None);
        }

        #[test]
        fn handles_multiline_objects() {
            let text = "preamble\n{\n  \"a\": 1\n}\npostscript";
            assert_eq!(extract_json_object(text), Some("{\n  \"a\": 1\n}"));
        }
    }

    mod json_array {
        use super::*;

        #[test]
        fn extracts_array_with_surrounding_text() {
            assert_eq!(
                extract_json_array(r#"text in front ["one", "two"] text behind"#),
                Some(r#"["one", "two"]"#)
            );
        }

        #[test]
        fn returns_none_without_brackets() {
            assert_eq!(
                extract_json_array(r#"hello world! { "key": "value" } end"#),
                None
            );
        }

        #[test]
        fn extracts_bare_array() {
            let array = r#"["statement 1", "statement 2", "statement 3"]"#;
            assert_eq!(extract_json_array(array), Some(array));
        }
    }

    mod bullet_points {
        use super::*;

        #[test]
        fn extracts_bullet_lines() {
            assert_eq!(
                extract_bullet_points("- a\n- b\n- c - with dash"),
                vec!["a", "b", "c - with dash"]
            );
        }

        #[test]
        fn trims_indented_bullets_and_drops_blank_lines() {
            let text = "\n  - bullet point 1\n  - bullet point 2\n  - bullet point 3 - with another dash in the middle.\n  ";
            assert_eq!(
                extract_bullet_points(text),
                vec![
                    "bullet point 1",
                    "bullet point 2",
                    "bullet point 3 - with another dash in the middle.",
                ]
            );
        }

        #[test]
        fn keeps_lines_without_markers() {
            assert_eq!(extract_bullet_points("plain line"), vec!["plain line"]);
        }

        #[test]
        fn preserves_order_and_duplicates() {
            assert_eq!(
                extract_bullet_points("- same\n- same\n- other"),
                vec!["same", "same", "other"]
            );
        }

        #[test]
        fn empty_text_yields_no_points() {
            assert!(extract_bullet_points("").is_empty());
            assert!(extract_bullet_points("\n\n").is_empty());
        }
    }
}
