//! Extraction of JSON payloads from free-form oracle text
//!
//! The oracle is asked for pure JSON but routinely wraps it in prose or
//! markdown code fences. These helpers pull the first balanced JSON array or
//! object out of the surrounding text; actual decoding stays with serde.

/// Extract the first top-level JSON array from text
pub fn extract_json_array(text: &str) -> Option<&str> {
    extract_delimited(text, '[', ']')
}

/// Extract the first top-level JSON object from text
pub fn extract_json_object(text: &str) -> Option<&str> {
    extract_delimited(text, '{', '}')
}

/// Scan from the first `open` to its balanced `close`, ignoring delimiters
/// inside JSON string literals.
fn extract_delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..start + i + c.len_utf8()]);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_array() {
        let text = r#"[{"title": "A"}, {"title": "B"}]"#;
        assert_eq!(extract_json_array(text), Some(text));
    }

    #[test]
    fn test_extract_array_from_prose() {
        let text = "Here is your roadmap:\n```json\n[{\"title\": \"A\"}]\n```\nGood luck!";
        assert_eq!(extract_json_array(text), Some(r#"[{"title": "A"}]"#));
    }

    #[test]
    fn test_extract_nested_arrays() {
        let text = r#"prefix [1, [2, 3], {"k": [4]}] suffix [5]"#;
        assert_eq!(extract_json_array(text), Some(r#"[1, [2, 3], {"k": [4]}]"#));
    }

    #[test]
    fn test_brackets_inside_strings_ignored() {
        let text = r#"[{"title": "Arrays [1] and \"quotes\""}]"#;
        assert_eq!(extract_json_array(text), Some(text));
    }

    #[test]
    fn test_extract_object() {
        let text = "The plan:\n{\"events\": [{\"summary\": \"s\"}]}\ndone";
        assert_eq!(extract_json_object(text), Some(r#"{"events": [{"summary": "s"}]}"#));
    }

    #[test]
    fn test_no_array_present() {
        assert_eq!(extract_json_array("no json here"), None);
    }

    #[test]
    fn test_unbalanced_returns_none() {
        assert_eq!(extract_json_array(r#"[{"title": "A"}"#), None);
    }
}
