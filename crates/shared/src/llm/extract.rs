use serde_json::Value;

/// Best-effort slice of provider output believed to contain the structured
/// payload. Priority order, first matching rule only:
///
/// 1. fenced code block (optionally tagged `json`) -> trimmed interior
/// 2. first `{` .. last `}` (closing after opening) -> inclusive slice
/// 3. first `[` .. last `]` likewise
/// 4. the trimmed input unchanged
///
/// This is a heuristic, not a parser; text with multiple unrelated brace
/// pairs can select the wrong span. The repair pass is the backstop.
pub fn extract_candidate(raw: &str) -> &str {
    let text = raw.trim();
    if text.is_empty() {
        return text;
    }

    if let Some(interior) = fenced_interior(text) {
        return interior;
    }

    if let Some(span) = delimited_span(text, '{', '}') {
        return span;
    }

    if let Some(span) = delimited_span(text, '[', ']') {
        return span;
    }

    text
}

/// Strict parse of an extraction candidate. Total: any malformed input is
/// `None`, never a panic, so callers can branch into the repair pass.
pub fn try_parse(candidate: &str) -> Option<Value> {
    serde_json::from_str(candidate).ok()
}

fn fenced_interior(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    let body = strip_json_tag(after_fence);
    let close = body.find("```")?;
    Some(body[..close].trim())
}

fn strip_json_tag(body: &str) -> &str {
    match body.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &body[4..],
        _ => body,
    }
}

fn delimited_span(text: &str, open: char, close: char) -> Option<&str> {
    let first = text.find(open)?;
    let last = text.rfind(close)?;
    if last > first {
        Some(text[first..last + close.len_utf8()].trim())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_candidate, try_parse};

    #[test]
    fn fenced_block_interior_is_returned_trimmed() {
        let raw = "Sure, here you go:\n```json\n{\"a\": 1}\n```\nanything else?";
        assert_eq!(extract_candidate(raw), "{\"a\": 1}");
    }

    #[test]
    fn fence_tag_is_optional_and_case_insensitive() {
        assert_eq!(extract_candidate("```\n{\"x\":true}\n```"), "{\"x\":true}");
        assert_eq!(extract_candidate("```JSON\n{\"x\":true}\n```"), "{\"x\":true}");
    }

    #[test]
    fn brace_span_runs_from_first_open_to_last_close() {
        let raw = "prefix {\"a\":{\"b\":2}} suffix } trailing";
        assert_eq!(extract_candidate(raw), "{\"a\":{\"b\":2}} suffix }");
    }

    #[test]
    fn bracket_span_used_when_no_braces_present() {
        let raw = "items: [1, 2, 3] done";
        assert_eq!(extract_candidate(raw), "[1, 2, 3]");
    }

    #[test]
    fn fence_rule_wins_over_brace_rule() {
        let raw = "{\"outer\": true}\n```json\n{\"inner\": true}\n```";
        assert_eq!(extract_candidate(raw), "{\"inner\": true}");
    }

    #[test]
    fn plain_text_passes_through_trimmed() {
        assert_eq!(extract_candidate("  no json here  "), "no json here");
        assert_eq!(extract_candidate(""), "");
    }

    #[test]
    fn unbalanced_delimiters_fall_through() {
        // Closing brace before opening one: rule 2 must not apply.
        assert_eq!(extract_candidate("} then {"), "} then {");
    }

    #[test]
    fn try_parse_is_total() {
        assert_eq!(try_parse("{\"a\":1}"), Some(json!({"a": 1})));
        assert_eq!(try_parse("no json here"), None);
        assert_eq!(try_parse("{\"a\":"), None);
        assert_eq!(try_parse(""), None);
    }

    #[test]
    fn fenced_scenario_from_chatty_provider_parses() {
        let raw = "Sure! ```json\n{\"a\":1}\n```";
        let parsed = try_parse(extract_candidate(raw)).expect("candidate should parse");
        assert_eq!(parsed, json!({"a": 1}));
    }
}
