/// System instruction sent with every structured-generation call.
pub const STRUCTURED_SYSTEM_PROMPT: &str = "Return ONLY valid JSON. No markdown.";

/// Fixed instruction prefix for structured tasks. The schema hint is embedded
/// verbatim and never validated against the output; callers tolerate missing
/// or extra fields.
pub fn structured_task_prompt(task: &str, schema_hint: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are an expert growth/affiliate operator. Return ONLY valid JSON.\n",
    );
    prompt.push_str(&format!("Task: {task}\n"));
    if let Some(hint) = schema_hint {
        prompt.push_str(&format!("Schema hint: {hint}\n"));
    }
    prompt.push_str("No markdown, no explanations.");
    prompt
}

/// The single deterministic repair re-prompt, with the failing output as
/// payload.
pub fn repair_prompt(raw_output: &str) -> String {
    format!(
        "Convert the following content to STRICT valid JSON. Output ONLY JSON.\n\
         If it contains multiple things, preserve all information in JSON.\n\n{raw_output}"
    )
}

/// User-context block for conversational replies.
pub fn chat_context_prompt(username: Option<&str>, chat_id: i64, text: &str) -> String {
    format!(
        "User: {}\nChatId: {chat_id}\n\nMessage: {text}",
        username.unwrap_or("unknown")
    )
}

#[cfg(test)]
mod tests {
    use super::{chat_context_prompt, structured_task_prompt};

    #[test]
    fn schema_hint_is_embedded_verbatim() {
        let prompt = structured_task_prompt("extract offer", Some("{\"name\":\"\"}\nInput: x"));
        assert!(prompt.contains("Task: extract offer\n"));
        assert!(prompt.contains("Schema hint: {\"name\":\"\"}\nInput: x\n"));
        assert!(prompt.ends_with("No markdown, no explanations."));
    }

    #[test]
    fn hint_line_omitted_when_absent() {
        let prompt = structured_task_prompt("extract offer", None);
        assert!(!prompt.contains("Schema hint"));
    }

    #[test]
    fn unknown_username_is_labelled() {
        let prompt = chat_context_prompt(None, 7, "hi");
        assert!(prompt.starts_with("User: unknown\nChatId: 7"));
    }
}
