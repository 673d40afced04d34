//! Extraction of the text that pattern rules are tested against.

use serde_json::Value;

/// Extract the input string for pattern matching.
///
/// Order of lookup:
/// 1. the most recent `messages` entry with role `user`
/// 2. the top-level `prompt` field
/// 3. the top-level `input` field (string, or the most recent user entry)
///
/// Returns an empty string when none is present.
pub fn extract_input(body: Option<&Value>) -> String {
    let Some(body) = body else {
        return String::new();
    };

    if let Some(text) = body
        .get("messages")
        .and_then(Value::as_array)
        .and_then(|messages| last_user_text(messages))
    {
        return text;
    }

    match body.get("prompt") {
        Some(Value::String(prompt)) => return prompt.clone(),
        Some(Value::Array(prompts)) => {
            if let Some(first) = prompts.iter().find_map(Value::as_str) {
                return first.to_string();
            }
        }
        _ => {}
    }

    match body.get("input") {
        Some(Value::String(input)) => input.clone(),
        Some(Value::Array(items)) => last_user_text(items).unwrap_or_default(),
        _ => String::new(),
    }
}

fn last_user_text(messages: &[Value]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|msg| msg.get("role").and_then(Value::as_str) == Some("user"))
        .and_then(|msg| msg.get("content"))
        .and_then(content_text)
}

/// Content is either a string or a list of parts (`{"type": "text", "text": ...}`)
fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|part| match part {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(_) => part.get("text").and_then(Value::as_str),
                    _ => None,
                })
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join(" "))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_last_user_message_wins() {
        let body = json!({
            "messages": [
                {"role": "system", "content": "be nice"},
                {"role": "user", "content": "first question"},
                {"role": "assistant", "content": "answer"},
                {"role": "user", "content": "second question"},
                {"role": "assistant", "content": "trailing"}
            ]
        });
        assert_eq!(extract_input(Some(&body)), "second question");
    }

    #[test]
    fn test_content_parts_are_joined() {
        let body = json!({
            "messages": [{"role": "user", "content": [
                {"type": "text", "text": "describe"},
                {"type": "image_url", "image_url": {"url": "http://x"}},
                {"type": "text", "text": "this"}
            ]}]
        });
        assert_eq!(extract_input(Some(&body)), "describe this");
    }

    #[test]
    fn test_prompt_fallback() {
        let body = json!({"model": "gpt-3.5-turbo-instruct", "prompt": "Once upon"});
        assert_eq!(extract_input(Some(&body)), "Once upon");

        let body = json!({"prompt": ["batch one", "batch two"]});
        assert_eq!(extract_input(Some(&body)), "batch one");
    }

    #[test]
    fn test_input_fallback() {
        let body = json!({"input": "responses api"});
        assert_eq!(extract_input(Some(&body)), "responses api");

        let body = json!({"input": [{"role": "user", "content": "from list"}]});
        assert_eq!(extract_input(Some(&body)), "from list");
    }

    #[test]
    fn test_messages_without_user_fall_back_to_prompt() {
        let body = json!({
            "messages": [{"role": "system", "content": "x"}],
            "prompt": "fallback"
        });
        assert_eq!(extract_input(Some(&body)), "fallback");
    }

    #[test]
    fn test_absent_is_empty() {
        assert_eq!(extract_input(None), "");
        assert_eq!(extract_input(Some(&json!({"model": "gpt-4"}))), "");
    }
}
