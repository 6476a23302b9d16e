use serde_json::Value;

/// Fields checked, in order, for the reply text.
const REPLY_FIELDS: [&str; 3] = ["output", "response", "message"];

/// Turn a successful chat response into display text.
///
/// First non-empty of `output`, `response`, `message` wins; non-string
/// values are serialized. With none present the whole body is shown as JSON.
pub fn normalize_reply(body: &Value) -> String {
    match body {
        Value::Null => return "No response".to_string(),
        Value::String(s) if !s.trim().is_empty() => return s.clone(),
        _ => {}
    }
    for field in REPLY_FIELDS {
        match body.get(field) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => continue,
            Some(Value::String(s)) if s.is_empty() => continue,
            Some(Value::String(s)) => return s.clone(),
            Some(other) => return other.to_string(),
        }
    }
    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_field_priority() {
        assert_eq!(normalize_reply(&json!({"output": "hello", "response": "x"})), "hello");
        assert_eq!(normalize_reply(&json!({"response": "hi"})), "hi");
        assert_eq!(normalize_reply(&json!({"output": "", "message": "m"})), "m");
    }

    #[test]
    fn test_unrecognized_body_is_serialized() {
        assert_eq!(normalize_reply(&json!({})), "{}");
        assert_eq!(normalize_reply(&json!({"raw": 1})), r#"{"raw":1}"#);
        assert_eq!(normalize_reply(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_structured_output_is_serialized() {
        assert_eq!(
            normalize_reply(&json!({"output": {"model": "llama3", "done": true}})),
            r#"{"done":true,"model":"llama3"}"#
        );
    }

    #[test]
    fn test_null_and_plain_text_bodies() {
        assert_eq!(normalize_reply(&Value::Null), "No response");
        assert_eq!(normalize_reply(&json!("plain text")), "plain text");
        assert_eq!(normalize_reply(&json!("")), "\"\"");
    }
}
