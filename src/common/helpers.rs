// Helper functions for safe logging

use serde_json::Value;

/// JSON keys whose values never reach the logs
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "token",
    "idToken",
    "id_token",
    "code",
    "secret",
    "passwordHash",
    "password_hash",
];

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```ignore
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            let first = local.chars().next().unwrap_or('*');
            format!("{first}***@{domain}")
        }
        _ => "***@***.***".to_string(),
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
pub fn safe_token_log(token: &str) -> String {
    if token.is_ascii() && token.len() > 8 {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Replaces the values of sensitive keys, at any depth, with "[REDACTED]"
pub fn redact_sensitive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if SENSITIVE_KEYS.contains(&key.as_str()) {
                    *v = Value::String("[REDACTED]".to_string());
                } else {
                    redact_sensitive(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_sensitive),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_email_log() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
        assert_eq!(safe_email_log("not-an-email"), "***@***.***");
        assert_eq!(safe_email_log("@example.com"), "***@***.***");
        assert_eq!(safe_email_log("রহিম@example.com"), "র***@example.com");
    }

    #[test]
    fn test_safe_token_log() {
        assert_eq!(
            safe_token_log("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"),
            "eyJh...VCJ9"
        );
        assert_eq!(safe_token_log("short"), "***");
    }

    #[test]
    fn test_redact_sensitive_nested() {
        let mut body = json!({
            "email": "user@example.com",
            "password": "hunter22",
            "nested": { "token": "abc", "keep": 1 },
            "list": [{ "idToken": "xyz" }]
        });
        redact_sensitive(&mut body);

        assert_eq!(body["email"], "user@example.com");
        assert_eq!(body["password"], "[REDACTED]");
        assert_eq!(body["nested"]["token"], "[REDACTED]");
        assert_eq!(body["nested"]["keep"], 1);
        assert_eq!(body["list"][0]["idToken"], "[REDACTED]");
    }
}
