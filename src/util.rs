/// Maximum length for provider content quoted in error messages
const MAX_ERROR_CONTENT_LEN: usize = 200;

/// Truncate a string for display (Unicode-safe)
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    if s.chars().count() <= max_chars {
        s
    } else {
        let byte_idx = s
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        &s[..byte_idx]
    }
}

/// Sanitize provider response content for error messages to prevent credential leakage.
pub fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "api_key",
        "apikey",
        "secret",
        "password",
        "credential",
        "bearer",
        "sk-", // OpenAI/OpenRouter key prefix
    ];

    let truncated = truncate_str(content, MAX_ERROR_CONTENT_LEN);

    let lower = truncated.to_lowercase();
    for pattern in SECRET_PATTERNS {
        if lower.contains(pattern) {
            return "(response details redacted - may contain sensitive data)".to_string();
        }
    }

    truncated.to_string()
}

/// Short description of a data URI or URL suitable for logs (never the payload).
pub fn describe_image_ref(image_ref: &str) -> String {
    if let Some(rest) = image_ref.strip_prefix("data:") {
        let (header, payload) = rest.split_once(',').unwrap_or((rest, ""));
        let mime = header.split(';').next().unwrap_or("unknown");
        format!("data-uri({}, {} base64 chars)", mime, payload.len())
    } else {
        truncate_str(image_ref, 120).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_str_respects_char_boundaries() {
        assert_eq!(truncate_str("沙发套地毯", 2), "沙发");
        assert_eq!(truncate_str("rug", 10), "rug");
    }

    #[test]
    fn sanitize_redacts_key_like_content() {
        let redacted = sanitize_api_response("invalid key sk-or-v1-abc");
        assert!(redacted.contains("redacted"));
        assert_eq!(sanitize_api_response("model not found"), "model not found");
    }

    #[test]
    fn describe_image_ref_hides_payload() {
        let described = describe_image_ref("data:image/png;base64,AAAA");
        assert_eq!(described, "data-uri(image/png, 4 base64 chars)");
        assert!(!described.contains("AAAA"));
    }
}
