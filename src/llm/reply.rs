//! Normalization of chat-completion replies.
//!
//! Providers disagree on where generated content lives: plain string content,
//! a list of typed parts, or a sibling `images` list next to the content. The
//! raw `message` JSON is inspected once here; everything downstream works with
//! [`ReplyEnvelope`].

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Inline image data embedded in free text
const DATA_URI_PATTERN: &str = r"data:image/[a-zA-Z0-9.+-]+;base64,[A-Za-z0-9+/=]+";

fn data_uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DATA_URI_PATTERN).expect("data URI pattern is valid"))
}

/// One element of a multipart reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPart {
    Text(String),
    /// `image_url` part; the URL may be absent or empty in malformed replies
    ImageUrl(Option<String>),
    Other,
}

/// The normal content channel of a reply
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplyContent {
    #[default]
    Empty,
    PlainText(String),
    PartSequence(Vec<ReplyPart>),
}

/// Normalized reply message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplyEnvelope {
    pub content: ReplyContent,
    /// URLs read from the sibling `images` list, in order (`None` when an entry had none)
    pub sibling_images: Vec<Option<String>>,
    /// The message exactly as received, kept for diagnostics
    pub raw: Value,
}

impl ReplyEnvelope {
    /// Normalize a `choices[0].message` object.
    pub fn from_message(message: &Value) -> Self {
        let content = match message.get("content") {
            Some(Value::String(text)) => ReplyContent::PlainText(text.clone()),
            Some(Value::Array(parts)) => {
                ReplyContent::PartSequence(parts.iter().map(normalize_part).collect())
            }
            _ => ReplyContent::Empty,
        };

        let sibling_images = message
            .get("images")
            .and_then(Value::as_array)
            .map(|images| images.iter().map(sibling_image_url).collect())
            .unwrap_or_default();

        Self {
            content,
            sibling_images,
            raw: message.clone(),
        }
    }

    /// Normalize a full chat-completion body by taking the first choice's message.
    pub fn from_completion(body: &Value) -> Self {
        let message = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .cloned()
            .unwrap_or(Value::Null);
        Self::from_message(&message)
    }

    /// Plain text of the reply: string content verbatim, or text parts joined by newlines.
    pub fn text(&self) -> String {
        match &self.content {
            ReplyContent::PlainText(text) => text.clone(),
            ReplyContent::PartSequence(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ReplyPart::Text(text) if !text.is_empty() => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            ReplyContent::Empty => String::new(),
        }
    }

    /// First image reference in the reply, by precedence: sibling image list,
    /// then `image_url` parts, then a data URI embedded in string content.
    pub fn first_image_ref(&self) -> Option<String> {
        if let Some(Some(url)) = self.sibling_images.first() {
            return Some(url.clone());
        }

        match &self.content {
            ReplyContent::PartSequence(parts) => parts.iter().find_map(|part| match part {
                ReplyPart::ImageUrl(Some(url)) => Some(url.clone()),
                _ => None,
            }),
            ReplyContent::PlainText(text) => data_uri_regex()
                .find(text)
                .map(|m| m.as_str().to_string()),
            ReplyContent::Empty => None,
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn normalize_part(part: &Value) -> ReplyPart {
    match part.get("type").and_then(Value::as_str) {
        Some("text") => match part.get("text").and_then(Value::as_str) {
            Some(text) => ReplyPart::Text(text.to_string()),
            None => ReplyPart::Other,
        },
        Some("image_url") => {
            ReplyPart::ImageUrl(non_empty_str(part.get("image_url").and_then(|i| i.get("url"))))
        }
        _ => ReplyPart::Other,
    }
}

fn sibling_image_url(image: &Value) -> Option<String> {
    // OpenRouter uses `image_url.url`; some SDKs camelCase it; some return a bare `url`.
    [
        image.get("image_url").and_then(|i| i.get("url")),
        image.get("imageUrl").and_then(|i| i.get("url")),
        image.get("url"),
    ]
    .into_iter()
    .find_map(non_empty_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_from_string_content() {
        let env = ReplyEnvelope::from_message(&json!({"content": "hello"}));
        assert_eq!(env.text(), "hello");
    }

    #[test]
    fn test_text_joins_text_parts_and_skips_images() {
        let env = ReplyEnvelope::from_message(&json!({
            "content": [
                {"type": "text", "text": "line one"},
                {"type": "image_url", "image_url": {"url": "https://x/y.png"}},
                {"type": "text", "text": "line two"},
                "garbage"
            ]
        }));
        assert_eq!(env.text(), "line one\nline two");
    }

    #[test]
    fn test_text_empty_for_missing_or_odd_content() {
        assert_eq!(ReplyEnvelope::from_message(&json!({})).text(), "");
        assert_eq!(ReplyEnvelope::from_message(&json!({"content": 42})).text(), "");
        assert_eq!(ReplyEnvelope::from_message(&Value::Null).text(), "");
    }

    #[test]
    fn test_sibling_images_win_over_content_parts() {
        let env = ReplyEnvelope::from_message(&json!({
            "content": [{"type": "image_url", "image_url": {"url": "https://content/part.png"}}],
            "images": [{"type": "image_url", "image_url": {"url": "https://sibling/first.png"}}]
        }));
        assert_eq!(
            env.first_image_ref().as_deref(),
            Some("https://sibling/first.png")
        );
    }

    #[test]
    fn test_sibling_url_field_variants() {
        let camel = ReplyEnvelope::from_message(&json!({"images": [{"imageUrl": {"url": "a"}}]}));
        assert_eq!(camel.first_image_ref().as_deref(), Some("a"));

        let bare = ReplyEnvelope::from_message(&json!({"images": [{"image_url": {"url": ""}, "url": "b"}]}));
        assert_eq!(bare.first_image_ref().as_deref(), Some("b"));
    }

    #[test]
    fn test_first_image_part_with_url() {
        let env = ReplyEnvelope::from_message(&json!({
            "content": [
                {"type": "text", "text": "here you go"},
                {"type": "image_url", "image_url": {"url": ""}},
                {"type": "image_url", "image_url": {"url": "https://x/second.png"}}
            ]
        }));
        assert_eq!(env.first_image_ref().as_deref(), Some("https://x/second.png"));
    }

    #[test]
    fn test_data_uri_in_plain_text() {
        let env = ReplyEnvelope::from_message(&json!({
            "content": "Here is the room: data:image/svg+xml;base64,PHN2Zz4=) enjoy"
        }));
        assert_eq!(
            env.first_image_ref().as_deref(),
            Some("data:image/svg+xml;base64,PHN2Zz4=")
        );
    }

    #[test]
    fn test_no_image_found() {
        let env = ReplyEnvelope::from_message(&json!({"content": "sorry, I cannot edit images"}));
        assert_eq!(env.first_image_ref(), None);
        assert_eq!(ReplyEnvelope::from_message(&json!({"images": []})).first_image_ref(), None);
    }

    #[test]
    fn test_from_completion_takes_first_choice() {
        let body = json!({"choices": [{"message": {"content": "first"}}, {"message": {"content": "second"}}]});
        assert_eq!(ReplyEnvelope::from_completion(&body).text(), "first");
        assert_eq!(ReplyEnvelope::from_completion(&json!({"choices": []})).raw, Value::Null);
    }
}
