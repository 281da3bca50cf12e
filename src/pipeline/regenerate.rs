use super::PipelineError;
use crate::llm::prompts::REGENERATE_ROOM_PROMPT;
use crate::llm::{ChatGateway, ChatRequest, ContentPart, ImageConfig};
use crate::util::describe_image_ref;
use base64::Engine;
use tracing::Instrument;
use uuid::Uuid;

const DEFAULT_UPLOAD_MIME: &str = "image/png";
const OUTPUT_ASPECT_RATIO: &str = "4:3";
const OUTPUT_IMAGE_SIZE: &str = "1K";

/// An uploaded room photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImageUpload {
    /// A missing or blank content type falls back to `image/png`.
    pub fn new(bytes: Vec<u8>, content_type: Option<&str>) -> Self {
        let content_type = content_type
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_UPLOAD_MIME)
            .to_string();
        Self {
            bytes,
            content_type,
        }
    }

    pub fn to_data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.content_type, encoded)
    }
}

/// Send the photo with the cream-style instruction and return the first generated image reference.
pub async fn regenerate_room(
    gateway: &dyn ChatGateway,
    model: &str,
    upload: &ImageUpload,
) -> Result<String, PipelineError> {
    let span = tracing::info_span!("regenerate", run_id = %Uuid::new_v4());
    request_regeneration(gateway, model, upload)
        .instrument(span)
        .await
}

async fn request_regeneration(
    gateway: &dyn ChatGateway,
    model: &str,
    upload: &ImageUpload,
) -> Result<String, PipelineError> {
    tracing::info!(
        model,
        content_type = %upload.content_type,
        bytes = upload.bytes.len(),
        "requesting room regeneration"
    );

    let request = ChatRequest::user(
        model,
        vec![
            ContentPart::text(REGENERATE_ROOM_PROMPT),
            ContentPart::image_url(upload.to_data_url()),
        ],
    )
    .with_image_output(ImageConfig {
        aspect_ratio: OUTPUT_ASPECT_RATIO.to_string(),
        image_size: OUTPUT_IMAGE_SIZE.to_string(),
    });

    let envelope = gateway.complete(&request).await?;
    match envelope.first_image_ref() {
        Some(image_ref) => {
            tracing::info!(image = %describe_image_ref(&image_ref), "room regenerated");
            Ok(image_ref)
        }
        None => {
            tracing::warn!("model reply contained no image reference");
            Err(PipelineError::NoImage {
                envelope: envelope.raw,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::UpstreamError;
    use crate::testing::ScriptedGateway;
    use serde_json::json;

    fn jpeg() -> ImageUpload {
        ImageUpload::new(vec![0xFF, 0xD8, 0xFF, 0xE0], Some("image/jpeg"))
    }

    #[test]
    fn test_data_url_encoding() {
        assert_eq!(jpeg().to_data_url(), "data:image/jpeg;base64,/9j/4A==");
        assert_eq!(
            ImageUpload::new(vec![1], Some("  ")).content_type,
            DEFAULT_UPLOAD_MIME
        );
        assert_eq!(ImageUpload::new(vec![1], None).content_type, DEFAULT_UPLOAD_MIME);
    }

    #[tokio::test]
    async fn test_returns_sibling_image_and_sends_expected_request() {
        let gateway = ScriptedGateway::with_messages(vec![json!({
            "content": "done",
            "images": [{"type": "image_url", "image_url": {"url": "https://cdn.test/room.png"}}]
        })]);

        let image = regenerate_room(&gateway, "img-model", &jpeg()).await.unwrap();
        assert_eq!(image, "https://cdn.test/room.png");

        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        let sent = serde_json::to_value(&requests[0]).unwrap();
        assert_eq!(sent["model"], "img-model");
        assert_eq!(sent["modalities"], json!(["image", "text"]));
        assert_eq!(sent["image_config"]["aspect_ratio"], "4:3");
        assert_eq!(sent["image_config"]["image_size"], "1K");
        assert_eq!(sent["messages"][0]["content"][0]["text"], REGENERATE_ROOM_PROMPT);
        assert_eq!(
            sent["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,/9j/4A=="
        );
    }

    #[tokio::test]
    async fn test_missing_image_carries_raw_envelope() {
        let message = json!({"content": "I can only describe images."});
        let gateway = ScriptedGateway::with_messages(vec![message.clone()]);

        match regenerate_room(&gateway, "m", &jpeg()).await {
            Err(PipelineError::NoImage { envelope }) => assert_eq!(envelope, message),
            other => panic!("expected NoImage, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upstream_error_is_propagated() {
        let gateway = ScriptedGateway::new(vec![Err(UpstreamError::new(
            Some(400),
            "model does not support image output",
        ))]);

        match regenerate_room(&gateway, "m", &jpeg()).await {
            Err(PipelineError::Upstream(err)) => {
                assert_eq!(err.message, "model does not support image output")
            }
            other => panic!("expected Upstream, got {:?}", other),
        }
    }
}
