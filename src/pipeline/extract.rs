use super::{PipelineError, RepairFailure};
use crate::furnish::FurnishingItem;
use crate::llm::prompts::{repair_items_prompt, EXTRACT_ITEMS_PROMPT};
use crate::llm::{parse_furnishing_items, ChatGateway, ChatRequest, ContentPart};
use crate::util::describe_image_ref;
use tracing::Instrument;
use uuid::Uuid;

/// A validated furnishing list
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedItems {
    pub items: Vec<FurnishingItem>,
    /// Whether the list only validated after the repair round-trip
    pub repaired: bool,
}

/// Ask the model for a furnishing list for `image_ref` (URL or data URI).
///
/// If the first reply fails validation the model gets exactly one chance to
/// repair its own output; a second failure is terminal.
pub async fn extract_items(
    gateway: &dyn ChatGateway,
    model: &str,
    image_ref: &str,
) -> Result<ExtractedItems, PipelineError> {
    let span = tracing::info_span!("extract", run_id = %Uuid::new_v4());
    extract_with_repair(gateway, model, image_ref)
        .instrument(span)
        .await
}

async fn extract_with_repair(
    gateway: &dyn ChatGateway,
    model: &str,
    image_ref: &str,
) -> Result<ExtractedItems, PipelineError> {
    tracing::info!(model, image = %describe_image_ref(image_ref), "requesting furnishing list");

    let request = ChatRequest::user(
        model,
        vec![
            ContentPart::text(EXTRACT_ITEMS_PROMPT),
            ContentPart::image_url(image_ref),
        ],
    );
    let raw_text = gateway.complete(&request).await?.text();

    let first_issues = match parse_furnishing_items(&raw_text) {
        Ok(items) => {
            tracing::info!(count = items.len(), "furnishing list validated");
            return Ok(ExtractedItems {
                items,
                repaired: false,
            });
        }
        Err(issues) => issues,
    };

    tracing::warn!(
        issues = first_issues.len(),
        first = %first_issues
            .first()
            .map(ToString::to_string)
            .unwrap_or_default(),
        "furnishing list failed validation; asking the model to repair it"
    );

    let repair = ChatRequest::user(
        model,
        vec![ContentPart::text(repair_items_prompt(&raw_text))],
    );
    let repaired_text = gateway.complete(&repair).await?.text();

    match parse_furnishing_items(&repaired_text) {
        Ok(items) => {
            tracing::info!(count = items.len(), "furnishing list validated after repair");
            Ok(ExtractedItems {
                items,
                repaired: true,
            })
        }
        Err(issues) => {
            tracing::warn!(issues = issues.len(), "repaired furnishing list still invalid");
            Err(PipelineError::Validation(Box::new(RepairFailure {
                issues,
                raw_text,
                repaired_text,
            })))
        }
    }
}
