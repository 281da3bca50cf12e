//! Request pipelines: room regeneration and furnishing list extraction.

pub mod extract;
pub mod regenerate;

use crate::furnish::ValidationIssue;
use crate::llm::UpstreamError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use extract::{extract_items, ExtractedItems};
pub use regenerate::{regenerate_room, ImageUpload};

/// Diagnostics for a list that still failed validation after the repair attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairFailure {
    pub issues: Vec<ValidationIssue>,
    pub raw_text: String,
    pub repaired_text: String,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("no image found in the model reply")]
    NoImage { envelope: Value },
    #[error("model output did not match the furnishing list format ({} issues)", .0.issues.len())]
    Validation(Box<RepairFailure>),
}
