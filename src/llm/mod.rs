pub mod client;
pub mod parse;
pub mod prompts;
pub mod reply;

pub use client::{
    ChatGateway, ChatMessage, ChatRequest, ContentPart, HttpChatGateway, ImageConfig,
    UpstreamError,
};
pub use parse::{extract_json_candidate, parse_furnishing_items, strip_code_fences};
pub use reply::{ReplyContent, ReplyEnvelope, ReplyPart};
