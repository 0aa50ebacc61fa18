use serde_json::{Map, Value};

use crate::error::{AiError, Result};

/// Slice from the first `{` to the last `}` inclusive.
///
/// Replies often wrap the object in prose or markdown fences; everything
/// outside the outermost braces is ignored.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then_some(&raw[start..=end])
}

/// Pull the JSON object out of a free-form completion reply.
pub fn parse_object_reply(raw: &str) -> Result<Map<String, Value>> {
    let payload = extract_json_object(raw).ok_or(AiError::MissingBoundary)?;
    Ok(serde_json::from_str(payload)?)
}
