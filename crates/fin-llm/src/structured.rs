//! Structured (JSON) output on top of plain completions
//!
//! Models wrap JSON in prose or Markdown fences often enough that every
//! caller needs the same extraction step, so it lives here.

use crate::{CompletionRequest, LLMError, LLMProvider, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Run a completion and deserialize the JSON value found in the reply
pub async fn complete_json<T>(provider: &dyn LLMProvider, request: CompletionRequest) -> Result<T>
where
    T: DeserializeOwned,
{
    let response = provider.complete(request).await?;
    let text = response.text();

    let block = extract_json_block(text).ok_or_else(|| {
        warn!(reply_len = text.len(), "LLM reply contained no JSON");
        LLMError::UnexpectedResponse("reply contained no JSON value".to_string())
    })?;

    debug!(json_len = block.len(), "Parsing structured LLM reply");
    serde_json::from_str(block)
        .map_err(|e| LLMError::UnexpectedResponse(format!("reply did not match schema: {e}")))
}

/// Locate the first complete JSON object or array in `text`
///
/// A ```` ```json ```` fence wins when present; otherwise the first balanced
/// `{...}` or `[...]` is returned. Brackets inside string literals are
/// ignored.
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(fenced) = fenced_block(text) {
        if let Some(inner) = balanced_from(fenced, 0) {
            return Some(inner);
        }
    }

    let start = text.find(['{', '['])?;
    balanced_from(text, start)
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_ticks = &text[open + 3..];
    // Skip the info string ("json", "JSON", ...)
    let body_start = after_ticks.find('\n')? + 1;
    let body = &after_ticks[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

fn balanced_from(text: &str, from: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = from + text[from..].find(['{', '['])?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}
