use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::events::StreamEvent;
use crate::payload::Request;

const BEARER_TOKEN_FIELD: &str = "bearerToken";
const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Decoder for inbound JSON text frames.
///
/// WebSocket frames arrive whole, so decoding is per frame. Frames that are not
/// JSON objects, lack a `type`, or carry an unrecognized `type` are skipped and
/// counted rather than treated as failures.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    ignored: usize,
}

impl FrameDecoder {
    /// Decode one text frame.
    pub fn decode(&mut self, text: &str) -> Option<StreamEvent> {
        let event = serde_json::from_str::<Value>(text)
            .ok()
            .and_then(map_event);

        if event.is_none() {
            self.ignored += 1;
            debug!(frame = %truncate_for_log(text), "ignoring unrecognized stream frame");
        }

        event
    }

    /// Decode a batch of frames in order, dropping the ones that do not map.
    pub fn decode_frames<'a>(frames: impl IntoIterator<Item = &'a str>) -> Vec<StreamEvent> {
        let mut decoder = Self::default();
        frames
            .into_iter()
            .filter_map(|frame| decoder.decode(frame))
            .collect()
    }

    /// Number of frames skipped so far.
    pub fn ignored_frames(&self) -> usize {
        self.ignored
    }
}

/// Encode one request as a single JSON text frame.
///
/// A non-empty `bearer_token` is added as the `bearerToken` field.
pub fn encode_request(request: &Request, bearer_token: Option<&str>) -> Result<String, ApiError> {
    let mut value = serde_json::to_value(request)?;

    if let Some(token) = bearer_token.map(str::trim).filter(|token| !token.is_empty()) {
        if let Value::Object(map) = &mut value {
            map.insert(
                BEARER_TOKEN_FIELD.to_owned(),
                Value::String(token.to_owned()),
            );
        }
    }

    Ok(serde_json::to_string(&value)?)
}

fn map_event(value: Value) -> Option<StreamEvent> {
    let event_type = value.get("type")?.as_str()?;

    match event_type {
        // `message` is the legacy echo handler's spelling of a chunk.
        "chunk" | "message" => {
            let data = string_field(&value, "data").unwrap_or_default();
            Some(StreamEvent::Chunk { data })
        }
        "complete" => {
            let id = string_field(&value, "id").filter(|id| !id.trim().is_empty());
            Some(StreamEvent::Complete { id })
        }
        "error" => {
            let message = string_field(&value, "message")
                .or_else(|| string_field(&value, "data"))
                .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_owned());
            Some(StreamEvent::Error { message })
        }
        // The upload worker reports progress as `progress_update`.
        "update" | "progress_update" => {
            let completed = count_field(&value, "completed");
            let total = count_field(&value, "total");
            Some(StreamEvent::Update { completed, total })
        }
        "free_tier_limit" => Some(StreamEvent::FreeTierLimit),
        _ => None,
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|value| value.as_str())
        .map(ToString::to_string)
}

fn count_field(value: &Value, key: &str) -> u64 {
    value
        .get(key)
        .and_then(|value| {
            value
                .as_u64()
                .or_else(|| value.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
        })
        .unwrap_or(0)
}

fn truncate_for_log(text: &str) -> String {
    const MAX_CHARS: usize = 120;
    if text.chars().count() <= MAX_CHARS {
        return text.to_owned();
    }

    let mut truncated: String = text.chars().take(MAX_CHARS).collect();
    truncated.push('…');
    truncated
}
