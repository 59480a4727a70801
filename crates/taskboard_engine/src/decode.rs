use serde::Deserialize;

use crate::{StreamError, StreamEvent};

#[derive(Debug, Deserialize)]
struct WireEvent {
    data: String,
    #[serde(default)]
    done: bool,
}

/// Decode one SSE message payload: a JSON object with `data` and optional `done`.
/// Other fields (the backend also sends `"event": "log"`) are ignored.
pub fn decode_event(raw: &str) -> Result<StreamEvent, StreamError> {
    let wire: WireEvent = serde_json::from_str(raw)
        .map_err(|err| StreamError::DecodeFailure(format!("{err}: {}", preview(raw))))?;
    Ok(StreamEvent {
        data: wire.data,
        done: wire.done,
    })
}

fn preview(raw: &str) -> String {
    const LIMIT: usize = 80;
    match raw.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &raw[..cut]),
        None => raw.to_string(),
    }
}
