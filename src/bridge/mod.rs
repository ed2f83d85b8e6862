//! Host messaging bridge
//!
//! The companion settings surface talks to the switcher with a single
//! message shape: `{"action":"updateSettings","platform":...,"showInfo":...}`.
//! Every decoded message is acknowledged with `{"success":true}` - a
//! liveness signal for the sender, not an error report.

use crate::page::Platform;
use crate::utils::Result;
use serde::{Deserialize, Serialize};

/// Inbound message from the settings surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Request {
    /// Update a platform's show-info preference
    #[serde(rename = "updateSettings")]
    UpdateSettings {
        platform: Platform,
        #[serde(rename = "showInfo")]
        show_info: bool,
    },
}

/// Acknowledgement sent back for every handled message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
}

impl Response {
    /// Positive acknowledgement
    pub fn ack() -> Response {
        Response { success: true }
    }
}

/// Decode a message payload
pub fn decode(payload: &str) -> Result<Request> {
    Ok(serde_json::from_str(payload)?)
}

/// Decode an already-parsed message value
pub fn decode_value(value: &serde_json::Value) -> Result<Request> {
    Ok(serde_json::from_value(value.clone())?)
}

/// Encode a response for the message channel
pub fn encode_response(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| r#"{"success":false}"#.to_string())
}
