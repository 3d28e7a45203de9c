use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
/// Messages accepted from viewer WebSocket clients.
///
/// Both are hints: neither mutates timer state. The authority answers a sync
/// request with a broadcast correction and records a client-side expiry as
/// telemetry only, since its own deadline arithmetic is the sole source of
/// truth for "expired".
#[serde(tag = "type")]
pub enum ViewerInboundMessage {
    /// The viewer suspects its local prediction drifted.
    #[serde(rename = "request_timer_sync")]
    RequestTimerSync,
    /// The viewer's local countdown reached zero.
    #[serde(rename = "timer_client_expired")]
    TimerClientExpired,
    /// Anything this server version does not understand.
    #[serde(other)]
    Unknown,
}

impl ViewerInboundMessage {
    /// Parse a raw text frame into a viewer message.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
