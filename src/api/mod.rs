//! HTTP clients for the clinic backend
//!
//! Two surfaces: the speech conversation endpoints used by the voice
//! session, and the time-slot administration endpoints used by the
//! admin CLI. Both speak to the same FastAPI service.

pub mod speech;
pub mod timeslots;

pub use speech::{SpeechBackend, SpeechClient};
pub use timeslots::{NewTimeSlot, TimeSlot, TimeSlotClient};

use crate::Error;

/// Convert a non-success backend response into a `Remote` error,
/// surfacing the server's `detail` field when the body carries one
pub(crate) async fn remote_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::Remote {
        status,
        detail: extract_detail(&body),
    }
}

/// Pull a `{ "detail": … }` message out of an error body, falling back
/// to the raw body text
pub(crate) fn extract_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail")?.as_str().map(ToString::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_field_is_extracted() {
        assert_eq!(
            extract_detail(r#"{"detail":"Cannot delete a booked time slot"}"#),
            "Cannot delete a booked time slot"
        );
    }

    #[test]
    fn non_json_body_passes_through() {
        assert_eq!(extract_detail("Internal Server Error"), "Internal Server Error");
    }

    #[test]
    fn json_without_detail_passes_through() {
        assert_eq!(extract_detail(r#"{"error":"nope"}"#), r#"{"error":"nope"}"#);
    }
}
