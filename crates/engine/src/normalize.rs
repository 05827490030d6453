//! Webhook payload validation and normalization.
//!
//! Maps the raw booking webhook into a canonical [`BookingEvent`]. Malformed
//! payloads fail with [`ValidationError`]; well-formed payloads whose event
//! kind is outside the accepted set normalize to [`Normalized::Ignored`],
//! which is a success — the caller performs no scheduling or dispatch for it.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;

use relay_common::error::RelayError;
use relay_common::types::{BookingEvent, EventKind};

/// Payload-level validation failures, distinct from unrecognized event kinds.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("booking has no attendees")]
    NoAttendees,

    #[error("unparseable start time: {0:?}")]
    BadStartTime(String),
}

impl From<ValidationError> for RelayError {
    fn from(err: ValidationError) -> Self {
        RelayError::Validation(err.to_string())
    }
}

/// Outcome of normalization.
#[derive(Debug, Clone)]
pub enum Normalized {
    /// An accepted booking event, ready for resolution and scheduling.
    Booking(BookingEvent),
    /// Well-formed webhook of a kind the relay does not act on.
    Ignored { kind: String },
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "triggerEvent")]
    trigger_event: String,
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawBooking {
    #[serde(rename = "startTime")]
    start_time: String,
    uid: Option<String>,
    #[serde(default)]
    attendees: Vec<RawAttendee>,
    #[serde(rename = "userFieldsResponses")]
    user_fields_responses: Option<serde_json::Value>,
    responses: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawAttendee {
    name: String,
    email: Option<String>,
    #[serde(rename = "phoneNumber", alias = "phone")]
    phone_number: Option<String>,
}

/// Validate a raw webhook body and normalize it into a [`BookingEvent`].
///
/// The incoming start time (UTC-qualified ISO 8601) is converted into `tz`
/// exactly once; the converted value is the single source of truth for all
/// later offset arithmetic.
pub fn normalize(raw: &[u8], tz: Tz) -> Result<Normalized, ValidationError> {
    let envelope: WebhookEnvelope =
        serde_json::from_slice(raw).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let kind = EventKind::from_trigger(&envelope.trigger_event);
    if !kind.is_accepted() {
        return Ok(Normalized::Ignored {
            kind: envelope.trigger_event,
        });
    }

    let booking: RawBooking = serde_json::from_value(envelope.payload)
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let attendee = booking.attendees.first().ok_or(ValidationError::NoAttendees)?;

    let start_time = DateTime::parse_from_rfc3339(&booking.start_time)
        .map_err(|_| ValidationError::BadStartTime(booking.start_time.clone()))?
        .with_timezone(&tz);

    let contact_hints = extract_hints(&booking);

    Ok(Normalized::Booking(BookingEvent {
        kind,
        meeting_id: booking.uid.clone(),
        start_time,
        attendee_name: attendee.name.clone(),
        attendee_email: attendee
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string),
        contact_hints,
    }))
}

/// One source in the ordered contact-hint fallback chain.
type HintExtractor = fn(&RawBooking) -> Option<String>;

/// Payload locations consulted in order; the chain stops at the first
/// non-empty value. The records-store lookup is a later stage owned by the
/// contact resolver, not part of this chain.
const HINT_SOURCES: &[(&str, HintExtractor)] = &[
    ("attendee_phone", attendee_phone),
    ("booking_fields", booking_field_phone),
    ("responses", response_phone),
];

fn extract_hints(booking: &RawBooking) -> Vec<String> {
    for (source, extract) in HINT_SOURCES {
        if let Some(hint) = extract(booking) {
            tracing::debug!(source, "contact hint found");
            return vec![hint];
        }
    }
    Vec::new()
}

fn attendee_phone(booking: &RawBooking) -> Option<String> {
    booking
        .attendees
        .first()
        .and_then(|a| a.phone_number.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

fn booking_field_phone(booking: &RawBooking) -> Option<String> {
    booking
        .user_fields_responses
        .as_ref()
        .and_then(phone_from_block)
}

fn response_phone(booking: &RawBooking) -> Option<String> {
    booking.responses.as_ref().and_then(phone_from_block)
}

/// Pull a phone value out of a responses-style block. The field may be a
/// plain string or an object with a `value` key.
fn phone_from_block(block: &serde_json::Value) -> Option<String> {
    for key in ["phone", "telefone", "whatsapp"] {
        let Some(field) = block.get(key) else {
            continue;
        };
        let value = match field {
            serde_json::Value::String(s) => Some(s.as_str()),
            other => other.get("value").and_then(|v| v.as_str()),
        };
        if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
            return Some(v.to_string());
        }
    }
    None
}
