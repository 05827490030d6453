use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Kinds of booking webhook events.
///
/// Only `Created`, `Rescheduled` and `Requested` drive scheduling; every
/// other kind is accepted and ignored without side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    Rescheduled,
    Requested,
    Other(String),
}

impl EventKind {
    /// Map the wire-format trigger string onto an event kind.
    pub fn from_trigger(trigger: &str) -> Self {
        match trigger {
            "BOOKING_CREATED" => EventKind::Created,
            "BOOKING_RESCHEDULED" => EventKind::Rescheduled,
            "BOOKING_REQUESTED" => EventKind::Requested,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// Whether this kind triggers scheduling and dispatch.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, EventKind::Other(_))
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Created => write!(f, "created"),
            EventKind::Rescheduled => write!(f, "rescheduled"),
            EventKind::Requested => write!(f, "requested"),
            EventKind::Other(kind) => write!(f, "other({kind})"),
        }
    }
}

/// A validated booking event, immutable after normalization.
///
/// `start_time` already carries the service's configured zone; it is the
/// single source of truth for all offset arithmetic.
#[derive(Debug, Clone, Serialize)]
pub struct BookingEvent {
    pub kind: EventKind,
    pub meeting_id: Option<String>,
    pub start_time: DateTime<Tz>,
    pub attendee_name: String,
    pub attendee_email: Option<String>,
    /// Ordered non-empty phone hints extracted from the payload.
    pub contact_hints: Vec<String>,
}

impl BookingEvent {
    /// Stable key identifying the meeting across reschedules.
    ///
    /// Prefers the booking uid; falls back to the start timestamp's numeric
    /// value when no stable id is available.
    pub fn meeting_key(&self) -> String {
        self.meeting_id
            .clone()
            .unwrap_or_else(|| self.start_time.timestamp().to_string())
    }

    /// First word of the attendee's name, used in message templates.
    pub fn first_name(&self) -> &str {
        self.attendee_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.attendee_name)
    }
}

/// Best-effort contact identity produced by the resolver.
///
/// `phone` is stored in query form (digits, country code stripped); callers
/// convert to dispatch form at send time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactIdentity {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub record_id: Option<String>,
}

impl ContactIdentity {
    /// True when no reachable identity was found. Not an error state.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none() && self.record_id.is_none()
    }
}

/// Fixed message templates, named after their offset from the meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Template {
    OneDayBefore,
    FourHoursBefore,
    OneHourAfter,
    Confirmation,
}

impl Template {
    /// Stable label used in deterministic job ids.
    pub fn label(&self) -> &'static str {
        match self {
            Template::OneDayBefore => "1day",
            Template::FourHoursBefore => "4h",
            Template::OneHourAfter => "after",
            Template::Confirmation => "confirm",
        }
    }

    /// Parse a job-id label back into a template.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "1day" => Some(Template::OneDayBefore),
            "4h" => Some(Template::FourHoursBefore),
            "after" => Some(Template::OneHourAfter),
            "confirm" => Some(Template::Confirmation),
            _ => None,
        }
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which recipients a dispatch fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientSet {
    AdminList,
    Lead,
    Both,
}

impl RecipientSet {
    pub fn includes_admins(&self) -> bool {
        matches!(self, RecipientSet::AdminList | RecipientSet::Both)
    }

    pub fn includes_lead(&self) -> bool {
        matches!(self, RecipientSet::Lead | RecipientSet::Both)
    }
}

/// A pending timed notification.
///
/// `job_id` is deterministic over (meeting key, template label) so that
/// re-registering for the same meeting replaces rather than duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJob {
    pub job_id: String,
    pub fire_at: DateTime<Utc>,
    pub recipient_set: RecipientSet,
    pub template: Template,
    /// Rendered-message inputs frozen at registration time
    /// (first name, formatted local time, lead phone, optional link).
    pub args: serde_json::Value,
}

/// Outcome of one recipient send. Transient, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub ok: bool,
    pub recipient: String,
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn sent(recipient: impl Into<String>) -> Self {
        Self {
            ok: true,
            recipient: recipient.into(),
            error: None,
        }
    }

    pub fn failed(recipient: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            recipient: recipient.into(),
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Sao_Paulo;

    fn make_event(meeting_id: Option<&str>) -> BookingEvent {
        BookingEvent {
            kind: EventKind::Created,
            meeting_id: meeting_id.map(str::to_string),
            start_time: Sao_Paulo.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap(),
            attendee_name: "Maria da Silva".to_string(),
            attendee_email: Some("maria@example.com".to_string()),
            contact_hints: vec![],
        }
    }

    #[test]
    fn test_event_kind_from_trigger() {
        assert_eq!(
            EventKind::from_trigger("BOOKING_CREATED"),
            EventKind::Created
        );
        assert_eq!(
            EventKind::from_trigger("BOOKING_RESCHEDULED"),
            EventKind::Rescheduled
        );
        assert_eq!(
            EventKind::from_trigger("BOOKING_REQUESTED"),
            EventKind::Requested
        );
        assert_eq!(
            EventKind::from_trigger("BOOKING_CANCELLED"),
            EventKind::Other("BOOKING_CANCELLED".to_string())
        );
        assert!(!EventKind::from_trigger("BOOKING_CANCELLED").is_accepted());
    }

    #[test]
    fn test_meeting_key_prefers_uid() {
        let event = make_event(Some("uid-123"));
        assert_eq!(event.meeting_key(), "uid-123");
    }

    #[test]
    fn test_meeting_key_falls_back_to_timestamp() {
        let event = make_event(None);
        assert_eq!(
            event.meeting_key(),
            event.start_time.timestamp().to_string()
        );
    }

    #[test]
    fn test_first_name() {
        let event = make_event(None);
        assert_eq!(event.first_name(), "Maria");
    }

    #[test]
    fn test_template_label_roundtrip() {
        for template in [
            Template::OneDayBefore,
            Template::FourHoursBefore,
            Template::OneHourAfter,
            Template::Confirmation,
        ] {
            assert_eq!(Template::from_label(template.label()), Some(template));
        }
        assert_eq!(Template::from_label("2weeks"), None);
    }

    #[test]
    fn test_recipient_set_fanout() {
        assert!(RecipientSet::Both.includes_admins());
        assert!(RecipientSet::Both.includes_lead());
        assert!(!RecipientSet::AdminList.includes_lead());
        assert!(!RecipientSet::Lead.includes_admins());
    }
}
