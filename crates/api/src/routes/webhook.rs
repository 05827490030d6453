//! Booking webhook intake.
//!
//! Order is fixed: signature verification over the exact raw body bytes,
//! then structural validation, and only then any external call. Everything
//! past validation is best-effort — a records-store or gateway failure must
//! not fail notifications already sent or jobs already registered.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use relay_common::error::RelayError;
use relay_common::types::{BookingEvent, ContactIdentity, NotificationJob, RecipientSet, Template};
use relay_engine::normalize::{Normalized, normalize};
use relay_engine::resolve::{ContactResolver, RecordsStore};
use relay_engine::scheduler::{Dispatch, job_id};
use relay_engine::signature;
use relay_notifier::templates;

use crate::state::AppState;

const SIGNATURE_HEADER: &str = "x-cal-signature-256";

pub fn router<D: Dispatch, R: RecordsStore>() -> Router<AppState<D, R>> {
    Router::new().route("/webhook/cal", post(cal_webhook::<D, R>))
}

async fn cal_webhook<D: Dispatch, R: RecordsStore>(
    State(state): State<AppState<D, R>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, RelayError> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    signature::verify(&body, header, state.config.webhook_secret.as_bytes())
        .map_err(|e| RelayError::Auth(e.to_string()))?;

    let event = match normalize(&body, state.config.timezone)? {
        Normalized::Ignored { kind } => {
            tracing::info!(kind, "Webhook accepted but ignored");
            return Ok(Json(json!({ "ignored": kind })));
        }
        Normalized::Booking(event) => event,
    };

    tracing::info!(
        kind = %event.kind,
        meeting_key = %event.meeting_key(),
        start_time = %event.start_time,
        "Booking webhook accepted"
    );

    // Resolution failures degrade to an admin-only dispatch.
    let resolver = ContactResolver::new(state.records.as_ref(), &state.config.country_code);
    let identity = match resolver
        .resolve(event.attendee_email.as_deref(), &event.contact_hints)
        .await
    {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(error = %err, "Contact resolution failed; proceeding without identity");
            ContactIdentity::default()
        }
    };

    let formatted = templates::format_pt_br(&event.start_time);
    if let Some(record_id) = &identity.record_id {
        if let Err(err) = state.records.update_schedule(record_id, &formatted).await {
            tracing::warn!(record_id, error = %err, "Records write-back failed");
        }
    }

    // Immediate confirmation goes through the same scheduling primitive
    // with a fire time of now.
    state.scheduler.schedule_one(confirmation_job(
        &state.config.meeting_link,
        &event,
        &identity,
        &formatted,
        state.scheduler.now(),
    ));

    let jobs = state.scheduler.schedule_set(
        &event.meeting_key(),
        event.first_name(),
        event.start_time,
        identity.phone.as_deref(),
    );

    Ok(Json(json!({
        "status": "ok",
        "scheduled": true,
        "jobs": jobs.len(),
    })))
}

fn confirmation_job(
    meeting_link: &Option<String>,
    event: &BookingEvent,
    identity: &ContactIdentity,
    formatted: &str,
    fire_at: chrono::DateTime<chrono::Utc>,
) -> NotificationJob {
    NotificationJob {
        job_id: job_id(&event.meeting_key(), Template::Confirmation),
        fire_at,
        recipient_set: RecipientSet::Both,
        template: Template::Confirmation,
        args: json!({
            "first_name": event.first_name(),
            "meeting_hm": event.start_time.format("%H:%M").to_string(),
            "meeting_full": formatted,
            "lead_phone": identity.phone,
            "meeting_link": meeting_link,
        }),
    }
}
