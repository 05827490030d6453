//! Ad-hoc notification endpoints.
//!
//! Reference harness for the scheduling primitive: accepts an explicit
//! meeting time and identity, and either schedules one named offset message
//! or fires it immediately. Same primitive as the webhook path, same
//! idempotency rule.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use relay_common::error::RelayError;
use relay_common::types::{NotificationJob, RecipientSet, Template};
use relay_engine::phone;
use relay_engine::resolve::RecordsStore;
use relay_engine::scheduler::{Dispatch, job_id, offset_minutes};
use relay_notifier::templates;

use crate::state::AppState;

pub fn router<D: Dispatch, R: RecordsStore>() -> Router<AppState<D, R>> {
    Router::new().route(
        "/test/notifications",
        post(schedule_test_notification::<D, R>),
    )
}

#[derive(Debug, Deserialize)]
pub struct TestNotificationParams {
    pub first_name: String,
    /// RFC 3339 meeting time, any zone.
    pub meeting_time: DateTime<Utc>,
    /// Template label: `1day`, `4h`, `after` or `confirm`.
    pub template: String,
    pub phone: Option<String>,
    pub meeting_key: Option<String>,
    /// Skip the offset and fire immediately.
    #[serde(default)]
    pub fire_now: bool,
}

/// POST /test/notifications — schedule or immediately fire one message.
async fn schedule_test_notification<D: Dispatch, R: RecordsStore>(
    State(state): State<AppState<D, R>>,
    Json(params): Json<TestNotificationParams>,
) -> Result<Json<serde_json::Value>, RelayError> {
    let template = Template::from_label(&params.template).ok_or_else(|| {
        RelayError::Validation(format!("unknown template label {:?}", params.template))
    })?;

    let local = params.meeting_time.with_timezone(&state.config.timezone);
    let now = state.scheduler.now();
    let fire_at = if params.fire_now {
        now
    } else {
        match offset_minutes(template) {
            Some(minutes) => params.meeting_time + Duration::minutes(minutes),
            None => now,
        }
    };

    let meeting_key = params
        .meeting_key
        .unwrap_or_else(|| params.meeting_time.timestamp().to_string());
    let lead_phone = params
        .phone
        .as_deref()
        .map(|p| phone::to_query_form(p, &state.config.country_code));

    let job = NotificationJob {
        job_id: job_id(&meeting_key, template),
        fire_at,
        recipient_set: if lead_phone.is_some() {
            RecipientSet::Both
        } else {
            RecipientSet::AdminList
        },
        template,
        args: json!({
            "first_name": params.first_name,
            "meeting_hm": local.format("%H:%M").to_string(),
            "meeting_full": templates::format_pt_br(&local),
            "lead_phone": lead_phone,
            "meeting_link": state.config.meeting_link,
        }),
    };

    let response = json!({
        "job_id": job.job_id,
        "fire_at": job.fire_at,
        "fires_immediately": job.fire_at <= now,
    });
    state.scheduler.schedule_one(job);

    Ok(Json(response))
}
