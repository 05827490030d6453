//! Health check endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use relay_engine::resolve::RecordsStore;
use relay_engine::scheduler::Dispatch;

use crate::state::AppState;

pub fn router<D: Dispatch, R: RecordsStore>() -> Router<AppState<D, R>> {
    Router::new().route("/health", get(health_check::<D, R>))
}

async fn health_check<D: Dispatch, R: RecordsStore>(
    State(state): State<AppState<D, R>>,
) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "booking-relay-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timezone": state.config.timezone.to_string(),
        "admin_phones_configured": state.config.admin_phones.len(),
        "pending_jobs": state.scheduler.pending_count(),
    }))
}
