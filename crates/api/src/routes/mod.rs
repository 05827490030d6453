pub mod harness;
pub mod health;
pub mod webhook;

use axum::Router;

use relay_engine::resolve::RecordsStore;
use relay_engine::scheduler::Dispatch;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router<D: Dispatch, R: RecordsStore>(state: AppState<D, R>) -> Router {
    Router::new()
        .merge(health::router::<D, R>())
        .merge(webhook::router::<D, R>())
        .merge(harness::router::<D, R>())
        .with_state(state)
}
