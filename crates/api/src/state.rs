//! Shared application state for the Axum API server.
//!
//! Generic over the dispatch sink and records store so that route tests can
//! swap in recording fakes; production wiring lives in
//! [`AppState::from_config`].

use std::sync::Arc;

use relay_common::config::AppConfig;
use relay_engine::clock::SystemClock;
use relay_engine::resolve::RecordsStore;
use relay_engine::scheduler::{Dispatch, Scheduler};
use relay_notifier::dispatch::Dispatcher;
use relay_notifier::gateway::ZapiGateway;
use relay_notifier::records::NotionRecords;

/// Application state shared across all route handlers via Axum `State`.
pub struct AppState<D: Dispatch, R: RecordsStore> {
    pub config: AppConfig,
    pub scheduler: Arc<Scheduler<D>>,
    pub records: Arc<R>,
}

impl<D: Dispatch, R: RecordsStore> AppState<D, R> {
    pub fn new(config: AppConfig, scheduler: Arc<Scheduler<D>>, records: Arc<R>) -> Self {
        Self {
            config,
            scheduler,
            records,
        }
    }
}

// Derived Clone would require D: Clone and R: Clone; both live behind Arcs.
impl<D: Dispatch, R: RecordsStore> Clone for AppState<D, R> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            scheduler: Arc::clone(&self.scheduler),
            records: Arc::clone(&self.records),
        }
    }
}

/// Production state: Z-API gateway behind the dispatcher, Notion records.
pub type ProdState = AppState<Dispatcher<ZapiGateway>, NotionRecords>;

impl ProdState {
    pub fn from_config(config: AppConfig) -> Self {
        let http = reqwest::Client::new();

        let gateway = ZapiGateway::new(http.clone(), &config.zapi_instance, &config.zapi_token);
        let dispatcher = Dispatcher::new(
            gateway,
            config.admin_phones.clone(),
            &config.country_code,
        );
        let scheduler = Scheduler::new(Arc::new(dispatcher), Arc::new(SystemClock));
        let records = NotionRecords::new(http, &config.notion_token, &config.notion_db);

        Self::new(config, Arc::new(scheduler), Arc::new(records))
    }
}
