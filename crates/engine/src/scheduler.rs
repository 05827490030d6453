//! Deferred notification scheduler.
//!
//! Owns an in-memory table of pending timed jobs keyed by deterministic job
//! id. Registering a job with an id that is already pending replaces the
//! prior entry (cancel-and-reinsert), so for a given meeting key and offset
//! label at most one job is pending at any time. Each job fires on its own
//! tokio task; a slow outbound call inside one dispatch never delays another
//! job's fire time.
//!
//! Pending jobs are not persisted: a process restart drops them all.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde_json::json;

use relay_common::types::{DispatchResult, NotificationJob, RecipientSet, Template};

use crate::clock::Clock;

/// Sink a fired job is handed to. Implementations render the message and
/// fan out to the recipient set; per-recipient failures are reported in the
/// results, never retried here.
pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(
        &self,
        job: NotificationJob,
    ) -> impl std::future::Future<Output = Vec<DispatchResult>> + Send;
}

/// Fixed offset table relative to the meeting start, in minutes.
const OFFSETS: &[(Template, i64)] = &[
    (Template::OneDayBefore, -24 * 60),
    (Template::FourHoursBefore, -4 * 60),
    (Template::OneHourAfter, 60),
];

/// Offset of a template from the meeting start. `None` for templates that
/// are dispatched immediately rather than at a fixed offset.
pub fn offset_minutes(template: Template) -> Option<i64> {
    OFFSETS
        .iter()
        .find(|(t, _)| *t == template)
        .map(|(_, m)| *m)
}

/// Deterministic job id for a meeting key and offset label. Re-registering
/// the same pair always yields the same id, which is what makes replacement
/// idempotent.
pub fn job_id(meeting_key: &str, template: Template) -> String {
    format!("wa:{meeting_key}:{}", template.label())
}

struct Pending {
    job: NotificationJob,
    /// Distinguishes this registration from a later one with the same id,
    /// closing the race between an old timer waking up and its replacement.
    generation: u64,
    task: tokio::task::JoinHandle<()>,
}

type PendingMap = Arc<Mutex<HashMap<String, Pending>>>;

/// In-memory deferred-notification scheduler.
///
/// An explicit service instance injected into callers; there is no ambient
/// global registry.
pub struct Scheduler<D: Dispatch> {
    dispatch: Arc<D>,
    clock: Arc<dyn Clock>,
    pending: PendingMap,
    generation: AtomicU64,
}

impl<D: Dispatch> Scheduler<D> {
    pub fn new(dispatch: Arc<D>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dispatch,
            clock,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Current time as seen by the scheduler's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Register the full reminder set for a meeting: one job per entry in
    /// the fixed offset table, all addressed to both the admin list and the
    /// lead.
    ///
    /// The three ids are deterministic over `meeting_key`, so re-invoking
    /// for the same key replaces the three prior entries. Replacement
    /// happens under a single lock acquisition — two concurrent calls for
    /// the same key cannot leave duplicates behind.
    ///
    /// The lead phone (query form) is frozen into the job args here; a
    /// reschedule re-registers and therefore re-freezes it.
    pub fn schedule_set(
        &self,
        meeting_key: &str,
        first_name: &str,
        meeting_time: DateTime<Tz>,
        lead_phone: Option<&str>,
    ) -> Vec<NotificationJob> {
        let fire_base = meeting_time.with_timezone(&Utc);
        let args = json!({
            "first_name": first_name,
            "meeting_hm": meeting_time.format("%H:%M").to_string(),
            "lead_phone": lead_phone,
        });

        let jobs: Vec<NotificationJob> = OFFSETS
            .iter()
            .map(|(template, minutes)| NotificationJob {
                job_id: job_id(meeting_key, *template),
                fire_at: fire_base + Duration::minutes(*minutes),
                recipient_set: RecipientSet::Both,
                template: *template,
                args: args.clone(),
            })
            .collect();

        {
            let mut pending = self.pending.lock().expect("scheduler lock poisoned");
            for job in &jobs {
                self.insert_locked(&mut pending, job.clone());
            }
        }

        tracing::info!(
            meeting_key,
            meeting_time = %meeting_time,
            jobs = jobs.len(),
            "Reminder set registered"
        );

        jobs
    }

    /// Register a single job, replacing any pending job with the same id.
    ///
    /// A `fire_at` in the past is allowed and fires immediately. This is the
    /// one primitive; ad-hoc and test entry points go through it too.
    pub fn schedule_one(&self, job: NotificationJob) {
        let mut pending = self.pending.lock().expect("scheduler lock poisoned");
        self.insert_locked(&mut pending, job);
    }

    /// Snapshot of pending jobs, ordered by fire time.
    pub fn pending_jobs(&self) -> Vec<NotificationJob> {
        let pending = self.pending.lock().expect("scheduler lock poisoned");
        let mut jobs: Vec<NotificationJob> = pending.values().map(|p| p.job.clone()).collect();
        jobs.sort_by_key(|j| j.fire_at);
        jobs
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("scheduler lock poisoned").len()
    }

    fn insert_locked(&self, pending: &mut HashMap<String, Pending>, job: NotificationJob) {
        if let Some(prev) = pending.remove(&job.job_id) {
            prev.task.abort();
            tracing::debug!(job_id = %job.job_id, "Replacing pending job");
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let wait = (job.fire_at - self.clock.now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        let task = tokio::spawn(run_job(
            job.clone(),
            generation,
            wait,
            Arc::clone(&self.dispatch),
            Arc::clone(&self.pending),
        ));

        tracing::debug!(
            job_id = %job.job_id,
            fire_at = %job.fire_at,
            wait_secs = wait.as_secs(),
            "Job registered"
        );

        pending.insert(
            job.job_id.clone(),
            Pending {
                job,
                generation,
                task,
            },
        );
    }
}

/// Timer body for one pending job. Sleeps until the fire time, then claims
/// its map entry and dispatches. If the entry was replaced while sleeping,
/// the claim fails and the job does not fire.
async fn run_job<D: Dispatch>(
    job: NotificationJob,
    generation: u64,
    wait: std::time::Duration,
    dispatch: Arc<D>,
    pending: PendingMap,
) {
    tokio::time::sleep(wait).await;

    {
        let mut pending = pending.lock().expect("scheduler lock poisoned");
        let claimed = pending
            .get(&job.job_id)
            .is_some_and(|entry| entry.generation == generation);
        if !claimed {
            // Replaced (or already claimed) while we slept.
            return;
        }
        pending.remove(&job.job_id);
    }

    tracing::info!(job_id = %job.job_id, template = %job.template, "Job firing");
    let results = dispatch.dispatch(job.clone()).await;
    for result in &results {
        if !result.ok {
            tracing::warn!(
                job_id = %job.job_id,
                recipient = %result.recipient,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Dispatch failed for recipient"
            );
        }
    }
}
