//! Retry queue for the writes that follow an application insert.
//!
//! The candidate record and the applicant-count increment are not in a
//! transaction with the application row. When either fails the submission
//! still succeeds, and the failed write is queued here and replayed by the
//! background worker.
//!
//! Replays are at-least-once: an entry is moved to an in-flight list while it
//! runs and only removed once it has been applied, dropped, or requeued.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Direction};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::applications::candidates::CandidateStore;
use crate::applications::repository::ApplicationStore;
use crate::errors::AppError;
use crate::jobs::store::JobStore;

const OUTBOX_KEY: &str = "talentio:outbox";
const IN_FLIGHT_KEY: &str = "talentio:outbox:in_flight";

/// Entries are dropped after this many failed replays.
pub const MAX_ATTEMPTS: u32 = 5;

/// Entries a worker tick looks at, at most.
pub const DRAIN_BUDGET: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DependentWrite {
    CreateCandidate {
        application_id: Uuid,
        company_id: Uuid,
    },
    IncrementApplied {
        job_id: Uuid,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub write: DependentWrite,
    pub attempts: u32,
}

impl OutboxEntry {
    pub fn new(write: DependentWrite) -> Self {
        Self { write, attempts: 0 }
    }

    fn retried(&self) -> Self {
        Self {
            write: self.write.clone(),
            attempts: self.attempts + 1,
        }
    }
}

#[async_trait]
pub trait Outbox: Send + Sync {
    async fn push(&self, entry: OutboxEntry) -> Result<(), AppError>;

    /// Number of queued entries, not counting claimed ones.
    async fn pending(&self) -> Result<usize, AppError>;

    /// Moves the oldest queued entry to the in-flight list and returns it.
    async fn claim(&self) -> Result<Option<OutboxEntry>, AppError>;

    /// Removes a claimed entry from the in-flight list.
    async fn ack(&self, entry: &OutboxEntry) -> Result<(), AppError>;

    /// Puts entries a previous worker left in flight back at the head of the
    /// queue. Returns how many were moved.
    async fn recover(&self) -> Result<usize, AppError>;
}

/// Outbox backed by two Redis lists. `LMOVE` claims an entry into the
/// in-flight list and `LREM` acknowledges it.
#[derive(Clone)]
pub struct RedisOutbox {
    client: redis::Client,
}

impl RedisOutbox {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

// Entries serialize deterministically, so re-encoding a claimed entry yields
// the payload stored in the in-flight list.
fn encode(entry: &OutboxEntry) -> Result<String, AppError> {
    serde_json::to_string(entry).map_err(|e| AppError::Outbox(format!("encode outbox entry: {e}")))
}

fn decode(raw: &str) -> Result<OutboxEntry, AppError> {
    serde_json::from_str(raw).map_err(|e| AppError::Outbox(format!("decode outbox entry: {e}")))
}

#[async_trait]
impl Outbox for RedisOutbox {
    async fn push(&self, entry: OutboxEntry) -> Result<(), AppError> {
        let payload = encode(&entry)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.rpush::<_, _, ()>(OUTBOX_KEY, payload).await?;
        Ok(())
    }

    async fn pending(&self) -> Result<usize, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.llen(OUTBOX_KEY).await?)
    }

    async fn claim(&self) -> Result<Option<OutboxEntry>, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn
            .lmove(OUTBOX_KEY, IN_FLIGHT_KEY, Direction::Left, Direction::Right)
            .await?;
        payload.as_deref().map(decode).transpose()
    }

    async fn ack(&self, entry: &OutboxEntry) -> Result<(), AppError> {
        let payload = encode(entry)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.lrem::<_, _, ()>(IN_FLIGHT_KEY, 1, payload).await?;
        Ok(())
    }

    async fn recover(&self) -> Result<usize, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut moved = 0;
        loop {
            let payload: Option<String> = conn
                .lmove(IN_FLIGHT_KEY, OUTBOX_KEY, Direction::Right, Direction::Left)
                .await?;
            if payload.is_none() {
                break;
            }
            moved += 1;
        }
        Ok(moved)
    }
}

/// Queues a failed dependent write. A failure to queue is logged, not
/// returned: the submission has already succeeded.
pub async fn defer(outbox: &dyn Outbox, write: DependentWrite) -> bool {
    warn!("Deferring dependent write: {write:?}");
    match outbox.push(OutboxEntry::new(write)).await {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to enqueue dependent write: {e}");
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    Applied,
    /// The write no longer has a target.
    Skipped,
}

/// Runs one dependent write against the stores.
///
/// A candidate record is only created while its application still exists.
pub async fn apply(
    write: &DependentWrite,
    applications: &dyn ApplicationStore,
    candidates: &dyn CandidateStore,
    jobs: &dyn JobStore,
) -> Result<Replay, AppError> {
    match write {
        DependentWrite::CreateCandidate {
            application_id,
            company_id,
        } => {
            if applications.find_by_id(*application_id).await?.is_none() {
                warn!("Application {application_id} was deleted; skipping its candidate record");
                return Ok(Replay::Skipped);
            }
            candidates.create(*application_id, *company_id).await?;
        }
        DependentWrite::IncrementApplied { job_id } => {
            jobs.increment_applied(*job_id).await?;
        }
    }
    Ok(Replay::Applied)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub applied: usize,
    pub skipped: usize,
    pub requeued: usize,
    pub dropped: usize,
}

async fn settle(outbox: &dyn Outbox, entry: &OutboxEntry) {
    if let Err(e) = outbox.ack(entry).await {
        error!("Failed to acknowledge {:?}; it will be replayed again: {e}", entry.write);
    }
}

/// Replays the entries that were queued when the drain started, at most
/// `budget` of them. Failures are requeued after the pass with one more
/// attempt, so each entry is tried at most once per drain. An entry is
/// dropped once it reaches [`MAX_ATTEMPTS`].
pub async fn drain_once(
    outbox: &dyn Outbox,
    applications: &dyn ApplicationStore,
    candidates: &dyn CandidateStore,
    jobs: &dyn JobStore,
    budget: usize,
) -> Result<DrainReport, AppError> {
    let mut report = DrainReport::default();
    let mut failed = Vec::new();

    for _ in 0..outbox.pending().await?.min(budget) {
        let entry = match outbox.claim().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                error!("Outbox claim failed: {e}");
                break;
            }
        };

        match apply(&entry.write, applications, candidates, jobs).await {
            Ok(Replay::Applied) => {
                info!("Replayed dependent write {:?}", entry.write);
                report.applied += 1;
                settle(outbox, &entry).await;
            }
            Ok(Replay::Skipped) => {
                report.skipped += 1;
                settle(outbox, &entry).await;
            }
            Err(e) if entry.attempts + 1 >= MAX_ATTEMPTS => {
                error!(
                    "Dropping dependent write {:?} after {} attempts: {e}",
                    entry.write,
                    entry.attempts + 1
                );
                report.dropped += 1;
                settle(outbox, &entry).await;
            }
            Err(e) => {
                warn!(
                    "Replay of {:?} failed (attempt {}): {e}",
                    entry.write,
                    entry.attempts + 1
                );
                failed.push(entry);
            }
        }
    }

    for entry in failed {
        match outbox.push(entry.retried()).await {
            Ok(()) => {
                report.requeued += 1;
                settle(outbox, &entry).await;
            }
            // Still in flight; `recover` puts it back on the queue.
            Err(e) => error!("Failed to requeue {:?}: {e}", entry.write),
        }
    }

    Ok(report)
}

/// Recovers entries left in flight, then polls the outbox forever on the
/// runtime.
pub fn spawn_worker(
    outbox: Arc<dyn Outbox>,
    applications: Arc<dyn ApplicationStore>,
    candidates: Arc<dyn CandidateStore>,
    jobs: Arc<dyn JobStore>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match outbox.recover().await {
            Ok(0) => {}
            Ok(moved) => info!("Outbox recovered {moved} in-flight entries"),
            Err(e) => error!("Outbox recovery failed: {e}"),
        }

        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let drained = drain_once(
                outbox.as_ref(),
                applications.as_ref(),
                candidates.as_ref(),
                jobs.as_ref(),
                DRAIN_BUDGET,
            )
            .await;
            match drained {
                Ok(report) if report != DrainReport::default() => {
                    info!(
                        "Outbox drain: {} applied, {} skipped, {} requeued, {} dropped",
                        report.applied, report.skipped, report.requeued, report.dropped
                    );
                }
                Ok(_) => {}
                Err(e) => error!("Outbox drain failed: {e}"),
            }
        }
    })
}
