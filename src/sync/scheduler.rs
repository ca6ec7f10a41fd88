use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::db::Storage;
use crate::error::{AppError, Result};
use crate::feed::SourceAdapter;

use super::ingest::run_ingest_cycle;
use super::LastRunRegistry;

/// Name the cleanup job records its runs under.
pub const CLEANUP_JOB: &str = "cleanup";

/// One unit of periodic background work.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    /// Runs one full cycle. `cutoff` is the oldest publish date still retained.
    async fn run_cycle(&self, cutoff: DateTime<Utc>) -> Result<()>;
}

/// Fetch-and-ingest over every channel of one source kind.
pub struct IngestJob {
    store: Arc<dyn Storage>,
    adapter: Arc<dyn SourceAdapter>,
}

impl IngestJob {
    pub fn new(store: Arc<dyn Storage>, adapter: Arc<dyn SourceAdapter>) -> Self {
        Self { store, adapter }
    }
}

#[async_trait]
impl Job for IngestJob {
    fn name(&self) -> &str {
        self.adapter.kind().as_str()
    }

    async fn run_cycle(&self, cutoff: DateTime<Utc>) -> Result<()> {
        run_ingest_cycle(self.store.as_ref(), self.adapter.as_ref(), cutoff).await?;
        Ok(())
    }
}

/// Drops content a day past retention and channels nobody follows.
pub struct CleanupJob {
    store: Arc<dyn Storage>,
}

impl CleanupJob {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Job for CleanupJob {
    fn name(&self) -> &str {
        CLEANUP_JOB
    }

    async fn run_cycle(&self, cutoff: DateTime<Utc>) -> Result<()> {
        let cutoff = cutoff - chrono::Duration::days(1);
        tracing::info!("Removing content older than {}", cutoff);

        match self.store.cleanup_old_content(cutoff).await {
            Ok(removed) => tracing::info!(removed, "Cleaned up old content"),
            Err(e) => tracing::warn!("Content cleanup failed: {}", e),
        }
        match self.store.cleanup_orphaned_channels().await {
            Ok(removed) => tracing::info!(removed, "Cleaned up orphaned channels"),
            Err(e) => tracing::warn!("Channel cleanup failed: {}", e),
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub refresh_interval: Duration,
    pub retention_days: i64,
    /// Sleep between checks while no cycle is due.
    pub idle_poll: Duration,
    pub probe_timeout: Duration,
    /// Wait before probing again after storage was unreachable.
    pub storage_backoff: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(60 * 60),
            retention_days: 7,
            idle_poll: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(10),
            storage_backoff: Duration::from_secs(60),
        }
    }
}

/// Drives jobs in independent polling loops.
///
/// The first cycle of a loop fires immediately, later ones once
/// `refresh_interval` has passed since the previous cycle finished. Cancellation
/// is checked between cycles only; a running cycle always completes and is
/// recorded.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn Storage>,
    registry: LastRunRegistry,
    settings: SchedulerSettings,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn Storage>,
        registry: LastRunRegistry,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            store,
            registry,
            settings,
        }
    }

    pub fn registry(&self) -> &LastRunRegistry {
        &self.registry
    }

    pub fn spawn(&self, job: Arc<dyn Job>, token: CancellationToken) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run(job, token).await })
    }

    pub async fn run(&self, job: Arc<dyn Job>, token: CancellationToken) {
        let mut last_cycle: Option<Instant> = None;

        loop {
            if token.is_cancelled() {
                break;
            }

            let due = last_cycle
                .map_or(true, |at| at.elapsed() >= self.settings.refresh_interval);
            if !due {
                if pause(self.settings.idle_poll, &token).await {
                    break;
                }
                continue;
            }

            if let Err(e) = self.probe_storage().await {
                tracing::warn!(
                    job = job.name(),
                    "{}, retrying in {:?}",
                    e,
                    self.settings.storage_backoff
                );
                if pause(self.settings.storage_backoff, &token).await {
                    break;
                }
                continue;
            }

            self.run_once(job.as_ref()).await;
            last_cycle = Some(Instant::now());
        }

        tracing::info!(job = job.name(), "Terminating background job");
    }

    /// Runs a single cycle and records it, without probing storage first.
    pub async fn run_once(&self, job: &dyn Job) {
        let started = Instant::now();
        let cutoff = Utc::now() - chrono::Duration::days(self.settings.retention_days);
        tracing::info!(job = job.name(), "Updating, cutoff {}", cutoff);

        if let Err(e) = job.run_cycle(cutoff).await {
            tracing::warn!(job = job.name(), "Cycle failed: {}", e);
        }

        self.registry.record(job.name(), Utc::now()).await;
        tracing::info!(
            job = job.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Finished updating"
        );
    }

    async fn probe_storage(&self) -> Result<()> {
        match tokio::time::timeout(self.settings.probe_timeout, self.store.ping()).await {
            Ok(result) => result,
            Err(_) => Err(AppError::StorageUnavailable(format!(
                "no answer within {:?}",
                self.settings.probe_timeout
            ))),
        }
    }
}

/// Sleeps for `duration` unless cancelled first. Returns whether it was cancelled.
async fn pause(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}
