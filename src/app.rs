use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::{Repository, Storage};
use crate::error::Result;
use crate::feed::{adapter_for, parse_opml_file, AdapterContext, HttpFetcher, SourceAdapter};
use crate::models::{Channel, SourceKind};
use crate::sync::{CleanupJob, IngestJob, Job, LastRunRegistry, Scheduler, CLEANUP_JOB};

pub struct App {
    pub repository: Arc<Repository>,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    context: AdapterContext,
    scheduler: Scheduler,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        Self::with_repository(config, repository)
    }

    pub fn with_repository(config: &Config, repository: Repository) -> Result<Self> {
        let offset = config.utc_offset()?;
        let repository = Arc::new(repository.with_offset(offset));
        let fetcher = Arc::new(HttpFetcher::new(config.http_timeout())?);
        let context = AdapterContext::new(fetcher, offset)
            .with_nitter_instance(config.nitter_instance.clone());

        let mut kinds: Vec<SourceKind> = Vec::new();
        for kind in &config.sources {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        let adapters: Vec<_> = kinds
            .iter()
            .map(|kind| adapter_for(*kind, &context))
            .collect();

        let names = kinds
            .iter()
            .map(|kind| kind.as_str())
            .chain(std::iter::once(CLEANUP_JOB));
        let registry = LastRunRegistry::seeded(names, Utc::now());

        let store: Arc<dyn Storage> = repository.clone();
        let scheduler = Scheduler::new(store, registry, config.scheduler_settings());

        Ok(Self {
            repository,
            adapters,
            context,
            scheduler,
        })
    }

    pub fn enabled_kinds(&self) -> Vec<SourceKind> {
        self.adapters.iter().map(|a| a.kind()).collect()
    }

    pub fn registry(&self) -> &LastRunRegistry {
        self.scheduler.registry()
    }

    /// When `kind` last finished an ingest cycle.
    pub async fn last_run(&self, kind: SourceKind) -> Option<DateTime<Utc>> {
        self.registry().for_kind(kind).await
    }

    fn jobs(&self) -> Vec<Arc<dyn Job>> {
        let store: Arc<dyn Storage> = self.repository.clone();
        let mut jobs: Vec<Arc<dyn Job>> = self
            .adapters
            .iter()
            .map(|adapter| {
                Arc::new(IngestJob::new(store.clone(), adapter.clone())) as Arc<dyn Job>
            })
            .collect();
        jobs.push(Arc::new(CleanupJob::new(store)));
        jobs
    }

    /// Runs one polling loop per enabled kind plus cleanup until `token` is
    /// cancelled and every loop has wound down.
    pub async fn run(&self, token: CancellationToken) {
        let handles: Vec<_> = self
            .jobs()
            .into_iter()
            .map(|job| self.scheduler.spawn(job, token.clone()))
            .collect();
        tracing::info!("Started {} background jobs", handles.len());

        for result in join_all(handles).await {
            if let Err(e) = result {
                tracing::error!("Background job ended abnormally: {}", e);
            }
        }
    }

    /// One cycle of every job, concurrently, then returns.
    pub async fn refresh_once(&self) -> Result<()> {
        self.repository.ping().await?;

        let jobs = self.jobs();
        join_all(jobs.iter().map(|job| self.scheduler.run_once(job.as_ref()))).await;
        Ok(())
    }

    /// Resolves `input` into a channel of `kind` and makes `account_id` follow it.
    /// Returns `None` when the input does not name a reachable channel.
    pub async fn add_channel(
        &self,
        account_id: i64,
        kind: SourceKind,
        input: &str,
    ) -> Result<Option<Channel>> {
        let adapter = adapter_for(kind, &self.context);
        let Some(new_channel) = adapter.provide_channel_metadata(input).await? else {
            return Ok(None);
        };

        let (channel, created) = self
            .repository
            .create_channel_if_not_exists(new_channel)
            .await?;
        self.repository.follow_channel(account_id, channel.id).await?;
        if created {
            tracing::info!("Added {} channel {}", kind, channel.name);
        }
        Ok(Some(channel))
    }

    /// Follows every YouTube feed listed in an OPML subscription export.
    /// Returns how many channels were added; an export without feeds is an error.
    pub async fn import_opml(&self, path: &Path, account_id: i64) -> Result<usize> {
        let urls = parse_opml_file(path)?;
        if urls.is_empty() {
            return Err(anyhow::anyhow!("No feed URLs found in {}", path.display()).into());
        }
        let mut added = 0;

        for url in urls {
            match self.add_channel(account_id, SourceKind::Youtube, &url).await {
                Ok(Some(_)) => added += 1,
                Ok(None) => tracing::warn!("Skipping {}: not a reachable channel", url),
                Err(e) => tracing::warn!("Failed to add {}: {}", url, e),
            }
        }

        Ok(added)
    }
}
