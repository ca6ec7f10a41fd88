use std::ops::AddAssign;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use crate::db::Storage;
use crate::error::Result;
use crate::feed::SourceAdapter;
use crate::models::{Channel, NewContent, NewMedia, NormalizedItem};

/// What one channel's ingestion did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub created: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub media_created: usize,
    pub media_failed: usize,
    /// Items left unread because an older-than-cutoff item ended the listing.
    pub skipped_after_cutoff: usize,
}

impl AddAssign for IngestStats {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
        self.media_created += other.media_created;
        self.media_failed += other.media_failed;
        self.skipped_after_cutoff += other.skipped_after_cutoff;
    }
}

/// Totals for one fan-out over every channel of a kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub channels: usize,
    pub failed_channels: usize,
    pub stats: IngestStats,
}

/// Persists `items` for `channel` in the order given.
///
/// Listings are assumed newest first: the first item older than `cutoff` ends
/// the run, even if later items are newer. Duplicates are skipped silently.
/// Media are written one by one after their content and never roll it back.
pub async fn ingest_items(
    store: &dyn Storage,
    channel: &Channel,
    items: Vec<NormalizedItem>,
    cutoff: DateTime<Utc>,
) -> IngestStats {
    let mut stats = IngestStats::default();
    let total = items.len();

    for (idx, item) in items.into_iter().enumerate() {
        if item.published_at.with_timezone(&Utc) < cutoff {
            stats.skipped_after_cutoff = total - idx;
            tracing::debug!(
                "{}: {} is older than cutoff, ending listing",
                channel.name,
                item.external_id
            );
            break;
        }

        let content = NewContent::from_item(channel.id, &item);
        let content_id = match store.create_content(content).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                stats.duplicates += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(
                    "{}: failed to store {}: {}",
                    channel.name,
                    item.external_id,
                    e
                );
                stats.failed += 1;
                continue;
            }
        };
        stats.created += 1;

        for url in item.media_urls {
            match store.create_media(NewMedia { content_id, url }).await {
                Ok(_) => stats.media_created += 1,
                Err(e) => {
                    tracing::warn!(
                        "{}: failed to store media for content {}: {}",
                        channel.name,
                        content_id,
                        e
                    );
                    stats.media_failed += 1;
                }
            }
        }
    }

    stats
}

/// Fetches one channel and ingests whatever it returned.
pub async fn ingest_channel(
    store: &dyn Storage,
    adapter: &dyn SourceAdapter,
    channel: &Channel,
    cutoff: DateTime<Utc>,
) -> Result<IngestStats> {
    let items = adapter.fetch_channel_items(channel).await?;
    tracing::debug!("Fetched {} items from {}", items.len(), channel.name);
    Ok(ingest_items(store, channel, items, cutoff).await)
}

/// Ingests every channel of the adapter's kind concurrently and waits for all of
/// them. A failing channel is logged and counted; it never fails the cycle.
pub async fn run_ingest_cycle(
    store: &dyn Storage,
    adapter: &dyn SourceAdapter,
    cutoff: DateTime<Utc>,
) -> Result<CycleReport> {
    let kind = adapter.kind();
    let channels = store.find_channels_by_kind(kind).await?;
    let started = Instant::now();

    let results = join_all(channels.iter().map(|channel| async move {
        let result = ingest_channel(store, adapter, channel, cutoff).await;
        (channel, result)
    }))
    .await;

    let mut report = CycleReport {
        channels: channels.len(),
        ..CycleReport::default()
    };
    for (channel, result) in results {
        match result {
            Ok(stats) => report.stats += stats,
            Err(e) => {
                tracing::warn!(kind = %kind, channel = %channel.name, "Channel fetch failed: {}", e);
                report.failed_channels += 1;
            }
        }
    }

    tracing::info!(
        kind = %kind,
        channels = report.channels,
        failed = report.failed_channels,
        created = report.stats.created,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Ingest cycle finished"
    );

    Ok(report)
}
