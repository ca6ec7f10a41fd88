use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{AppError, Result};
use crate::models::{Channel, NewChannel, NormalizedItem, SourceKind};

use super::{HttpFetcher, InstagramAdapter, RedditAdapter, TwitterAdapter, YoutubeAdapter};

/// Upper bound on items considered from a single fetch.
pub const MAX_ITEMS_PER_FETCH: usize = 50;

/// Capabilities every source kind provides.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetches one channel's feed and normalizes it, newest first as the upstream
    /// orders it. Any transport, status or decode failure fails the whole channel.
    async fn fetch_channel_items(&self, channel: &Channel) -> Result<Vec<NormalizedItem>>;

    /// Resolves user input (usually a profile URL) into channel metadata.
    /// `Ok(None)` when the input does not name an existing channel.
    async fn provide_channel_metadata(&self, input: &str) -> Result<Option<NewChannel>>;

    async fn validate_channel_input(&self, input: &str) -> bool;
}

/// Public Nitter instance used when none is configured.
pub const DEFAULT_NITTER_INSTANCE: &str = "https://nitter.net";

/// What every adapter shares: the transport, the offset items are normalized to
/// and the Nitter instance Twitter channels are read through.
#[derive(Clone)]
pub struct AdapterContext {
    pub fetcher: Arc<HttpFetcher>,
    pub offset: FixedOffset,
    pub nitter_instance: String,
}

impl AdapterContext {
    pub fn new(fetcher: Arc<HttpFetcher>, offset: FixedOffset) -> Self {
        Self {
            fetcher,
            offset,
            nitter_instance: DEFAULT_NITTER_INSTANCE.to_string(),
        }
    }

    pub fn with_nitter_instance(mut self, instance: impl Into<String>) -> Self {
        self.nitter_instance = instance.into().trim_end_matches('/').to_string();
        self
    }
}

/// Builds the adapter for `kind`.
pub fn adapter_for(kind: SourceKind, ctx: &AdapterContext) -> Arc<dyn SourceAdapter> {
    match kind {
        SourceKind::Youtube => Arc::new(YoutubeAdapter::new(ctx)),
        SourceKind::Reddit => Arc::new(RedditAdapter::new(ctx)),
        SourceKind::Twitter => Arc::new(TwitterAdapter::new(ctx)),
        SourceKind::Instagram => Arc::new(InstagramAdapter::new(ctx)),
    }
}

/// Factory keyed by the kind's string name, as stored on channels and accounts.
pub fn adapter_for_name(name: &str, ctx: &AdapterContext) -> Result<Arc<dyn SourceAdapter>> {
    let kind = name.parse::<SourceKind>()?;
    Ok(adapter_for(kind, ctx))
}

pub(crate) fn from_epoch_seconds(
    seconds: f64,
    offset: &FixedOffset,
) -> Result<DateTime<FixedOffset>> {
    DateTime::<Utc>::from_timestamp(seconds as i64, 0)
        .map(|dt| dt.with_timezone(offset))
        .ok_or_else(|| AppError::InvalidTimestamp(seconds.to_string()))
}

/// Reads an explicit JSON `null` as the field type's default, like a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
