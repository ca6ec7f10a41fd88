use std::sync::Arc;

use async_trait::async_trait;
use chrono::FixedOffset;
use feed_rs::parser;
use regex::Regex;
use reqwest::Method;

use crate::error::Result;
use crate::models::{Channel, NewChannel, NormalizedItem, SourceKind};

use super::adapter::{AdapterContext, SourceAdapter, MAX_ITEMS_PER_FETCH};
use super::HttpFetcher;

pub const YOUTUBE_BASE_URL: &str = "https://youtube.com";

const VIDEO_ID_PREFIX: &str = "yt:video:";

/// A YouTube channel as addressed by its Atom feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YoutubeHandle {
    User(String),
    Channel(String),
}

impl YoutubeHandle {
    /// Query string accepted by `/feeds/videos.xml`, also the stored external id.
    pub fn feed_query(&self) -> String {
        match self {
            YoutubeHandle::User(name) => format!("user={name}"),
            YoutubeHandle::Channel(id) => format!("channel_id={id}"),
        }
    }

    fn page_path(&self) -> String {
        match self {
            YoutubeHandle::User(name) => format!("user/{name}"),
            YoutubeHandle::Channel(id) => format!("channel/{id}"),
        }
    }
}

/// Pulls a user or channel handle out of a page URL, a feed URL or a bare query.
/// User handles win over channel handles.
pub fn extract_handle(input: &str) -> Option<YoutubeHandle> {
    let capture = |pattern: &str| -> Option<String> {
        let re = Regex::new(pattern).ok()?;
        re.captures(input)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.is_empty())
    };

    let user = capture(r"youtube\.com/user/([^/\n?&]*)").or_else(|| capture(r"user=([^/\n&]*)"));
    if let Some(name) = user {
        return Some(YoutubeHandle::User(name));
    }
    capture(r"youtube\.com/channel/([^/\n?&]*)")
        .or_else(|| capture(r"channel_id=([^/\n&]*)"))
        .map(YoutubeHandle::Channel)
}

/// Normalizes an Atom video feed. An entry without a usable publish date ends
/// the listing.
pub fn parse_video_feed(bytes: &[u8], offset: &FixedOffset) -> Result<Vec<NormalizedItem>> {
    let feed = parser::parse(bytes)?;

    let mut items = Vec::new();
    for entry in feed.entries.into_iter().take(MAX_ITEMS_PER_FETCH) {
        let Some(published) = entry.published else {
            tracing::debug!("Entry {} has no publish date, ending listing", entry.id);
            break;
        };

        let video_id = entry
            .id
            .strip_prefix(VIDEO_ID_PREFIX)
            .unwrap_or(&entry.id)
            .to_string();

        items.push(NormalizedItem {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            published_at: published.with_timezone(offset),
            media_urls: vec![thumbnail_url(&video_id)],
            external_id: video_id,
        });
    }

    Ok(items)
}

fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/sddefault.jpg")
}

pub struct YoutubeAdapter {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
    offset: FixedOffset,
}

impl YoutubeAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self::with_base_url(ctx, YOUTUBE_BASE_URL)
    }

    pub fn with_base_url(ctx: &AdapterContext, base_url: impl Into<String>) -> Self {
        Self {
            fetcher: ctx.fetcher.clone(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            offset: ctx.offset,
        }
    }

    fn feed_url(&self, query: &str) -> String {
        format!("{}/feeds/videos.xml?{}", self.base_url, query)
    }

    async fn resolve(&self, input: &str) -> Option<YoutubeHandle> {
        let handle = extract_handle(input)?;
        let probe = format!("{}/{}", self.base_url, handle.page_path());
        if self.fetcher.can_fetch(Method::HEAD, &probe).await {
            Some(handle)
        } else {
            tracing::info!("YouTube channel {} is not reachable", probe);
            None
        }
    }

    async fn author_name(&self, query: &str) -> Result<Option<String>> {
        let bytes = self.fetcher.get_bytes(&self.feed_url(query)).await?;
        let feed = parser::parse(&bytes[..])?;
        Ok(feed.authors.into_iter().next().map(|a| a.name))
    }
}

#[async_trait]
impl SourceAdapter for YoutubeAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Youtube
    }

    async fn fetch_channel_items(&self, channel: &Channel) -> Result<Vec<NormalizedItem>> {
        let bytes = self
            .fetcher
            .get_bytes(&self.feed_url(&channel.external_id))
            .await?;
        parse_video_feed(&bytes, &self.offset)
    }

    async fn provide_channel_metadata(&self, input: &str) -> Result<Option<NewChannel>> {
        let Some(handle) = self.resolve(input).await else {
            return Ok(None);
        };
        let query = handle.feed_query();

        let name = match self.author_name(&query).await {
            Ok(Some(name)) => name,
            Ok(None) => query.clone(),
            Err(e) => {
                tracing::debug!("Failed to read author of {}: {}", query, e);
                query.clone()
            }
        };

        Ok(Some(NewChannel {
            name,
            kind: SourceKind::Youtube,
            external_id: query,
            profile_pic: None,
        }))
    }

    async fn validate_channel_input(&self, input: &str) -> bool {
        self.resolve(input).await.is_some()
    }
}
