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

const MEDIA_PATTERN: &str = r#"(img src|video poster)="([^"]*)""#;

/// Normalizes a Nitter `/media/rss` feed read from `instance`. Entries without a
/// publish date are skipped.
pub fn parse_media_feed(
    bytes: &[u8],
    instance: &str,
    offset: &FixedOffset,
) -> Result<Vec<NormalizedItem>> {
    let feed = parser::parse(bytes)?;
    let media_re = Regex::new(MEDIA_PATTERN).ok();
    let link_prefix = format!("{}/", instance.trim_end_matches('/'));

    let mut items = Vec::new();
    for entry in feed.entries.into_iter().take(MAX_ITEMS_PER_FETCH) {
        let Some(published) = entry.published else {
            tracing::debug!("Skipping undated tweet {}", entry.id);
            continue;
        };

        let creator = entry
            .authors
            .first()
            .map(|a| a.name.as_str())
            .unwrap_or_default();
        let title = entry.title.as_ref().map(|t| t.content.as_str()).unwrap_or_default();

        let link = entry
            .links
            .first()
            .map(|l| l.href.as_str())
            .unwrap_or_default();
        let external_id = link.strip_prefix(&link_prefix).unwrap_or(link).to_string();

        let description = entry.summary.as_ref().map(|s| s.content.as_str()).unwrap_or_default();
        let media_urls = match &media_re {
            Some(re) => re
                .captures_iter(description)
                .filter_map(|cap| cap.get(2))
                .map(|m| m.as_str().to_string())
                .collect(),
            None => Vec::new(),
        };

        items.push(NormalizedItem {
            external_id,
            title: format!("{creator}-{title}"),
            published_at: published.with_timezone(offset),
            media_urls,
        });
    }

    Ok(items)
}

/// Account name from a `twitter.com/<name>` URL.
pub fn extract_username(input: &str) -> Option<String> {
    let re = Regex::new(r"twitter\.com/([^/?#\s]+)").ok()?;
    re.captures(input)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Reads tweets through a Nitter instance.
pub struct TwitterAdapter {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
    offset: FixedOffset,
}

impl TwitterAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self::with_base_url(ctx, ctx.nitter_instance.clone())
    }

    pub fn with_base_url(ctx: &AdapterContext, base_url: impl Into<String>) -> Self {
        Self {
            fetcher: ctx.fetcher.clone(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            offset: ctx.offset,
        }
    }

    async fn resolve(&self, input: &str) -> Option<String> {
        let username = extract_username(input)?;
        // Nitter does not answer HEAD
        let probe = format!("{}/{}", self.base_url, username);
        if self.fetcher.can_fetch(Method::GET, &probe).await {
            Some(username)
        } else {
            tracing::info!("Twitter account {} is not reachable", probe);
            None
        }
    }

    async fn profile_pic(&self, username: &str) -> Result<Option<String>> {
        let url = format!("{}/{}/rss", self.base_url, username);
        let bytes = self.fetcher.get_bytes(&url).await?;
        let feed = parser::parse(&bytes[..])?;
        Ok(feed.logo.map(|image| image.uri))
    }
}

#[async_trait]
impl SourceAdapter for TwitterAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Twitter
    }

    async fn fetch_channel_items(&self, channel: &Channel) -> Result<Vec<NormalizedItem>> {
        let url = format!("{}/{}/media/rss", self.base_url, channel.external_id);
        let bytes = self.fetcher.get_bytes(&url).await?;
        parse_media_feed(&bytes, &self.base_url, &self.offset)
    }

    async fn provide_channel_metadata(&self, input: &str) -> Result<Option<NewChannel>> {
        let Some(username) = self.resolve(input).await else {
            return Ok(None);
        };

        let profile_pic = self.profile_pic(&username).await.unwrap_or_else(|e| {
            tracing::debug!("No avatar for {}: {}", username, e);
            None
        });

        Ok(Some(NewChannel {
            name: username.clone(),
            kind: SourceKind::Twitter,
            external_id: username,
            profile_pic,
        }))
    }

    async fn validate_channel_input(&self, input: &str) -> bool {
        self.resolve(input).await.is_some()
    }
}
