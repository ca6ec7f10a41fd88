use std::sync::Arc;

use async_trait::async_trait;
use chrono::FixedOffset;
use regex::Regex;
use reqwest::Method;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{Channel, NewChannel, NormalizedItem, SourceKind};

use super::adapter::{
    from_epoch_seconds, null_as_default, AdapterContext, SourceAdapter, MAX_ITEMS_PER_FETCH,
};
use super::HttpFetcher;

pub const INSTAGRAM_BASE_URL: &str = "https://www.instagram.com";

#[derive(Debug, Deserialize)]
struct Profile {
    graphql: Graph,
}

#[derive(Debug, Deserialize)]
struct Graph {
    user: User,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct User {
    profile_pic_url_hd: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    edge_owner_to_timeline_media: Edges<Post>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Edges<T> {
    edges: Vec<Edge<T>>,
}

impl<T> Default for Edges<T> {
    fn default() -> Self {
        Self { edges: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Post {
    #[serde(deserialize_with = "null_as_default")]
    shortcode: String,
    #[serde(rename = "__typename", deserialize_with = "null_as_default")]
    typename: String,
    #[serde(deserialize_with = "null_as_default")]
    display_url: String,
    #[serde(deserialize_with = "null_as_default")]
    taken_at_timestamp: f64,
    #[serde(deserialize_with = "null_as_default")]
    edge_media_to_caption: Edges<Caption>,
    #[serde(deserialize_with = "null_as_default")]
    edge_sidecar_to_children: Edges<Child>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Caption {
    #[serde(deserialize_with = "null_as_default")]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Child {
    #[serde(deserialize_with = "null_as_default")]
    display_url: String,
}

impl Post {
    fn media_urls(&self) -> Vec<String> {
        match self.typename.as_str() {
            "GraphImage" | "GraphVideo" => vec![self.display_url.clone()],
            "GraphSidecar" => self
                .edge_sidecar_to_children
                .edges
                .iter()
                .map(|edge| edge.node.display_url.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn caption(&self) -> String {
        self.edge_media_to_caption
            .edges
            .iter()
            .map(|edge| edge.node.text.as_str())
            .collect()
    }
}

/// Normalizes a profile's timeline graph. Posts without a shortcode are skipped.
pub fn parse_profile(bytes: &[u8], offset: &FixedOffset) -> Result<Vec<NormalizedItem>> {
    let profile: Profile = serde_json::from_slice(bytes)?;

    let mut items = Vec::new();
    for edge in profile
        .graphql
        .user
        .edge_owner_to_timeline_media
        .edges
        .into_iter()
        .take(MAX_ITEMS_PER_FETCH)
    {
        let post = edge.node;
        if post.shortcode.is_empty() {
            continue;
        }

        items.push(NormalizedItem {
            title: post.caption(),
            published_at: from_epoch_seconds(post.taken_at_timestamp, offset)?,
            media_urls: post.media_urls(),
            external_id: post.shortcode,
        });
    }

    Ok(items)
}

/// Account name from an `instagram.com/<name>` URL.
pub fn extract_username(input: &str) -> Option<String> {
    let re = Regex::new(r"instagram\.com/([^/?#\s]+)").ok()?;
    re.captures(input)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

pub struct InstagramAdapter {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
    offset: FixedOffset,
}

impl InstagramAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self::with_base_url(ctx, INSTAGRAM_BASE_URL)
    }

    pub fn with_base_url(ctx: &AdapterContext, base_url: impl Into<String>) -> Self {
        Self {
            fetcher: ctx.fetcher.clone(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            offset: ctx.offset,
        }
    }

    fn profile_url(&self, username: &str) -> String {
        format!("{}/{}/?__a=1", self.base_url, username)
    }

    async fn resolve(&self, input: &str) -> Option<String> {
        let username = extract_username(input)?;
        let probe = self.profile_url(&username);
        if self.fetcher.can_fetch(Method::HEAD, &probe).await {
            Some(username)
        } else {
            tracing::info!("Instagram profile {} is not reachable", probe);
            None
        }
    }

    async fn profile_pic(&self, username: &str) -> Result<Option<String>> {
        let bytes = self.fetcher.get_bytes(&self.profile_url(username)).await?;
        let profile: Profile = serde_json::from_slice(&bytes)?;
        Ok(profile.graphql.user.profile_pic_url_hd)
    }
}

#[async_trait]
impl SourceAdapter for InstagramAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Instagram
    }

    async fn fetch_channel_items(&self, channel: &Channel) -> Result<Vec<NormalizedItem>> {
        let bytes = self
            .fetcher
            .get_bytes(&self.profile_url(&channel.external_id))
            .await?;
        parse_profile(&bytes, &self.offset)
    }

    async fn provide_channel_metadata(&self, input: &str) -> Result<Option<NewChannel>> {
        let Some(username) = self.resolve(input).await else {
            return Ok(None);
        };

        let profile_pic = self.profile_pic(&username).await.unwrap_or_else(|e| {
            tracing::debug!("No profile picture for {}: {}", username, e);
            None
        });

        Ok(Some(NewChannel {
            name: username.clone(),
            kind: SourceKind::Instagram,
            external_id: username,
            profile_pic,
        }))
    }

    async fn validate_channel_input(&self, input: &str) -> bool {
        self.resolve(input).await.is_some()
    }
}
