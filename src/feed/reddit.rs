use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::FixedOffset;
use htmlescape::decode_html;
use regex::{Captures, Regex};
use reqwest::Method;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{Channel, NewChannel, NormalizedItem, SourceKind};

use super::adapter::{
    from_epoch_seconds, null_as_default, AdapterContext, SourceAdapter, MAX_ITEMS_PER_FETCH,
};
use super::HttpFetcher;

pub const REDDIT_BASE_URL: &str = "https://reddit.com";

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpeg", "jpg", "gif"];

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Post {
    #[serde(deserialize_with = "null_as_default")]
    title: String,
    #[serde(deserialize_with = "null_as_default")]
    thumbnail: String,
    #[serde(deserialize_with = "null_as_default")]
    permalink: String,
    #[serde(deserialize_with = "null_as_default")]
    url: String,
    #[serde(deserialize_with = "null_as_default")]
    created_utc: f64,
    post_hint: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    is_gallery: bool,
    gallery_data: Option<GalleryData>,
    media_metadata: Option<HashMap<String, MediaMetadata>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GalleryData {
    items: Vec<GalleryItem>,
}

#[derive(Debug, Deserialize)]
struct GalleryItem {
    media_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MediaMetadata {
    s: Option<MediaSource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MediaSource {
    u: Option<String>,
}

impl Post {
    /// First matching rule wins: direct image, gallery, image-looking link, thumbnail.
    fn media_urls(&self) -> Vec<String> {
        if self.post_hint.as_deref() == Some("image") {
            return vec![self.url.clone()];
        }

        if self.is_gallery {
            return self.gallery_urls();
        }

        if has_image_extension(&self.url) {
            return vec![self.url.clone()];
        }

        if self.thumbnail.starts_with("http") {
            return vec![self.thumbnail.clone()];
        }

        Vec::new()
    }

    fn gallery_urls(&self) -> Vec<String> {
        let (Some(gallery), Some(metadata)) = (&self.gallery_data, &self.media_metadata) else {
            return Vec::new();
        };

        gallery
            .items
            .iter()
            .filter_map(|item| {
                let url = metadata
                    .get(&item.media_id)
                    .and_then(|m| m.s.as_ref())
                    .and_then(|s| s.u.as_deref());
                if url.is_none() {
                    tracing::debug!("Gallery item {} has no source url", item.media_id);
                }
                url
            })
            .map(unescape_html)
            .collect()
    }
}

/// Decodes entities such as `&amp;` and leaves bare ampersands alone.
fn unescape_html(raw: &str) -> String {
    let Ok(entity) = Regex::new(r"&(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#[xX][0-9A-Fa-f]+);") else {
        return raw.to_string();
    };
    entity
        .replace_all(raw, |cap: &Captures| {
            decode_html(&cap[0]).unwrap_or_else(|_| cap[0].to_string())
        })
        .into_owned()
}

fn has_image_extension(url: &str) -> bool {
    Path::new(url)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext))
}

/// Normalizes a subreddit `/new/.json` listing.
pub fn parse_listing(bytes: &[u8], offset: &FixedOffset) -> Result<Vec<NormalizedItem>> {
    let listing: Listing = serde_json::from_slice(bytes)?;

    listing
        .data
        .children
        .into_iter()
        .take(MAX_ITEMS_PER_FETCH)
        .map(|child| {
            let post = child.data;
            Ok(NormalizedItem {
                published_at: from_epoch_seconds(post.created_utc, offset)?,
                media_urls: post.media_urls(),
                external_id: post.permalink,
                title: post.title,
            })
        })
        .collect()
}

/// Subreddit name from a `reddit.com/r/<name>` URL.
pub fn extract_subreddit(input: &str) -> Option<String> {
    let re = Regex::new(r"reddit\.com/r/([^/?#\s]+)").ok()?;
    re.captures(input)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

pub struct RedditAdapter {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
    offset: FixedOffset,
}

impl RedditAdapter {
    pub fn new(ctx: &AdapterContext) -> Self {
        Self::with_base_url(ctx, REDDIT_BASE_URL)
    }

    pub fn with_base_url(ctx: &AdapterContext, base_url: impl Into<String>) -> Self {
        Self {
            fetcher: ctx.fetcher.clone(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            offset: ctx.offset,
        }
    }

    async fn resolve(&self, input: &str) -> Option<String> {
        let subreddit = extract_subreddit(input)?;
        let probe = format!("{}/r/{}", self.base_url, subreddit);
        if self.fetcher.can_fetch(Method::HEAD, &probe).await {
            Some(subreddit)
        } else {
            tracing::info!("Subreddit {} is not reachable", probe);
            None
        }
    }
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Reddit
    }

    async fn fetch_channel_items(&self, channel: &Channel) -> Result<Vec<NormalizedItem>> {
        let url = format!("{}/r/{}/new/.json", self.base_url, channel.external_id);
        let bytes = self.fetcher.get_bytes(&url).await?;
        parse_listing(&bytes, &self.offset)
    }

    async fn provide_channel_metadata(&self, input: &str) -> Result<Option<NewChannel>> {
        Ok(self.resolve(input).await.map(|subreddit| NewChannel {
            name: subreddit.clone(),
            kind: SourceKind::Reddit,
            external_id: subreddit,
            profile_pic: None,
        }))
    }

    async fn validate_channel_input(&self, input: &str) -> bool {
        self.resolve(input).await.is_some()
    }
}
