use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::Channel;

/// One upstream item after source-specific normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedItem {
    pub external_id: String,
    pub title: String,
    pub published_at: DateTime<FixedOffset>,
    pub media_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewContent {
    pub channel_id: i64,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub external_id: String,
}

impl NewContent {
    pub fn from_item(channel_id: i64, item: &NormalizedItem) -> Self {
        Self {
            channel_id,
            title: item.title.clone(),
            published_at: item.published_at.with_timezone(&Utc),
            external_id: item.external_id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub content_id: i64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    pub content_id: i64,
    pub url: String,
}

/// A stored item denormalized with its owning channel and every attached media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: i64,
    pub title: String,
    /// In the repository's configured offset.
    pub published_at: DateTime<FixedOffset>,
    pub external_id: String,
    pub channel: Channel,
    pub media: Vec<Media>,
}
