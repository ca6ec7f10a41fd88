#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use feed_mosaic::db::{Repository, Storage};
use feed_mosaic::feed::{AdapterContext, HttpFetcher};
use feed_mosaic::models::{Channel, NewChannel, NewContent, NewMedia, SourceKind};

pub async fn repository() -> Repository {
    Repository::open_in_memory().await.unwrap()
}

pub fn context() -> AdapterContext {
    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(5)).unwrap());
    AdapterContext::new(fetcher, FixedOffset::east_opt(0).unwrap())
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, day, hour, 0, 0).unwrap()
}

pub async fn channel(repo: &Repository, kind: SourceKind, external_id: &str) -> Channel {
    let (channel, _) = repo
        .create_channel_if_not_exists(NewChannel {
            name: external_id.to_string(),
            kind,
            external_id: external_id.to_string(),
            profile_pic: None,
        })
        .await
        .unwrap();
    channel
}

/// A user with one account of `kind` following `channels`. Returns (user, account).
pub async fn follower(
    repo: &Repository,
    email: &str,
    kind: SourceKind,
    channels: &[&Channel],
) -> (i64, i64) {
    let user = repo.create_user(email, None).await.unwrap();
    let account = repo.create_account(user, "main", kind).await.unwrap();
    for channel in channels {
        repo.follow_channel(account, channel.id).await.unwrap();
    }
    (user, account)
}

pub async fn content(
    repo: &Repository,
    channel: &Channel,
    external_id: &str,
    published_at: DateTime<Utc>,
    media: &[&str],
) -> i64 {
    let id = repo
        .create_content(NewContent {
            channel_id: channel.id,
            title: format!("title {external_id}"),
            published_at,
            external_id: external_id.to_string(),
        })
        .await
        .unwrap()
        .unwrap();
    for url in media {
        repo.create_media(NewMedia {
            content_id: id,
            url: url.to_string(),
        })
        .await
        .unwrap();
    }
    id
}
