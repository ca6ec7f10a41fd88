mod common;

use chrono::Duration;
use tokio_test::{assert_err, assert_ok};

use feed_mosaic::db::Storage;
use feed_mosaic::models::{NewContent, NewMedia, SourceKind};

use common::{at, channel, content, follower, repository};

#[tokio::test]
async fn duplicate_content_is_reported_not_raised() {
    let repo = repository().await;
    let chan = channel(&repo, SourceKind::Reddit, "rust").await;
    let item = NewContent {
        channel_id: chan.id,
        title: "first".to_string(),
        published_at: at(10, 12),
        external_id: "/r/rust/1".to_string(),
    };

    let first = assert_ok!(repo.create_content(item.clone()).await);
    let second = assert_ok!(repo.create_content(item).await);

    assert!(first.is_some());
    assert_eq!(second, None);
}

#[tokio::test]
async fn same_external_id_in_another_channel_is_new_content() {
    let repo = repository().await;
    let a = channel(&repo, SourceKind::Reddit, "rust").await;
    let b = channel(&repo, SourceKind::Reddit, "golang").await;

    content(&repo, &a, "shared", at(10, 12), &[]).await;
    let other = repo
        .create_content(NewContent {
            channel_id: b.id,
            title: "shared".to_string(),
            published_at: at(10, 12),
            external_id: "shared".to_string(),
        })
        .await
        .unwrap();

    assert!(other.is_some());
}

#[tokio::test]
async fn media_needs_existing_content() {
    let repo = repository().await;
    assert_err!(
        repo.create_media(NewMedia {
            content_id: 404,
            url: "http://x/a.png".to_string(),
        })
        .await
    );
}

#[tokio::test]
async fn channels_are_listed_per_kind() {
    let repo = repository().await;
    channel(&repo, SourceKind::Reddit, "rust").await;
    channel(&repo, SourceKind::Youtube, "channel_id=UC1").await;
    channel(&repo, SourceKind::Reddit, "golang").await;

    let reddit = repo.find_channels_by_kind(SourceKind::Reddit).await.unwrap();
    let names: Vec<_> = reddit.iter().map(|c| c.external_id.as_str()).collect();
    assert_eq!(names, vec!["rust", "golang"]);
    assert!(repo
        .find_channels_by_kind(SourceKind::Instagram)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn creating_a_known_channel_returns_the_stored_row() {
    let repo = repository().await;
    let first = channel(&repo, SourceKind::Twitter, "jack").await;

    let (again, created) = repo
        .create_channel_if_not_exists(feed_mosaic::models::NewChannel {
            name: "someone else".to_string(),
            kind: SourceKind::Twitter,
            external_id: "jack".to_string(),
            profile_pic: Some("http://x/pic.jpg".to_string()),
        })
        .await
        .unwrap();

    assert!(!created);
    assert_eq!(again, first);
}

#[tokio::test]
async fn old_content_cleanup_cascades_to_media() {
    let repo = repository().await;
    let chan = channel(&repo, SourceKind::Reddit, "rust").await;
    let old = content(&repo, &chan, "old", at(1, 0), &["http://x/1.png", "http://x/2.png"]).await;
    let fresh = content(&repo, &chan, "fresh", at(10, 0), &["http://x/3.png"]).await;

    let removed = repo.cleanup_old_content(at(5, 0)).await.unwrap();

    assert_eq!(removed, 1);
    assert!(repo.media_for_content(old).await.unwrap().is_empty());
    assert_eq!(repo.media_for_content(fresh).await.unwrap().len(), 1);
    assert_eq!(
        repo.external_ids_for_channel(chan.id).await.unwrap(),
        vec!["fresh".to_string()]
    );
}

#[tokio::test]
async fn cleanup_boundary_keeps_content_published_at_cutoff() {
    let repo = repository().await;
    let chan = channel(&repo, SourceKind::Reddit, "rust").await;
    let cutoff = at(5, 0);
    content(&repo, &chan, "edge", cutoff, &[]).await;
    content(&repo, &chan, "before", cutoff - Duration::seconds(1), &[]).await;

    assert_eq!(repo.cleanup_old_content(cutoff).await.unwrap(), 1);
    assert_eq!(
        repo.external_ids_for_channel(chan.id).await.unwrap(),
        vec!["edge".to_string()]
    );
}

#[tokio::test]
async fn orphaned_channels_are_removed_with_their_content() {
    let repo = repository().await;
    let followed = channel(&repo, SourceKind::Reddit, "rust").await;
    let orphan = channel(&repo, SourceKind::Reddit, "golang").await;
    follower(&repo, "a@example.com", SourceKind::Reddit, &[&followed]).await;
    content(&repo, &orphan, "post", at(10, 0), &["http://x/1.png"]).await;

    let removed = repo.cleanup_orphaned_channels().await.unwrap();

    assert_eq!(removed, 1);
    let left = repo.find_channels_by_kind(SourceKind::Reddit).await.unwrap();
    assert_eq!(left, vec![followed]);
    assert!(repo
        .external_ids_for_channel(orphan.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn unfollowing_the_last_account_orphans_a_channel() {
    let repo = repository().await;
    let chan = channel(&repo, SourceKind::Youtube, "user=someone").await;
    let (_, account) = follower(&repo, "a@example.com", SourceKind::Youtube, &[&chan]).await;

    assert_eq!(repo.cleanup_orphaned_channels().await.unwrap(), 0);
    repo.unfollow_channel(account, chan.id).await.unwrap();
    assert_eq!(repo.cleanup_orphaned_channels().await.unwrap(), 1);
}

#[tokio::test]
async fn database_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feeds.db");

    {
        let repo = feed_mosaic::db::Repository::new(&path).await.unwrap();
        let chan = channel(&repo, SourceKind::Reddit, "rust").await;
        content(&repo, &chan, "kept", at(10, 0), &[]).await;
    }

    let repo = feed_mosaic::db::Repository::new(&path).await.unwrap();
    assert_ok!(repo.ping().await);
    let chans = repo.find_channels_by_kind(SourceKind::Reddit).await.unwrap();
    assert_eq!(
        repo.external_ids_for_channel(chans[0].id).await.unwrap(),
        vec!["kept".to_string()]
    );
}
