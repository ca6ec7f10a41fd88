mod common;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feed_mosaic::feed::{
    InstagramAdapter, RedditAdapter, SourceAdapter, TwitterAdapter, YoutubeAdapter,
};
use feed_mosaic::models::{Channel, SourceKind};
use feed_mosaic::AppError;

use common::context;

const VIDEO_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns="http://www.w3.org/2005/Atom">
 <id>yt:channel:UC123</id>
 <title>Rust Videos</title>
 <author><name>Rust Videos</name><uri>https://www.youtube.com/user/rustvideos</uri></author>
 <entry>
  <id>yt:video:abc123</id>
  <yt:videoId>abc123</yt:videoId>
  <title>Ownership explained</title>
  <published>2021-03-10T12:00:00+00:00</published>
 </entry>
</feed>"#;

const NITTER_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
 <channel>
  <title>jack / @jack</title>
  <link>http://HOST/jack</link>
  <description>Twitter feed for: @jack</description>
  <image>
   <title>jack / @jack</title>
   <url>https://pbs.example/jack.jpg</url>
   <link>http://HOST/jack</link>
  </image>
  <item>
   <title>hello</title>
   <dc:creator>@jack</dc:creator>
   <description><![CDATA[<p>hello</p><img src="http://HOST/pic/one.jpg" />]]></description>
   <pubDate>Wed, 10 Mar 2021 12:00:00 GMT</pubDate>
   <guid>http://HOST/jack/status/1#m</guid>
   <link>http://HOST/jack/status/1#m</link>
  </item>
 </channel>
</rss>"#;

fn stored(kind: SourceKind, external_id: &str) -> Channel {
    Channel {
        id: 1,
        name: external_id.to_string(),
        kind,
        external_id: external_id.to_string(),
        profile_pic: None,
    }
}

async fn respond(server: &MockServer, verb: &str, at: &str, status: u16) {
    Mock::given(method(verb))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn youtube_fetches_the_channel_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feeds/videos.xml"))
        .and(query_param("user", "rustvideos"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(VIDEO_FEED.as_bytes(), "application/atom+xml"),
        )
        .mount(&server)
        .await;
    let adapter = YoutubeAdapter::with_base_url(&context(), server.uri());

    let items = adapter
        .fetch_channel_items(&stored(SourceKind::Youtube, "user=rustvideos"))
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].external_id, "abc123");
    assert_eq!(
        items[0].media_urls,
        vec!["https://img.youtube.com/vi/abc123/sddefault.jpg".to_string()]
    );
}

#[tokio::test]
async fn youtube_metadata_uses_feed_author() {
    let server = MockServer::start().await;
    respond(&server, "HEAD", "/user/rustvideos", 200).await;
    Mock::given(method("GET"))
        .and(path("/feeds/videos.xml"))
        .and(query_param("user", "rustvideos"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(VIDEO_FEED.as_bytes(), "application/atom+xml"),
        )
        .mount(&server)
        .await;
    let adapter = YoutubeAdapter::with_base_url(&context(), server.uri());

    let channel = adapter
        .provide_channel_metadata("https://www.youtube.com/user/rustvideos")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(channel.name, "Rust Videos");
    assert_eq!(channel.kind, SourceKind::Youtube);
    assert_eq!(channel.external_id, "user=rustvideos");
}

#[tokio::test]
async fn youtube_metadata_falls_back_to_query_without_feed() {
    let server = MockServer::start().await;
    respond(&server, "HEAD", "/channel/UC123", 200).await;
    let adapter = YoutubeAdapter::with_base_url(&context(), server.uri());

    let channel = adapter
        .provide_channel_metadata("https://www.youtube.com/channel/UC123")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(channel.name, "channel_id=UC123");
    assert_eq!(channel.external_id, "channel_id=UC123");
}

#[tokio::test]
async fn youtube_rejects_unreachable_or_unrecognized_input() {
    let server = MockServer::start().await;
    respond(&server, "HEAD", "/user/gone", 404).await;
    let adapter = YoutubeAdapter::with_base_url(&context(), server.uri());

    assert!(!adapter.validate_channel_input("https://www.youtube.com/user/gone").await);
    assert!(!adapter.validate_channel_input("https://vimeo.com/someone").await);
    assert!(adapter
        .provide_channel_metadata("https://www.youtube.com/user/gone")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn reddit_error_status_fails_the_channel() {
    let server = MockServer::start().await;
    respond(&server, "GET", "/r/rust/new/.json", 429).await;
    let adapter = RedditAdapter::with_base_url(&context(), server.uri());

    let err = adapter
        .fetch_channel_items(&stored(SourceKind::Reddit, "rust"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UnexpectedStatus { .. }));
}

#[tokio::test]
async fn reddit_metadata_names_the_subreddit() {
    let server = MockServer::start().await;
    respond(&server, "HEAD", "/r/rust", 200).await;
    let adapter = RedditAdapter::with_base_url(&context(), server.uri());

    let channel = adapter
        .provide_channel_metadata("https://www.reddit.com/r/rust/")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(channel.name, "rust");
    assert_eq!(channel.external_id, "rust");
    assert!(channel.profile_pic.is_none());
    assert!(!adapter.validate_channel_input("https://reddit.com/r/missing").await);
}

#[tokio::test]
async fn twitter_reads_media_feed_and_avatar_through_instance() {
    let server = MockServer::start().await;
    let rss = NITTER_RSS.replace("http://HOST", &server.uri());
    Mock::given(method("GET"))
        .and(path("/jack/media/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(rss.clone(), "application/rss+xml"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jack/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(rss, "application/rss+xml"))
        .mount(&server)
        .await;
    respond(&server, "GET", "/jack", 200).await;
    let adapter = TwitterAdapter::with_base_url(&context(), server.uri());

    let items = adapter
        .fetch_channel_items(&stored(SourceKind::Twitter, "jack"))
        .await
        .unwrap();
    let channel = adapter
        .provide_channel_metadata("https://twitter.com/jack")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].external_id, "jack/status/1#m");
    assert_eq!(items[0].title, "@jack-hello");
    assert_eq!(items[0].media_urls, vec![format!("{}/pic/one.jpg", server.uri())]);
    assert_eq!(channel.external_id, "jack");
    assert_eq!(channel.profile_pic.as_deref(), Some("https://pbs.example/jack.jpg"));
}

#[tokio::test]
async fn twitter_missing_avatar_still_yields_channel() {
    let server = MockServer::start().await;
    respond(&server, "GET", "/jack", 200).await;
    let adapter = TwitterAdapter::with_base_url(&context(), server.uri());

    let channel = adapter
        .provide_channel_metadata("https://twitter.com/jack")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(channel.name, "jack");
    assert!(channel.profile_pic.is_none());
}

#[tokio::test]
async fn instagram_profile_drives_items_and_picture() {
    let server = MockServer::start().await;
    let body = serde_json::to_vec(&json!({
        "graphql": { "user": {
            "profile_pic_url_hd": "https://cdn/avatar.jpg",
            "edge_owner_to_timeline_media": { "edges": [
                { "node": {
                    "__typename": "GraphImage",
                    "shortcode": "IMG",
                    "display_url": "https://cdn/img.jpg",
                    "taken_at_timestamp": 1615377600,
                    "edge_media_to_caption": { "edges": [ { "node": { "text": "sunset" } } ] }
                } }
            ] }
        } }
    }))
    .unwrap();
    Mock::given(method("GET"))
        .and(path("/someone/"))
        .and(query_param("__a", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/someone/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let adapter = InstagramAdapter::with_base_url(&context(), server.uri());

    let items = adapter
        .fetch_channel_items(&stored(SourceKind::Instagram, "someone"))
        .await
        .unwrap();
    let channel = adapter
        .provide_channel_metadata("https://www.instagram.com/someone/")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].external_id, "IMG");
    assert_eq!(items[0].title, "sunset");
    assert_eq!(items[0].media_urls, vec!["https://cdn/img.jpg".to_string()]);
    assert_eq!(channel.kind, SourceKind::Instagram);
    assert_eq!(channel.profile_pic.as_deref(), Some("https://cdn/avatar.jpg"));
}

#[tokio::test]
async fn instagram_garbage_fails_the_channel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/someone/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"<html>login</html>".to_vec(), "text/html"),
        )
        .mount(&server)
        .await;
    let adapter = InstagramAdapter::with_base_url(&context(), server.uri());

    assert!(adapter
        .fetch_channel_items(&stored(SourceKind::Instagram, "someone"))
        .await
        .is_err());
}
