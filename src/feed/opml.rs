use std::path::Path;

use ::opml::{Outline, OPML};

use crate::error::Result;

/// Feed URLs of every outline in an OPML document, nested outlines included,
/// in document order.
pub fn parse_opml(xml: &str) -> Result<Vec<String>> {
    let document = OPML::from_str(xml)?;

    let mut urls = Vec::new();
    collect_feed_urls(&document.body.outlines, &mut urls);
    Ok(urls)
}

pub fn parse_opml_file(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    // Subscription exports are not always valid UTF-8
    let xml = String::from_utf8_lossy(&bytes);
    parse_opml(&xml)
}

fn collect_feed_urls(outlines: &[Outline], urls: &mut Vec<String>) {
    for outline in outlines {
        if let Some(url) = outline.xml_url.as_deref().filter(|u| !u.is_empty()) {
            urls.push(url.to_string());
        }
        collect_feed_urls(&outline.outlines, urls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SUBSCRIPTIONS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="1.1">
  <head><title>YouTube Subscriptions</title></head>
  <body>
    <outline text="YouTube Subscriptions" title="YouTube Subscriptions">
      <outline text="First" title="First" type="rss" xmlUrl="https://www.youtube.com/feeds/videos.xml?channel_id=UC111" />
      <outline text="Second" title="Second" type="rss" xmlUrl="https://www.youtube.com/feeds/videos.xml?channel_id=UC222" />
    </outline>
  </body>
</opml>"#;

    #[test]
    fn collects_nested_feed_urls_in_order() {
        let urls = parse_opml(SUBSCRIPTIONS).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://www.youtube.com/feeds/videos.xml?channel_id=UC111".to_string(),
                "https://www.youtube.com/feeds/videos.xml?channel_id=UC222".to_string(),
            ]
        );
    }

    #[test]
    fn reads_subscriptions_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SUBSCRIPTIONS.as_bytes()).unwrap();

        let urls = parse_opml_file(file.path()).unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn rejects_non_opml() {
        assert!(parse_opml("<rss version=\"2.0\"></rss>").is_err());
    }
}
