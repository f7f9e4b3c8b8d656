use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref ITEM_REGEX: Regex = Regex::new(r"(?s)<item[^>]*>(.*?)</item>").unwrap();
    static ref TITLE_REGEX: Regex =
        Regex::new(r"(?s)<title[^>]*>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</title>").unwrap();
    static ref LINK_REGEX: Regex = Regex::new(r"(?s)<link[^>]*>\s*(.*?)\s*</link>").unwrap();
    static ref PUBDATE_REGEX: Regex = Regex::new(r"(?s)<pubDate>\s*(.*?)\s*</pubDate>").unwrap();
}

/// One aggregated news item for the ticker
#[derive(Debug, Clone, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub published: String,
    pub source: String,
}

/// Fetch and aggregate the configured RSS feeds, best effort
///
/// A source that fails to fetch or yields no items simply contributes
/// nothing; when every source fails the result is an empty list and the
/// client ticker hides itself. No retries.
pub async fn aggregate(client: &reqwest::Client, feed_urls: &[String]) -> Vec<NewsItem> {
    let mut items = Vec::new();
    for url in feed_urls {
        match fetch_feed(client, url).await {
            Ok(xml) => items.extend(extract_items(&xml, url)),
            Err(e) => warn!("news source {} dropped: {}", url, e),
        }
    }
    items
}

async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<String, String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("request failed: {}", e))?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }
    response
        .text()
        .await
        .map_err(|e| format!("body read failed: {}", e))
}

// Good-enough RSS extraction: pull title/link/pubDate out of each <item>.
// Feeds that deviate just yield fewer fields, never an error.
fn extract_items(xml: &str, source: &str) -> Vec<NewsItem> {
    ITEM_REGEX
        .captures_iter(xml)
        .filter_map(|item| {
            let body = item.get(1)?.as_str();
            let title = first_capture(&TITLE_REGEX, body)?;
            Some(NewsItem {
                title,
                link: first_capture(&LINK_REGEX, body).unwrap_or_default(),
                published: first_capture(&PUBDATE_REGEX, body).unwrap_or_default(),
                source: source.to_string(),
            })
        })
        .collect()
}

fn first_capture(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss><channel>
  <title>Channel</title>
  <item>
    <title><![CDATA[First headline]]></title>
    <link>https://example.com/1</link>
    <pubDate>Mon, 01 Jul 2024 10:00:00 GMT</pubDate>
  </item>
  <item>
    <title>Second headline</title>
    <link>https://example.com/2</link>
  </item>
  <item>
    <link>https://example.com/untitled</link>
  </item>
</channel></rss>"#;

    #[test]
    fn items_extracted_with_cdata_titles() {
        let items = extract_items(FEED, "feed");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "First headline");
        assert_eq!(items[0].link, "https://example.com/1");
        assert_eq!(items[0].published, "Mon, 01 Jul 2024 10:00:00 GMT");
        assert_eq!(items[1].title, "Second headline");
        assert_eq!(items[1].published, "");
    }

    #[test]
    fn untitled_items_skipped() {
        let items = extract_items(FEED, "feed");
        assert!(items.iter().all(|i| !i.title.is_empty()));
    }

    #[test]
    fn channel_title_not_mistaken_for_item() {
        let items = extract_items(FEED, "feed");
        assert!(items.iter().all(|i| i.title != "Channel"));
    }
}
