use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::ItemError;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<]+?>").expect("valid tag pattern"));

/// One feed entry, before it is checked against the sent links.
///
/// Every field but the identifier is optional; absent values are handled where
/// they are used (see `sender::format` and `common::select_new`).
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateItem {
    /// The trimmed `<link>`; also the dedup key.
    pub identifier: String,
    pub title: Option<String>,
    /// Description with HTML tags stripped.
    pub body: Option<String>,
    /// `None` when `<pubDate>` is absent or not RFC 2822.
    pub published_at: Option<DateTime<Utc>>,
    pub media_url: Option<String>,
}

impl TryFrom<&rss::Item> for CandidateItem {
    type Error = ItemError;

    fn try_from(item: &rss::Item) -> Result<Self, Self::Error> {
        let title = non_blank(item.title());
        let identifier = match non_blank(item.link()) {
            Some(link) => link,
            None => return Err(ItemError::MissingLink { title }),
        };

        Ok(Self {
            identifier,
            title,
            body: item.description().map(strip_html).and_then(|d| non_blank(Some(d.as_str()))),
            published_at: item.pub_date().and_then(parse_pub_date),
            media_url: media_url(item),
        })
    }
}

/// Parse an RFC 2822 `<pubDate>`, e.g. `Tue, 14 Jan 2025 09:30:00 +0700`.
pub fn parse_pub_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn strip_html(value: &str) -> String {
    HTML_TAG.replace_all(value, "").trim().to_string()
}

/// `media:content@url` first, then an image `<enclosure>`.
fn media_url(item: &rss::Item) -> Option<String> {
    let media_content = item
        .extensions()
        .get("media")
        .and_then(|media| media.get("content"))
        .and_then(|contents| contents.iter().find_map(|c| c.attrs().get("url")))
        .and_then(|url| non_blank(Some(url.as_str())));

    media_content.or_else(|| {
        item.enclosure()
            .filter(|e| e.mime_type().starts_with("image/"))
            .and_then(|e| non_blank(Some(e.url())))
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
