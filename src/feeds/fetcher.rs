use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, USER_AGENT};
use rss::Channel;
use tracing::{debug, info, warn};

use crate::{
    common::deduplicate,
    error::{Error, FetchError},
};

use super::data_types::CandidateItem;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const FEED_ACCEPT: &str = "application/xml, text/xml, */*";
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// The candidates of one fetch, plus the instant they were fetched at.
/// Items without a usable `pubDate` are ordered as if published at `fetched_at`.
#[derive(Clone, Debug)]
pub struct Feed {
    pub items: Vec<CandidateItem>,
    pub fetched_at: DateTime<Utc>,
}

pub struct RssFetcher {
    client: reqwest::Client,
    url: String,
}

impl RssFetcher {
    #[must_use]
    pub fn new(url: &str) -> RssFetcher {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }

    /// Download and parse the feed. Entries without a link are logged and dropped;
    /// duplicate links keep their first occurrence.
    pub async fn fetch(&self) -> Result<Feed, Error> {
        info!(url = %self.url, "fetching feed");
        let response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, FEED_ACCEPT)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(FetchError::from)?;

        let status = response.status();
        debug!(%status, "feed responded");
        if !status.is_success() {
            return Err(FetchError::Status(status).into());
        }

        let content = response.bytes().await.map_err(FetchError::from)?;
        let fetched_at = Utc::now();
        let channel = Channel::read_from(&content[..])?;

        let items: Vec<CandidateItem> = channel
            .items()
            .iter()
            .filter_map(|item| match CandidateItem::try_from(item) {
                Ok(candidate) => Some(candidate),
                Err(e) => {
                    warn!(error = %e, "skipping feed entry");
                    None
                }
            })
            .collect();

        let items = deduplicate(items);
        info!(count = items.len(), "parsed feed items");

        Ok(Feed { items, fetched_at })
    }
}
