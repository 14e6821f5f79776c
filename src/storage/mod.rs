use std::collections::{HashSet, VecDeque};

use crate::error::StoreError;

mod file;
mod gist;

pub use file::FileStorage;
pub use gist::GistStorage;

/// Links that were already forwarded, in the order they were sent.
///
/// Membership checks are O(1); the insertion order decides what gets evicted
/// once the persisted list goes over its cap.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SentLinks {
    order: VecDeque<String>,
    index: HashSet<String>,
}

impl SentLinks {
    pub fn contains(&self, link: &str) -> bool {
        self.index.contains(link)
    }

    /// Append a link. Returns `false` (and keeps the old position) when it is already there.
    pub fn insert(&mut self, link: String) -> bool {
        if self.index.contains(&link) {
            return false;
        }
        self.index.insert(link.clone());
        self.order.push_back(link);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// The `cap` most recently inserted links, oldest first.
    pub fn latest(&self, cap: usize) -> Vec<String> {
        let skip = self.order.len().saturating_sub(cap);
        self.order.iter().skip(skip).cloned().collect()
    }
}

impl FromIterator<String> for SentLinks {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut links = SentLinks::default();
        for link in iter {
            links.insert(link);
        }
        links
    }
}

/// Where the sent links live between runs.
///
/// `load` never fails: an unreachable or unreadable backend yields an empty set.
/// `save` keeps the newest `cap` links and refuses to overwrite a document that
/// changed since `load` (`StoreError::Conflict`).
pub trait LinkStore {
    async fn load(&mut self) -> SentLinks;
    async fn save(&mut self, links: &SentLinks) -> Result<usize, StoreError>;
}

pub enum Store {
    File(FileStorage),
    Gist(GistStorage),
}

impl LinkStore for Store {
    async fn load(&mut self) -> SentLinks {
        match self {
            Store::File(store) => store.load().await,
            Store::Gist(store) => store.load().await,
        }
    }

    async fn save(&mut self, links: &SentLinks) -> Result<usize, StoreError> {
        match self {
            Store::File(store) => store.save(links).await,
            Store::Gist(store) => store.save(links).await,
        }
    }
}

/// The persisted form: a pretty printed JSON array, non-ASCII kept as is.
fn to_json(links: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(links)
}

fn from_json(content: &str) -> Result<SentLinks, serde_json::Error> {
    let links: Vec<String> = serde_json::from_str(content)?;
    Ok(links.into_iter().collect())
}

#[cfg(test)]
mod test {
    use super::*;

    fn links(n: usize) -> SentLinks {
        (0..n).map(|i| format!("https://news.example/{i}")).collect()
    }

    #[test]
    fn test_insert_and_contains() {
        let mut sent = SentLinks::default();
        assert!(sent.is_empty());
        assert!(sent.insert("L2".to_string()));
        assert!(sent.insert("L3".to_string()));
        assert!(sent.insert("L1".to_string()));
        assert!(!sent.insert("L2".to_string()), "Duplicate insert should be a no-op");

        assert_eq!(sent.len(), 3);
        assert!(sent.contains("L1"));
        assert!(!sent.contains("L4"));
        assert_eq!(sent.iter().collect::<Vec<_>>(), vec!["L2", "L3", "L1"]);
    }

    #[test]
    fn test_latest_evicts_oldest_inserted() {
        let sent = links(505);
        let kept = sent.latest(500);
        assert_eq!(kept.len(), 500);
        assert_eq!(kept[0], "https://news.example/5");
        assert_eq!(kept[499], "https://news.example/504");
    }

    #[test]
    fn test_latest_under_cap() {
        let sent = links(3);
        assert_eq!(sent.latest(500).len(), 3);
        assert!(sent.latest(0).is_empty());
    }

    #[test]
    fn test_json_keeps_order_and_unicode() {
        let sent: SentLinks = ["https://coin68.com/tin-mới".to_string(), "b".to_string()]
            .into_iter()
            .collect();
        let json = to_json(&sent.latest(10)).unwrap();
        assert!(json.contains("tin-mới"));
        assert!(json.contains("\n  \""), "Expected two-space indentation");

        let back = from_json(&json).unwrap();
        assert_eq!(back, sent);
    }

    #[test]
    fn test_from_json_rejects_non_arrays() {
        assert!(from_json(r#"{"links": []}"#).is_err());
        assert!(from_json("not json").is_err());
    }
}
