use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::{feeds::prelude::CandidateItem, storage::SentLinks};

/// De-duplicate the fetched items and return the unique items in feed order.
/// The identifier (link) is used as the key; the first occurrence wins.
pub fn deduplicate(items: Vec<CandidateItem>) -> Vec<CandidateItem> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.identifier.clone()))
        .collect()
}

/// Pick the items to forward this run:
/// 1. drop every item whose link was already sent
/// 2. order the rest oldest first; items without a publish date count as
///    published at `fetched_at`, and ties keep their feed order
/// 3. keep the first `limit` of them, so a backlog drains oldest first
pub fn select_new(
    candidates: &[CandidateItem],
    sent: &SentLinks,
    fetched_at: DateTime<Utc>,
    limit: usize,
) -> Vec<CandidateItem> {
    let mut new_items: Vec<&CandidateItem> = candidates
        .iter()
        .filter(|item| !sent.contains(&item.identifier))
        .collect();

    // sort_by_key is stable
    new_items.sort_by_key(|item| item.published_at.unwrap_or(fetched_at));

    new_items.into_iter().take(limit).cloned().collect()
}
