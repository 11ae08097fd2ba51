//! Miniflux API access, category matching, and entry filtering.

mod client;
mod error;

pub use client::{api_base, MinifluxClient, MinifluxClientBuilder};
pub use error::ApiError;

use crate::config::{ENTRY_DIRECTION, ENTRY_PAGE_LIMIT, ENTRY_STATUS};
use crate::model::{Category, Entry, EntryResultSet};

/// Query sent to `GET /v1/entries`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    pub status: &'static str,
    pub limit: usize,
    pub direction: &'static str,
}

impl EntryQuery {
    /// The fixed request shape used for every export: unread, oldest first, one page of 100.
    pub fn unread() -> Self {
        Self {
            status: ENTRY_STATUS,
            limit: ENTRY_PAGE_LIMIT,
            direction: ENTRY_DIRECTION,
        }
    }

    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("status", self.status.to_string()),
            ("limit", self.limit.to_string()),
            ("direction", self.direction.to_string()),
        ]
    }
}

impl Default for EntryQuery {
    fn default() -> Self {
        Self::unread()
    }
}

/// Read access to a feed-reader account. Implemented by [MinifluxClient].
pub trait FeedReader {
    /// All categories, in server order.
    fn categories(&self) -> Result<Vec<Category>, ApiError>;

    /// One page of entries matching `query`; never more than `query.limit`.
    fn entries(&self, query: &EntryQuery) -> Result<EntryResultSet, ApiError>;
}

/// First category whose title equals `name` exactly (case-sensitive).
///
/// Returns `Category::default()` (id 0) when nothing matches; filtering by it selects nothing.
pub fn find_category(categories: &[Category], name: &str) -> Category {
    categories
        .iter()
        .find(|c| c.title == name)
        .cloned()
        .unwrap_or_default()
}

/// Entries whose feed belongs to `category`, in their original order.
pub fn filter_entries(entries: Vec<Entry>, category: &Category) -> Vec<Entry> {
    entries
        .into_iter()
        .filter(|e| e.feed.category.id == category.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Feed, FeedCategory};

    fn category(id: i64, title: &str) -> Category {
        Category {
            id,
            title: title.to_string(),
        }
    }

    fn entry(id: i64, category_id: i64) -> Entry {
        Entry {
            id,
            title: format!("Entry {}", id),
            url: format!("https://example.com/{}", id),
            content: String::new(),
            feed: Feed {
                id: 1,
                title: "Feed".into(),
                category: FeedCategory {
                    id: category_id,
                    title: String::new(),
                },
            },
        }
    }

    #[test]
    fn unread_query_params() {
        assert_eq!(
            EntryQuery::unread().to_params(),
            vec![
                ("status", "unread".to_string()),
                ("limit", "100".to_string()),
                ("direction", "asc".to_string()),
            ]
        );
        assert_eq!(EntryQuery::default(), EntryQuery::unread());
    }

    #[test]
    fn find_category_exact_title() {
        let cats = vec![category(1, "Tech"), category(2, "News")];
        assert_eq!(find_category(&cats, "News"), category(2, "News"));
    }

    #[test]
    fn find_category_is_case_sensitive() {
        let cats = vec![category(1, "Tech"), category(2, "News")];
        assert_eq!(find_category(&cats, "news"), Category::default());
        assert_eq!(find_category(&cats, " News"), Category::default());
    }

    #[test]
    fn find_category_first_match_wins() {
        let cats = vec![category(3, "Dup"), category(4, "Dup")];
        assert_eq!(find_category(&cats, "Dup").id, 3);
    }

    #[test]
    fn find_category_empty_list_is_zero() {
        assert_eq!(find_category(&[], "All").id, 0);
    }

    #[test]
    fn filter_keeps_matching_in_order() {
        let entries = vec![entry(10, 2), entry(11, 1), entry(12, 2), entry(13, 3)];
        let kept = filter_entries(entries, &category(2, "News"));
        let ids: Vec<i64> = kept.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![10, 12]);
    }

    #[test]
    fn filter_by_zero_category_selects_nothing() {
        let entries = vec![entry(10, 2), entry(11, 1)];
        assert!(filter_entries(entries, &Category::default()).is_empty());
    }

    #[test]
    fn filter_is_exact_subset_for_every_category() {
        let entries: Vec<Entry> = (0..30).map(|i| entry(i, i % 4 + 1)).collect();
        for cid in 1..=4 {
            let kept = filter_entries(entries.clone(), &category(cid, "c"));
            let expected: Vec<i64> = entries
                .iter()
                .filter(|e| e.feed.category.id == cid)
                .map(|e| e.id)
                .collect();
            let got: Vec<i64> = kept.iter().map(|e| e.id).collect();
            assert_eq!(got, expected);
        }
    }
}
