//! The export pipeline: fetch categories, fetch unread entries, keep the configured category,
//! and assemble the document. Any API failure stops the run before anything is written.

use crate::document::assemble;
use crate::miniflux::{filter_entries, find_category, ApiError, EntryQuery, FeedReader};
use crate::model::{Document, Entry};

/// Fetch and assemble the document for category `category_name`.
///
/// `progress` is called once per kept entry with its 1-based position in the document.
/// A category that does not exist yields an empty document, not an error.
pub fn collect_document(
    reader: &impl FeedReader,
    category_name: &str,
    progress: Option<&dyn Fn(usize, &Entry)>,
) -> Result<Document, ApiError> {
    let categories = reader.categories()?;
    let category = find_category(&categories, category_name);
    if category.id == 0 {
        tracing::warn!(
            category = category_name,
            available = categories.len(),
            "no category with this title; the document will be empty"
        );
    } else {
        tracing::debug!(category = category_name, id = category.id, "matched category");
    }

    let page = reader.entries(&EntryQuery::unread())?;
    let fetched = page.entries.len();
    let entries = filter_entries(page.entries, &category);

    if let Some(cb) = progress {
        for (i, entry) in entries.iter().enumerate() {
            cb(i + 1, entry);
        }
    }
    tracing::info!(
        fetched,
        total = page.total,
        kept = entries.len(),
        "filtered unread entries"
    );

    Ok(assemble(&entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, EntryResultSet, Feed, FeedCategory};
    use std::cell::RefCell;

    /// In-memory reader returning canned categories and entries.
    struct FakeReader {
        categories: Result<Vec<Category>, u16>,
        entries: Vec<Entry>,
        calls: RefCell<Vec<&'static str>>,
    }

    impl FakeReader {
        fn new(categories: Vec<Category>, entries: Vec<Entry>) -> Self {
            Self {
                categories: Ok(categories),
                entries,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl FeedReader for FakeReader {
        fn categories(&self) -> Result<Vec<Category>, ApiError> {
            self.calls.borrow_mut().push("categories");
            match &self.categories {
                Ok(c) => Ok(c.clone()),
                Err(status) => Err(ApiError::HttpStatus {
                    status: *status,
                    url: "http://fake/v1/categories".into(),
                    message: "boom".into(),
                }),
            }
        }

        fn entries(&self, query: &EntryQuery) -> Result<EntryResultSet, ApiError> {
            self.calls.borrow_mut().push("entries");
            assert_eq!(query, &EntryQuery::unread());
            Ok(EntryResultSet {
                total: self.entries.len() as u64,
                entries: self.entries.clone(),
            })
        }
    }

    fn category(id: i64, title: &str) -> Category {
        Category {
            id,
            title: title.to_string(),
        }
    }

    fn entry(id: i64, category_id: i64, title: &str) -> Entry {
        Entry {
            id,
            title: title.to_string(),
            url: format!("https://example.com/{}", id),
            content: format!("<p>content {}</p>", id),
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

    fn sample_reader() -> FakeReader {
        FakeReader::new(
            vec![category(1, "Tech"), category(2, "News")],
            vec![entry(10, 2, "A"), entry(11, 1, "B"), entry(12, 2, "C")],
        )
    }

    #[test]
    fn keeps_only_configured_category_in_order() {
        let doc = collect_document(&sample_reader(), "News", None).unwrap();
        let titles: Vec<&str> = doc.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"]);
        assert!(doc.sections[0].heading.contains("https://example.com/10"));
        assert_eq!(doc.sections[1].body, "<p>content 12</p>");
    }

    #[test]
    fn unknown_category_yields_empty_document() {
        let doc = collect_document(&sample_reader(), "Sports", None).unwrap();
        assert!(doc.sections.is_empty());
    }

    #[test]
    fn category_match_is_case_sensitive() {
        let doc = collect_document(&sample_reader(), "news", None).unwrap();
        assert!(doc.sections.is_empty());
    }

    #[test]
    fn category_fetch_error_stops_before_entries() {
        let mut reader = sample_reader();
        reader.categories = Err(500);
        let result = collect_document(&reader, "News", None);
        assert!(matches!(
            result,
            Err(ApiError::HttpStatus { status: 500, .. })
        ));
        assert_eq!(*reader.calls.borrow(), vec!["categories"]);
    }

    #[test]
    fn progress_reports_each_kept_entry_in_order() {
        let seen: RefCell<Vec<(usize, i64)>> = RefCell::new(Vec::new());
        let cb = |n: usize, e: &Entry| seen.borrow_mut().push((n, e.id));
        collect_document(&sample_reader(), "News", Some(&cb)).unwrap();
        assert_eq!(*seen.borrow(), vec![(1, 10), (2, 12)]);
    }

    #[test]
    fn repeated_runs_produce_identical_documents() {
        let reader = sample_reader();
        let a = collect_document(&reader, "News", None).unwrap();
        let b = collect_document(&reader, "News", None).unwrap();
        assert_eq!(a, b);
    }
}
