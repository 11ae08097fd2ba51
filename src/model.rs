//! Data model: the Miniflux API payloads we read, and the document we build from them.
//!
//! API types mirror the JSON returned by `/v1/categories` and `/v1/entries`; unknown
//! fields are ignored. `Document` is the canonical shape consumed by the EPUB writer.

use serde::Deserialize;

/// A user-defined grouping of feeds.
///
/// `Category::default()` (id 0) is the "no match" value; Miniflux never assigns id 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
}

/// Category reference embedded in a feed. Only the id is needed for filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeedCategory {
    pub id: i64,
    #[serde(default)]
    pub title: String,
}

/// The source publication an entry belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub category: FeedCategory,
}

/// One article fetched from Miniflux. `content` is an HTML fragment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    pub feed: Feed,
}

/// Response body of `GET /v1/entries`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryResultSet {
    /// Total matching entries on the server, which may exceed `entries.len()`.
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// The assembled e-book: fixed metadata plus one section per exported entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub author: String,
    pub identifier: String,
    /// ISO 8601 UTC timestamp written as `dcterms:modified`.
    pub modified: String,
    pub sections: Vec<Section>,
}

/// One entry rendered as markup. Each part is already HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Plain-text title used in the table of contents.
    pub title: String,
    /// `<h1>` with the entry title linked to its source URL.
    pub heading: String,
    /// Feed attribution line.
    pub byline: String,
    /// Entry content, verbatim.
    pub body: String,
}

impl Section {
    /// Full section markup: heading, byline, then body.
    pub fn to_html(&self) -> String {
        format!("{}{}{}", self.heading, self.byline, self.body)
    }
}
