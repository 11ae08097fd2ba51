//! miniflux-epub: exports unread Miniflux entries from one category as an EPUB.

pub mod cli;
pub mod config;
pub mod document;
pub mod epub;
pub mod export;
pub mod miniflux;
pub mod model;

// Re-exports for CLI and consumers.
pub use config::{ConfigError, Settings};
pub use document::assemble;
pub use epub::{write_epub, EpubError};
pub use export::collect_document;
pub use miniflux::{
    filter_entries, find_category, ApiError, EntryQuery, FeedReader, MinifluxClient,
    MinifluxClientBuilder,
};
pub use model::{Category, Document, Entry, Section};
