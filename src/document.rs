//! Document assembly: one section per entry, in the order given.

use crate::config::{DOCUMENT_AUTHOR, DOCUMENT_IDENTIFIER, DOCUMENT_MODIFIED, DOCUMENT_TITLE};
use crate::model::{Document, Entry, Section};

/// Escape text for HTML element content and double-quoted attributes.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render one entry as a section.
///
/// Title, feed title, and URL are escaped. `entry.content` is already HTML and is kept verbatim.
pub fn section_for(entry: &Entry) -> Section {
    Section {
        title: entry.title.clone(),
        heading: format!(
            "<h1><a href=\"{}\">{}</a></h1>",
            html_escape(&entry.url),
            html_escape(&entry.title)
        ),
        byline: format!("<p>from <em>{}</em></p>", html_escape(&entry.feed.title)),
        body: entry.content.clone(),
    }
}

/// Build the document with fixed title and author, appending a section per entry.
pub fn assemble(entries: &[Entry]) -> Document {
    Document {
        title: DOCUMENT_TITLE.to_string(),
        author: DOCUMENT_AUTHOR.to_string(),
        identifier: DOCUMENT_IDENTIFIER.to_string(),
        modified: DOCUMENT_MODIFIED.to_string(),
        sections: entries.iter().map(section_for).collect(),
    }
}
