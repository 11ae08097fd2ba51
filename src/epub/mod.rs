//! EPUB writer. Serializes a [Document](crate::model::Document) as an EPUB 3 package
//! (mimetype, container, OPF, nav, NCX, title page, one XHTML file per section).
//!
//! Output is deterministic: zip timestamps are fixed, `dcterms:modified` comes from the document,
//! and no random ids are generated, so the same document always produces the same bytes.

use crate::document::html_escape;
use crate::model::Document;
use std::io::{Seek, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTAINER_XML: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n  <rootfiles>\n    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>\n  </rootfiles>\n</container>";

const MIMETYPE: &[u8] = b"application/epub+zip";
const OEBPS_PREFIX: &str = "OEBPS/";

/// Errors from the EPUB writer. Maps to CLI exit code 3.
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Cannot write EPUB: document title is empty.")]
    EmptyTitle,

    #[error("Cannot write EPUB: document author is empty.")]
    EmptyAuthor,

    #[error("Failed to create EPUB file: {path}: {source}")]
    CreateFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to replace EPUB file: {path}: {source}")]
    Persist {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write EPUB archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl From<std::io::Error> for EpubError {
    fn from(e: std::io::Error) -> Self {
        EpubError::Zip(zip::result::ZipError::Io(e))
    }
}

/// Write `doc` to `path`, replacing any existing file.
///
/// The archive is built in a temporary file next to `path` and renamed over it only once
/// complete, so a failed write leaves any previous file untouched.
/// A document with no sections is still a valid EPUB: the title page is always present.
pub fn write_epub(doc: &Document, path: &Path) -> Result<(), EpubError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| EpubError::CreateFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let tmp = write_epub_to(doc, tmp)?;
    tmp.persist(path).map_err(|e| EpubError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Write `doc` as an EPUB archive into any seekable writer. Returns the writer.
pub fn write_epub_to<W: Write + Seek>(doc: &Document, writer: W) -> Result<W, EpubError> {
    validate_document(doc)?;
    let mut zip = ZipWriter::new(writer);

    let options_stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);
    let options_deflate = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    // mimetype must be the first entry, uncompressed
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML)?;

    write_opf(doc, &mut zip, options_deflate)?;
    write_nav_xhtml(doc, &mut zip, options_deflate)?;
    write_ncx(doc, &mut zip, options_deflate)?;
    write_title_page(doc, &mut zip, options_deflate)?;
    write_sections(doc, &mut zip, options_deflate)?;

    Ok(zip.finish()?)
}

fn validate_document(doc: &Document) -> Result<(), EpubError> {
    if doc.title.trim().is_empty() {
        return Err(EpubError::EmptyTitle);
    }
    if doc.author.trim().is_empty() {
        return Err(EpubError::EmptyAuthor);
    }
    Ok(())
}

fn section_href(i: usize) -> String {
    format!("section-{}.xhtml", i + 1)
}

fn write_opf(
    doc: &Document,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let mut manifest = String::from(
        r#"    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="title-page" href="title.xhtml" media-type="application/xhtml+xml"/>
"#,
    );
    let mut spine = String::from(r#"    <itemref idref="title-page"/>"#);
    for i in 0..doc.sections.len() {
        manifest.push_str(&format!(
            "    <item id=\"section-{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            i + 1,
            section_href(i)
        ));
        spine.push_str(&format!("\n    <itemref idref=\"section-{}\"/>", i + 1));
    }

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{id}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:creator>{creator}</dc:creator>
    <dc:language>en</dc:language>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}
  </spine>
</package>
"#,
        id = xml_escape(&doc.identifier),
        title = xml_escape(&doc.title),
        creator = xml_escape(&doc.author),
        modified = xml_escape(&doc.modified),
        manifest = manifest,
        spine = spine,
    );

    zip.start_file(format!("{}content.opf", OEBPS_PREFIX), options)?;
    zip.write_all(opf.as_bytes())?;
    Ok(())
}

fn write_nav_xhtml(
    doc: &Document,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let mut links = String::from("      <li><a href=\"title.xhtml\">Title Page</a></li>\n");
    for (i, section) in doc.sections.iter().enumerate() {
        links.push_str(&format!(
            "      <li><a href=\"{}\">{}</a></li>\n",
            section_href(i),
            html_escape(&section.title)
        ));
    }
    let nav = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
  <meta charset="UTF-8"/>
  <title>Table of Contents</title>
</head>
<body>
  <nav epub:type="toc">
    <h1>Contents</h1>
    <ol>
{}    </ol>
  </nav>
</body>
</html>
"#,
        links
    );
    zip.start_file(format!("{}nav.xhtml", OEBPS_PREFIX), options)?;
    zip.write_all(nav.as_bytes())?;
    Ok(())
}

fn write_ncx(
    doc: &Document,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let mut nav_points = String::from(
        r#"    <navPoint id="navpoint-0" playOrder="1">
      <navLabel><text>Title Page</text></navLabel>
      <content src="title.xhtml"/>
    </navPoint>
"#,
    );
    for (i, section) in doc.sections.iter().enumerate() {
        nav_points.push_str(&format!(
            r#"    <navPoint id="navpoint-{}" playOrder="{}">
      <navLabel><text>{}</text></navLabel>
      <content src="{}"/>
    </navPoint>
"#,
            i + 1,
            i + 2,
            xml_escape(&section.title),
            section_href(i)
        ));
    }
    let ncx = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{}"/>
  </head>
  <docTitle>
    <text>{}</text>
  </docTitle>
  <navMap>
{}  </navMap>
</ncx>
"#,
        xml_escape(&doc.identifier),
        xml_escape(&doc.title),
        nav_points
    );
    zip.start_file(format!("{}toc.ncx", OEBPS_PREFIX), options)?;
    zip.write_all(ncx.as_bytes())?;
    Ok(())
}

fn write_title_page(
    doc: &Document,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    let count = match doc.sections.len() {
        0 => "No entries".to_string(),
        1 => "1 entry".to_string(),
        n => format!("{} entries", n),
    };
    let page = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <meta charset="UTF-8"/>
  <title>{title}</title>
</head>
<body>
  <div style="text-align: center; font-family: serif; margin-top: 3em;">
    <h1 style="font-size: 1.5em;">{title}</h1>
    <p style="margin-top: 1em;">{author}</p>
    <p>{count}</p>
  </div>
</body>
</html>
"#,
        title = html_escape(&doc.title),
        author = html_escape(&doc.author),
        count = count
    );
    zip.start_file(format!("{}title.xhtml", OEBPS_PREFIX), options)?;
    zip.write_all(page.as_bytes())?;
    Ok(())
}

fn write_sections(
    doc: &Document,
    zip: &mut ZipWriter<impl Write + Seek>,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    for (i, section) in doc.sections.iter().enumerate() {
        let html = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <meta charset="UTF-8"/>
  <title>{}</title>
</head>
<body>
{}
</body>
</html>
"#,
            html_escape(&section.title),
            section.to_html()
        );
        zip.start_file(format!("{}{}", OEBPS_PREFIX, section_href(i)), options)?;
        zip.write_all(html.as_bytes())?;
    }
    Ok(())
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Section;
    use std::io::{Cursor, Read};
    use zip::read::ZipArchive;

    fn section(title: &str, body: &str) -> Section {
        Section {
            title: title.to_string(),
            heading: format!("<h1><a href=\"https://example.com\">{}</a></h1>", title),
            byline: "<p>from <em>Feed</em></p>".to_string(),
            body: body.to_string(),
        }
    }

    fn document(sections: Vec<Section>) -> Document {
        Document {
            title: "Miniflux Entries".to_string(),
            author: "miniflux-epub".to_string(),
            identifier: "urn:test".to_string(),
            modified: "2000-01-01T00:00:00Z".to_string(),
            sections,
        }
    }

    fn to_bytes(doc: &Document) -> Vec<u8> {
        write_epub_to(doc, Cursor::new(Vec::new()))
            .unwrap()
            .into_inner()
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = zip.by_name(name).unwrap();
        let mut s = String::new();
        file.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn rejects_empty_title_and_author() {
        let mut doc = document(vec![]);
        doc.title.clear();
        assert!(matches!(
            write_epub_to(&doc, Cursor::new(Vec::new())),
            Err(EpubError::EmptyTitle)
        ));
        let mut doc = document(vec![]);
        doc.author = "  ".into();
        assert!(matches!(
            write_epub_to(&doc, Cursor::new(Vec::new())),
            Err(EpubError::EmptyAuthor)
        ));
    }

    #[test]
    fn package_layout_with_mimetype_first_and_stored() {
        let bytes = to_bytes(&document(vec![section("A", "<p>a</p>")]));
        let mut zip = ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        {
            let first = zip.by_index(0).unwrap();
            assert_eq!(first.name(), "mimetype");
            assert_eq!(first.compression(), zip::CompressionMethod::Stored);
        }
        let names: Vec<String> = zip.file_names().map(String::from).collect();
        for expected in [
            "META-INF/container.xml",
            "OEBPS/content.opf",
            "OEBPS/nav.xhtml",
            "OEBPS/toc.ncx",
            "OEBPS/title.xhtml",
            "OEBPS/section-1.xhtml",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
        assert_eq!(read_entry(&bytes, "mimetype"), "application/epub+zip");
    }

    #[test]
    fn one_file_per_section_in_spine_order() {
        let doc = document(vec![
            section("A", "<p>a</p>"),
            section("B", "<p>b</p>"),
            section("C", "<p>c</p>"),
        ]);
        let bytes = to_bytes(&doc);
        let zip = ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        let section_files = zip
            .file_names()
            .filter(|n| n.starts_with("OEBPS/section-"))
            .count();
        assert_eq!(section_files, 3);

        let opf = read_entry(&bytes, "OEBPS/content.opf");
        let p1 = opf.find("idref=\"section-1\"").unwrap();
        let p2 = opf.find("idref=\"section-2\"").unwrap();
        let p3 = opf.find("idref=\"section-3\"").unwrap();
        assert!(opf.find("idref=\"title-page\"").unwrap() < p1);
        assert!(p1 < p2 && p2 < p3);

        let s2 = read_entry(&bytes, "OEBPS/section-2.xhtml");
        assert!(s2.contains("<p>b</p>"));
        assert!(s2.contains("<em>Feed</em>"));
    }

    #[test]
    fn empty_document_still_has_title_page() {
        let bytes = to_bytes(&document(vec![]));
        let zip = ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        assert!(!zip.file_names().any(|n| n.starts_with("OEBPS/section-")));
        let title = read_entry(&bytes, "OEBPS/title.xhtml");
        assert!(title.contains("No entries"));
        let opf = read_entry(&bytes, "OEBPS/content.opf");
        assert!(opf.contains("<itemref idref=\"title-page\"/>"));
    }

    #[test]
    fn metadata_is_escaped_in_opf_and_nav() {
        let mut doc = document(vec![section("R&D <weekly>", "")]);
        doc.title = "A & B".into();
        let bytes = to_bytes(&doc);
        let opf = read_entry(&bytes, "OEBPS/content.opf");
        assert!(opf.contains("<dc:title>A &amp; B</dc:title>"));
        let nav = read_entry(&bytes, "OEBPS/nav.xhtml");
        assert!(nav.contains("R&amp;D &lt;weekly&gt;"));
    }

    #[test]
    fn output_is_byte_identical_across_writes() {
        let doc = document(vec![section("A", "<p>a</p>"), section("B", "<p>b</p>")]);
        assert_eq!(to_bytes(&doc), to_bytes(&doc));
    }

    #[test]
    fn write_epub_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.epub");
        std::fs::write(&path, vec![0u8; 200_000]).unwrap();
        let doc = document(vec![section("A", "<p>a</p>")]);
        write_epub(&doc, &path).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, to_bytes(&doc));
    }

    #[test]
    fn opf_declares_modified_exactly_once() {
        let bytes = to_bytes(&crate::document::assemble(&[]));
        let opf = read_entry(&bytes, "OEBPS/content.opf");
        assert_eq!(opf.matches("property=\"dcterms:modified\"").count(), 1);
        assert!(opf.contains(
            "<meta property=\"dcterms:modified\">2000-01-01T00:00:00Z</meta>"
        ));
    }

    #[test]
    fn failed_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.epub");
        let good = document(vec![section("A", "<p>a</p>")]);
        write_epub(&good, &path).unwrap();
        let before = std::fs::read(&path).unwrap();

        let mut bad = document(vec![]);
        bad.title.clear();
        assert!(matches!(write_epub(&bad, &path), Err(EpubError::EmptyTitle)));
        assert_eq!(std::fs::read(&path).unwrap(), before);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn write_epub_missing_directory_is_create_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.epub");
        let result = write_epub(&document(vec![]), &path);
        assert!(matches!(result, Err(EpubError::CreateFile { .. })));
    }
}
