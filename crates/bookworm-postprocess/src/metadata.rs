//! OPF sidecar generation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bookworm_library::Book;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event as XmlEvent};
use tracing::debug;

use crate::error::{PostProcessError, PostProcessResult};

const OPF_NAMESPACE: &str = "http://www.idpf.org/2007/opf";
const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// Writes the OPF descriptor next to relocated content.
#[derive(Debug, Clone)]
pub struct MetadataWriter {
    file_name: String,
}

impl MetadataWriter {
    /// Writer producing `file_name` inside each destination.
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Sidecar file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Write the sidecar for `book` into `destination`, returning its path.
    ///
    /// The document is written to a hidden temp file first and renamed into place.
    ///
    /// # Errors
    ///
    /// Returns [`PostProcessError::MetadataGenerationFailed`] when `book` is absent
    /// or the document cannot be rendered or written.
    pub fn write(&self, book: Option<&Book>, destination: &Path) -> PostProcessResult<PathBuf> {
        let Some(book) = book else {
            return Err(PostProcessError::metadata(
                "metadata.book_missing",
                destination,
                None,
            ));
        };
        let target = destination.join(&self.file_name);
        let document = render_opf(book)
            .map_err(|err| PostProcessError::metadata("metadata.render", &target, Some(err)))?;
        let staged = destination.join(format!(".{}.tmp", self.file_name));
        fs::write(&staged, document)
            .map_err(|err| PostProcessError::metadata("metadata.write", &staged, Some(err)))?;
        fs::rename(&staged, &target)
            .map_err(|err| PostProcessError::metadata("metadata.rename", &target, Some(err)))?;
        debug!(path = %target.display(), book_id = %book.id, "metadata written");
        Ok(target)
    }
}

/// Render an OPF 2.0 package document for `book`.
///
/// # Errors
///
/// Returns an IO error if the XML writer fails.
pub fn render_opf(book: &Book) -> io::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(
        &mut writer,
        XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut package = BytesStart::new("package");
    package.push_attribute(("xmlns", OPF_NAMESPACE));
    package.push_attribute(("unique-identifier", "BookId"));
    package.push_attribute(("version", "2.0"));
    emit(&mut writer, XmlEvent::Start(package))?;

    let mut metadata = BytesStart::new("metadata");
    metadata.push_attribute(("xmlns:dc", DC_NAMESPACE));
    metadata.push_attribute(("xmlns:opf", OPF_NAMESPACE));
    emit(&mut writer, XmlEvent::Start(metadata))?;

    element(
        &mut writer,
        "dc:identifier",
        &[("id", "BookId"), ("opf:scheme", "bookworm")],
        &book.id,
    )?;
    element(&mut writer, "dc:title", &[], &book.title)?;
    element(
        &mut writer,
        "dc:creator",
        &[("opf:role", "aut")],
        &book.author_name,
    )?;
    if let Some(published) = book.published {
        element(
            &mut writer,
            "dc:date",
            &[],
            &published.format("%Y-%m-%d").to_string(),
        )?;
    }
    optional(&mut writer, "dc:publisher", &[], book.publisher.as_deref())?;
    optional(&mut writer, "dc:language", &[], book.language.as_deref())?;
    optional(&mut writer, "dc:description", &[], book.description.as_deref())?;
    optional(
        &mut writer,
        "dc:identifier",
        &[("opf:scheme", "ISBN")],
        book.isbn.as_deref(),
    )?;
    optional(&mut writer, "dc:source", &[], book.provider.as_deref())?;
    if let Some(pages) = book.page_count {
        meta(&mut writer, "bookworm:page_count", &pages.to_string())?;
    }
    if let Some(rating) = book.average_rating {
        meta(&mut writer, "bookworm:average_rating", &rating.to_string())?;
    }
    for (name, value) in [
        ("bookworm:image", book.image.as_deref()),
        ("bookworm:image_small", book.image_small.as_deref()),
    ] {
        if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
            meta(&mut writer, name, value)?;
        }
    }

    emit(&mut writer, XmlEvent::End(BytesEnd::new("metadata")))?;
    emit(&mut writer, XmlEvent::End(BytesEnd::new("package")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: XmlEvent<'_>) -> io::Result<()> {
    writer.write_event(event).map_err(io::Error::other)
}

fn element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    attributes: &[(&str, &str)],
    text: &str,
) -> io::Result<()> {
    let mut start = BytesStart::new(name);
    for attribute in attributes {
        start.push_attribute(*attribute);
    }
    emit(writer, XmlEvent::Start(start))?;
    emit(writer, XmlEvent::Text(BytesText::new(text)))?;
    emit(writer, XmlEvent::End(BytesEnd::new(name)))
}

fn optional(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    attributes: &[(&str, &str)],
    text: Option<&str>,
) -> io::Result<()> {
    match text.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => element(writer, name, attributes, value),
        None => Ok(()),
    }
}

fn meta(writer: &mut Writer<Vec<u8>>, name: &str, content: &str) -> io::Result<()> {
    let mut tag = BytesStart::new("meta");
    tag.push_attribute(("name", name));
    tag.push_attribute(("content", content));
    emit(writer, XmlEvent::Empty(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

    fn book() -> Book {
        let mut book = Book::new("b-1", "Tales & <Legends>", "Jane Doe");
        book.published = NaiveDate::from_ymd_opt(2020, 1, 1);
        book.isbn = Some("9780000000001".into());
        book.language = Some("en".into());
        book.page_count = Some(320);
        book.image = Some("https://covers.example.org/b-1.jpg?size=L&v=2".into());
        book
    }

    #[test]
    fn opf_contains_escaped_core_fields() -> TestResult<()> {
        let opf = render_opf(&book())?;
        assert!(opf.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(opf.contains("<dc:title>Tales &amp; &lt;Legends&gt;</dc:title>"));
        assert!(opf.contains("<dc:creator opf:role=\"aut\">Jane Doe</dc:creator>"));
        assert!(opf.contains("<dc:date>2020-01-01</dc:date>"));
        assert!(opf.contains("opf:scheme=\"ISBN\">9780000000001</dc:identifier>"));
        assert!(opf.contains("name=\"bookworm:page_count\" content=\"320\""));
        assert!(opf.contains(
            "name=\"bookworm:image\" content=\"https://covers.example.org/b-1.jpg?size=L&amp;v=2\""
        ));
        assert!(!opf.contains("bookworm:image_small"));
        assert!(!opf.contains("dc:publisher"));
        Ok(())
    }

    #[test]
    fn write_places_sidecar_atomically() -> TestResult<()> {
        let dir = tempfile::Builder::new()
            .prefix("bookworm-metadata-")
            .tempdir()?;
        let writer = MetadataWriter::new("metadata.opf");
        let path = writer.write(Some(&book()), dir.path())?;
        assert_eq!(path, dir.path().join("metadata.opf"));
        assert!(fs::read_to_string(&path)?.contains("<package"));
        assert!(!dir.path().join(".metadata.opf.tmp").exists());
        Ok(())
    }

    #[test]
    fn missing_book_is_reported() {
        let writer = MetadataWriter::new("metadata.opf");
        let result = writer.write(None, Path::new("/library/x"));
        assert!(matches!(
            result,
            Err(PostProcessError::MetadataGenerationFailed {
                operation: "metadata.book_missing",
                source: None,
                ..
            })
        ));
    }
}
