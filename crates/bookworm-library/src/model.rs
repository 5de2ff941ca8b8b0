//! Book and release records.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a tracked book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    /// The user wants this book.
    Wanted,
    /// Newly discovered and wanted by default.
    #[default]
    WantedNew,
    /// The user chose to skip this book.
    Skipped,
    /// Content is in the library.
    Downloaded,
    /// A release was grabbed and is downloading.
    Snatched,
    /// Never search for this book.
    Excluded,
}

impl BookStatus {
    /// Stable lower-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wanted => "wanted",
            Self::WantedNew => "wanted_new",
            Self::Skipped => "skipped",
            Self::Downloaded => "downloaded",
            Self::Snatched => "snatched",
            Self::Excluded => "excluded",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "wanted" => Ok(Self::Wanted),
            "wanted_new" => Ok(Self::WantedNew),
            "skipped" => Ok(Self::Skipped),
            "downloaded" => Ok(Self::Downloaded),
            "snatched" => Ok(Self::Snatched),
            "excluded" => Ok(Self::Excluded),
            other => Err(format!("unknown book status '{other}'")),
        }
    }
}

/// Lifecycle of a single release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    /// Found by a search but not grabbed.
    #[default]
    Wanted,
    /// Handed to a downloader.
    Snatched,
    /// Relocated into the library.
    Downloaded,
    /// Rejected by the user.
    Ignored,
}

impl ReleaseStatus {
    /// Stable lower-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wanted => "wanted",
            Self::Snatched => "snatched",
            Self::Downloaded => "downloaded",
            Self::Ignored => "ignored",
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Stable identifier.
    pub id: String,
    /// Title as shown in the library.
    pub title: String,
    /// Display name of the primary author.
    pub author_name: String,
    /// Current lifecycle status.
    #[serde(default)]
    pub status: BookStatus,
    /// Publication date, when known.
    #[serde(default)]
    pub published: Option<NaiveDate>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Publisher name.
    #[serde(default)]
    pub publisher: Option<String>,
    /// Language code (e.g. `en`).
    #[serde(default)]
    pub language: Option<String>,
    /// Number of pages.
    #[serde(default)]
    pub page_count: Option<u32>,
    /// Average rating reported by the catalog provider.
    #[serde(default)]
    pub average_rating: Option<f32>,
    /// ISBN (10 or 13).
    #[serde(default)]
    pub isbn: Option<String>,
    /// Catalog provider the record came from.
    #[serde(default)]
    pub provider: Option<String>,
    /// Provider API link for the record.
    #[serde(default)]
    pub api_link: Option<String>,
    /// Cover image reference.
    #[serde(default)]
    pub image: Option<String>,
    /// Thumbnail cover image reference.
    #[serde(default)]
    pub image_small: Option<String>,
    /// Last modification time.
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

impl Book {
    /// Create a book with the required attributes and no descriptive metadata.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        author_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author_name: author_name.into(),
            status: BookStatus::default(),
            published: None,
            description: None,
            publisher: None,
            language: None,
            page_count: None,
            average_rating: None,
            isbn: None,
            provider: None,
            api_link: None,
            image: None,
            image_small: None,
            updated: None,
        }
    }

    /// Whether the user still wants this book.
    #[must_use]
    pub const fn is_wanted(&self) -> bool {
        matches!(self.status, BookStatus::Wanted | BookStatus::WantedNew)
    }

    /// Four-digit publication year, when the date is known.
    #[must_use]
    pub fn published_year(&self) -> Option<i32> {
        self.published.map(|date| date.year())
    }
}

/// One downloaded instance of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Globally unique identifier embedded in staging directory names.
    pub guid: String,
    /// Release title as reported by the indexer.
    pub title: String,
    /// Identifier of the owning book.
    pub book_id: String,
    /// Current lifecycle status.
    #[serde(default)]
    pub status: ReleaseStatus,
    /// Directory holding the content; staging while matched, library once processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Release {
    /// Create a release for `book_id`.
    #[must_use]
    pub fn new(
        guid: impl Into<String>,
        title: impl Into<String>,
        book_id: impl Into<String>,
    ) -> Self {
        Self {
            guid: guid.into(),
            title: title.into(),
            book_id: book_id.into(),
            status: ReleaseStatus::default(),
            directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_use_snake_case_identifiers() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&BookStatus::WantedNew)?, "\"wanted_new\"");
        assert_eq!(serde_json::to_string(&ReleaseStatus::Downloaded)?, "\"downloaded\"");
        for status in [
            BookStatus::Wanted,
            BookStatus::WantedNew,
            BookStatus::Skipped,
            BookStatus::Downloaded,
            BookStatus::Snatched,
            BookStatus::Excluded,
        ] {
            assert_eq!(status.as_str().parse::<BookStatus>(), Ok(status));
        }
        assert!("archived".parse::<BookStatus>().is_err());
        Ok(())
    }

    #[test]
    fn new_book_defaults_to_wanted_new() {
        let mut book = Book::new("b-1", "Great Book", "Jane Doe");
        assert_eq!(book.status, BookStatus::WantedNew);
        assert!(book.is_wanted());
        book.status = BookStatus::Snatched;
        assert!(!book.is_wanted());
        assert_eq!(book.published_year(), None);
        book.published = NaiveDate::from_ymd_opt(2020, 1, 1);
        assert_eq!(book.published_year(), Some(2020));
    }

    #[test]
    fn release_omits_unset_directory() -> Result<(), serde_json::Error> {
        let release = Release::new("ABC123", "Great Book [epub]", "b-1");
        let encoded = serde_json::to_value(&release)?;
        assert!(encoded.get("directory").is_none());
        assert_eq!(encoded["status"], "wanted");
        Ok(())
    }
}
