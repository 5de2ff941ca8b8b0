//! Folder naming patterns.
//!
//! A pattern such as `$First/$Author/$Title ($Year)` is rendered from book
//! attributes in one left-to-right pass, so text produced by a substitution is
//! never expanded again. The result is then reduced to a safe character set.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(First|first|Author|author|Title|title|Year)")
        .unwrap_or_else(|err| panic!("invalid token pattern: {err}"))
});

static UNSAFE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^ 0-9a-zA-Z\-\[\]()_/]")
        .unwrap_or_else(|err| panic!("invalid sanitizer pattern: {err}"))
});

/// Render `pattern` for a book, returning `None` when nothing safe remains.
///
/// Unknown `$Tokens` are kept verbatim before sanitising, which strips their `$`.
/// A missing publication date renders `$Year` as an empty string.
#[must_use]
pub fn resolve(
    pattern: &str,
    author: &str,
    title: &str,
    published: Option<NaiveDate>,
) -> Option<String> {
    let first = author.chars().next();
    let rendered = TOKEN.replace_all(pattern, |caps: &Captures<'_>| match &caps[1] {
        "First" => first.map(|c| c.to_uppercase().collect()).unwrap_or_default(),
        "first" => first.map(|c| c.to_lowercase().collect()).unwrap_or_default(),
        "Author" => author.to_string(),
        "author" => author.to_lowercase(),
        "Title" => title.to_string(),
        "title" => title.to_lowercase(),
        "Year" => published
            .map(|date| format!("{:04}", date.year()))
            .unwrap_or_default(),
        other => format!("${other}"),
    });
    let sanitized = sanitize(&rendered);
    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Strip every character outside letters, digits, space, `-`, `(`, `)`, `[`, `]`, `_` and `/`.
#[must_use]
pub fn sanitize(value: &str) -> String {
    UNSAFE.replace_all(value, "").into_owned()
}

/// Join a resolved folder onto `root`, ignoring empty segments.
///
/// Returns `None` when the folder has no usable segment, so a release can never
/// land directly in (or above) the library root.
#[must_use]
pub fn destination_for(root: &Path, folder: &str) -> Option<PathBuf> {
    let segments: Vec<&str> = folder
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        return None;
    }
    let mut path = root.to_path_buf();
    path.extend(segments);
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn is_safe(c: char) -> bool {
        c.is_ascii_alphanumeric() || " -()[]_/".contains(c)
    }

    #[test]
    fn renders_every_token() {
        let resolved = resolve(
            "$First/$first/$Author/$author/$Title/$title/$Year",
            "Jane Doe",
            "Great Book",
            date(2020, 1, 1),
        );
        assert_eq!(
            resolved.as_deref(),
            Some("J/j/Jane Doe/jane doe/Great Book/great book/2020")
        );
    }

    #[test]
    fn default_style_pattern() {
        assert_eq!(
            resolve("$Author/$Title ($Year)", "Jane Doe", "Great Book", date(2020, 1, 1))
                .as_deref(),
            Some("Jane Doe/Great Book (2020)")
        );
    }

    #[test]
    fn substituted_text_is_not_expanded_again() {
        assert_eq!(
            resolve("$Title", "Jane Doe", "Cost in $Author", None).as_deref(),
            Some("Cost in Author")
        );
    }

    #[test]
    fn repeated_tokens_are_all_replaced() {
        assert_eq!(
            resolve("$Author - $Author", "Ann", "T", None).as_deref(),
            Some("Ann - Ann")
        );
    }

    #[test]
    fn unknown_tokens_lose_their_sigil() {
        assert_eq!(
            resolve("$Series/$Title", "A", "Book", None).as_deref(),
            Some("Series/Book")
        );
    }

    #[test]
    fn unsafe_characters_are_stripped() {
        let resolved = resolve(
            "$Author/$Title",
            "J.R.R. Tolkien",
            "The Hobbit: There & Back Again?",
            None,
        );
        assert_eq!(
            resolved.as_deref(),
            Some("JRR Tolkien/The Hobbit There  Back Again")
        );
        let resolved = resolve("$Title", "Émile Zola", "Thérèse Raquin", None);
        assert!(resolved.is_some_and(|value| value.chars().all(is_safe)));
    }

    #[test]
    fn empty_after_sanitising_is_none() {
        assert_eq!(resolve("$Title", "A", "???", None), None);
        assert_eq!(resolve("", "A", "B", None), None);
        assert_eq!(resolve("$First", "", "B", None), None);
    }

    #[test]
    fn missing_year_renders_empty() {
        assert_eq!(
            resolve("$Title ($Year)", "A", "Book", None).as_deref(),
            Some("Book ()")
        );
    }

    #[test]
    fn destination_skips_empty_segments() {
        let root = Path::new("/library");
        assert_eq!(
            destination_for(root, "/Jane Doe//Great Book (2020)/"),
            Some(PathBuf::from("/library/Jane Doe/Great Book (2020)"))
        );
        assert_eq!(destination_for(root, "/ / "), None);
    }
}
