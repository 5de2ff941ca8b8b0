use std::fs;

use bookworm_library::{
    Book, BookStatus, JsonRecordStore, LibraryError, RecordStore, Release, ReleaseStatus,
};
use chrono::NaiveDate;
use tempfile::TempDir;

type TestResult<T> = anyhow::Result<T>;

fn temp_dir() -> TestResult<TempDir> {
    Ok(tempfile::Builder::new()
        .prefix("bookworm-library-")
        .tempdir()?)
}

#[tokio::test]
async fn saved_records_survive_reopen() -> TestResult<()> {
    let dir = temp_dir()?;
    let path = dir.path().join("nested").join("library.json");

    let store = JsonRecordStore::open(&path).await?;
    assert!(store.find_book("b-1").await?.is_none());

    let mut book = Book::new("b-1", "Great Book", "Jane Doe");
    book.status = BookStatus::Snatched;
    book.published = NaiveDate::from_ymd_opt(2020, 1, 1);
    let mut release = Release::new("ABC123", "Great Book [epub]", "b-1");
    release.status = ReleaseStatus::Snatched;
    store.save_book(&book).await?;
    store.save_release(&release).await?;
    drop(store);

    let reopened = JsonRecordStore::open(&path).await?;
    assert_eq!(reopened.find_book("b-1").await?, Some(book));
    assert_eq!(reopened.find_release("ABC123").await?, Some(release));
    assert!(!path.with_file_name("library.json.tmp").exists());
    Ok(())
}

#[tokio::test]
async fn corrupt_snapshot_is_reported() -> TestResult<()> {
    let dir = temp_dir()?;
    let path = dir.path().join("library.json");
    fs::write(&path, b"[not a snapshot")?;

    let result = JsonRecordStore::open(&path).await;
    assert!(matches!(
        result,
        Err(LibraryError::Serialization {
            operation: "store.parse",
            ..
        })
    ));
    Ok(())
}
