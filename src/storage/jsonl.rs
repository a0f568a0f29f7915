use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::book::{Book, BookChanges, BookFilter};

/// Insert refused because the id is already taken
#[derive(Debug, Error)]
#[error("Duplicate book id {0}")]
pub struct DuplicateId(pub String);

/// Book collection persisted as JSON lines, one document per line.
///
/// Documents live in memory; every mutation rewrites the file through a
/// temporary sibling and a rename while the write lock is held. A failed
/// write leaves the in-memory collection untouched.
pub struct JsonlStorage {
    path: PathBuf,
    documents: RwLock<Vec<Book>>,
}

impl JsonlStorage {
    /// Open (or create) the collection at `path`
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
        }

        let documents = match fs::read_to_string(&path).await {
            Ok(content) => parse_documents(&path, &content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::write(&path, "")
                    .await
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                Vec::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        info!(path = %path.display(), documents = documents.len(), "Book collection opened");

        Ok(Self {
            path,
            documents: RwLock::new(documents),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn count(&self) -> usize {
        self.documents.read().await.len()
    }

    /// All documents matching `filter`, in insertion order
    pub async fn find(&self, filter: &BookFilter) -> Vec<Book> {
        self.documents
            .read()
            .await
            .iter()
            .filter(|book| filter.matches(book))
            .cloned()
            .collect()
    }

    pub async fn find_one(&self, id: &str) -> Option<Book> {
        self.documents
            .read()
            .await
            .iter()
            .find(|book| book.id == id)
            .cloned()
    }

    pub async fn insert(&self, book: Book) -> Result<()> {
        let mut documents = self.documents.write().await;
        if documents.iter().any(|existing| existing.id == book.id) {
            return Err(DuplicateId(book.id).into());
        }

        let mut next = documents.clone();
        next.push(book);
        self.persist(&next).await?;
        *documents = next;
        Ok(())
    }

    /// Apply `changes` to the document with `id`. Returns whether one matched.
    pub async fn update_one(
        &self,
        id: &str,
        changes: BookChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut documents = self.documents.write().await;
        let Some(position) = documents.iter().position(|book| book.id == id) else {
            return Ok(false);
        };

        let mut next = documents.clone();
        next[position].apply(changes, updated_at);
        self.persist(&next).await?;
        *documents = next;
        Ok(true)
    }

    /// Remove the document with `id`. Returns whether one was removed.
    pub async fn delete_one(&self, id: &str) -> Result<bool> {
        let mut documents = self.documents.write().await;
        let Some(position) = documents.iter().position(|book| book.id == id) else {
            return Ok(false);
        };

        let mut next = documents.clone();
        next.remove(position);
        self.persist(&next).await?;
        *documents = next;
        Ok(true)
    }

    /// Rewrite the file from the in-memory snapshot
    pub async fn flush(&self) -> Result<()> {
        let documents = self.documents.read().await;
        self.persist(&documents).await
    }

    async fn persist(&self, documents: &[Book]) -> Result<()> {
        let mut content = String::new();
        for book in documents {
            content.push_str(&serde_json::to_string(book).context("Failed to serialize book")?);
            content.push('\n');
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(documents = documents.len(), "Book collection persisted");
        Ok(())
    }
}

fn parse_documents(path: &Path, content: &str) -> Result<Vec<Book>> {
    let mut documents: Vec<Book> = Vec::new();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let book: Book = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid book document", path.display(), index + 1))?;

        if documents.iter().any(|existing| existing.id == book.id) {
            bail!("{}:{}: duplicate book id {}", path.display(), index + 1, book.id);
        }
        documents.push(book);
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::book::now;
    use tempfile::tempdir;

    fn changes(name: &str, page_count: u32, read_page: u32, reading: bool) -> BookChanges {
        BookChanges {
            name: name.to_string(),
            year: 2020,
            author: "Jane".to_string(),
            summary: "Summary".to_string(),
            publisher: None,
            page_count,
            read_page,
            reading,
        }
    }

    #[tokio::test]
    async fn open_creates_missing_file_and_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/books.jsonl");

        let storage = JsonlStorage::open(&path).await.unwrap();

        assert!(path.exists());
        assert_eq!(storage.count().await, 0);
    }

    #[tokio::test]
    async fn writes_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("books.jsonl");

        let storage = JsonlStorage::open(&path).await.unwrap();
        let kept = Book::create(changes("Kept", 10, 5, true), now());
        let dropped = Book::create(changes("Dropped", 10, 10, false), now());
        storage.insert(kept.clone()).await.unwrap();
        storage.insert(dropped.clone()).await.unwrap();
        assert!(storage.delete_one(&dropped.id).await.unwrap());

        let reopened = JsonlStorage::open(&path).await.unwrap();
        assert_eq!(reopened.find(&BookFilter::default()).await, vec![kept]);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id() {
        let dir = tempdir().unwrap();
        let storage = JsonlStorage::open(dir.path().join("books.jsonl")).await.unwrap();
        let book = Book::create(changes("A", 1, 0, false), now());

        storage.insert(book.clone()).await.unwrap();
        let err = storage.insert(book).await.unwrap_err();
        assert!(err.is::<DuplicateId>());
        assert_eq!(storage.count().await, 1);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_ids() {
        let dir = tempdir().unwrap();
        let storage = JsonlStorage::open(dir.path().join("books.jsonl")).await.unwrap();

        let updated = storage
            .update_one("book-missing", changes("A", 1, 1, false), now())
            .await
            .unwrap();
        assert!(!updated);
        assert!(!storage.delete_one("book-missing").await.unwrap());
    }

    #[tokio::test]
    async fn update_replaces_fields_and_keeps_identity() {
        let dir = tempdir().unwrap();
        let storage = JsonlStorage::open(dir.path().join("books.jsonl")).await.unwrap();
        let book = Book::create(changes("Before", 100, 10, true), now());
        storage.insert(book.clone()).await.unwrap();

        let later = book.inserted_at + chrono::Duration::seconds(1);
        assert!(storage
            .update_one(&book.id, changes("After", 100, 100, false), later)
            .await
            .unwrap());

        let stored = storage.find_one(&book.id).await.unwrap();
        assert_eq!(stored.name, "After");
        assert!(stored.finished);
        assert_eq!(stored.inserted_at, book.inserted_at);
        assert_eq!(stored.updated_at, later);
    }

    #[tokio::test]
    async fn open_reports_malformed_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("books.jsonl");
        std::fs::write(&path, "\n{not json}\n").unwrap();

        let err = JsonlStorage::open(&path).await.err().unwrap();
        assert!(format!("{err:#}").contains(":2: invalid book document"));
    }
}
