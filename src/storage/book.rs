use chrono::{DateTime, SubsecRound, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_PREFIX: &str = "book-";
const ID_LENGTH: usize = 16;
const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// A catalogued book as stored in the collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub name: String,
    pub year: i32,
    pub author: String,
    pub summary: String,
    pub publisher: Option<String>,
    pub page_count: u32,
    pub read_page: u32,
    pub reading: bool,
    pub finished: bool,
    #[serde(with = "iso_millis")]
    pub inserted_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

/// The user-editable part of a book, replaced wholesale on every write
#[derive(Debug, Clone, PartialEq)]
pub struct BookChanges {
    pub name: String,
    pub year: i32,
    pub author: String,
    pub summary: String,
    pub publisher: Option<String>,
    pub page_count: u32,
    pub read_page: u32,
    pub reading: bool,
}

impl BookChanges {
    pub fn is_finished(&self) -> bool {
        self.read_page == self.page_count
    }
}

impl Book {
    /// Build a fresh document with a new id and both timestamps set to `now`
    pub fn create(changes: BookChanges, now: DateTime<Utc>) -> Self {
        let finished = changes.is_finished();
        Self {
            id: generate_book_id(),
            name: changes.name,
            year: changes.year,
            author: changes.author,
            summary: changes.summary,
            publisher: changes.publisher,
            page_count: changes.page_count,
            read_page: changes.read_page,
            reading: changes.reading,
            finished,
            inserted_at: now,
            updated_at: now,
        }
    }

    /// Replace every mutable field, keeping `id` and `inserted_at`
    pub fn apply(&mut self, changes: BookChanges, now: DateTime<Utc>) {
        self.finished = changes.is_finished();
        self.name = changes.name;
        self.year = changes.year;
        self.author = changes.author;
        self.summary = changes.summary;
        self.publisher = changes.publisher;
        self.page_count = changes.page_count;
        self.read_page = changes.read_page;
        self.reading = changes.reading;
        self.updated_at = now;
    }
}

/// Conjunctive filter for listing books. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilter {
    pub name: Option<String>,
    pub reading: Option<bool>,
    pub finished: Option<bool>,
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        self.name.as_deref().is_none_or(|name| book.name == name)
            && self.reading.is_none_or(|reading| book.reading == reading)
            && self.finished.is_none_or(|finished| book.finished == finished)
    }
}

/// Current time at the precision the documents are stored with
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// `book-` followed by 16 URL-safe random characters
pub fn generate_book_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{ID_PREFIX}{suffix}")
}

/// ISO 8601 with millisecond precision and a `Z` suffix
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
