use crate::storage::{Book, BookChanges, BookFilter, JsonlStorage};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<JsonlStorage>,
}

/// Body of add and update requests.
///
/// Every field decodes leniently so that the name and page checks run
/// before any other field is required.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookPayload {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub publisher: Option<String>,
    pub page_count: Option<u32>,
    pub read_page: Option<u32>,
    pub reading: Option<bool>,
}

/// Which write a payload is validated for; selects the failure wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Add,
    Update,
}

impl WriteAction {
    fn verb(self) -> &'static str {
        match self {
            WriteAction::Add => "menambahkan",
            WriteAction::Update => "memperbarui",
        }
    }
}

impl BookPayload {
    /// Validate the request: name, then the page bounds, then the
    /// remaining required fields
    pub fn validate(self, action: WriteAction) -> Result<BookChanges, AppError> {
        let verb = action.verb();

        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(AppError::BadRequest(format!("Gagal {verb} buku. Mohon isi nama buku")));
            }
        };

        if let (Some(read_page), Some(page_count)) = (self.read_page, self.page_count) {
            if read_page > page_count {
                return Err(AppError::BadRequest(format!(
                    "Gagal {verb} buku. readPage tidak boleh lebih besar dari pageCount"
                )));
            }
        }

        Ok(BookChanges {
            name,
            year: required(self.year, "year", verb)?,
            author: required(self.author, "author", verb)?,
            summary: required(self.summary, "summary", verb)?,
            publisher: self.publisher,
            page_count: required(self.page_count, "pageCount", verb)?,
            read_page: required(self.read_page, "readPage", verb)?,
            reading: required(self.reading, "reading", verb)?,
        })
    }
}

fn required<T>(value: Option<T>, field: &str, verb: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::BadRequest(format!("Gagal {verb} buku. Mohon isi {field}")))
}

/// Query string of the list endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ListBooksQuery {
    pub name: Option<String>,
    pub reading: Option<String>,
    pub finished: Option<String>,
}

impl ListBooksQuery {
    pub fn into_filter(self) -> BookFilter {
        BookFilter {
            name: self.name,
            reading: self.reading.as_deref().map(parse_flag),
            finished: self.finished.as_deref().map(parse_flag),
        }
    }
}

/// Truthiness of a query flag under JavaScript `Number()` coercion:
/// non-zero numbers (including hex, octal and binary literals and
/// `Infinity`) are true; zero, blank and anything that coerces to NaN
/// are false.
pub fn parse_flag(raw: &str) -> bool {
    let value = coerce_number(raw);
    value != 0.0 && !value.is_nan()
}

fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return parse_radix(digits, radix);
        }
    }

    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if unsigned == "Infinity" {
        return if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    // Rust also accepts `inf`, `infinity` and `nan`; those are NaN here
    if !unsigned
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return f64::NAN;
    }

    trimmed.parse().unwrap_or(f64::NAN)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0, |acc, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

/// Envelope for successful responses
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
            data: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedBook {
    pub book_id: String,
}

#[derive(Debug, Serialize)]
pub struct BookList {
    pub books: Vec<BookSummary>,
}

/// Reduced view returned by the list endpoint
#[derive(Debug, Serialize)]
pub struct BookSummary {
    pub id: String,
    pub name: String,
    pub publisher: Option<String>,
}

impl From<Book> for BookSummary {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            name: book.name,
            publisher: book.publisher,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookDetail {
    pub book: Book,
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub total_books: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
    /// Body the JSON extractor refused: 415 without a JSON content type,
    /// 400 otherwise
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

impl AppError {
    /// Log `source` and surface `message` to the client
    pub fn internal(message: &str, source: anyhow::Error) -> Self {
        error!(error = ?source, "{message}");
        AppError::Internal(message.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection {
            JsonRejection::MissingJsonContentType(_) => rejection.status(),
            _ => StatusCode::BAD_REQUEST,
        };
        AppError::Rejected {
            status,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "fail", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "fail", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "error", msg),
            AppError::Rejected { status, message } => (status, "fail", message),
        };

        (status, Json(ErrorResponse { status: kind, message })).into_response()
    }
}
