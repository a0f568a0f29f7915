use crate::api::models::*;
use crate::storage::{book, Book, DuplicateId, JsonlStorage};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

pub async fn add_book_handler(
    State(state): State<AppState>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AddedBook>>), AppError> {
    let Json(payload) = payload?;
    let changes = payload.validate(WriteAction::Add)?;

    let new_book = Book::create(changes, book::now());

    // A successful insert is durable, no read-back needed
    let book_id = insert_new_book(&state.storage, new_book, book::generate_book_id)
        .await
        .map_err(|e| AppError::internal("Buku gagal ditambahkan", e))?;

    info!(book_id = %book_id, "Book added");

    let response = ApiResponse::success(AddedBook { book_id });
    Ok((StatusCode::CREATED, Json(response.with_message("Buku berhasil ditambahkan"))))
}

/// Insert `new_book`, drawing one fresh id if the generated one is taken.
/// Returns the id the book was stored under.
async fn insert_new_book(
    storage: &JsonlStorage,
    mut new_book: Book,
    fresh_id: impl FnOnce() -> String,
) -> anyhow::Result<String> {
    match storage.insert(new_book.clone()).await {
        Err(e) if e.is::<DuplicateId>() => {
            warn!(book_id = %new_book.id, "Generated book id already taken, retrying");
            new_book.id = fresh_id();
            let book_id = new_book.id.clone();
            storage.insert(new_book).await?;
            Ok(book_id)
        }
        result => result.map(|()| new_book.id),
    }
}

pub async fn list_books_handler(
    State(state): State<AppState>,
    Query(query): Query<ListBooksQuery>,
) -> Json<ApiResponse<BookList>> {
    let filter = query.into_filter();
    let books: Vec<BookSummary> = state
        .storage
        .find(&filter)
        .await
        .into_iter()
        .map(BookSummary::from)
        .collect();

    info!(?filter, found = books.len(), "Listed books");

    Json(ApiResponse::success(BookList { books }))
}

pub async fn get_book_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BookDetail>>, AppError> {
    let book = state
        .storage
        .find_one(&id)
        .await
        .ok_or_else(|| AppError::NotFound("Buku tidak ditemukan".to_string()))?;

    Ok(Json(ApiResponse::success(BookDetail { book })))
}

pub async fn update_book_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let Json(payload) = payload?;
    let changes = payload.validate(WriteAction::Update)?;

    let updated = state
        .storage
        .update_one(&id, changes, book::now())
        .await
        .map_err(|e| AppError::internal("Buku gagal diperbarui", e))?;

    if !updated {
        warn!(book_id = %id, "Update on unknown book");
        return Err(AppError::NotFound(
            "Gagal memperbarui buku. Id tidak ditemukan".to_string(),
        ));
    }

    info!(book_id = %id, "Book updated");
    Ok(Json(ApiResponse::message("Buku berhasil diperbarui")))
}

pub async fn delete_book_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let deleted = state
        .storage
        .delete_one(&id)
        .await
        .map_err(|e| AppError::internal("Buku gagal dihapus", e))?;

    if !deleted {
        warn!(book_id = %id, "Delete on unknown book");
        return Err(AppError::NotFound(
            "Buku gagal dihapus. Id tidak ditemukan".to_string(),
        ));
    }

    info!(book_id = %id, "Book deleted");
    Ok(Json(ApiResponse::message("Buku berhasil dihapus")))
}
