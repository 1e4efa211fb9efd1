use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use bookstore_authz::RoleName;
use bookstore_http::{error::ErrorResponse, AppError, Page, PageRequest, ValidJson, ValidPath, ValidQuery};
use bookstore_db::{constraint_violation, ConstraintViolation};
use bookstore_kernel::AppState;
use serde_json::json;

use super::models::{BookDto, BookSearchParameters, CreateBookRequestDto};
use super::repository::{BookRepository, SORT_COLUMNS};
use crate::modules::auth::CurrentUser;
use crate::modules::categories::repository::CategoryRepository;

/// List books
#[utoipa::path(
    get,
    path = "/",
    tag = "Books",
    params(PageRequest),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "One page of books", body = Page<BookDto>),
        (status = 400, description = "Unsupported sort", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn list_books(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidQuery(page): ValidQuery<PageRequest>,
) -> Result<Json<Page<BookDto>>, AppError> {
    user.require_reader()?;
    let order_by = page.order_by(SORT_COLUMNS)?;
    let books = BookRepository::new(state.db.clone())
        .find_all(&page, &order_by)
        .await?;
    Ok(Json(books))
}

/// Search books by exact titles, authors or ISBNs
#[utoipa::path(
    get,
    path = "/search",
    tag = "Books",
    params(BookSearchParameters, PageRequest),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Matching books", body = Page<BookDto>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn search_books(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<BookSearchParameters>,
    ValidQuery(page): ValidQuery<PageRequest>,
) -> Result<Json<Page<BookDto>>, AppError> {
    user.require_reader()?;
    let order_by = page.order_by(SORT_COLUMNS)?;
    let books = BookRepository::new(state.db.clone())
        .search(&params, &page, &order_by)
        .await?;
    Ok(Json(books))
}

/// Get a book by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The book", body = BookDto),
        (status = 404, description = "No such book", body = ErrorResponse)
    )
)]
pub async fn get_book(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<BookDto>, AppError> {
    user.require_reader()?;
    BookRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| book_not_found(id))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/",
    tag = "Books",
    request_body = CreateBookRequestDto,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Book created", body = BookDto),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 409, description = "ISBN already used", body = ErrorResponse),
        (status = 422, description = "Invalid book data or unknown category", body = ErrorResponse)
    )
)]
pub async fn create_book(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateBookRequestDto>,
) -> Result<(StatusCode, Json<BookDto>), AppError> {
    user.require(RoleName::Admin)?;
    let books = BookRepository::new(state.db.clone());

    ensure_isbn_free(&books, &request, None).await?;
    ensure_categories_exist(&state, &request).await?;

    let book = books
        .save(&request)
        .await
        .map_err(|error| write_rejected(error, &request))?;
    tracing::info!(book_id = book.id, isbn = %book.isbn, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// Replace a book
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    request_body = CreateBookRequestDto,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Book updated", body = BookDto),
        (status = 404, description = "No such book", body = ErrorResponse),
        (status = 409, description = "ISBN used by another book", body = ErrorResponse),
        (status = 422, description = "Invalid book data or unknown category", body = ErrorResponse)
    )
)]
pub async fn update_book(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(request): ValidJson<CreateBookRequestDto>,
) -> Result<(StatusCode, Json<BookDto>), AppError> {
    user.require(RoleName::Admin)?;
    let books = BookRepository::new(state.db.clone());

    ensure_isbn_free(&books, &request, Some(id)).await?;
    ensure_categories_exist(&state, &request).await?;

    let book = books
        .update(id, &request)
        .await
        .map_err(|error| write_rejected(error, &request))?
        .ok_or_else(|| book_not_found(id))?;
    tracing::info!(book_id = book.id, "book updated");
    Ok((StatusCode::CREATED, Json(book)))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Book deleted or already absent"),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
    )
)]
pub async fn delete_book(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, AppError> {
    user.require(RoleName::Admin)?;
    if BookRepository::new(state.db.clone()).delete_by_id(id).await? {
        tracing::info!(book_id = id, "book deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}

fn book_not_found(id: i64) -> AppError {
    AppError::not_found(format!("book {id} not found"))
}

async fn ensure_isbn_free(
    books: &BookRepository,
    request: &CreateBookRequestDto,
    excluding: Option<i64>,
) -> Result<(), AppError> {
    let isbn = request.isbn.trim();
    if books.exists_by_isbn(isbn, excluding).await? {
        return Err(isbn_taken(isbn));
    }
    Ok(())
}

fn isbn_taken(isbn: &str) -> AppError {
    AppError::conflict(
        vec![json!({ "field": "isbn", "error": "already used by another book" })],
        format!("a book with isbn {isbn} already exists"),
    )
}

/// Map a write the database refused after the pre-checks passed, such as a
/// concurrent request taking the same ISBN or deleting a linked category.
fn write_rejected(error: anyhow::Error, request: &CreateBookRequestDto) -> AppError {
    match constraint_violation(&error) {
        Some(ConstraintViolation::Unique) => isbn_taken(request.isbn.trim()),
        Some(ConstraintViolation::ForeignKey) => unknown_categories(format!(
            "one of the categories {:?} no longer exists",
            request.category_ids
        )),
        _ => error.into(),
    }
}

fn unknown_categories(error: String) -> AppError {
    AppError::validation(
        vec![json!({ "field": "categoryIds", "error": error })],
        "request references categories that do not exist",
    )
}

async fn ensure_categories_exist(state: &AppState, request: &CreateBookRequestDto) -> Result<(), AppError> {
    let found = CategoryRepository::new(state.db.clone())
        .existing_ids(&request.category_ids)
        .await?;
    let missing: Vec<i64> = request.category_ids.difference(&found).copied().collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(unknown_categories(format!("unknown category ids {missing:?}")))
}
