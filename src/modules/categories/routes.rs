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

use super::models::{CategoryDto, CreateCategoryRequestDto};
use super::repository::{CategoryRepository, SORT_COLUMNS};
use crate::modules::auth::CurrentUser;
use crate::modules::books::models::BookDtoWithoutCategoryIds;
use crate::modules::books::repository::{BookRepository, SORT_COLUMNS as BOOK_SORT_COLUMNS};

/// List categories
#[utoipa::path(
    get,
    path = "/",
    tag = "Categories",
    params(PageRequest),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "One page of categories", body = Page<CategoryDto>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn list_categories(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidQuery(page): ValidQuery<PageRequest>,
) -> Result<Json<Page<CategoryDto>>, AppError> {
    user.require_reader()?;
    let order_by = page.order_by(SORT_COLUMNS)?;
    let categories = CategoryRepository::new(state.db.clone())
        .find_all(&page, &order_by)
        .await?;
    Ok(Json(categories.map(CategoryDto::from)))
}

/// Get a category by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Categories",
    params(("id" = i64, Path, description = "Category id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The category", body = CategoryDto),
        (status = 404, description = "No such category", body = ErrorResponse)
    )
)]
pub async fn get_category(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<CategoryDto>, AppError> {
    user.require_reader()?;
    CategoryRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .map(|category| Json(category.into()))
        .ok_or_else(|| category_not_found(id))
}

/// List the books of a category
#[utoipa::path(
    get,
    path = "/{id}/books",
    tag = "Categories",
    params(("id" = i64, Path, description = "Category id"), PageRequest),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Books in the category", body = Page<BookDtoWithoutCategoryIds>)
    )
)]
pub async fn list_category_books(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
    ValidQuery(page): ValidQuery<PageRequest>,
) -> Result<Json<Page<BookDtoWithoutCategoryIds>>, AppError> {
    user.require_reader()?;
    let order_by = page.order_by(BOOK_SORT_COLUMNS)?;
    let books = BookRepository::new(state.db.clone())
        .find_by_category_id(id, &page, &order_by)
        .await?;
    Ok(Json(books.map(BookDtoWithoutCategoryIds::from)))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/",
    tag = "Categories",
    request_body = CreateCategoryRequestDto,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Category created", body = CategoryDto),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 409, description = "Name already used", body = ErrorResponse),
        (status = 422, description = "Invalid category data", body = ErrorResponse)
    )
)]
pub async fn create_category(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateCategoryRequestDto>,
) -> Result<(StatusCode, Json<CategoryDto>), AppError> {
    user.require(RoleName::Admin)?;
    let categories = CategoryRepository::new(state.db.clone());

    ensure_name_free(&categories, &request, None).await?;
    let category = categories
        .save(&request)
        .await
        .map_err(|error| write_rejected(error, &request))?;

    tracing::info!(category_id = category.id, "category created");
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// Replace a category
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Categories",
    params(("id" = i64, Path, description = "Category id")),
    request_body = CreateCategoryRequestDto,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Category updated", body = CategoryDto),
        (status = 404, description = "No such category", body = ErrorResponse),
        (status = 409, description = "Name used by another category", body = ErrorResponse)
    )
)]
pub async fn update_category(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(request): ValidJson<CreateCategoryRequestDto>,
) -> Result<(StatusCode, Json<CategoryDto>), AppError> {
    user.require(RoleName::Admin)?;
    let categories = CategoryRepository::new(state.db.clone());

    ensure_name_free(&categories, &request, Some(id)).await?;
    let category = categories
        .update(id, &request)
        .await
        .map_err(|error| write_rejected(error, &request))?
        .ok_or_else(|| category_not_found(id))?;

    tracing::info!(category_id = id, "category updated");
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// Delete a category; its books stay in the catalogue
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Categories",
    params(("id" = i64, Path, description = "Category id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Category deleted or already absent"),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
    )
)]
pub async fn delete_category(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<StatusCode, AppError> {
    user.require(RoleName::Admin)?;
    if CategoryRepository::new(state.db.clone()).delete_by_id(id).await? {
        tracing::info!(category_id = id, "category deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}

fn category_not_found(id: i64) -> AppError {
    AppError::not_found(format!("category {id} not found"))
}

async fn ensure_name_free(
    categories: &CategoryRepository,
    request: &CreateCategoryRequestDto,
    excluding: Option<i64>,
) -> Result<(), AppError> {
    let name = request.name.trim();
    if categories.exists_by_name(name, excluding).await? {
        return Err(name_taken(name));
    }
    Ok(())
}

fn name_taken(name: &str) -> AppError {
    AppError::conflict(
        vec![json!({ "field": "name", "error": "already used by another category" })],
        format!("a category named {name} already exists"),
    )
}

/// A concurrent request can claim the name between the check and the write.
fn write_rejected(error: anyhow::Error, request: &CreateCategoryRequestDto) -> AppError {
    match constraint_violation(&error) {
        Some(ConstraintViolation::Unique) => name_taken(request.name.trim()),
        _ => error.into(),
    }
}
