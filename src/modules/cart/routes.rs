use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use bookstore_authz::RoleName;
use bookstore_http::{error::ErrorResponse, AppError, ValidJson, ValidPath};
use bookstore_db::{constraint_violation, ConstraintViolation};
use bookstore_kernel::AppState;
use serde_json::json;

use super::models::{
    AddToCartRequestDto, ShoppingCart, ShoppingCartDto, UpdateCartItemRequestDto, MAX_QUANTITY,
};
use super::repository::ShoppingCartRepository;
use crate::modules::auth::CurrentUser;
use crate::modules::books::repository::BookRepository;

/// Get the caller's shopping cart
#[utoipa::path(
    get,
    path = "/",
    tag = "Shopping cart",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's cart", body = ShoppingCartDto),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Caller is not a customer", body = ErrorResponse)
    )
)]
pub async fn get_cart(user: CurrentUser, State(state): State<AppState>) -> Result<Json<ShoppingCartDto>, AppError> {
    user.require(RoleName::User)?;
    let carts = ShoppingCartRepository::new(state.db.clone());
    let cart = carts.find_or_create_by_user(user.id).await?;
    Ok(Json(render(&carts, cart).await?))
}

/// Add a book to the caller's cart
#[utoipa::path(
    post,
    path = "/",
    tag = "Shopping cart",
    request_body = AddToCartRequestDto,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated cart", body = ShoppingCartDto),
        (status = 404, description = "No such book", body = ErrorResponse),
        (status = 422, description = "Quantity or book id out of range, or the line would exceed the quantity limit", body = ErrorResponse)
    )
)]
pub async fn add_book(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidJson(request): ValidJson<AddToCartRequestDto>,
) -> Result<Json<ShoppingCartDto>, AppError> {
    user.require(RoleName::User)?;
    if BookRepository::new(state.db.clone())
        .find_by_id(request.book_id)
        .await?
        .is_none()
    {
        return Err(AppError::not_found(format!("book {} not found", request.book_id)));
    }

    let carts = ShoppingCartRepository::new(state.db.clone());
    let cart = carts.find_or_create_by_user(user.id).await?;

    let current = carts
        .find_item_by_book(cart.id, request.book_id)
        .await?
        .map_or(0, |item| item.quantity);
    if !within_limit(current.checked_add(request.quantity)) {
        return Err(quantity_limit_exceeded());
    }

    carts
        .add_item(cart.id, request.book_id, request.quantity)
        .await
        .map_err(|error| match constraint_violation(&error) {
            Some(ConstraintViolation::ForeignKey) => {
                AppError::not_found(format!("book {} not found", request.book_id))
            }
            Some(ConstraintViolation::Check) => quantity_limit_exceeded(),
            _ => error.into(),
        })?;

    tracing::debug!(cart_id = cart.id, book_id = request.book_id, quantity = request.quantity, "book added to cart");
    Ok(Json(render(&carts, cart).await?))
}

/// Change the quantity of a cart item
#[utoipa::path(
    put,
    path = "/items/{cartItemId}",
    tag = "Shopping cart",
    params(("cartItemId" = i64, Path, description = "Cart item id")),
    request_body = UpdateCartItemRequestDto,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated cart; lines decreased to zero are removed", body = ShoppingCartDto),
        (status = 404, description = "Item is not in the caller's cart", body = ErrorResponse),
        (status = 422, description = "Quantity out of range, or the line would exceed the quantity limit", body = ErrorResponse)
    )
)]
pub async fn update_item(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidPath(item_id): ValidPath<i64>,
    ValidJson(request): ValidJson<UpdateCartItemRequestDto>,
) -> Result<Json<ShoppingCartDto>, AppError> {
    user.require(RoleName::User)?;
    let carts = ShoppingCartRepository::new(state.db.clone());
    let cart = carts.find_or_create_by_user(user.id).await?;

    let item = carts
        .find_item(cart.id, item_id)
        .await?
        .ok_or_else(|| item_not_found(item_id))?;

    let quantity = request.apply(item.quantity);
    if quantity > MAX_QUANTITY {
        return Err(quantity_limit_exceeded());
    }
    if quantity > 0 {
        carts
            .set_quantity(item.id, quantity)
            .await
            .map_err(|error| match constraint_violation(&error) {
                Some(ConstraintViolation::Check) => quantity_limit_exceeded(),
                _ => error.into(),
            })?;
    } else {
        carts.delete_item(cart.id, item.id).await?;
        tracing::debug!(cart_id = cart.id, item_id, "cart item decreased to zero and removed");
    }

    Ok(Json(render(&carts, cart).await?))
}

/// Remove an item from the caller's cart
#[utoipa::path(
    delete,
    path = "/items/{cartItemId}",
    tag = "Shopping cart",
    params(("cartItemId" = i64, Path, description = "Cart item id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Item removed"),
        (status = 404, description = "Item is not in the caller's cart", body = ErrorResponse)
    )
)]
pub async fn delete_item(
    user: CurrentUser,
    State(state): State<AppState>,
    ValidPath(item_id): ValidPath<i64>,
) -> Result<StatusCode, AppError> {
    user.require(RoleName::User)?;
    let carts = ShoppingCartRepository::new(state.db.clone());
    let cart = carts.find_or_create_by_user(user.id).await?;

    if !carts.delete_item(cart.id, item_id).await? {
        return Err(item_not_found(item_id));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn within_limit(quantity: Option<i64>) -> bool {
    quantity.is_some_and(|quantity| quantity <= MAX_QUANTITY)
}

fn quantity_limit_exceeded() -> AppError {
    AppError::validation(
        vec![json!({ "field": "quantity", "error": format!("a cart line holds at most {MAX_QUANTITY} copies") })],
        "cart line quantity limit exceeded",
    )
}

fn item_not_found(item_id: i64) -> AppError {
    AppError::not_found(format!("cart item {item_id} not found in your cart"))
}

async fn render(carts: &ShoppingCartRepository, cart: ShoppingCart) -> Result<ShoppingCartDto, AppError> {
    let items = carts.items(cart.id).await?;
    Ok(ShoppingCartDto::from_parts(cart, items))
}
