use bookstore_http::{Validate, Violations};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Row of the `shopping_carts` table. Each user owns exactly one.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ShoppingCart {
    pub id: i64,
    pub user_id: i64,
}

/// A cart line joined with the title of its book.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CartItem {
    pub id: i64,
    pub book_id: i64,
    pub book_title: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingCartDto {
    pub id: i64,
    pub user_id: i64,
    pub cart_items: Vec<CartItemDto>,
}

impl ShoppingCartDto {
    pub fn from_parts(cart: ShoppingCart, items: Vec<CartItem>) -> Self {
        Self {
            id: cart.id,
            user_id: cart.user_id,
            cart_items: items.into_iter().map(CartItemDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDto {
    pub id: i64,
    pub book_id: i64,
    #[schema(example = "Dune")]
    pub book_title: String,
    #[schema(example = 2)]
    pub quantity: i64,
}

impl From<CartItem> for CartItemDto {
    fn from(item: CartItem) -> Self {
        Self {
            id: item.id,
            book_id: item.book_id,
            book_title: item.book_title,
            quantity: item.quantity,
        }
    }
}

/// Largest quantity a single cart line may hold.
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequestDto {
    #[schema(example = 1)]
    pub book_id: i64,
    #[schema(example = 3, minimum = 1, maximum = 2147483647)]
    pub quantity: i64,
}

impl Validate for AddToCartRequestDto {
    fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        violations
            .positive("bookId", self.book_id)
            .positive("quantity", self.quantity)
            .at_most("quantity", self.quantity, MAX_QUANTITY);
        violations.into_result()
    }
}

/// How `UpdateCartItemRequestDto::quantity` is applied to a cart line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CartItemOperation {
    #[default]
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateCartItemRequestDto {
    /// Defaults to `INCREASE` when omitted
    #[serde(default)]
    pub operation: CartItemOperation,
    #[schema(example = 3, minimum = 1, maximum = 2147483647)]
    pub quantity: i64,
}

impl UpdateCartItemRequestDto {
    /// Quantity of the line after applying this request to `current`.
    /// Zero or less means the line is removed.
    pub fn apply(&self, current: i64) -> i64 {
        match self.operation {
            CartItemOperation::Increase => current.saturating_add(self.quantity),
            CartItemOperation::Decrease => current.saturating_sub(self.quantity),
        }
    }
}

impl Validate for UpdateCartItemRequestDto {
    fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        violations
            .positive("quantity", self.quantity)
            .at_most("quantity", self.quantity, MAX_QUANTITY);
        violations.into_result()
    }
}
