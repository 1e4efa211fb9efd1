use anyhow::Context;
use bookstore_db::DbPool;
use sqlx::SqliteConnection;

use super::models::{CartItem, ShoppingCart};

const ITEM_QUERY: &str = "SELECT ci.id, ci.book_id, b.title AS book_title, ci.quantity \
                          FROM cart_items ci JOIN books b ON b.id = ci.book_id";

pub struct ShoppingCartRepository {
    pool: DbPool,
}

impl ShoppingCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Ensure `user_id` owns a cart and return it. Runs on the caller's
    /// connection so registration can do it inside its transaction.
    pub async fn create_for_user(conn: &mut SqliteConnection, user_id: i64) -> anyhow::Result<ShoppingCart> {
        sqlx::query("INSERT INTO shopping_carts (user_id) VALUES (?) ON CONFLICT(user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("failed to create cart for user {user_id}"))?;

        let cart = sqlx::query_as::<_, ShoppingCart>("SELECT id, user_id FROM shopping_carts WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await
            .with_context(|| format!("failed to load cart of user {user_id}"))?;
        Ok(cart)
    }

    /// The user's cart, created on first access for accounts that were
    /// inserted without one.
    pub async fn find_or_create_by_user(&self, user_id: i64) -> anyhow::Result<ShoppingCart> {
        let mut conn = self.pool.acquire().await?;
        Self::create_for_user(&mut *conn, user_id).await
    }

    pub async fn items(&self, cart_id: i64) -> anyhow::Result<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(&format!("{ITEM_QUERY} WHERE ci.cart_id = ? ORDER BY ci.id"))
            .bind(cart_id)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to load items of cart {cart_id}"))?;
        Ok(items)
    }

    /// Item `item_id`, only if it belongs to `cart_id`.
    pub async fn find_item(&self, cart_id: i64, item_id: i64) -> anyhow::Result<Option<CartItem>> {
        let item = sqlx::query_as::<_, CartItem>(&format!("{ITEM_QUERY} WHERE ci.cart_id = ? AND ci.id = ?"))
            .bind(cart_id)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load cart item")?;
        Ok(item)
    }

    pub async fn find_item_by_book(&self, cart_id: i64, book_id: i64) -> anyhow::Result<Option<CartItem>> {
        let item = sqlx::query_as::<_, CartItem>(&format!("{ITEM_QUERY} WHERE ci.cart_id = ? AND ci.book_id = ?"))
            .bind(cart_id)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load cart item by book")?;
        Ok(item)
    }

    /// Add `quantity` copies of a book; an existing line for the same book
    /// grows instead of being duplicated.
    pub async fn add_item(&self, cart_id: i64, book_id: i64, quantity: i64) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO cart_items (cart_id, book_id, quantity) VALUES (?, ?, ?) \
             ON CONFLICT(cart_id, book_id) DO UPDATE SET quantity = quantity + excluded.quantity",
        )
        .bind(cart_id)
        .bind(book_id)
        .bind(quantity)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to add book {book_id} to cart {cart_id}"))?;
        Ok(())
    }

    pub async fn set_quantity(&self, item_id: i64, quantity: i64) -> anyhow::Result<()> {
        sqlx::query("UPDATE cart_items SET quantity = ? WHERE id = ?")
            .bind(quantity)
            .bind(item_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to update cart item {item_id}"))?;
        Ok(())
    }

    /// Returns `false` when the item is not in `cart_id`.
    pub async fn delete_item(&self, cart_id: i64, item_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ? AND id = ?")
            .bind(cart_id)
            .bind(item_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete cart item {item_id}"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::migrated_pool;

    async fn seed(pool: &DbPool) {
        sqlx::raw_sql(
            "INSERT INTO users (id, email, password, first_name, last_name) VALUES \
                 (1, 'a@example.com', 'x', 'A', 'A'), (2, 'b@example.com', 'x', 'B', 'B'); \
             INSERT INTO books (id, title, author, isbn, price) VALUES \
                 (1, 'Dune', 'Frank Herbert', '9780000000011', 9.99), \
                 (2, 'Emma', 'Jane Austen', '9780000000028', 5.5);",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn cart_is_created_once_per_user() {
        let pool = migrated_pool().await;
        seed(&pool).await;
        let carts = ShoppingCartRepository::new(pool);

        let first = carts.find_or_create_by_user(1).await.unwrap();
        let again = carts.find_or_create_by_user(1).await.unwrap();
        let other = carts.find_or_create_by_user(2).await.unwrap();
        assert_eq!(first, again);
        assert_ne!(first.id, other.id);
        assert_eq!(first.user_id, 1);
    }

    #[tokio::test]
    async fn adding_the_same_book_merges_lines() {
        let pool = migrated_pool().await;
        seed(&pool).await;
        let carts = ShoppingCartRepository::new(pool);
        let cart = carts.find_or_create_by_user(1).await.unwrap();

        carts.add_item(cart.id, 1, 2).await.unwrap();
        carts.add_item(cart.id, 1, 3).await.unwrap();
        carts.add_item(cart.id, 2, 1).await.unwrap();

        let items = carts.items(cart.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].book_title, "Dune");
        assert_eq!(items[0].quantity, 5);

        let by_book = carts.find_item_by_book(cart.id, 2).await.unwrap().unwrap();
        assert_eq!(by_book.quantity, 1);
    }

    #[tokio::test]
    async fn items_are_scoped_to_their_cart() {
        let pool = migrated_pool().await;
        seed(&pool).await;
        let carts = ShoppingCartRepository::new(pool);
        let mine = carts.find_or_create_by_user(1).await.unwrap();
        let theirs = carts.find_or_create_by_user(2).await.unwrap();

        carts.add_item(theirs.id, 1, 1).await.unwrap();
        let item = carts.items(theirs.id).await.unwrap().remove(0);

        assert!(carts.find_item(mine.id, item.id).await.unwrap().is_none());
        assert!(!carts.delete_item(mine.id, item.id).await.unwrap());

        carts.set_quantity(item.id, 4).await.unwrap();
        assert_eq!(carts.find_item(theirs.id, item.id).await.unwrap().unwrap().quantity, 4);
        assert!(carts.delete_item(theirs.id, item.id).await.unwrap());
        assert!(carts.items(theirs.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_book_removes_its_cart_lines() {
        let pool = migrated_pool().await;
        seed(&pool).await;
        let carts = ShoppingCartRepository::new(pool.clone());
        let cart = carts.find_or_create_by_user(1).await.unwrap();
        carts.add_item(cart.id, 1, 1).await.unwrap();

        sqlx::query("DELETE FROM books WHERE id = 1").execute(&pool).await.unwrap();
        assert!(carts.items(cart.id).await.unwrap().is_empty());
    }
}
