use std::collections::BTreeSet;

use anyhow::Context;
use bookstore_db::DbPool;
use bookstore_http::{pagination::SortColumns, Page, PageRequest};
use sqlx::{QueryBuilder, Sqlite};

use super::models::{Category, CreateCategoryRequestDto};

/// Sortable fields of the category listing.
pub const SORT_COLUMNS: SortColumns<'static> = &[("id", "id"), ("name", "name")];

pub struct CategoryRepository {
    pool: DbPool,
}

impl CategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// `order_by` must come from [`PageRequest::order_by`] with [`SORT_COLUMNS`].
    pub async fn find_all(&self, request: &PageRequest, order_by: &str) -> anyhow::Result<Page<Category>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await
            .context("failed to count categories")?;

        let rows = sqlx::query_as::<_, Category>(&format!(
            "SELECT id, name, description FROM categories ORDER BY {order_by} LIMIT ? OFFSET ?"
        ))
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(&self.pool)
        .await
        .context("failed to list categories")?;

        Ok(Page::new(rows, request, u64::try_from(total).unwrap_or_default()))
    }

    pub async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load category {id}"))?;
        Ok(category)
    }

    /// Whether another category already uses `name`. `excluding` skips the
    /// row being updated.
    pub async fn exists_by_name(&self, name: &str, excluding: Option<i64>) -> anyhow::Result<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM categories WHERE name = ? AND id IS NOT ?",
        )
        .bind(name)
        .bind(excluding)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    /// The subset of `ids` that name existing categories.
    pub async fn existing_ids(&self, ids: &BTreeSet<i64>) -> anyhow::Result<BTreeSet<i64>> {
        if ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM categories WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let found: Vec<i64> = query
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .context("failed to resolve category ids")?;
        Ok(found.into_iter().collect())
    }

    pub async fn save(&self, request: &CreateCategoryRequestDto) -> anyhow::Result<Category> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description) VALUES (?, ?) RETURNING id, name, description",
        )
        .bind(request.name.trim())
        .bind(request.description.as_deref())
        .fetch_one(&self.pool)
        .await
        .context("failed to insert category")?;
        Ok(category)
    }

    /// Returns `None` when no category has `id`.
    pub async fn update(&self, id: i64, request: &CreateCategoryRequestDto) -> anyhow::Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = ?, description = ? WHERE id = ? RETURNING id, name, description",
        )
        .bind(request.name.trim())
        .bind(request.description.as_deref())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to update category {id}"))?;
        Ok(category)
    }

    /// Returns whether a row was removed. Book links go with it.
    pub async fn delete_by_id(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete category {id}"))?;
        Ok(result.rows_affected() > 0)
    }
}
