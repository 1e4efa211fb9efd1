use std::collections::{BTreeSet, HashMap};

use anyhow::Context;
use bookstore_db::DbPool;
use bookstore_http::{pagination::SortColumns, Page, PageRequest};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::models::{Book, BookDto, BookSearchParameters, CreateBookRequestDto};

/// Sortable fields of the book listings.
pub const SORT_COLUMNS: SortColumns<'static> = &[
    ("id", "b.id"),
    ("title", "b.title"),
    ("author", "b.author"),
    ("price", "b.price"),
    ("isbn", "b.isbn"),
];

const BOOK_COLUMNS: &str = "b.id, b.title, b.author, b.isbn, b.price, b.description, b.cover_image";

pub struct BookRepository {
    pool: DbPool,
}

impl BookRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// `order_by` must come from [`PageRequest::order_by`] with [`SORT_COLUMNS`].
    pub async fn find_all(&self, request: &PageRequest, order_by: &str) -> anyhow::Result<Page<BookDto>> {
        self.search(&BookSearchParameters::default(), request, order_by)
            .await
    }

    pub async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<BookDto>> {
        let book = sqlx::query_as::<_, Book>(&format!("SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load book {id}"))?;

        let Some(book) = book else {
            return Ok(None);
        };
        let mut links = self.category_ids_for(&[book.id]).await?;
        let category_ids = links.remove(&book.id).unwrap_or_default();
        Ok(Some(BookDto::from_parts(book, category_ids)))
    }

    /// Whether a book other than `excluding` already carries `isbn`.
    pub async fn exists_by_isbn(&self, isbn: &str, excluding: Option<i64>) -> anyhow::Result<bool> {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM books WHERE isbn = ? AND id IS NOT ?")
            .bind(isbn)
            .bind(excluding)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Books linked to `category_id`. An unknown category yields an empty page.
    pub async fn find_by_category_id(
        &self,
        category_id: i64,
        request: &PageRequest,
        order_by: &str,
    ) -> anyhow::Result<Page<Book>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books_categories WHERE category_id = ?")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await
            .context("failed to count books of category")?;

        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books b \
             JOIN books_categories bc ON bc.book_id = b.id \
             WHERE bc.category_id = ? ORDER BY {order_by} LIMIT ? OFFSET ?"
        ))
        .bind(category_id)
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to list books of category {category_id}"))?;

        Ok(Page::new(books, request, to_total(total)))
    }

    pub async fn search(
        &self,
        params: &BookSearchParameters,
        request: &PageRequest,
        order_by: &str,
    ) -> anyhow::Result<Page<BookDto>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM books b");
        push_search_filters(&mut count, params);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("failed to count books")?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {BOOK_COLUMNS} FROM books b"));
        push_search_filters(&mut select, params);
        select
            .push(" ORDER BY ")
            .push(order_by)
            .push(" LIMIT ")
            .push_bind(request.limit())
            .push(" OFFSET ")
            .push_bind(request.offset());
        let books: Vec<Book> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("failed to list books")?;

        let ids: Vec<i64> = books.iter().map(|book| book.id).collect();
        let mut links = self.category_ids_for(&ids).await?;
        Ok(Page::new(books, request, to_total(total)).map(|book| {
            let category_ids = links.remove(&book.id).unwrap_or_default();
            BookDto::from_parts(book, category_ids)
        }))
    }

    /// Insert a book and its category links in one transaction.
    pub async fn save(&self, request: &CreateBookRequestDto) -> anyhow::Result<BookDto> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(
            "INSERT INTO books (title, author, isbn, price, description, cover_image) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING id, title, author, isbn, price, description, cover_image",
        )
        .bind(request.title.trim())
        .bind(request.author.trim())
        .bind(request.isbn.trim())
        .bind(request.price)
        .bind(request.description.as_deref())
        .bind(request.cover_image.as_deref())
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert book")?;

        link_categories(&mut *tx, book.id, &request.category_ids).await?;
        tx.commit().await?;

        Ok(BookDto::from_parts(book, request.category_ids.clone()))
    }

    /// Replace every field and the category links of book `id`. Returns
    /// `None` when no such book exists.
    pub async fn update(&self, id: i64, request: &CreateBookRequestDto) -> anyhow::Result<Option<BookDto>> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(
            "UPDATE books SET title = ?, author = ?, isbn = ?, price = ?, description = ?, cover_image = ? \
             WHERE id = ? \
             RETURNING id, title, author, isbn, price, description, cover_image",
        )
        .bind(request.title.trim())
        .bind(request.author.trim())
        .bind(request.isbn.trim())
        .bind(request.price)
        .bind(request.description.as_deref())
        .bind(request.cover_image.as_deref())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .with_context(|| format!("failed to update book {id}"))?;

        let Some(book) = book else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM books_categories WHERE book_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("failed to unlink categories")?;
        link_categories(&mut *tx, id, &request.category_ids).await?;
        tx.commit().await?;

        Ok(Some(BookDto::from_parts(book, request.category_ids.clone())))
    }

    /// Returns whether a row was removed. Category links and cart items
    /// referencing the book go with it.
    pub async fn delete_by_id(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete book {id}"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn category_ids_for(&self, book_ids: &[i64]) -> anyhow::Result<HashMap<i64, BTreeSet<i64>>> {
        let mut links: HashMap<i64, BTreeSet<i64>> = HashMap::new();
        if book_ids.is_empty() {
            return Ok(links);
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT book_id, category_id FROM books_categories WHERE book_id IN (",
        );
        let mut separated = query.separated(", ");
        for id in book_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<(i64, i64)> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("failed to load book categories")?;
        for (book_id, category_id) in rows {
            links.entry(book_id).or_default().insert(category_id);
        }
        Ok(links)
    }
}

async fn link_categories(
    conn: &mut SqliteConnection,
    book_id: i64,
    category_ids: &BTreeSet<i64>,
) -> anyhow::Result<()> {
    for category_id in category_ids {
        sqlx::query("INSERT INTO books_categories (book_id, category_id) VALUES (?, ?)")
            .bind(book_id)
            .bind(category_id)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("failed to link book {book_id} to category {category_id}"))?;
    }
    Ok(())
}

fn push_search_filters(query: &mut QueryBuilder<'_, Sqlite>, params: &BookSearchParameters) {
    query.push(" WHERE 1 = 1");
    let filters = [
        ("b.title", params.titles()),
        ("b.author", params.authors()),
        ("b.isbn", params.isbns()),
    ];
    for (column, values) in filters {
        if values.is_empty() {
            continue;
        }
        query.push(" AND ").push(column).push(" IN (");
        let mut separated = query.separated(", ");
        for value in values {
            separated.push_bind(value.to_string());
        }
        separated.push_unseparated(")");
    }
}

fn to_total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::migrated_pool;

    async fn seed_categories(pool: &DbPool) {
        sqlx::raw_sql("INSERT INTO categories (id, name) VALUES (1, 'Fiction'), (2, 'Classics');")
            .execute(pool)
            .await
            .unwrap();
    }

    fn request(title: &str, isbn: &str, category_ids: &[i64]) -> CreateBookRequestDto {
        CreateBookRequestDto {
            title: title.to_string(),
            author: "Author".to_string(),
            isbn: isbn.to_string(),
            price: 12.5,
            description: None,
            cover_image: None,
            category_ids: category_ids.iter().copied().collect(),
        }
    }

    #[tokio::test]
    async fn save_links_categories() {
        let pool = migrated_pool().await;
        seed_categories(&pool).await;
        let books = BookRepository::new(pool);

        let saved = books.save(&request("Emma", "9780000000011", &[1, 2])).await.unwrap();
        let found = books.find_by_id(saved.id).await.unwrap().unwrap();
        assert_eq!(found, saved);
        assert_eq!(found.category_ids, BTreeSet::from([1, 2]));
    }

    #[tokio::test]
    async fn save_with_unknown_category_rolls_back() {
        let pool = migrated_pool().await;
        let books = BookRepository::new(pool.clone());

        assert!(books.save(&request("Emma", "9780000000011", &[42])).await.is_err());
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn update_replaces_links() {
        let pool = migrated_pool().await;
        seed_categories(&pool).await;
        let books = BookRepository::new(pool);

        let saved = books.save(&request("Emma", "9780000000011", &[1])).await.unwrap();
        let updated = books
            .update(saved.id, &request("Emma (annotated)", "9780000000011", &[2]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Emma (annotated)");
        assert_eq!(
            books.find_by_id(saved.id).await.unwrap().unwrap().category_ids,
            BTreeSet::from([2])
        );
        assert!(books.update(999, &request("X", "1", &[])).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn isbn_uniqueness_ignores_the_row_being_updated() {
        let books = BookRepository::new(migrated_pool().await);
        let saved = books.save(&request("Emma", "9780000000011", &[])).await.unwrap();

        assert!(books.exists_by_isbn("9780000000011", None).await.unwrap());
        assert!(!books.exists_by_isbn("9780000000011", Some(saved.id)).await.unwrap());
    }

    #[tokio::test]
    async fn category_listing_and_search() {
        let pool = migrated_pool().await;
        seed_categories(&pool).await;
        let books = BookRepository::new(pool);
        books.save(&request("Emma", "9780000000011", &[1])).await.unwrap();
        books.save(&request("Dune", "9780000000028", &[1, 2])).await.unwrap();
        books.save(&request("Ulysses", "9780000000035", &[2])).await.unwrap();

        let page = PageRequest::default();
        let order_by = page.order_by(SORT_COLUMNS).unwrap();

        let fiction = books.find_by_category_id(1, &page, &order_by).await.unwrap();
        assert_eq!(fiction.total_elements, 2);
        let titles: Vec<_> = fiction.content.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Emma", "Dune"]);
        assert_eq!(books.find_by_category_id(99, &page, &order_by).await.unwrap().total_elements, 0);

        let params = BookSearchParameters {
            titles: Some("Dune,Ulysses".to_string()),
            authors: Some("Author".to_string()),
            isbns: None,
        };
        let found = books.search(&params, &page, &order_by).await.unwrap();
        assert_eq!(found.total_elements, 2);
        assert_eq!(found.content[0].category_ids, BTreeSet::from([1, 2]));

        let all = books.find_all(&page, &order_by).await.unwrap();
        assert_eq!(all.total_elements, 3);
    }

    #[tokio::test]
    async fn delete_cascades_links() {
        let pool = migrated_pool().await;
        seed_categories(&pool).await;
        let books = BookRepository::new(pool.clone());
        let saved = books.save(&request("Emma", "9780000000011", &[1])).await.unwrap();

        assert!(books.delete_by_id(saved.id).await.unwrap());
        assert!(!books.delete_by_id(saved.id).await.unwrap());
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books_categories")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links, 0);
    }
}
