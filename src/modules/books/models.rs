use std::collections::BTreeSet;

use bookstore_http::{Validate, Violations};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Row of the `books` table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub price: f64,
    pub description: Option<String>,
    pub cover_image: Option<String>,
}

/// A book as returned by the book endpoints, with the ids of its categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDto {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "The Pragmatic Programmer")]
    pub title: String,
    #[schema(example = "Andrew Hunt")]
    pub author: String,
    #[schema(example = "9780135957059")]
    pub isbn: String,
    #[schema(example = 39.99)]
    pub price: f64,
    pub description: Option<String>,
    #[schema(example = "https://example.com/covers/pragmatic.jpg")]
    pub cover_image: Option<String>,
    pub category_ids: BTreeSet<i64>,
}

impl BookDto {
    pub fn from_parts(book: Book, category_ids: BTreeSet<i64>) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            price: book.price,
            description: book.description,
            cover_image: book.cover_image,
            category_ids,
        }
    }
}

/// A book listed under a category; the category is implied by the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDtoWithoutCategoryIds {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub price: f64,
    pub description: Option<String>,
    pub cover_image: Option<String>,
}

impl From<Book> for BookDtoWithoutCategoryIds {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            price: book.price,
            description: book.description,
            cover_image: book.cover_image,
        }
    }
}

/// Body of book create and update requests.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequestDto {
    #[schema(example = "The Pragmatic Programmer")]
    pub title: String,
    #[schema(example = "Andrew Hunt")]
    pub author: String,
    #[schema(example = "9780135957059")]
    pub isbn: String,
    #[schema(example = 39.99, minimum = 0)]
    pub price: f64,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub category_ids: BTreeSet<i64>,
}

impl Validate for CreateBookRequestDto {
    fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        violations
            .not_blank("title", &self.title)
            .max_len("title", &self.title, 255)
            .not_blank("author", &self.author)
            .max_len("author", &self.author, 255)
            .not_blank("isbn", &self.isbn)
            .max_len("isbn", &self.isbn, 32)
            .non_negative("price", self.price);
        if let Some(cover_image) = &self.cover_image {
            violations.max_len("coverImage", cover_image, 1024);
        }
        if self.category_ids.iter().any(|id| *id <= 0) {
            violations.add("categoryIds", "must contain only positive ids");
        }
        violations.into_result()
    }
}

/// `GET /search` filters. Each parameter is a comma separated list of exact
/// values; a book matches when it satisfies every parameter given.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookSearchParameters {
    /// e.g. `Dune,Emma`
    pub titles: Option<String>,
    pub authors: Option<String>,
    pub isbns: Option<String>,
}

impl BookSearchParameters {
    pub fn titles(&self) -> Vec<&str> {
        split_values(self.titles.as_deref())
    }

    pub fn authors(&self) -> Vec<&str> {
        split_values(self.authors.as_deref())
    }

    pub fn isbns(&self) -> Vec<&str> {
        split_values(self.isbns.as_deref())
    }
}

fn split_values(raw: Option<&str>) -> Vec<&str> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateBookRequestDto {
        CreateBookRequestDto {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            isbn: "9780441013593".to_string(),
            price: 9.99,
            description: None,
            cover_image: None,
            category_ids: BTreeSet::from([1]),
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn negative_price_and_blank_title_are_reported() {
        let invalid = CreateBookRequestDto {
            title: String::new(),
            price: -1.0,
            ..request()
        };
        let violations = invalid.validate().unwrap_err();
        assert_eq!(violations.fields().collect::<Vec<_>>(), vec!["title", "price"]);
    }

    #[test]
    fn free_books_are_allowed() {
        let free = CreateBookRequestDto { price: 0.0, ..request() };
        assert!(free.validate().is_ok());
    }

    #[test]
    fn category_ids_default_to_empty() {
        let parsed: CreateBookRequestDto = serde_json::from_value(serde_json::json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "isbn": "9780441013593",
            "price": 9.99
        }))
        .unwrap();
        assert!(parsed.category_ids.is_empty());
    }

    #[test]
    fn search_values_are_split_and_trimmed() {
        let params = BookSearchParameters {
            titles: Some(" Dune , ,Emma".to_string()),
            authors: None,
            isbns: Some(String::new()),
        };
        assert_eq!(params.titles(), vec!["Dune", "Emma"]);
        assert!(params.authors().is_empty());
        assert!(params.isbns().is_empty());
    }
}
