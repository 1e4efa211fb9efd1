//! Page requests and page envelopes for listing endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// `?page=0&size=20&sort=title,desc` query parameters.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageRequest {
    /// Zero-based page index
    pub page: Option<u32>,
    /// Page size, 1 to 100
    pub size: Option<u32>,
    /// Sort field with optional direction, e.g. `title,desc`
    pub sort: Option<String>,
}

/// Sortable fields of a listing: API name to SQL column.
///
/// The first entry is the default order and the tie-breaker.
pub type SortColumns<'a> = &'a [(&'a str, &'a str)];

impl PageRequest {
    #[cfg(test)]
    pub fn of(page: u32, size: u32) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            sort: None,
        }
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(0)
    }

    pub fn size(&self) -> u32 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size())
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page()) * i64::from(self.size())
    }

    /// Build an `ORDER BY` body from the requested sort, restricted to `columns`.
    pub fn order_by(&self, columns: SortColumns<'_>) -> Result<String, AppError> {
        let (_, tie_breaker) = columns
            .first()
            .copied()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("listing declares no sort columns")))?;

        let Some(sort) = self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(format!("{tie_breaker} ASC"));
        };

        let (field, direction) = match sort.split_once(',') {
            Some((field, direction)) => (field.trim(), direction.trim()),
            None => (sort, "asc"),
        };

        let direction = match direction.to_ascii_lowercase().as_str() {
            "asc" => "ASC",
            "desc" => "DESC",
            other => {
                return Err(AppError::bad_request(format!(
                    "unsupported sort direction '{other}'"
                )))
            }
        };

        let column = columns
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, column)| *column)
            .ok_or_else(|| AppError::bad_request(format!("unsupported sort field '{field}'")))?;

        if column == tie_breaker {
            Ok(format!("{column} {direction}"))
        } else {
            Ok(format!("{column} {direction}, {tie_breaker} ASC"))
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    /// Zero-based index of this page
    pub number: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let size = request.size();
        Self {
            content,
            number: request.page(),
            size,
            total_elements,
            total_pages: total_elements.div_ceil(u64::from(size)),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}
