use bookstore_http::{Validate, Violations};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Row of the `categories` table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryDto {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Fiction")]
    pub name: String,
    #[schema(example = "Novels and short stories")]
    pub description: Option<String>,
}

impl From<Category> for CategoryDto {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
        }
    }
}

/// Body of category create and update requests.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCategoryRequestDto {
    #[schema(example = "Fiction")]
    pub name: String,
    #[schema(example = "Novels and short stories")]
    pub description: Option<String>,
}

impl Validate for CreateCategoryRequestDto {
    fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        violations
            .not_blank("name", &self.name)
            .max_len("name", &self.name, 255);
        if let Some(description) = &self.description {
            violations.max_len("description", description, 1024);
        }
        violations.into_result()
    }
}
