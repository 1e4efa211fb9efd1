use std::collections::BTreeSet;

use bookstore_authz::RoleName;
use bookstore_http::{Validate, Violations};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 35;

/// Row of the `users` table. `password` holds the bcrypt hash.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub shipping_address: Option<String>,
}

/// Row of the `roles` table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

impl Role {
    pub fn role_name(&self) -> Option<RoleName> {
        self.name.parse().ok()
    }
}

/// A user together with the roles granted to it.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub user: User,
    pub roles: BTreeSet<RoleName>,
}

/// Fields of a user about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub shipping_address: Option<&'a str>,
}

/// Lowercased, trimmed form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistrationRequestDto {
    #[schema(example = "john.doe@example.com")]
    pub email: String,
    #[schema(example = "password123", min_length = 8, max_length = 35)]
    pub password: String,
    #[schema(example = "password123")]
    pub repeat_password: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "221B Baker Street, London")]
    pub shipping_address: Option<String>,
}

impl Validate for UserRegistrationRequestDto {
    fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        violations
            .email("email", &self.email)
            .max_len("email", &self.email, 255)
            .length_between("password", &self.password, PASSWORD_MIN_LEN, PASSWORD_MAX_LEN)
            .not_blank("firstName", &self.first_name)
            .max_len("firstName", &self.first_name, 255)
            .not_blank("lastName", &self.last_name)
            .max_len("lastName", &self.last_name, 255);
        if let Some(address) = &self.shipping_address {
            violations.max_len("shippingAddress", address, 255);
        }
        if self.password != self.repeat_password {
            violations.add("repeatPassword", "passwords do not match");
        }
        violations.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponseDto {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub shipping_address: Option<String>,
}

impl From<User> for UserResponseDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            shipping_address: user.shipping_address,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserLoginRequestDto {
    #[schema(example = "john.doe@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

impl Validate for UserLoginRequestDto {
    fn validate(&self) -> Result<(), Violations> {
        let mut violations = Violations::new();
        violations
            .not_blank("email", &self.email)
            .not_blank("password", &self.password);
        violations.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserLoginResponseDto {
    pub token: String,
}
