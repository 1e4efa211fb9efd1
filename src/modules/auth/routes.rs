use axum::{extract::State, http::StatusCode, Json};
use bookstore_authz::RoleName;
use bookstore_http::{error::ErrorResponse, AppError, ValidJson};
use bookstore_db::{constraint_violation, ConstraintViolation};
use bookstore_kernel::AppState;
use serde_json::json;

use super::models::{
    normalize_email, NewUser, UserLoginRequestDto, UserLoginResponseDto,
    UserRegistrationRequestDto, UserResponseDto,
};
use super::repository::{RoleRepository, UserRepository};

/// Register a customer account
#[utoipa::path(
    post,
    path = "/registration",
    tag = "Authentication",
    request_body = UserRegistrationRequestDto,
    responses(
        (status = 201, description = "Account created", body = UserResponseDto),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Invalid registration data", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<UserRegistrationRequestDto>,
) -> Result<(StatusCode, Json<UserResponseDto>), AppError> {
    let email = normalize_email(&request.email);
    let users = UserRepository::new(state.db.clone());

    if users.exists_by_email(&email).await? {
        return Err(email_taken(&email));
    }

    let user_role = RoleRepository::new(state.db.clone())
        .find_by_name(RoleName::User)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("role USER is not seeded")))?;

    let password_hash = state.passwords.hash(&request.password).await?;
    let user = users
        .save(
            NewUser {
                email: &email,
                password_hash: &password_hash,
                first_name: request.first_name.trim(),
                last_name: request.last_name.trim(),
                shipping_address: request.shipping_address.as_deref(),
            },
            &[user_role],
        )
        .await
        .map_err(|error| match constraint_violation(&error) {
            // another registration for the same email committed first
            Some(ConstraintViolation::Unique) => email_taken(&email),
            _ => error.into(),
        })?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/login",
    tag = "Authentication",
    request_body = UserLoginRequestDto,
    responses(
        (status = 200, description = "Authenticated", body = UserLoginResponseDto),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<UserLoginRequestDto>,
) -> Result<Json<UserLoginResponseDto>, AppError> {
    let email = normalize_email(&request.email);
    let account = UserRepository::new(state.db.clone())
        .find_by_email(&email)
        .await?;

    let authenticated = match &account {
        Some(account) => {
            state
                .passwords
                .verify(&request.password, &account.user.password)
                .await?
        }
        None => false,
    };

    if !authenticated {
        tracing::debug!("login rejected");
        return Err(AppError::unauthorized("invalid email or password"));
    }

    let token = state.tokens.generate(&email)?;
    Ok(Json(UserLoginResponseDto { token }))
}

fn email_taken(email: &str) -> AppError {
    AppError::conflict(
        vec![json!({ "field": "email", "error": "already registered" })],
        format!("a user with email {email} already exists"),
    )
}
