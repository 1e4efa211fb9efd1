use std::collections::BTreeSet;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use bookstore_authz::{extract_bearer, RoleName};
use bookstore_http::AppError;
use bookstore_kernel::AppState;

use super::repository::UserRepository;

/// The authenticated caller, resolved from the bearer token.
///
/// The token only names the user; roles are read from storage on every
/// request so revocations apply immediately.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub roles: BTreeSet<RoleName>,
}

impl CurrentUser {
    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.contains(&role)
    }

    /// Fail with 403 unless the caller holds `role`.
    pub fn require(&self, role: RoleName) -> Result<(), AppError> {
        self.require_any(&[role])
    }

    /// Fail with 403 unless the caller holds at least one of `roles`.
    pub fn require_any(&self, roles: &[RoleName]) -> Result<(), AppError> {
        if roles.iter().any(|role| self.has_role(*role)) {
            Ok(())
        } else {
            tracing::debug!(user_id = self.id, required = ?roles, "access denied");
            Err(AppError::forbidden("insufficient role for this operation"))
        }
    }

    /// Readers of the catalogue: any signed-in customer or administrator.
    pub fn require_reader(&self) -> Result<(), AppError> {
        self.require_any(&[RoleName::User, RoleName::Admin])
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str())
            .transpose()
            .map_err(|_| AppError::unauthorized("authorization header is not valid text"))?;

        let token = extract_bearer(header)?;
        let claims = state.tokens.validate(token)?;

        let account = UserRepository::new(state.db.clone())
            .find_by_email(&claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("token subject no longer exists"))?;

        Ok(Self {
            id: account.user.id,
            email: account.user.email,
            roles: account.roles,
        })
    }
}
