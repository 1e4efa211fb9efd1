use std::sync::Arc;

use bookstore_authz::{PasswordHasher, TokenService};
use bookstore_db::DbPool;

use crate::settings::Settings;

/// State shared by every request handler.
///
/// Cloning is cheap: the pool and services are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: DbPool,
    pub tokens: Arc<TokenService>,
    pub passwords: PasswordHasher,
}

impl AppState {
    pub fn new(settings: Settings, db: DbPool) -> Self {
        let tokens = TokenService::new(
            settings.auth.jwt_secret.as_bytes(),
            settings.auth.jwt_expiration_secs,
        );
        let passwords = PasswordHasher::new(settings.auth.bcrypt_cost);

        Self {
            settings: Arc::new(settings),
            db,
            tokens: Arc::new(tokens),
            passwords,
        }
    }
}
