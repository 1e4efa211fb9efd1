use std::collections::BTreeSet;

use anyhow::Context;
use bookstore_authz::RoleName;
use bookstore_db::DbPool;

use super::models::{NewUser, Role, User, UserAccount};
use crate::modules::cart::repository::ShoppingCartRepository;

const USER_COLUMNS: &str = "id, email, password, first_name, last_name, shipping_address";

pub struct RoleRepository {
    pool: DbPool,
}

impl RoleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_name(&self, name: RoleName) -> anyhow::Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = ?")
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load role {name}"))?;
        Ok(role)
    }
}

pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn exists_by_email(&self, email: &str) -> anyhow::Result<bool> {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Load a user and its roles. Role names the application does not know
    /// are skipped.
    pub async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserAccount>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load user by email")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let names = sqlx::query_scalar::<_, String>(
            "SELECT r.name FROM roles r JOIN users_roles ur ON ur.role_id = r.id WHERE ur.user_id = ?",
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load user roles")?;

        let roles: BTreeSet<RoleName> = names
            .iter()
            .filter_map(|name| match name.parse() {
                Ok(role) => Some(role),
                Err(e) => {
                    tracing::warn!(user_id = user.id, error = %e, "ignoring unknown role");
                    None
                }
            })
            .collect();

        Ok(Some(UserAccount { user, roles }))
    }

    /// Insert a user with its roles and an empty shopping cart, atomically.
    pub async fn save(&self, new_user: NewUser<'_>, roles: &[Role]) -> anyhow::Result<User> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password, first_name, last_name, shipping_address) \
             VALUES (?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .bind(new_user.first_name)
        .bind(new_user.last_name)
        .bind(new_user.shipping_address)
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert user")?;

        for role in roles {
            sqlx::query("INSERT INTO users_roles (user_id, role_id) VALUES (?, ?)")
                .bind(user.id)
                .bind(role.id)
                .execute(&mut *tx)
                .await
                .context("failed to assign role")?;
        }

        ShoppingCartRepository::create_for_user(&mut *tx, user.id).await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Grant `role` to the user with `email`. Returns `false` when no such
    /// user exists; granting a role twice is a no-op.
    pub async fn add_role(&self, email: &str, role: &Role) -> anyhow::Result<bool> {
        let user_id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        let Some(user_id) = user_id else {
            return Ok(false);
        };

        sqlx::query("INSERT OR IGNORE INTO users_roles (user_id, role_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(role.id)
            .execute(&self.pool)
            .await
            .context("failed to grant role")?;
        Ok(true)
    }
}
