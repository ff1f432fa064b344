//! Users, profiles, permissions and API tokens

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use super::PgStore;
use crate::{
    error::{AppError, AppResult},
    models::user::{AuthToken, NewUser, Permission, Role, User, UserProfile, UserRow},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; fails with `Conflict` when the username is taken
    async fn create_user(&self, user: &NewUser) -> AppResult<User>;

    async fn get_by_id(&self, id: i32) -> AppResult<User>;

    /// Exact username lookup
    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Case-insensitive existence check used on registration
    async fn username_exists(&self, username: &str) -> AppResult<bool>;

    async fn touch_last_login(&self, id: i32) -> AppResult<()>;

    async fn profile(&self, user_id: i32) -> AppResult<Option<UserProfile>>;

    /// Create, change or (with `None`) remove the profile
    async fn set_profile(&self, user_id: i32, role: Option<Role>) -> AppResult<()>;

    async fn permissions(&self, user_id: i32) -> AppResult<BTreeSet<Permission>>;

    async fn set_permissions(&self, user_id: i32, permissions: &[Permission]) -> AppResult<()>;

    /// Return the user's token, storing `candidate_key` if none exists yet
    async fn token_get_or_create(&self, user_id: i32, candidate_key: &str) -> AppResult<AuthToken>;

    /// Owner of a token key
    async fn token_user(&self, key: &str) -> AppResult<Option<User>>;
}

const DUPLICATE_USERNAME: &str = "A user with that username already exists";

const USER_COLUMNS: &str =
    "id, username, password, email, is_active, is_superuser, date_joined, last_login";

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        if self.username_exists(&user.username).await? {
            return Err(AppError::Conflict(DUPLICATE_USERNAME.to_string()));
        }

        let query = format!(
            r#"
            INSERT INTO users (username, password, email, is_active, is_superuser, date_joined)
            VALUES ($1, $2, $3, TRUE, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.email)
            .bind(user.is_superuser)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_USERNAME))?;
        Ok(row.into())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::from)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn touch_last_login(&self, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn profile(&self, user_id: i32) -> AppResult<Option<UserProfile>> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM user_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        role.map(|role| {
            role.parse::<Role>()
                .map(|role| UserProfile { user_id, role })
                .map_err(AppError::Internal)
        })
        .transpose()
    }

    async fn set_profile(&self, user_id: i32, role: Option<Role>) -> AppResult<()> {
        match role {
            Some(role) => {
                sqlx::query(
                    r#"
                    INSERT INTO user_profiles (user_id, role)
                    VALUES ($1, $2)
                    ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role
                    "#,
                )
                .bind(user_id)
                .bind(role.as_str())
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn permissions(&self, user_id: i32) -> AppResult<BTreeSet<Permission>> {
        let rows = sqlx::query("SELECT codename FROM user_permissions WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let mut permissions = BTreeSet::new();
        for row in rows {
            let codename: String = row.get("codename");
            match codename.parse::<Permission>() {
                Ok(permission) => {
                    permissions.insert(permission);
                }
                Err(e) => tracing::warn!(user_id, "Ignoring stored permission: {}", e),
            }
        }
        Ok(permissions)
    }

    async fn set_permissions(&self, user_id: i32, permissions: &[Permission]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for permission in permissions {
            sqlx::query(
                r#"
                INSERT INTO user_permissions (user_id, codename)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(permission.codename())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn token_get_or_create(&self, user_id: i32, candidate_key: &str) -> AppResult<AuthToken> {
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (key, user_id, created)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(candidate_key)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT key, user_id, created FROM auth_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(AuthToken {
            key: row.get("key"),
            user_id: row.get("user_id"),
            created: row.get("created"),
        })
    }

    async fn token_user(&self, key: &str) -> AppResult<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE id = (SELECT user_id FROM auth_tokens WHERE key = $1)",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }
}
