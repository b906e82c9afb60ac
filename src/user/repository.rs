//! Handle database requests for users.

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::Result;
use crate::user::{AuthUser, Settings, User};

const USER_COLUMNS: &str = "id, name, email, role, password, is_admin, is_active, settings, \
                            created_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert [`User`] into database.
    pub async fn insert(&self, user: &User) -> Result<User> {
        let query = format!(
            r#"INSERT INTO users (id, name, email, role, password, is_admin, is_active, settings)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {USER_COLUMNS}"#
        );

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.role)
            .bind(&user.password)
            .bind(user.is_admin)
            .bind(user.is_active)
            .bind(sqlx::types::Json(&user.settings))
            .fetch_one(&self.pool)
            .await?)
    }

    /// Find current user using `id` field.
    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let query = format!(r#"SELECT {USER_COLUMNS} FROM users WHERE id = $1"#);

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Find current user using `email` field.
    /// Emails are stored lowercased; callers normalize before lookup.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!(r#"SELECT {USER_COLUMNS} FROM users WHERE email = $1"#);

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Existence probe for the registration form.
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)"#)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Resolve the identity attached to protected requests.
    pub async fn identity(&self, user_id: Uuid) -> Result<Option<AuthUser>> {
        Ok(sqlx::query_as::<_, AuthUser>(
            r#"SELECT id, email, name, is_admin FROM users WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Update display name and role label, keeping absent fields.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        role: Option<String>,
    ) -> Result<Option<User>> {
        let query = format!(
            r#"UPDATE users
                SET name = COALESCE($2, name), role = COALESCE($3, role)
                WHERE id = $1
                RETURNING {USER_COLUMNS}"#
        );

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .bind(name)
            .bind(role)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Replace the settings document.
    pub async fn update_settings(&self, user_id: Uuid, settings: &Settings) -> Result<bool> {
        let result = sqlx::query(r#"UPDATE users SET settings = $2 WHERE id = $1"#)
            .bind(user_id)
            .bind(sqlx::types::Json(settings))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip the activity flag. Deactivated users keep their rows but are
    /// refused authentication.
    pub async fn set_active(&self, user_id: Uuid, is_active: bool) -> Result<Option<User>> {
        let query = format!(
            r#"UPDATE users SET is_active = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"#
        );

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Store a new password hash.
    pub async fn update_password(&self, user_id: Uuid, phc_hash: &str) -> Result<bool> {
        let result = sqlx::query(r#"UPDATE users SET password = $2 WHERE id = $1"#)
            .bind(user_id)
            .bind(phc_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Administrative hard delete. Dependent tasks are left in place.
    pub async fn delete(&self, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
