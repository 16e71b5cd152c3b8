//! Repository trait definitions for testability and dependency injection.
//!
//! This module provides trait-based abstractions over user storage so the
//! account core can run against PostgreSQL in production and against
//! [`MemoryStore`](super::MemoryStore) in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};

use crate::auth::{AuthError, AuthResult, NewUser, User, UserId, UserPatch};

const USER_COLUMNS: &str = "id, username, email, full_name, hashed_password, is_active, \
                            is_verified, created_at, updated_at";

/// Trait for user repository operations
///
/// Implementations enforce uniqueness of username and email themselves and
/// report a violation as `UsernameTaken` / `EmailTaken`, even when the
/// caller already checked beforehand.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by username
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    /// Find user by email
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>>;

    /// Insert a new, unverified, active user
    async fn insert_user(&self, user: NewUser) -> AuthResult<User>;

    /// Apply the fields present in `patch`; `false` when no such user exists
    async fn update_user(&self, user_id: UserId, patch: UserPatch) -> AuthResult<bool>;
}

/// Default PostgreSQL implementation of `UserRepository`
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn insert_user(&self, user: NewUser) -> AuthResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, full_name, hashed_password) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)?;

        Ok(user_from_row(&row)?)
    }

    async fn update_user(&self, user_id: UserId, patch: UserPatch) -> AuthResult<bool> {
        if patch.is_empty() {
            return Ok(self.find_by_id(user_id).await?.is_some());
        }

        let mut query = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");
        if let Some(email) = patch.email {
            query.push(", email = ").push_bind(email);
        }
        if let Some(full_name) = patch.full_name {
            query.push(", full_name = ").push_bind(full_name);
        }
        if let Some(hashed_password) = patch.hashed_password {
            query.push(", hashed_password = ").push_bind(hashed_password);
        }
        if let Some(is_active) = patch.is_active {
            query.push(", is_active = ").push_bind(is_active);
        }
        if let Some(is_verified) = patch.is_verified {
            query.push(", is_verified = ").push_bind(is_verified);
        }
        query.push(" WHERE id = ").push_bind(user_id);

        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_unique_violation)?;

        Ok(result.rows_affected() > 0)
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        hashed_password: row.try_get("hashed_password")?,
        is_active: row.try_get("is_active")?,
        is_verified: row.try_get("is_verified")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
    })
}

/// Turn a unique-constraint violation into the matching conflict error
fn map_unique_violation(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            log::info!(
                "Unique violation on {}",
                db_err.constraint().unwrap_or("<unknown constraint>")
            );
            return match db_err.constraint() {
                Some(constraint) if constraint.contains("email") => AuthError::EmailTaken,
                _ => AuthError::UsernameTaken,
            };
        }
    }
    AuthError::Database(err)
}
