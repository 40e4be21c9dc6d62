//! Repository for the `users` collection.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{
    first_row,
    models::{Role, User, UserStatus},
};

const COLUMNS: &str =
    "id, full_name, email, password_hash, role, status, created_at, updated_at";

/// Input for [`UserRepo::create`]. The email is expected to be normalised.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &SqlitePool, input: &NewUser<'_>) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO users (id, full_name, email, password_hash, role, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(input.full_name)
            .bind(input.email)
            .bind(input.password_hash)
            .bind(input.role)
            .bind(UserStatus::Active)
            .bind(now)
            .bind(now)
            .fetch_all(pool)
            .await
            .and_then(|rows| first_row(rows).ok_or(sqlx::Error::RowNotFound))
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive through the column collation.
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = ?");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    /// Users holding the given role, alphabetical by name.
    pub async fn list_by_role_by_name(
        pool: &SqlitePool,
        role: Role,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE role = ? ORDER BY full_name COLLATE NOCASE ASC"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(role)
            .fetch_all(pool)
            .await
    }

    /// Non-admin accounts, newest first.
    pub async fn list_staff(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE role IN (?, ?) ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(Role::User)
            .bind(Role::Moderator)
            .fetch_all(pool)
            .await
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users ORDER BY created_at DESC");
        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }

    /// Returns `None` if no row with the given `id` exists.
    pub async fn set_status(
        pool: &SqlitePool,
        id: &str,
        status: UserStatus,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET status = ?, updated_at = ? WHERE id = ? RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .fetch_all(pool)
            .await
            .map(first_row)
    }

    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
