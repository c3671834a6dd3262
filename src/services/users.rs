use chrono::Utc;
use uuid::Uuid;

use crate::{db::DbPool, error::AppError, models::user::User};

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

pub const EMAIL_TAKEN: &str = "A user already exists with this email";
pub const USERNAME_TAKEN: &str = "A user already exists with this username";

#[derive(Clone)]
pub struct UserStore {
    db: DbPool,
}

impl UserStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    pub async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.db)
        .await
        .map_err(taken)?;
        Ok(user)
    }

    /// Fails with `BadRequest` when another account already uses the name.
    pub async fn change_username(&self, user_id: &str, username: &str) -> Result<(), AppError> {
        if let Some(existing) = self.find_by_username(username).await? {
            if existing.id != user_id {
                return Err(AppError::BadRequest(USERNAME_TAKEN.into()));
            }
            return Ok(());
        }
        sqlx::query("UPDATE users SET username = ?1 WHERE id = ?2")
            .bind(username)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(taken)?;
        Ok(())
    }

    pub async fn set_password_hash(&self, user_id: &str, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Removes the account with its trips, sessions and reset tokens.
    pub async fn delete(&self, user: &User) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM trips WHERE user_id = ?1")
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = ?1")
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM password_resets WHERE email = ?1")
            .bind(&user.email)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

/// A concurrent request can claim an email or username between the lookup
/// and the write; the UNIQUE index then decides.
fn taken(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            if db.message().contains("users.email") {
                AppError::BadRequest(EMAIL_TAKEN.into())
            } else {
                AppError::BadRequest(USERNAME_TAKEN.into())
            }
        }
        err => err.into(),
    }
}
