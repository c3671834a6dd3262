use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::session::PasswordReset,
    services::{
        mail::{Mailer, OutgoingMail},
        password,
        users::UserStore,
    },
};

/// How long an emailed reset link stays usable.
pub fn token_ttl() -> Duration {
    Duration::hours(1)
}

#[derive(Clone)]
pub struct PasswordResets {
    db: DbPool,
    users: UserStore,
    mailer: Arc<dyn Mailer>,
    public_url: Url,
}

impl PasswordResets {
    pub fn new(db: DbPool, users: UserStore, mailer: Arc<dyn Mailer>, public_url: Url) -> Self {
        Self {
            db,
            users,
            mailer,
            public_url,
        }
    }

    /// Mails a reset link if an account uses `email`. Unknown addresses are
    /// accepted silently so the form does not reveal who is registered.
    pub async fn request(&self, email: &str) -> Result<(), AppError> {
        if self.users.find_by_email(email).await?.is_none() {
            info!("password reset requested for unknown address");
            return Ok(());
        }

        sqlx::query("DELETE FROM password_resets WHERE email = ?1")
            .bind(email)
            .execute(&self.db)
            .await?;

        let token = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO password_resets (email, token_hash, created_at) VALUES (?1, ?2, ?3)")
            .bind(email)
            .bind(password::token_digest(&token))
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        let mut link = self
            .public_url
            .join("/password/change")
            .map_err(|err| AppError::Other(err.into()))?;
        link.query_pairs_mut().append_pair("token", &token);

        let mail = OutgoingMail {
            to: email.to_string(),
            subject: "Password reset code".into(),
            body: format!(
                "Somebody has requested a password reset for your travel journal. If this was you, \
                 go to {link} to reset your password. The link will expire in 1 hour. If this \
                 wasn't you, you do not need to take any further action."
            ),
        };
        if let Err(err) = self.mailer.send(mail).await {
            warn!("password reset mail could not be sent: {err}");
        }
        Ok(())
    }

    pub async fn is_valid(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.find_live(token, Utc::now()).await?.is_some())
    }

    /// Sets a new password through a reset token. Returns `false` for unknown
    /// or expired tokens. A token works once.
    pub async fn redeem(&self, token: &str, new_password: &str) -> Result<bool, AppError> {
        let Some(reset) = self.find_live(token, Utc::now()).await? else {
            return Ok(false);
        };
        let Some(user) = self.users.find_by_email(&reset.email).await? else {
            return Ok(false);
        };

        let hashed = password::hash(new_password)?;
        self.users.set_password_hash(&user.id, &hashed).await?;
        sqlx::query("DELETE FROM password_resets WHERE email = ?1")
            .bind(&reset.email)
            .execute(&self.db)
            .await?;
        info!(user_id = %user.id, "password reset completed");
        Ok(true)
    }

    async fn find_live(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PasswordReset>, AppError> {
        let reset = sqlx::query_as::<_, PasswordReset>(
            "SELECT email, token_hash, created_at FROM password_resets WHERE token_hash = ?1",
        )
        .bind(password::token_digest(token))
        .fetch_optional(&self.db)
        .await?;

        Ok(reset.filter(|reset| reset.created_at + token_ttl() > now))
    }
}
