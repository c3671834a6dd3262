use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    PrivateCookieJar,
};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{session::Session, user::User},
    services::{
        password,
        users::{EMAIL_TAKEN, USERNAME_TAKEN},
    },
    state::AppState,
    validation::{self, FieldError},
};

pub const SESSION_COOKIE: &str = "whereto_session";
pub const SESSION_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let jar = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self(None));
        };
        Ok(Self(lookup_session(&state, cookie.value()).await?))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }

    pub fn is(&self, user_id: &str) -> bool {
        self.0.as_ref().is_some_and(|user| user.id == user_id)
    }
}

/// Creates an account. Problems the visitor can fix come back as `FieldError`.
pub async fn register_user(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<Result<AuthenticatedUser, FieldError>, AppError> {
    let registration = match validation::validate_registration(email, username, password) {
        Ok(registration) => registration,
        Err(err) => return Ok(Err(err)),
    };

    if state.users.find_by_email(&registration.email).await?.is_some() {
        return Ok(Err(FieldError::new("email", EMAIL_TAKEN)));
    }
    if state
        .users
        .find_by_username(&registration.username)
        .await?
        .is_some()
    {
        return Ok(Err(FieldError::new("username", USERNAME_TAKEN)));
    }

    let hashed = password::hash(&registration.password)?;
    let user = match state
        .users
        .create(&registration.email, &registration.username, &hashed)
        .await
    {
        Ok(user) => user,
        Err(AppError::BadRequest(message)) => {
            let field = if message == EMAIL_TAKEN { "email" } else { "username" };
            return Ok(Err(FieldError::new(field, message)));
        }
        Err(err) => return Err(err),
    };
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(Ok(user.into()))
}

/// Checks email and password. Any mismatch is `Unauthorized`.
pub async fn authenticate_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let Some(user) = state.users.find_by_email(email.trim()).await? else {
        return Err(AppError::Unauthorized);
    };
    if !password::verify(&user.password_hash, password) {
        debug!(user_id = %user.id, "password mismatch");
        return Err(AppError::Unauthorized);
    }
    Ok(user.into())
}

pub async fn create_session(state: &AppState, user_id: &str) -> Result<String, AppError> {
    let now = Utc::now();
    purge_expired_sessions(&state.db, now).await?;
    let session = Session {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        created_at: now,
        expires_at: now + Duration::days(SESSION_DAYS),
    };
    sqlx::query("INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&state.db)
        .await?;
    Ok(session.id)
}

pub async fn lookup_session(
    state: &AppState,
    session_id: &str,
) -> Result<Option<AuthenticatedUser>, AppError> {
    let session = sqlx::query_as::<_, Session>(
        "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?1",
    )
    .bind(session_id)
    .fetch_optional(&state.db)
    .await?;
    let Some(session) = session else {
        return Ok(None);
    };
    if session.is_expired(Utc::now()) {
        destroy_session(state, &session.id).await?;
        return Ok(None);
    }
    Ok(state
        .users
        .find_by_id(&session.user_id)
        .await?
        .map(AuthenticatedUser::from))
}

/// Drops session rows whose expiry has passed, whether or not their
/// cookie ever comes back.
pub async fn purge_expired_sessions(db: &DbPool, now: DateTime<Utc>) -> Result<u64, AppError> {
    let removed = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1")
        .bind(now)
        .execute(db)
        .await?
        .rows_affected();
    if removed > 0 {
        debug!(removed, "purged expired sessions");
    }
    Ok(removed)
}

pub async fn destroy_session(state: &AppState, session_id: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE id = ?1")
        .bind(session_id)
        .execute(&state.db)
        .await?;
    Ok(())
}

/// Sets the session cookie. Without `remember` it lasts for the browser
/// session; with it the cookie outlives the browser and the session row's
/// expiry decides.
pub fn apply_session_cookie(
    jar: PrivateCookieJar,
    session_id: &str,
    remember: bool,
) -> PrivateCookieJar {
    let mut cookie = Cookie::new(SESSION_COOKIE, session_id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    if remember {
        cookie.make_permanent();
    }
    jar.add(cookie)
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
