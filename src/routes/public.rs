use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use tracing::info;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    routes::Nav,
    services::password,
    state::AppState,
    validation::{self, FieldError},
};

const AFTER_LOGIN: &str = "/trips";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/login", get(login_form).post(login_submit))
        .route("/join", get(join_form).post(join_submit))
        .route("/logout", get(logout_redirect).post(logout))
        .route("/password/reset", get(reset_form).post(reset_submit))
        .route("/password/change", get(change_form).post(change_submit))
        .route("/kpi", get(kpi))
}

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    nav: Nav,
}

async fn landing(current: CurrentUser) -> impl IntoResponse {
    AskamaTemplateResponse::into_response(LandingTemplate {
        nav: Nav::from(&current),
    })
}

#[serde_as]
#[derive(Deserialize, Default)]
struct RedirectQuery {
    #[serde(default, rename = "redirectTo")]
    #[serde_as(as = "NoneAsEmptyString")]
    redirect_to: Option<String>,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    nav: Nav,
    error_message: Option<String>,
    email: String,
    redirect_to: String,
}

async fn login_form(
    current: CurrentUser,
    Query(query): Query<RedirectQuery>,
) -> Response {
    if current.0.is_some() {
        return Redirect::to(AFTER_LOGIN).into_response();
    }
    AskamaTemplateResponse::into_response(LoginTemplate {
        nav: Nav::default(),
        error_message: None,
        email: String::new(),
        redirect_to: query.redirect_to.unwrap_or_default(),
    })
}

#[serde_as]
#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
    remember: Option<String>,
    #[serde(default, rename = "redirectTo")]
    #[serde_as(as = "NoneAsEmptyString")]
    redirect_to: Option<String>,
}

async fn login_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if !validation::validate_email(form.email.trim()) {
        return Ok(render_login_error(form, "Email is invalid"));
    }
    if form.password.is_empty() {
        return Ok(render_login_error(form, "Password is required"));
    }

    match auth::authenticate_user(&state, &form.email, &form.password).await {
        Ok(user) => {
            let session_id = auth::create_session(&state, &user.id).await?;
            info!(user_id = %user.id, "user logged in");
            let target = validation::safe_redirect(form.redirect_to.as_deref(), AFTER_LOGIN);
            Ok((
                auth::apply_session_cookie(jar, &session_id, form.remember.is_some()),
                Redirect::to(target),
            )
                .into_response())
        }
        Err(AppError::Unauthorized) => Ok(render_login_error(form, "Invalid email or password")),
        Err(err) => Err(err),
    }
}

fn render_login_error(form: LoginForm, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        AskamaTemplateResponse::into_response(LoginTemplate {
            nav: Nav::default(),
            error_message: Some(message.to_string()),
            email: form.email,
            redirect_to: form.redirect_to.unwrap_or_default(),
        }),
    )
        .into_response()
}

#[derive(Template)]
#[template(path = "auth/join.html")]
pub struct JoinTemplate {
    nav: Nav,
    error: Option<FieldError>,
    email: String,
    username: String,
    redirect_to: String,
}

impl JoinTemplate {
    fn error_for(&self, field: &str) -> &str {
        field_message(&self.error, field)
    }
}

async fn join_form(current: CurrentUser, Query(query): Query<RedirectQuery>) -> Response {
    if current.0.is_some() {
        return Redirect::to("/").into_response();
    }
    AskamaTemplateResponse::into_response(JoinTemplate {
        nav: Nav::default(),
        error: None,
        email: String::new(),
        username: String::new(),
        redirect_to: query.redirect_to.unwrap_or_default(),
    })
}

#[serde_as]
#[derive(Deserialize)]
struct JoinForm {
    email: String,
    password: String,
    username: String,
    #[serde(default, rename = "redirectTo")]
    #[serde_as(as = "NoneAsEmptyString")]
    redirect_to: Option<String>,
}

async fn join_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<JoinForm>,
) -> Result<Response, AppError> {
    match auth::register_user(&state, &form.username, &form.email, &form.password).await? {
        Ok(user) => {
            let session_id = auth::create_session(&state, &user.id).await?;
            let target = validation::safe_redirect(form.redirect_to.as_deref(), AFTER_LOGIN);
            Ok((
                auth::apply_session_cookie(jar, &session_id, false),
                Redirect::to(target),
            )
                .into_response())
        }
        Err(error) => Ok((
            StatusCode::BAD_REQUEST,
            AskamaTemplateResponse::into_response(JoinTemplate {
                nav: Nav::default(),
                error: Some(error),
                email: form.email,
                username: form.username,
                redirect_to: form.redirect_to.unwrap_or_default(),
            }),
        )
            .into_response()),
    }
}

async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    if let Some(cookie) = jar.get(auth::SESSION_COOKIE) {
        auth::destroy_session(&state, cookie.value()).await?;
    }
    Ok((auth::clear_session_cookie(jar), Redirect::to("/")))
}

async fn logout_redirect() -> Redirect {
    Redirect::to("/")
}

#[derive(Template)]
#[template(path = "auth/password_reset.html")]
struct ResetTemplate {
    nav: Nav,
    error_message: Option<String>,
    done: bool,
}

async fn reset_form(current: CurrentUser) -> Response {
    // Signed-in users change their password directly.
    if current.0.is_some() {
        return Redirect::to("/password/change").into_response();
    }
    AskamaTemplateResponse::into_response(ResetTemplate {
        nav: Nav::default(),
        error_message: None,
        done: false,
    })
}

#[derive(Deserialize)]
struct ResetForm {
    email: String,
}

async fn reset_submit(
    State(state): State<AppState>,
    Form(form): Form<ResetForm>,
) -> Result<Response, AppError> {
    let email = form.email.trim();
    if !validation::validate_email(email) {
        return Ok((
            StatusCode::BAD_REQUEST,
            AskamaTemplateResponse::into_response(ResetTemplate {
                nav: Nav::default(),
                error_message: Some("Email is invalid".into()),
                done: false,
            }),
        )
            .into_response());
    }

    state.resets.request(email).await?;

    Ok(AskamaTemplateResponse::into_response(ResetTemplate {
        nav: Nav::default(),
        error_message: None,
        done: true,
    }))
}

#[derive(Template)]
#[template(path = "auth/password_change.html")]
struct ChangeTemplate {
    nav: Nav,
    token: String,
    error: Option<FieldError>,
    done: bool,
}

impl ChangeTemplate {
    fn error_for(&self, field: &str) -> &str {
        field_message(&self.error, field)
    }
}

#[serde_as]
#[derive(Deserialize, Default)]
struct TokenQuery {
    #[serde(default)]
    #[serde_as(as = "NoneAsEmptyString")]
    token: Option<String>,
}

async fn change_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<TokenQuery>,
) -> Result<Response, AppError> {
    let nav = Nav::from(&current);
    match query.token {
        Some(token) => {
            let error = if state.resets.is_valid(&token).await? {
                None
            } else {
                Some(expired_link())
            };
            Ok(AskamaTemplateResponse::into_response(ChangeTemplate {
                nav,
                token,
                error,
                done: false,
            }))
        }
        None => {
            current.require_user()?;
            Ok(AskamaTemplateResponse::into_response(ChangeTemplate {
                nav,
                token: String::new(),
                error: None,
                done: false,
            }))
        }
    }
}

#[serde_as]
#[derive(Deserialize)]
struct ChangeForm {
    password: String,
    #[serde(rename = "confirmPassword")]
    confirm_password: String,
    #[serde(default)]
    #[serde_as(as = "NoneAsEmptyString")]
    token: Option<String>,
}

async fn change_submit(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<ChangeForm>,
) -> Result<Response, AppError> {
    let nav = Nav::from(&current);
    let token = form.token.clone().unwrap_or_default();
    let render = |error: Option<FieldError>, done: bool| {
        let status = if error.is_some() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        };
        (
            status,
            AskamaTemplateResponse::into_response(ChangeTemplate {
                nav: nav.clone(),
                token: token.clone(),
                error,
                done,
            }),
        )
            .into_response()
    };

    if let Err(err) = validation::validate_password(&form.password, &form.confirm_password) {
        return Ok(render(Some(err), false));
    }

    match form.token.as_deref() {
        Some(token) => {
            if !state.resets.redeem(token, &form.password).await? {
                return Ok(render(Some(expired_link()), false));
            }
        }
        None => {
            let user = current.require_user()?;
            let hashed = password::hash(&form.password)?;
            state.users.set_password_hash(&user.id, &hashed).await?;
            info!(user_id = %user.id, "password changed");
        }
    }

    Ok(render(None, true))
}

fn expired_link() -> FieldError {
    FieldError::new(
        "token",
        "This password reset link is invalid or has expired. Please request a new one.",
    )
}

#[derive(Serialize)]
struct Kpi {
    users: i64,
    trips: i64,
}

async fn kpi(State(state): State<AppState>, current: CurrentUser) -> Result<Json<Kpi>, AppError> {
    current.require_user()?;
    let (users, trips) = tokio::try_join!(state.users.count(), state.trips.count())?;
    Ok(Json(Kpi { users, trips }))
}

pub(crate) fn field_message<'a>(error: &'a Option<FieldError>, field: &str) -> &'a str {
    match error {
        Some(error) if error.field == field => &error.message,
        _ => "",
    }
}
