use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use tracing::info;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    routes::Nav,
    state::AppState,
    validation,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(account_page).post(change_username))
        .route("/delete", get(delete_page).post(delete_account))
}

#[derive(Template)]
#[template(path = "account/index.html")]
struct AccountTemplate {
    nav: Nav,
    username: String,
    error_message: Option<String>,
}

async fn account_page(current: CurrentUser) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    Ok(AskamaTemplateResponse::into_response(AccountTemplate {
        nav: Nav::from(&current),
        username: user.username.clone(),
        error_message: None,
    }))
}

#[derive(Deserialize)]
struct UsernameForm {
    #[serde(default)]
    username: String,
}

async fn change_username(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<UsernameForm>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let render_error = |message: String| {
        (
            StatusCode::BAD_REQUEST,
            AskamaTemplateResponse::into_response(AccountTemplate {
                nav: Nav::from(&current),
                username: form.username.clone(),
                error_message: Some(message),
            }),
        )
            .into_response()
    };

    let username = match validation::validate_username(&form.username) {
        Ok(username) => username,
        Err(err) => return Ok(render_error(err.message)),
    };

    match state.users.change_username(&user.id, &username).await {
        Ok(()) => {
            info!(user_id = %user.id, %username, "username changed");
            Ok(Redirect::to(&format!("/{username}")).into_response())
        }
        Err(AppError::BadRequest(message)) => Ok(render_error(message)),
        Err(err) => Err(err),
    }
}

#[derive(Template)]
#[template(path = "account/delete.html")]
struct DeleteTemplate {
    nav: Nav,
}

async fn delete_page(current: CurrentUser) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    Ok(AskamaTemplateResponse::into_response(DeleteTemplate {
        nav: Nav::from(&current),
    }))
}

async fn delete_account(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    let user = current.require_user()?;
    let stored = state
        .users
        .find_by_id(&user.id)
        .await?
        .ok_or(AppError::NotFound)?;
    state.users.delete(&stored).await?;
    info!(user_id = %stored.id, "account deleted");
    Ok((auth::clear_session_cookie(jar), Redirect::to("/")))
}
