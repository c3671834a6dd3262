use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    auth::CurrentUser,
    error::AppError,
    routes::Nav,
    services::summary::{self, ProfileSummary},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/:username", get(profile))
}

#[derive(Serialize)]
struct Marker {
    lat: f64,
    long: f64,
    label: String,
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate {
    nav: Nav,
    username: String,
    owner_viewing: bool,
    summary: ProfileSummary,
    markers_json: String,
    tile_url: String,
}

async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or(AppError::NotFound)?;

    let trips = state.trips.list_for_user(&user.id).await?;
    let owner_viewing = current.is(&user.id);
    let summary = summary::summarize(trips, owner_viewing, Utc::now());

    let markers: Vec<Marker> = summary
        .trips
        .iter()
        .map(|view| Marker {
            lat: view.trip.lat,
            long: view.trip.long,
            label: format!("{}, {}", view.trip.destination, view.trip.country),
        })
        .collect();
    let markers_json = serde_json::to_string(&markers).map_err(|err| AppError::Other(err.into()))?;

    Ok(AskamaTemplateResponse::into_response(ProfileTemplate {
        nav: Nav::from(&current),
        username: user.username,
        owner_viewing,
        summary,
        markers_json,
        tile_url: state.config.map_tile_url.clone(),
    }))
}
