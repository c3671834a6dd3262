use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::trip::{Trip, TripExport},
    routes::{public::field_message, Nav},
    state::AppState,
    validation::{self, FieldError, TripForm},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(trips_list))
        .route("/new", get(new_form).post(new_submit))
        .route("/import", get(import_form).post(import_submit))
        .route("/export", get(export))
        .route("/:id", get(trip_detail).post(trip_delete))
        .route("/:id/edit", get(edit_form).post(edit_submit))
}

#[derive(Template)]
#[template(path = "trips/list.html")]
struct TripsListTemplate {
    nav: Nav,
    username: String,
    trips: Vec<Trip>,
}

async fn trips_list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    let trips = state.trips.list_for_user(&user.id).await?;
    Ok(AskamaTemplateResponse::into_response(TripsListTemplate {
        nav: Nav::from(&current),
        username: user.username.clone(),
        trips,
    }))
}

#[derive(Template)]
#[template(path = "trips/form.html")]
struct TripFormTemplate {
    nav: Nav,
    heading: String,
    action: String,
    form: TripForm,
    error: Option<FieldError>,
    tile_url: String,
}

impl TripFormTemplate {
    fn error_for(&self, field: &str) -> &str {
        field_message(&self.error, field)
    }

    fn is_secret(&self) -> bool {
        self.form.secret.as_deref() == Some("on")
    }

    fn is_hide_upcoming(&self) -> bool {
        self.form.hide_upcoming.as_deref() == Some("on")
    }
}

fn render_trip_form(
    state: &AppState,
    current: &CurrentUser,
    trip_id: Option<&str>,
    form: TripForm,
    error: Option<FieldError>,
) -> Response {
    let (heading, action) = match trip_id {
        Some(id) => ("Edit trip".to_string(), format!("/trips/{id}/edit")),
        None => ("New trip".to_string(), "/trips/new".to_string()),
    };
    let status = if error.is_some() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    (
        status,
        AskamaTemplateResponse::into_response(TripFormTemplate {
            nav: Nav::from(current),
            heading,
            action,
            form,
            error,
            tile_url: state.config.map_tile_url.clone(),
        }),
    )
        .into_response()
}

async fn new_form(State(state): State<AppState>, current: CurrentUser) -> Result<Response, AppError> {
    current.require_user()?;
    Ok(render_trip_form(&state, &current, None, TripForm::default(), None))
}

async fn new_submit(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<TripForm>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let input = match form.validate() {
        Ok(input) => input,
        Err(err) => return Ok(render_trip_form(&state, &current, None, form, Some(err))),
    };
    let trip = state.trips.create(&user.id, &input).await?;
    info!(user_id = %user.id, trip_id = %trip.id, "trip created");
    Ok(Redirect::to(&format!("/trips/{}", trip.id)).into_response())
}

#[derive(Template)]
#[template(path = "trips/detail.html")]
struct TripDetailTemplate {
    nav: Nav,
    trip: Trip,
    tile_url: String,
}

async fn trip_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    let trip = state
        .trips
        .get(&user.id, &trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(AskamaTemplateResponse::into_response(TripDetailTemplate {
        nav: Nav::from(&current),
        trip,
        tile_url: state.config.map_tile_url.clone(),
    }))
}

async fn trip_delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Redirect, AppError> {
    let user = current.require_user()?;
    if state.trips.delete(&user.id, &trip_id).await? {
        info!(user_id = %user.id, trip_id = %trip_id, "trip deleted");
    }
    Ok(Redirect::to("/trips"))
}

async fn edit_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let trip = state
        .trips
        .get(&user.id, &trip_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(render_trip_form(
        &state,
        &current,
        Some(&trip.id),
        TripForm::from(&trip),
        None,
    ))
}

async fn edit_submit(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
    Form(form): Form<TripForm>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let input = match form.validate() {
        Ok(input) => input,
        Err(err) => {
            return Ok(render_trip_form(
                &state,
                &current,
                Some(&trip_id),
                form,
                Some(err),
            ))
        }
    };
    let trip = state
        .trips
        .update(&user.id, &trip_id, &input)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(user_id = %user.id, trip_id = %trip.id, "trip updated");
    Ok(Redirect::to(&format!("/trips/{}", trip.id)).into_response())
}

#[derive(Template)]
#[template(path = "trips/import.html")]
struct ImportTemplate {
    nav: Nav,
    json: String,
    error_message: Option<String>,
}

async fn import_form(current: CurrentUser) -> Result<impl IntoResponse, AppError> {
    current.require_user()?;
    Ok(AskamaTemplateResponse::into_response(ImportTemplate {
        nav: Nav::from(&current),
        json: String::new(),
        error_message: None,
    }))
}

#[derive(Deserialize)]
struct ImportForm {
    #[serde(default)]
    json: String,
}

async fn import_submit(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<ImportForm>,
) -> Result<Response, AppError> {
    let user = current.require_user()?;
    let inputs = match validation::parse_import(&form.json) {
        Ok(inputs) => inputs,
        Err(err) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                AskamaTemplateResponse::into_response(ImportTemplate {
                    nav: Nav::from(&current),
                    json: form.json,
                    error_message: Some(err.message),
                }),
            )
                .into_response())
        }
    };
    state.trips.import(&user.id, &inputs).await?;
    Ok(Redirect::to("/trips").into_response())
}

async fn export(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require_user()?;
    let trips = state.trips.list_for_user(&user.id).await?;
    let disposition = format!("attachment; filename=\"{}-trips.json\"", user.username);
    Ok((
        [(header::CONTENT_DISPOSITION, disposition)],
        Json(TripExport {
            email: user.email.clone(),
            username: user.username.clone(),
            trips,
        }),
    ))
}

impl From<&Trip> for TripForm {
    fn from(trip: &Trip) -> Self {
        let checkbox = |checked: bool| checked.then(|| "on".to_string());
        Self {
            destination: trip.destination.clone(),
            country: trip.country.clone(),
            description: trip.description.clone(),
            from: trip.from_display(),
            to: trip.to_display(),
            lat: trip.lat.to_string(),
            long: trip.long.to_string(),
            flights: trip.flights.to_string(),
            secret: checkbox(trip.secret),
            hide_upcoming: checkbox(trip.hide_upcoming),
        }
    }
}
