pub mod account;
pub mod profile;
pub mod public;
pub mod trips;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{auth::CurrentUser, state::AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(public::router())
        .nest("/trips", trips::router())
        .nest("/account", account::router())
        .merge(profile::router())
        .nest_service("/static", ServeDir::new("static"))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Navigation bar state shared by every page.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub username: Option<String>,
}

impl From<&CurrentUser> for Nav {
    fn from(current: &CurrentUser) -> Self {
        Self {
            username: current.0.as_ref().map(|user| user.username.clone()),
        }
    }
}
