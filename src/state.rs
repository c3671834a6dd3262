use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{mail::Mailer, reset::PasswordResets, trips::TripStore, users::UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub users: UserStore,
    pub trips: TripStore,
    pub resets: PasswordResets,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool, mailer: Arc<dyn Mailer>) -> Self {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        let users = UserStore::new(db.clone());
        let trips = TripStore::new(db.clone());
        let resets = PasswordResets::new(
            db.clone(),
            users.clone(),
            mailer,
            config.public_url.clone(),
        );
        Self {
            config,
            db,
            users,
            trips,
            resets,
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
