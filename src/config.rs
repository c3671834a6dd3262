use std::{env, net::SocketAddr};

use url::Url;

use crate::error::AppError;

pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub cookie_secret: String,
    /// Externally reachable address, used for links in outgoing mail.
    pub public_url: Url,
    pub map_tile_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://whereto.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-this-is-not-a-secret-cookie-key".to_string());

        let public_url = Url::parse(
            &env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        )
        .map_err(|err| AppError::Config(format!("invalid PUBLIC_URL: {err}")))?;

        let map_tile_url =
            env::var("MAP_TILE_URL").unwrap_or_else(|_| DEFAULT_TILE_URL.to_string());

        Ok(Self {
            database_url,
            listen_addr,
            cookie_secret,
            public_url,
            map_tile_url,
        })
    }
}
