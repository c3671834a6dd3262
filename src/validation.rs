//! Turns raw form and JSON input into typed, checked records.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::models::trip::TripInput;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Paths that would shadow a public profile at `/{username}`.
const RESERVED_USERNAMES: &[&str] = &[
    "account", "join", "kpi", "login", "logout", "password", "static", "trips",
];

/// A rejected input field, with the message shown next to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Trip form exactly as the browser posts it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TripForm {
    pub destination: String,
    pub country: String,
    pub description: String,
    pub from: String,
    pub to: String,
    pub lat: String,
    pub long: String,
    pub flights: String,
    pub secret: Option<String>,
    pub hide_upcoming: Option<String>,
}

impl TripForm {
    pub fn validate(&self) -> Result<TripInput, FieldError> {
        let from = parse_date("from", &self.from, "From date")?;
        let to = parse_date("to", &self.to, "To date")?;
        let destination = required("destination", &self.destination, "Destination is required")?;
        let country = required("country", &self.country, "Country is required")?;

        let flights = self.flights.trim();
        if flights.is_empty() {
            return Err(FieldError::new("flights", "Flights is required"));
        }
        let flights = flights
            .parse::<u32>()
            .map_err(|_| FieldError::new("flights", "Flights must be a whole number of zero or more"))?;

        let lat = parse_coordinate("lat", &self.lat, "Latitude", 90.0)?;
        let long = parse_coordinate("long", &self.long, "Longitude", 180.0)?;

        Ok(TripInput {
            destination,
            country,
            description: self.description.trim().to_string(),
            from,
            to,
            lat,
            long,
            flights,
            secret: is_checked(&self.secret),
            hide_upcoming: is_checked(&self.hide_upcoming),
        })
    }
}

/// One entry of a JSON import. All fields but the flags are mandatory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripImport {
    pub destination: String,
    pub country: String,
    pub description: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub lat: f64,
    pub long: f64,
    pub flights: u32,
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub hide_upcoming: bool,
}

impl TripImport {
    pub fn validate(self) -> Result<TripInput, FieldError> {
        let destination = required("destination", &self.destination, "Destination is required")?;
        let country = required("country", &self.country, "Country is required")?;
        check_coordinate("lat", self.lat, "Latitude", 90.0)?;
        check_coordinate("long", self.long, "Longitude", 180.0)?;

        Ok(TripInput {
            destination,
            country,
            description: self.description.trim().to_string(),
            from: self.from,
            to: self.to,
            lat: self.lat,
            long: self.long,
            flights: self.flights,
            secret: self.secret,
            hide_upcoming: self.hide_upcoming,
        })
    }
}

/// Parses an import document: a JSON array of trips, all valid or none.
pub fn parse_import(raw: &str) -> Result<Vec<TripInput>, FieldError> {
    if raw.trim().is_empty() {
        return Err(FieldError::new("json", "JSON is required"));
    }
    let entries: Vec<TripImport> = serde_json::from_str(raw).map_err(|err| {
        FieldError::new(
            "json",
            format!(
                "Trips could not be imported. Please make sure that all your trips are \
                 specifying all fields with the right data type ({err})."
            ),
        )
    })?;

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            entry.validate().map_err(|err| {
                FieldError::new("json", format!("Trip #{}: {}", index + 1, err.message))
            })
        })
        .collect()
}

/// Sign-up form after checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

pub fn validate_registration(
    email: &str,
    username: &str,
    password: &str,
) -> Result<Registration, FieldError> {
    let email = email.trim();
    if !validate_email(email) {
        return Err(FieldError::new("email", "Email is invalid"));
    }
    if password.is_empty() {
        return Err(FieldError::new("password", "Password is required"));
    }
    let username = validate_username(username)?;
    validate_password(password, password)?;

    Ok(Registration {
        email: email.to_string(),
        username,
        password: password.to_string(),
    })
}

pub fn validate_username(raw: &str) -> Result<String, FieldError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(FieldError::new("username", "Username is required"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(FieldError::new(
            "username",
            "Username may only contain letters, digits, '-' and '_'",
        ));
    }
    if RESERVED_USERNAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(username))
    {
        return Err(FieldError::new("username", "This username is not available"));
    }
    Ok(username.to_string())
}

pub fn validate_password(password: &str, confirmation: &str) -> Result<(), FieldError> {
    if password.is_empty() {
        return Err(FieldError::new("password", "Password is required"));
    }
    if confirmation.is_empty() {
        return Err(FieldError::new(
            "confirmPassword",
            "Password confirmation is required",
        ));
    }
    if password != confirmation {
        return Err(FieldError::new("confirmPassword", "Passwords do not match"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FieldError::new("password", "Password is too short"));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> bool {
    email.len() > 3 && email.contains('@')
}

/// Only same-site absolute paths are followed after login. Browsers read a
/// backslash as a slash, and control characters can not go into a header.
pub fn safe_redirect<'a>(target: Option<&'a str>, default: &'a str) -> &'a str {
    match target {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.chars().any(|c| c == '\\' || c.is_control()) =>
        {
            path
        }
        _ => default,
    }
}

fn is_checked(value: &Option<String>) -> bool {
    value.as_deref() == Some("on")
}

fn required(field: &'static str, value: &str, message: &str) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::new(field, message));
    }
    Ok(trimmed.to_string())
}

fn parse_date(field: &'static str, value: &str, label: &str) -> Result<NaiveDate, FieldError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FieldError::new(field, format!("{label} is required")));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| FieldError::new(field, format!("{label} must be a date like 2022-01-31")))
}

fn parse_coordinate(
    field: &'static str,
    value: &str,
    label: &str,
    bound: f64,
) -> Result<f64, FieldError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FieldError::new(field, format!("{label} is required")));
    }
    let parsed = value
        .parse::<f64>()
        .map_err(|_| FieldError::new(field, format!("{label} must be a number")))?;
    check_coordinate(field, parsed, label, bound)?;
    Ok(parsed)
}

fn check_coordinate(field: &'static str, value: f64, label: &str, bound: f64) -> Result<(), FieldError> {
    if !value.is_finite() || value < -bound || value > bound {
        return Err(FieldError::new(
            field,
            format!("{label} must be between -{bound} and {bound}"),
        ));
    }
    Ok(())
}
