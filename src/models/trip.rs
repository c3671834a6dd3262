use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One journal entry, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub user_id: String,
    pub destination: String,
    pub country: String,
    pub description: String,
    #[sqlx(rename = "from_date")]
    pub from: NaiveDate,
    #[sqlx(rename = "to_date")]
    pub to: NaiveDate,
    pub lat: f64,
    pub long: f64,
    pub flights: u32,
    pub secret: bool,
    pub hide_upcoming: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Instant the trip starts: midnight UTC of `from`.
    pub fn starts_at(&self) -> DateTime<Utc> {
        start_of_day(self.from)
    }

    /// Instant the trip is considered over: midnight UTC of `to`.
    pub fn ends_at(&self) -> DateTime<Utc> {
        start_of_day(self.to)
    }

    pub fn from_display(&self) -> String {
        self.from.format("%Y-%m-%d").to_string()
    }

    pub fn to_display(&self) -> String {
        self.to.format("%Y-%m-%d").to_string()
    }

    pub fn visibility_icon(&self) -> &'static str {
        if self.secret {
            "🔒"
        } else {
            "🌐"
        }
    }

    pub fn has_description(&self) -> bool {
        !self.description.is_empty()
    }
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Validated trip data, ready to be written by the owner.
#[derive(Debug, Clone, PartialEq)]
pub struct TripInput {
    pub destination: String,
    pub country: String,
    pub description: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub lat: f64,
    pub long: f64,
    pub flights: u32,
    pub secret: bool,
    pub hide_upcoming: bool,
}

/// A trip together with its view-time `is_future` flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripView {
    #[serde(flatten)]
    pub trip: Trip,
    pub is_future: bool,
}

/// Shape of the JSON export download.
#[derive(Debug, Clone, Serialize)]
pub struct TripExport {
    pub email: String,
    pub username: String,
    pub trips: Vec<Trip>,
}
