use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::trip::{Trip, TripInput},
};

const TRIP_COLUMNS: &str = "id, user_id, destination, country, description, from_date, to_date, \
     lat, long, flights, secret, hide_upcoming, created_at, updated_at";

/// Trip rows, always scoped to their owner.
#[derive(Clone)]
pub struct TripStore {
    db: DbPool,
}

impl TripStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// All trips of a user, newest start date first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Trip>, AppError> {
        let trips = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE user_id = ?1 ORDER BY from_date DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(trips)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Option<Trip>, AppError> {
        let trip = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(trip)
    }

    pub async fn create(&self, user_id: &str, input: &TripInput) -> Result<Trip, AppError> {
        let mut tx = self.db.begin().await?;
        let trip = insert(&mut tx, user_id, input, Utc::now()).await?;
        tx.commit().await?;
        Ok(trip)
    }

    /// Inserts every trip or none of them.
    pub async fn import(&self, user_id: &str, inputs: &[TripInput]) -> Result<usize, AppError> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        for input in inputs {
            insert(&mut tx, user_id, input, now).await?;
        }
        tx.commit().await?;
        info!(user_id, count = inputs.len(), "trips imported");
        Ok(inputs.len())
    }

    /// Returns `None` when the trip does not exist for this owner.
    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        input: &TripInput,
    ) -> Result<Option<Trip>, AppError> {
        let result = sqlx::query(
            r#"UPDATE trips SET destination = ?1, country = ?2, description = ?3, from_date = ?4,
               to_date = ?5, lat = ?6, long = ?7, flights = ?8, secret = ?9, hide_upcoming = ?10,
               updated_at = ?11
               WHERE id = ?12 AND user_id = ?13"#,
        )
        .bind(&input.destination)
        .bind(&input.country)
        .bind(&input.description)
        .bind(input.from)
        .bind(input.to)
        .bind(input.lat)
        .bind(input.long)
        .bind(input.flights)
        .bind(input.secret)
        .bind(input.hide_upcoming)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(user_id, id).await
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM trips WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM trips")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

async fn insert(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    input: &TripInput,
    now: DateTime<Utc>,
) -> Result<Trip, AppError> {
    let trip = Trip {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        destination: input.destination.clone(),
        country: input.country.clone(),
        description: input.description.clone(),
        from: input.from,
        to: input.to,
        lat: input.lat,
        long: input.long,
        flights: input.flights,
        secret: input.secret,
        hide_upcoming: input.hide_upcoming,
        created_at: now,
        updated_at: now,
    };
    sqlx::query(&format!(
        "INSERT INTO trips ({TRIP_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
    ))
    .bind(&trip.id)
    .bind(&trip.user_id)
    .bind(&trip.destination)
    .bind(&trip.country)
    .bind(&trip.description)
    .bind(trip.from)
    .bind(trip.to)
    .bind(trip.lat)
    .bind(trip.long)
    .bind(trip.flights)
    .bind(trip.secret)
    .bind(trip.hide_upcoming)
    .bind(trip.created_at)
    .bind(trip.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(trip)
}
