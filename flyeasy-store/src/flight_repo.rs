use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use flyeasy_core::models::{Flight, SeatClass};
use flyeasy_core::repository::{FlightFilter, FlightRepository};
use flyeasy_core::{StoreError, StoreResult};

use crate::database::store_error;

const FILTER: &str = r#"
    ($1::text IS NULL OR status = $1)
    AND ($2::uuid[] IS NULL OR route_id = ANY($2))
    AND ($3::timestamptz IS NULL OR departure_time >= $3)
    AND ($4::timestamptz IS NULL OR departure_time <= $4)
"#;

pub struct PgFlightRepository {
    pool: PgPool,
}

impl PgFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> StoreResult<Flight> {
        let row: Option<(Json<Flight>,)> =
            sqlx::query_as("SELECT doc FROM flights WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(store_error)?;
        row.map(|(doc,)| doc.0).ok_or(StoreError::NotFound)
    }

    async fn write(tx: &mut Transaction<'_, Postgres>, flight: &Flight) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE flights
            SET flight_number = $2, route_id = $3, departure_time = $4, status = $5, doc = $6
            WHERE id = $1
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(flight.route_id)
        .bind(flight.departure_time)
        .bind(flight.status.as_str())
        .bind(Json(flight))
        .execute(&mut **tx)
        .await
        .map_err(store_error)?;
        Ok(())
    }
}

#[async_trait]
impl FlightRepository for PgFlightRepository {
    async fn insert(&self, flight: &Flight) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO flights (id, flight_number, route_id, departure_time, status, doc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(flight.id)
        .bind(&flight.flight_number)
        .bind(flight.route_id)
        .bind(flight.departure_time)
        .bind(flight.status.as_str())
        .bind(Json(flight))
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Flight>> {
        let row: Option<(Json<Flight>,)> = sqlx::query_as("SELECT doc FROM flights WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn find_by_number(&self, flight_number: &str) -> StoreResult<Option<Flight>> {
        let row: Option<(Json<Flight>,)> =
            sqlx::query_as("SELECT doc FROM flights WHERE flight_number = $1")
                .bind(flight_number)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn existing_numbers(&self, flight_numbers: &[String]) -> StoreResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT flight_number FROM flights WHERE flight_number = ANY($1)")
                .bind(flight_numbers)
                .fetch_all(&self.pool)
                .await
                .map_err(store_error)?;
        Ok(rows.into_iter().map(|(n,)| n).collect())
    }

    async fn list(&self, filter: &FlightFilter) -> StoreResult<Vec<Flight>> {
        self.list_page(filter, 0, usize::MAX).await
    }

    async fn list_page(
        &self,
        filter: &FlightFilter,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<Flight>> {
        let sql = format!(
            "SELECT doc FROM flights WHERE {} ORDER BY departure_time, flight_number OFFSET $5 LIMIT $6",
            FILTER
        );
        let rows: Vec<(Json<Flight>,)> = sqlx::query_as(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.route_ids.as_deref())
            .bind(filter.departure_from)
            .bind(filter.departure_to)
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(|(doc,)| doc.0).collect())
    }

    async fn count(&self, filter: &FlightFilter) -> StoreResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM flights WHERE {}", FILTER);
        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.route_ids.as_deref())
            .bind(filter.departure_from)
            .bind(filter.departure_to)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(count as usize)
    }

    async fn update(&self, flight: &Flight) -> StoreResult<Flight> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        let stored = Self::lock(&mut tx, flight.id).await?;
        // Seat counts only move through adjust_seats.
        let next = Flight {
            seats_available: stored.seats_available,
            ..flight.clone()
        };
        Self::write(&mut tx, &next).await?;
        tx.commit().await.map_err(store_error)?;
        Ok(next)
    }

    async fn adjust_seats(&self, id: Uuid, class: SeatClass, delta: i64) -> StoreResult<Flight> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        let mut flight = Self::lock(&mut tx, id).await?;
        flight
            .seats_available
            .apply_delta(class, delta)
            .ok_or(StoreError::InsufficientSeats)?;
        Self::write(&mut tx, &flight).await?;
        tx.commit().await.map_err(store_error)?;
        Ok(flight)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM flights WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
