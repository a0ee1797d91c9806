use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use flyeasy_core::models::Booking;
use flyeasy_core::repository::{BookingFilter, BookingRepository};
use flyeasy_core::{StoreError, StoreResult};

use crate::database::store_error;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert(&self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings
                (id, booking_reference, user_id, flight_id, status, flight_date, version, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.booking_reference)
        .bind(booking.user_id)
        .bind(booking.flight_id)
        .bind(booking.status.as_str())
        .bind(booking.flight_date)
        .bind(booking.version as i64)
        .bind(booking.created_at)
        .bind(Json(booking))
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row: Option<(Json<Booking>, i64)> =
            sqlx::query_as("SELECT doc, version FROM bookings WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;
        Ok(row.map(with_version))
    }

    async fn reference_exists(&self, reference: &str) -> StoreResult<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM bookings WHERE booking_reference = $1)")
                .bind(reference)
                .fetch_one(&self.pool)
                .await
                .map_err(store_error)?;
        Ok(exists)
    }

    async fn list(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let rows: Vec<(Json<Booking>, i64)> = sqlx::query_as(
            r#"
            SELECT doc, version FROM bookings
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR flight_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND (NOT $4 OR status <> 'cancelled')
              AND ($5::timestamptz IS NULL OR flight_date >= $5)
              AND ($6::timestamptz IS NULL OR flight_date <= $6)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.flight_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.exclude_cancelled)
        .bind(filter.flight_date_from)
        .bind(filter.flight_date_to)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(with_version).collect())
    }

    async fn update(&self, booking: &Booking) -> StoreResult<Booking> {
        let next = Booking {
            version: booking.version + 1,
            ..booking.clone()
        };
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET flight_id = $3, status = $4, flight_date = $5, version = version + 1, doc = $6
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(booking.id)
        .bind(booking.version as i64)
        .bind(next.flight_id)
        .bind(next.status.as_str())
        .bind(next.flight_date)
        .bind(Json(&next))
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 1 {
            return Ok(next);
        }
        match self.find_by_id(booking.id).await? {
            Some(_) => Err(StoreError::VersionConflict),
            None => Err(StoreError::NotFound),
        }
    }

    async fn count_active_for_flight(&self, flight_id: Uuid) -> StoreResult<usize> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookings WHERE flight_id = $1 AND status <> 'cancelled'",
        )
        .bind(flight_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(count as usize)
    }
}

/// The column is authoritative for the version, not the stored document.
fn with_version((doc, version): (Json<Booking>, i64)) -> Booking {
    Booking {
        version: version as u64,
        ..doc.0
    }
}
