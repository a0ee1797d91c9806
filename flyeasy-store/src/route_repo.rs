use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use flyeasy_core::models::Route;
use flyeasy_core::repository::{RouteFilter, RouteRepository};
use flyeasy_core::{StoreError, StoreResult};

use crate::database::store_error;

pub struct PgRouteRepository {
    pool: PgPool,
}

impl PgRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> StoreResult<Route> {
        let row: Option<(Json<Route>,)> =
            sqlx::query_as("SELECT doc FROM routes WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(store_error)?;
        row.map(|(doc,)| doc.0).ok_or(StoreError::NotFound)
    }

    async fn write(tx: &mut Transaction<'_, Postgres>, route: &Route) -> StoreResult<()> {
        sqlx::query(
            "UPDATE routes SET origin_code = $2, destination_code = $3, doc = $4 WHERE id = $1",
        )
        .bind(route.id)
        .bind(&route.origin.code)
        .bind(&route.destination.code)
        .bind(Json(route))
        .execute(&mut **tx)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    /// Runs `edit` against the locked row and stores the result.
    async fn modify<F>(&self, id: Uuid, edit: F) -> StoreResult<Route>
    where
        F: FnOnce(&mut Route) -> StoreResult<()> + Send,
    {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        let mut route = Self::lock(&mut tx, id).await?;
        edit(&mut route)?;
        Self::write(&mut tx, &route).await?;
        tx.commit().await.map_err(store_error)?;
        Ok(route)
    }
}

#[async_trait]
impl RouteRepository for PgRouteRepository {
    async fn insert(&self, route: &Route) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO routes (id, origin_code, destination_code, doc) VALUES ($1, $2, $3, $4)",
        )
        .bind(route.id)
        .bind(&route.origin.code)
        .bind(&route.destination.code)
        .bind(Json(route))
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Route>> {
        let row: Option<(Json<Route>,)> = sqlx::query_as("SELECT doc FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn find_by_codes(&self, origin: &str, destination: &str) -> StoreResult<Option<Route>> {
        let row: Option<(Json<Route>,)> = sqlx::query_as(
            "SELECT doc FROM routes WHERE origin_code = $1 AND destination_code = $2",
        )
        .bind(origin)
        .bind(destination)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.map(|(doc,)| doc.0))
    }

    async fn list(&self, filter: &RouteFilter) -> StoreResult<Vec<Route>> {
        let rows: Vec<(Json<Route>,)> = sqlx::query_as(
            r#"
            SELECT doc FROM routes
            WHERE ($1::text IS NULL OR origin_code = $1)
              AND ($2::text IS NULL OR destination_code = $2)
              AND (NOT $3 OR (doc->>'isActive')::boolean)
            ORDER BY origin_code, destination_code
            "#,
        )
        .bind(filter.origin_code.as_deref())
        .bind(filter.destination_code.as_deref())
        .bind(filter.active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(|(doc,)| doc.0).collect())
    }

    async fn update(&self, route: &Route) -> StoreResult<Route> {
        let incoming = route.clone();
        self.modify(route.id, move |stored| {
            let active_flights = std::mem::take(&mut stored.active_flights);
            *stored = Route {
                active_flights,
                ..incoming
            };
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        let route = Self::lock(&mut tx, id).await?;
        if route.has_active_flights() {
            return Err(StoreError::InUse);
        }
        sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        tx.commit().await.map_err(store_error)?;
        Ok(())
    }

    async fn attach_flights(&self, route_id: Uuid, flight_ids: &[Uuid]) -> StoreResult<Route> {
        let flight_ids = flight_ids.to_vec();
        self.modify(route_id, move |route| {
            for id in flight_ids {
                route.attach_flight(id);
            }
            Ok(())
        })
        .await
    }

    async fn detach_flight(&self, route_id: Uuid, flight_id: Uuid) -> StoreResult<Route> {
        self.modify(route_id, move |route| {
            route.detach_flight(flight_id);
            Ok(())
        })
        .await
    }
}
