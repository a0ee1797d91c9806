use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use flyeasy_core::models::user::normalize_email;
use flyeasy_core::models::{Booking, Flight, Route, SeatClass, User};
use flyeasy_core::repository::{
    BookingFilter, BookingRepository, FlightFilter, FlightRepository, RouteFilter,
    RouteRepository, UserRepository,
};
use flyeasy_core::{StoreError, StoreResult};

/// Process-local store used for development and tests. Each collection sits
/// behind its own lock; every trait method holds the lock for its whole
/// read-modify-write, which gives the same per-document atomicity the
/// Postgres store gets from row locks.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    routes: RwLock<HashMap<Uuid, Route>>,
    flights: RwLock<HashMap<Uuid, Flight>>,
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("users.email".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(StoreError::Duplicate("users.email".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl RouteRepository for InMemoryStore {
    async fn insert(&self, route: &Route) -> StoreResult<()> {
        let mut routes = self.routes.write().await;
        if routes.values().any(|r| same_pair(r, route)) {
            return Err(StoreError::Duplicate("routes.origin_destination".to_string()));
        }
        routes.insert(route.id, route.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Route>> {
        Ok(self.routes.read().await.get(&id).cloned())
    }

    async fn find_by_codes(&self, origin: &str, destination: &str) -> StoreResult<Option<Route>> {
        Ok(self
            .routes
            .read()
            .await
            .values()
            .find(|r| r.origin.code == origin && r.destination.code == destination)
            .cloned())
    }

    async fn list(&self, filter: &RouteFilter) -> StoreResult<Vec<Route>> {
        let mut routes: Vec<Route> = self
            .routes
            .read()
            .await
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        routes.sort_by(|a, b| {
            (&a.origin.code, &a.destination.code).cmp(&(&b.origin.code, &b.destination.code))
        });
        Ok(routes)
    }

    async fn update(&self, route: &Route) -> StoreResult<Route> {
        let mut routes = self.routes.write().await;
        if routes.values().any(|r| r.id != route.id && same_pair(r, route)) {
            return Err(StoreError::Duplicate("routes.origin_destination".to_string()));
        }
        let stored = routes.get_mut(&route.id).ok_or(StoreError::NotFound)?;
        let active_flights = std::mem::take(&mut stored.active_flights);
        *stored = Route {
            active_flights,
            ..route.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut routes = self.routes.write().await;
        let route = routes.get(&id).ok_or(StoreError::NotFound)?;
        if route.has_active_flights() {
            return Err(StoreError::InUse);
        }
        routes.remove(&id);
        Ok(())
    }

    async fn attach_flights(&self, route_id: Uuid, flight_ids: &[Uuid]) -> StoreResult<Route> {
        let mut routes = self.routes.write().await;
        let route = routes.get_mut(&route_id).ok_or(StoreError::NotFound)?;
        for id in flight_ids {
            route.attach_flight(*id);
        }
        Ok(route.clone())
    }

    async fn detach_flight(&self, route_id: Uuid, flight_id: Uuid) -> StoreResult<Route> {
        let mut routes = self.routes.write().await;
        let route = routes.get_mut(&route_id).ok_or(StoreError::NotFound)?;
        route.detach_flight(flight_id);
        Ok(route.clone())
    }
}

fn same_pair(a: &Route, b: &Route) -> bool {
    a.origin.code == b.origin.code && a.destination.code == b.destination.code
}

#[async_trait]
impl FlightRepository for InMemoryStore {
    async fn insert(&self, flight: &Flight) -> StoreResult<()> {
        let mut flights = self.flights.write().await;
        if flights.values().any(|f| f.flight_number == flight.flight_number) {
            return Err(StoreError::Duplicate("flights.flight_number".to_string()));
        }
        flights.insert(flight.id, flight.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Flight>> {
        Ok(self.flights.read().await.get(&id).cloned())
    }

    async fn find_by_number(&self, flight_number: &str) -> StoreResult<Option<Flight>> {
        Ok(self
            .flights
            .read()
            .await
            .values()
            .find(|f| f.flight_number == flight_number)
            .cloned())
    }

    async fn existing_numbers(&self, flight_numbers: &[String]) -> StoreResult<Vec<String>> {
        let flights = self.flights.read().await;
        Ok(flight_numbers
            .iter()
            .filter(|n| flights.values().any(|f| &f.flight_number == *n))
            .cloned()
            .collect())
    }

    async fn list(&self, filter: &FlightFilter) -> StoreResult<Vec<Flight>> {
        let mut flights: Vec<Flight> = self
            .flights
            .read()
            .await
            .values()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect();
        flights.sort_by(|a, b| {
            a.departure_time
                .cmp(&b.departure_time)
                .then_with(|| a.flight_number.cmp(&b.flight_number))
        });
        Ok(flights)
    }

    async fn list_page(
        &self,
        filter: &FlightFilter,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<Flight>> {
        let flights = FlightRepository::list(self, filter).await?;
        Ok(flights.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, filter: &FlightFilter) -> StoreResult<usize> {
        Ok(self
            .flights
            .read()
            .await
            .values()
            .filter(|f| filter.matches(f))
            .count())
    }

    async fn update(&self, flight: &Flight) -> StoreResult<Flight> {
        let mut flights = self.flights.write().await;
        if flights
            .values()
            .any(|f| f.id != flight.id && f.flight_number == flight.flight_number)
        {
            return Err(StoreError::Duplicate("flights.flight_number".to_string()));
        }
        let stored = flights.get_mut(&flight.id).ok_or(StoreError::NotFound)?;
        *stored = Flight {
            seats_available: stored.seats_available,
            ..flight.clone()
        };
        Ok(stored.clone())
    }

    async fn adjust_seats(&self, id: Uuid, class: SeatClass, delta: i64) -> StoreResult<Flight> {
        let mut flights = self.flights.write().await;
        let flight = flights.get_mut(&id).ok_or(StoreError::NotFound)?;
        flight
            .seats_available
            .apply_delta(class, delta)
            .ok_or(StoreError::InsufficientSeats)?;
        Ok(flight.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.flights
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn insert(&self, booking: &Booking) -> StoreResult<()> {
        let mut bookings = self.bookings.write().await;
        if bookings
            .values()
            .any(|b| b.booking_reference == booking.booking_reference)
        {
            return Err(StoreError::Duplicate("bookings.booking_reference".to_string()));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn reference_exists(&self, reference: &str) -> StoreResult<bool> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .any(|b| b.booking_reference == reference))
    }

    async fn list(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn update(&self, booking: &Booking) -> StoreResult<Booking> {
        let mut bookings = self.bookings.write().await;
        let stored = bookings.get_mut(&booking.id).ok_or(StoreError::NotFound)?;
        if stored.version != booking.version {
            return Err(StoreError::VersionConflict);
        }
        *stored = Booking {
            version: booking.version + 1,
            ..booking.clone()
        };
        Ok(stored.clone())
    }

    async fn count_active_for_flight(&self, flight_id: Uuid) -> StoreResult<usize> {
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.flight_id == flight_id && !b.is_cancelled())
            .count())
    }
}
