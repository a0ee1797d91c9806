use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Flight, FlightStatus, Route, SeatClass, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("duplicate key: {0}")]
    Duplicate(String),
    #[error("record was modified concurrently")]
    VersionConflict,
    #[error("not enough seats")]
    InsufficientSeats,
    #[error("record is still referenced")]
    InUse,
    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct RouteFilter {
    pub origin_code: Option<String>,
    pub destination_code: Option<String>,
    pub active_only: bool,
}

impl RouteFilter {
    pub fn matches(&self, route: &Route) -> bool {
        self.origin_code
            .as_deref()
            .map_or(true, |code| route.origin.code == code)
            && self
                .destination_code
                .as_deref()
                .map_or(true, |code| route.destination.code == code)
            && (!self.active_only || route.is_active)
    }

    pub fn is_empty(&self) -> bool {
        self.origin_code.is_none() && self.destination_code.is_none() && !self.active_only
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlightFilter {
    pub status: Option<FlightStatus>,
    /// `None` means any route; an empty list matches nothing.
    pub route_ids: Option<Vec<Uuid>>,
    pub departure_from: Option<DateTime<Utc>>,
    pub departure_to: Option<DateTime<Utc>>,
}

impl FlightFilter {
    pub fn matches(&self, flight: &Flight) -> bool {
        self.status.map_or(true, |s| flight.status == s)
            && self
                .route_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&flight.route_id))
            && self.departure_from.map_or(true, |from| flight.departure_time >= from)
            && self.departure_to.map_or(true, |to| flight.departure_time <= to)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub user_id: Option<Uuid>,
    pub flight_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub exclude_cancelled: bool,
    pub flight_date_from: Option<DateTime<Utc>>,
    pub flight_date_to: Option<DateTime<Utc>>,
}

impl BookingFilter {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.user_id.map_or(true, |id| booking.user_id == id)
            && self.flight_id.map_or(true, |id| booking.flight_id == id)
            && self.status.map_or(true, |s| booking.status == s)
            && (!self.exclude_cancelled || !booking.is_cancelled())
            && self.flight_date_from.map_or(true, |from| booking.flight_date >= from)
            && self.flight_date_to.map_or(true, |to| booking.flight_date <= to)
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Duplicate` when the email is taken.
    async fn insert(&self, user: &User) -> StoreResult<()>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn list(&self) -> StoreResult<Vec<User>>;

    async fn update(&self, user: &User) -> StoreResult<()>;
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    /// Fails with `Duplicate` when the origin/destination pair exists.
    async fn insert(&self, route: &Route) -> StoreResult<()>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Route>>;

    async fn find_by_codes(&self, origin: &str, destination: &str) -> StoreResult<Option<Route>>;

    /// Sorted by origin code, then destination code.
    async fn list(&self, filter: &RouteFilter) -> StoreResult<Vec<Route>>;

    /// Replaces the route's attributes. `active_flights` keeps its stored value.
    async fn update(&self, route: &Route) -> StoreResult<Route>;

    /// Fails with `InUse` while the route still has active flights.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// Appends the ids not already present, in one atomic write.
    async fn attach_flights(&self, route_id: Uuid, flight_ids: &[Uuid]) -> StoreResult<Route>;

    async fn detach_flight(&self, route_id: Uuid, flight_id: Uuid) -> StoreResult<Route>;
}

#[async_trait]
pub trait FlightRepository: Send + Sync {
    /// Fails with `Duplicate` when the flight number exists.
    async fn insert(&self, flight: &Flight) -> StoreResult<()>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Flight>>;

    async fn find_by_number(&self, flight_number: &str) -> StoreResult<Option<Flight>>;

    /// Returns the subset of `flight_numbers` already in use.
    async fn existing_numbers(&self, flight_numbers: &[String]) -> StoreResult<Vec<String>>;

    /// Sorted by departure time ascending.
    async fn list(&self, filter: &FlightFilter) -> StoreResult<Vec<Flight>>;

    async fn list_page(
        &self,
        filter: &FlightFilter,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<Flight>>;

    async fn count(&self, filter: &FlightFilter) -> StoreResult<usize>;

    /// Replaces the flight's attributes. `seats_available` keeps its stored
    /// value; seat counts only change through [`FlightRepository::adjust_seats`].
    async fn update(&self, flight: &Flight) -> StoreResult<Flight>;

    /// Atomically applies `delta` to one class. Fails with
    /// `InsufficientSeats` rather than going below zero.
    async fn adjust_seats(&self, id: Uuid, class: SeatClass, delta: i64) -> StoreResult<Flight>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Fails with `Duplicate` when the booking reference exists.
    async fn insert(&self, booking: &Booking) -> StoreResult<()>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    async fn reference_exists(&self, reference: &str) -> StoreResult<bool>;

    /// Newest first.
    async fn list(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>>;

    /// Writes the booking only if the stored version equals `booking.version`,
    /// returning the stored copy with the version incremented.
    async fn update(&self, booking: &Booking) -> StoreResult<Booking>;

    /// Non-cancelled bookings on the flight.
    async fn count_active_for_flight(&self, flight_id: Uuid) -> StoreResult<usize>;
}
