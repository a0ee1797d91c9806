use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use flyeasy_core::models::{
    Airport, ClassFares, Flight, FlightStatus, FlightSummary, Route, SeatClass, SeatInventory,
};
use flyeasy_core::repository::{
    BookingRepository, FlightFilter, FlightRepository, RouteFilter, RouteRepository,
};
use flyeasy_core::{Clock, CoreError, CoreResult, StoreError};

pub const MAX_FLIGHT_NUMBER_LEN: usize = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoute {
    pub origin: Airport,
    pub destination: Airport,
    pub distance: f64,
    pub estimated_duration: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteUpdate {
    pub origin: Option<Airport>,
    pub destination: Option<Airport>,
    pub distance: Option<f64>,
    pub estimated_duration: Option<u32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlight {
    pub flight_number: String,
    #[serde(rename = "route")]
    pub route_id: Uuid,
    pub aircraft: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    /// Minutes; derived from the timestamps when omitted.
    pub duration: Option<u32>,
    pub price: ClassFares,
    pub seats_available: SeatInventory,
}

impl NewFlight {
    pub fn validate(&self) -> CoreResult<()> {
        let number = self.flight_number.trim();
        if number.is_empty() {
            return Err(CoreError::ValidationError(
                "Please provide a flight number".to_string(),
            ));
        }
        if number.chars().count() > MAX_FLIGHT_NUMBER_LEN {
            return Err(CoreError::ValidationError(
                "Flight number cannot exceed 10 characters".to_string(),
            ));
        }
        if self.aircraft.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Please provide an aircraft type".to_string(),
            ));
        }
        if self.arrival_time <= self.departure_time {
            return Err(CoreError::ValidationError(
                "Arrival time must be after departure time".to_string(),
            ));
        }
        self.price.validate()
    }

    pub(crate) fn into_flight(self, now: DateTime<Utc>) -> Flight {
        let duration = self.duration.unwrap_or_else(|| {
            (self.arrival_time - self.departure_time)
                .num_minutes()
                .max(0) as u32
        });
        Flight {
            id: Uuid::new_v4(),
            flight_number: self.flight_number.trim().to_string(),
            route_id: self.route_id,
            aircraft: self.aircraft.trim().to_string(),
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            duration,
            price: self.price,
            seats_available: self.seats_available,
            status: FlightStatus::Scheduled,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightUpdate {
    pub flight_number: Option<String>,
    #[serde(rename = "route")]
    pub route_id: Option<Uuid>,
    pub aircraft: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub duration: Option<u32>,
    pub price: Option<ClassFares>,
    /// Absolute target counts, applied to the store as per-class deltas.
    pub seats_available: Option<SeatInventory>,
    pub status: Option<FlightStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub id: Uuid,
    pub origin: Airport,
    pub destination: Airport,
    pub distance: f64,
    pub estimated_duration: u32,
}

impl From<&Route> for RouteSummary {
    fn from(route: &Route) -> Self {
        Self {
            id: route.id,
            origin: route.origin.clone(),
            destination: route.destination.clone(),
            distance: route.distance,
            estimated_duration: route.estimated_duration,
        }
    }
}

/// A route with its active flights expanded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDetails {
    #[serde(flatten)]
    pub route: Route,
    pub display_name: String,
    pub flights: Vec<FlightSummary>,
}

/// A flight with its route joined in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightView {
    #[serde(flatten)]
    pub flight: Flight,
    pub is_full: bool,
    pub route_details: Option<RouteSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightStatusView {
    pub flight_number: String,
    pub status: FlightStatus,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub route: Option<RouteSummary>,
}

/// Route and flight administration. Keeps `Route.active_flights` equal to the
/// set of flights that reference the route.
#[derive(Clone)]
pub struct NetworkManager {
    routes: Arc<dyn RouteRepository>,
    flights: Arc<dyn FlightRepository>,
    bookings: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
}

impl NetworkManager {
    pub fn new(
        routes: Arc<dyn RouteRepository>,
        flights: Arc<dyn FlightRepository>,
        bookings: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            routes,
            flights,
            bookings,
            clock,
        }
    }

    pub(crate) fn routes(&self) -> &Arc<dyn RouteRepository> {
        &self.routes
    }

    pub(crate) fn flights(&self) -> &Arc<dyn FlightRepository> {
        &self.flights
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ---- routes ----

    pub async fn create_route(&self, new_route: NewRoute) -> CoreResult<Route> {
        validate_airport(&new_route.origin, "origin")?;
        validate_airport(&new_route.destination, "destination")?;

        if self
            .routes
            .find_by_codes(&new_route.origin.code, &new_route.destination.code)
            .await?
            .is_some()
        {
            return Err(CoreError::Conflict("Route already exists".to_string()));
        }

        let mut route = Route::new(
            new_route.origin,
            new_route.destination,
            new_route.distance,
            new_route.estimated_duration,
            self.clock.now(),
        );
        route.is_active = new_route.is_active;

        self.routes.insert(&route).await.map_err(|e| match e {
            StoreError::Duplicate(_) => CoreError::Conflict("Route already exists".to_string()),
            other => CoreError::Store(other),
        })?;

        info!(route_id = %route.id, route = %route.display_name(), "route created");
        Ok(route)
    }

    pub async fn list_routes(&self, filter: &RouteFilter) -> CoreResult<Vec<Route>> {
        Ok(self.routes.list(filter).await?)
    }

    pub async fn get_route(&self, id: Uuid) -> CoreResult<RouteDetails> {
        let route = self.load_route(id).await?;
        let mut flights = Vec::with_capacity(route.active_flights.len());
        for flight_id in &route.active_flights {
            if let Some(flight) = self.flights.find_by_id(*flight_id).await? {
                flights.push(flight.summary());
            }
        }
        Ok(RouteDetails {
            display_name: route.display_name(),
            route,
            flights,
        })
    }

    pub async fn update_route(&self, id: Uuid, update: RouteUpdate) -> CoreResult<Route> {
        let mut route = self.load_route(id).await?;

        let origin_code = update
            .origin
            .as_ref()
            .map_or(route.origin.code.as_str(), |a| a.code.as_str());
        let destination_code = update
            .destination
            .as_ref()
            .map_or(route.destination.code.as_str(), |a| a.code.as_str());

        if origin_code != route.origin.code || destination_code != route.destination.code {
            if let Some(existing) = self
                .routes
                .find_by_codes(origin_code, destination_code)
                .await?
            {
                if existing.id != id {
                    return Err(CoreError::Conflict(
                        "Route with these origin and destination already exists".to_string(),
                    ));
                }
            }
        }

        if let Some(origin) = update.origin {
            validate_airport(&origin, "origin")?;
            route.origin = origin;
        }
        if let Some(destination) = update.destination {
            validate_airport(&destination, "destination")?;
            route.destination = destination;
        }
        if let Some(distance) = update.distance {
            route.distance = distance;
        }
        if let Some(minutes) = update.estimated_duration {
            route.estimated_duration = minutes;
        }
        if let Some(active) = update.is_active {
            route.is_active = active;
        }

        self.routes.update(&route).await.map_err(|e| match e {
            StoreError::NotFound => CoreError::NotFound("Route not found".to_string()),
            StoreError::Duplicate(_) => CoreError::Conflict(
                "Route with these origin and destination already exists".to_string(),
            ),
            other => CoreError::Store(other),
        })
    }

    pub async fn delete_route(&self, id: Uuid) -> CoreResult<()> {
        let route = self.load_route(id).await?;
        if route.has_active_flights() {
            return Err(CoreError::InvalidState(
                "Cannot delete route with active flights".to_string(),
            ));
        }

        self.routes.delete(id).await.map_err(|e| match e {
            StoreError::InUse => {
                CoreError::InvalidState("Cannot delete route with active flights".to_string())
            }
            StoreError::NotFound => CoreError::NotFound("Route not found".to_string()),
            other => CoreError::Store(other),
        })?;

        info!(route_id = %id, "route deleted");
        Ok(())
    }

    // ---- flights ----

    pub async fn create_flight(&self, new_flight: NewFlight) -> CoreResult<Flight> {
        new_flight.validate()?;
        let flight = new_flight.into_flight(self.clock.now());
        self.insert_flight(flight).await
    }

    /// Attaches the flight to its route, then inserts it. The route edit is
    /// rolled back when the insert fails.
    pub(crate) async fn insert_flight(&self, flight: Flight) -> CoreResult<Flight> {
        if self.flights.find_by_number(&flight.flight_number).await?.is_some() {
            return Err(CoreError::Conflict("Flight number already exists".to_string()));
        }

        self.routes
            .attach_flights(flight.route_id, &[flight.id])
            .await
            .map_err(|e| route_error(e, "Route not found"))?;

        if let Err(e) = self.flights.insert(&flight).await {
            self.compensate_detach(flight.route_id, flight.id).await;
            return Err(match e {
                StoreError::Duplicate(_) => {
                    CoreError::Conflict("Flight number already exists".to_string())
                }
                other => CoreError::Store(other),
            });
        }

        info!(
            flight_id = %flight.id,
            flight_number = %flight.flight_number,
            route_id = %flight.route_id,
            "flight created"
        );
        Ok(flight)
    }

    pub async fn list_flights(&self, filter: &FlightFilter) -> CoreResult<Vec<FlightView>> {
        let flights = self.flights.list(filter).await?;
        self.join_routes(flights).await
    }

    pub async fn get_flight(&self, id: Uuid) -> CoreResult<FlightView> {
        let flight = self.load_flight(id).await?;
        let route = self.routes.find_by_id(flight.route_id).await?;
        Ok(flight_view(flight, route.as_ref()))
    }

    pub async fn flight_status(&self, flight_number: &str) -> CoreResult<FlightStatusView> {
        let flight = self
            .flights
            .find_by_number(flight_number.trim())
            .await?
            .ok_or_else(|| CoreError::NotFound("Flight not found".to_string()))?;
        let route = self.routes.find_by_id(flight.route_id).await?;

        Ok(FlightStatusView {
            flight_number: flight.flight_number,
            status: flight.status,
            departure_time: flight.departure_time,
            arrival_time: flight.arrival_time,
            route: route.as_ref().map(RouteSummary::from),
        })
    }

    pub async fn update_flight(&self, id: Uuid, update: FlightUpdate) -> CoreResult<FlightView> {
        let current = self.load_flight(id).await?;
        let mut flight = current.clone();

        if let Some(number) = update.flight_number {
            let number = number.trim().to_string();
            if number != current.flight_number {
                if number.is_empty() || number.chars().count() > MAX_FLIGHT_NUMBER_LEN {
                    return Err(CoreError::ValidationError(
                        "Flight number cannot exceed 10 characters".to_string(),
                    ));
                }
                if self.flights.find_by_number(&number).await?.is_some() {
                    return Err(CoreError::Conflict("Flight number already exists".to_string()));
                }
            }
            flight.flight_number = number;
        }
        if let Some(aircraft) = update.aircraft {
            flight.aircraft = aircraft;
        }
        if let Some(departure) = update.departure_time {
            flight.departure_time = departure;
        }
        if let Some(arrival) = update.arrival_time {
            flight.arrival_time = arrival;
        }
        if flight.arrival_time <= flight.departure_time {
            return Err(CoreError::ValidationError(
                "Arrival time must be after departure time".to_string(),
            ));
        }
        if let Some(minutes) = update.duration {
            flight.duration = minutes;
        }
        if let Some(price) = update.price {
            price.validate()?;
            flight.price = price;
        }
        if let Some(status) = update.status {
            ensure_transition(current.status, status)?;
            flight.status = status;
        }

        let new_route = update.route_id.filter(|r| *r != current.route_id);
        if let Some(route_id) = new_route {
            // Reference-adding edit goes first.
            self.routes
                .attach_flights(route_id, &[id])
                .await
                .map_err(|e| route_error(e, "Route not found"))?;
            flight.route_id = route_id;
        }

        let mut updated = match self.flights.update(&flight).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(route_id) = new_route {
                    self.compensate_detach(route_id, id).await;
                }
                return Err(match e {
                    StoreError::NotFound => CoreError::NotFound("Flight not found".to_string()),
                    StoreError::Duplicate(_) => {
                        CoreError::Conflict("Flight number already exists".to_string())
                    }
                    other => CoreError::Store(other),
                });
            }
        };

        if new_route.is_some() {
            match self.routes.detach_flight(current.route_id, id).await {
                Ok(_) | Err(StoreError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
            info!(flight_id = %id, from = %current.route_id, to = %updated.route_id, "flight moved to another route");
        }

        if let Some(target) = update.seats_available {
            for class in [SeatClass::Economy, SeatClass::Business, SeatClass::FirstClass] {
                let delta = i64::from(target.get(class)) - i64::from(updated.seats_available.get(class));
                if delta != 0 {
                    updated = self
                        .flights
                        .adjust_seats(id, class, delta)
                        .await
                        .map_err(|e| match e {
                            StoreError::InsufficientSeats => CoreError::InvalidState(format!(
                                "Not enough {} seats available",
                                class
                            )),
                            other => CoreError::Store(other),
                        })?;
                }
            }
        }

        let route = self.routes.find_by_id(updated.route_id).await?;
        Ok(flight_view(updated, route.as_ref()))
    }

    pub async fn update_flight_status(&self, id: Uuid, status: FlightStatus) -> CoreResult<Flight> {
        let mut flight = self.load_flight(id).await?;
        ensure_transition(flight.status, status)?;

        let previous = flight.status;
        flight.status = status;
        let updated = self.flights.update(&flight).await.map_err(|e| match e {
            StoreError::NotFound => CoreError::NotFound("Flight not found".to_string()),
            other => CoreError::Store(other),
        })?;

        info!(flight_id = %id, from = %previous, to = %status, "flight status changed");
        Ok(updated)
    }

    /// Detaches the flight from its route and deletes it. Refused once the
    /// flight has departed or while live bookings reference it.
    pub async fn delete_flight(&self, id: Uuid) -> CoreResult<()> {
        let flight = self.load_flight(id).await?;

        if flight.status.has_departed() {
            return Err(CoreError::InvalidState(
                "Cannot delete a flight that has already departed".to_string(),
            ));
        }
        let active = self.bookings.count_active_for_flight(id).await?;
        if active > 0 {
            return Err(CoreError::InvalidState(format!(
                "Cannot delete a flight with {} active booking(s)",
                active
            )));
        }

        match self.routes.detach_flight(flight.route_id, id).await {
            Ok(_) | Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.flights.delete(id).await {
            if let Err(restore) = self.routes.attach_flights(flight.route_id, &[id]).await {
                warn!(flight_id = %id, error = %restore, "could not restore route membership");
            }
            return Err(match e {
                StoreError::NotFound => CoreError::NotFound("Flight not found".to_string()),
                other => CoreError::Store(other),
            });
        }

        info!(flight_id = %id, flight_number = %flight.flight_number, "flight deleted");
        Ok(())
    }

    pub(crate) async fn join_routes(&self, flights: Vec<Flight>) -> CoreResult<Vec<FlightView>> {
        let mut views = Vec::with_capacity(flights.len());
        let mut cache: Vec<Route> = Vec::new();
        for flight in flights {
            let cached = cache.iter().find(|r| r.id == flight.route_id).cloned();
            let route = match cached {
                Some(route) => Some(route),
                None => {
                    let loaded = self.routes.find_by_id(flight.route_id).await?;
                    if let Some(route) = &loaded {
                        cache.push(route.clone());
                    }
                    loaded
                }
            };
            views.push(flight_view(flight, route.as_ref()));
        }
        Ok(views)
    }

    pub(crate) async fn load_flight(&self, id: Uuid) -> CoreResult<Flight> {
        self.flights
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Flight not found".to_string()))
    }

    async fn load_route(&self, id: Uuid) -> CoreResult<Route> {
        self.routes
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Route not found".to_string()))
    }

    pub(crate) async fn compensate_detach(&self, route_id: Uuid, flight_id: Uuid) {
        if let Err(e) = self.routes.detach_flight(route_id, flight_id).await {
            warn!(%route_id, %flight_id, error = %e, "could not roll back route membership");
        }
    }
}

pub fn flight_view(flight: Flight, route: Option<&Route>) -> FlightView {
    FlightView {
        is_full: flight.is_full(),
        route_details: route.map(RouteSummary::from),
        flight,
    }
}

fn ensure_transition(from: FlightStatus, to: FlightStatus) -> CoreResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "Cannot change flight status from {} to {}",
            from, to
        )))
    }
}

fn validate_airport(airport: &Airport, which: &str) -> CoreResult<()> {
    if airport.code.trim().is_empty() || airport.city.trim().is_empty() {
        return Err(CoreError::ValidationError(format!(
            "Please provide {} airport code and city",
            which
        )));
    }
    Ok(())
}

pub(crate) fn route_error(err: StoreError, not_found: &str) -> CoreError {
    match err {
        StoreError::NotFound => CoreError::NotFound(not_found.to_string()),
        other => CoreError::Store(other),
    }
}
