use std::sync::Arc;

use uuid::Uuid;

use flyeasy_core::models::{Flight, SeatClass};
use flyeasy_core::repository::FlightRepository;
use flyeasy_core::{CoreError, CoreResult, StoreError};

/// Seat bookkeeping on top of the flight store. Every change is a single
/// atomic `adjust_seats` call, so counts never drop below zero.
#[derive(Clone)]
pub struct SeatAllocator {
    flights: Arc<dyn FlightRepository>,
}

impl SeatAllocator {
    pub fn new(flights: Arc<dyn FlightRepository>) -> Self {
        Self { flights }
    }

    pub async fn reserve(&self, flight_id: Uuid, class: SeatClass, count: u32) -> CoreResult<Flight> {
        self.flights
            .adjust_seats(flight_id, class, -i64::from(count))
            .await
            .map_err(|e| seat_error(e, class))
    }

    pub async fn release(&self, flight_id: Uuid, class: SeatClass, count: u32) -> CoreResult<Flight> {
        self.flights
            .adjust_seats(flight_id, class, i64::from(count))
            .await
            .map_err(|e| seat_error(e, class))
    }
}

fn seat_error(err: StoreError, class: SeatClass) -> CoreError {
    match err {
        StoreError::InsufficientSeats => {
            CoreError::InvalidState(format!("Not enough {} seats available", class))
        }
        StoreError::NotFound => CoreError::NotFound("Flight not found".to_string()),
        other => CoreError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{flight_on, route};
    use flyeasy_core::repository::RouteRepository;
    use flyeasy_store::InMemoryStore;

    async fn setup() -> (Arc<InMemoryStore>, SeatAllocator, Flight, Flight) {
        let store = Arc::new(InMemoryStore::new());
        let r = route("DEL", "BOM");
        RouteRepository::insert(store.as_ref(), &r).await.unwrap();
        let a = flight_on(&r, "FL100", 2);
        let b = flight_on(&r, "FL200", 1);
        FlightRepository::insert(store.as_ref(), &a).await.unwrap();
        FlightRepository::insert(store.as_ref(), &b).await.unwrap();
        let allocator = SeatAllocator::new(store.clone());
        (store, allocator, a, b)
    }

    #[tokio::test]
    async fn reserve_and_release_move_the_count() {
        let (_store, allocator, a, _) = setup().await;

        let after = allocator.reserve(a.id, SeatClass::Economy, 2).await.unwrap();
        assert_eq!(after.seats_available.economy, 0);

        let err = allocator.reserve(a.id, SeatClass::Economy, 1).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));

        let after = allocator.release(a.id, SeatClass::Economy, 2).await.unwrap();
        assert_eq!(after.seats_available.economy, 2);
    }

    #[tokio::test]
    async fn unknown_flight_is_not_found() {
        let (_store, allocator, _, _) = setup().await;
        let err = allocator
            .reserve(Uuid::new_v4(), SeatClass::Business, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
