use std::sync::Arc;

use flyeasy_core::repository::{
    BookingRepository, FlightRepository, RouteRepository, UserRepository,
};

pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod flight_repo;
pub mod memory;
pub mod redis_repo;
pub mod route_repo;
pub mod user_repo;

pub use app_config::{Config, StoreBackend};
pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use flight_repo::PgFlightRepository;
pub use memory::InMemoryStore;
pub use redis_repo::RedisClient;
pub use route_repo::PgRouteRepository;
pub use user_repo::PgUserRepository;

/// One handle per collection, whichever backend serves them.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub routes: Arc<dyn RouteRepository>,
    pub flights: Arc<dyn FlightRepository>,
    pub bookings: Arc<dyn BookingRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(InMemoryStore::new()))
    }

    pub fn from_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            users: store.clone(),
            routes: store.clone(),
            flights: store.clone(),
            bookings: store,
        }
    }

    pub fn postgres(db: &DbClient) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(db.pool.clone())),
            routes: Arc::new(PgRouteRepository::new(db.pool.clone())),
            flights: Arc::new(PgFlightRepository::new(db.pool.clone())),
            bookings: Arc::new(PgBookingRepository::new(db.pool.clone())),
        }
    }
}
