use std::sync::Arc;

use flyeasy_catalog::{NetworkManager, ScheduleService};
use flyeasy_core::Clock;
use flyeasy_order::{BookingManager, MockPaymentAdapter, PaymentOrchestrator};
use flyeasy_store::app_config::BusinessRules;
use flyeasy_store::{RedisClient, Repositories};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub bootstrap_admin_email: Option<String>,
    pub bcrypt_cost: u32,
}

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub network: NetworkManager,
    pub schedules: ScheduleService,
    pub bookings: BookingManager,
    /// Rate limiting is skipped when absent.
    pub redis: Option<Arc<RedisClient>>,
    pub clock: Arc<dyn Clock>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        auth: AuthConfig,
        business_rules: BusinessRules,
        currency: &str,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let network = NetworkManager::new(
            repos.routes.clone(),
            repos.flights.clone(),
            repos.bookings.clone(),
            clock.clone(),
        );
        let bookings = BookingManager::new(
            repos.bookings.clone(),
            repos.flights.clone(),
            repos.routes.clone(),
            repos.users.clone(),
        )
        .with_payments(PaymentOrchestrator::new(Arc::new(MockPaymentAdapter), currency))
        .with_clock(clock.clone());

        Self {
            schedules: ScheduleService::new(network.clone()),
            network,
            bookings,
            redis: None,
            clock,
            repos,
            auth,
            business_rules,
        }
    }

    pub fn with_redis(mut self, redis: RedisClient) -> Self {
        self.redis = Some(Arc::new(redis));
        self
    }
}
