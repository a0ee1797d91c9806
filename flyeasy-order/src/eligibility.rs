use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use flyeasy_core::repository::{BookingFilter, BookingRepository};
use flyeasy_core::CoreResult;

pub const RECENT_TRAVEL_WINDOW_DAYS: i64 = 20;

/// Decides whether a user qualifies for the recent-travel discount.
#[async_trait]
pub trait DiscountEligibility: Send + Sync {
    async fn is_eligible(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<bool>;
}

/// Eligible when the user has a non-cancelled booking whose flight date lies
/// within the last 20 days.
pub struct RecentTravelEligibility {
    bookings: Arc<dyn BookingRepository>,
    window: Duration,
}

impl RecentTravelEligibility {
    pub fn new(bookings: Arc<dyn BookingRepository>) -> Self {
        Self {
            bookings,
            window: Duration::days(RECENT_TRAVEL_WINDOW_DAYS),
        }
    }
}

#[async_trait]
impl DiscountEligibility for RecentTravelEligibility {
    async fn is_eligible(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<bool> {
        let filter = BookingFilter {
            user_id: Some(user_id),
            exclude_cancelled: true,
            flight_date_from: Some(now - self.window),
            flight_date_to: Some(now),
            ..Default::default()
        };
        Ok(!self.bookings.list(&filter).await?.is_empty())
    }
}

/// Constant answer, for tests and for switching the discount off.
#[derive(Debug, Clone, Copy)]
pub struct FixedEligibility(pub bool);

#[async_trait]
impl DiscountEligibility for FixedEligibility {
    async fn is_eligible(&self, _user_id: Uuid, _now: DateTime<Utc>) -> CoreResult<bool> {
        Ok(self.0)
    }
}
