use chrono::{DateTime, Duration, Utc};
use flyeasy_shared::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::flight::SeatClass;
use crate::{money, CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassengerType {
    Adult,
    Child,
    Infant,
}

impl PassengerType {
    /// Under 2 travels as an infant, under 12 as a child.
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=1 => PassengerType::Infant,
            2..=11 => PassengerType::Child,
            _ => PassengerType::Adult,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub name: String,
    pub age: u32,
    pub passport_number: Masked<String>,
    #[serde(rename = "type")]
    pub passenger_type: PassengerType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub email: Masked<String>,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub method: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Confirmed,
    Cancelled,
    Rescheduled,
    #[serde(rename = "checked-in")]
    CheckedIn,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rescheduled => "rescheduled",
            BookingStatus::CheckedIn => "checked-in",
            BookingStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "rescheduled" => Ok(BookingStatus::Rescheduled),
            "checked-in" => Ok(BookingStatus::CheckedIn),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(format!("Invalid booking status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    #[serde(alias = "paid")]
    Completed,
    Refunded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleEntry {
    pub previous_flight: Uuid,
    pub new_flight: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Stored booking document. Prices are cents in memory, major units on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub booking_reference: String,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    #[serde(rename = "flight")]
    pub flight_id: Uuid,
    pub seat_class: SeatClass,
    pub passengers: Vec<Passenger>,
    pub contact_details: ContactDetails,
    pub payment_details: PaymentDetails,
    pub booking_date: DateTime<Utc>,
    pub flight_date: DateTime<Utc>,
    #[serde(with = "money::major_units")]
    pub total_price: i64,
    #[serde(with = "money::major_units")]
    pub original_price: i64,
    pub discount_applied: bool,
    pub discount_reason: String,
    #[serde(with = "money::major_units")]
    pub discount_amount: i64,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reschedule_history: Vec<RescheduleEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by the store on every successful update.
    #[serde(default)]
    pub version: u64,
}

impl Booking {
    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// More than 24 hours before the flight.
    pub fn is_refundable(&self, now: DateTime<Utc>) -> bool {
        self.flight_date - now > Duration::hours(24)
    }

    pub fn seats_held(&self) -> u32 {
        self.passengers.len() as u32
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.is_cancelled() {
            return Err(CoreError::InvalidState(
                "Booking is already cancelled".to_string(),
            ));
        }

        if self.payment_status == PaymentStatus::Completed && self.is_refundable(now) {
            self.payment_status = PaymentStatus::Refunded;
        }
        self.status = BookingStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Moves the booking to another flight and returns the flight it was on.
    /// The previous flight id is read before the reference is overwritten.
    pub fn reschedule(
        &mut self,
        new_flight_id: Uuid,
        new_flight_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> CoreResult<Uuid> {
        if self.is_cancelled() {
            return Err(CoreError::InvalidState(
                "Cannot reschedule a cancelled booking".to_string(),
            ));
        }

        let previous_flight = self.flight_id;
        self.reschedule_history.push(RescheduleEntry {
            previous_flight,
            new_flight: new_flight_id,
            timestamp: now,
        });
        self.flight_id = new_flight_id;
        self.flight_date = new_flight_date;
        self.updated_at = now;
        Ok(previous_flight)
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.payment_status == PaymentStatus::Completed {
            return Err(CoreError::InvalidState(
                "Booking is already paid".to_string(),
            ));
        }
        if self.is_cancelled() {
            return Err(CoreError::InvalidState(
                "Cannot pay for a cancelled booking".to_string(),
            ));
        }

        self.payment_status = PaymentStatus::Completed;
        self.status = BookingStatus::Confirmed;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_payment_failed(&mut self, now: DateTime<Utc>) {
        self.payment_status = PaymentStatus::Failed;
        self.updated_at = now;
    }
}
