use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flyeasy_catalog::RouteSummary;
use flyeasy_core::models::{
    Booking, ClassFares, Flight, FlightStatus, Passenger, PassengerType, SeatClass, UserSummary,
};
use flyeasy_core::payment::PaymentIntent;
use flyeasy_core::{money, CoreError, CoreResult};
use flyeasy_shared::Masked;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerInput {
    pub name: String,
    pub age: u32,
    pub passport_number: String,
    /// Derived from `age` when omitted.
    #[serde(rename = "type", default)]
    pub passenger_type: Option<PassengerType>,
}

impl PassengerInput {
    pub fn into_passenger(self) -> Passenger {
        Passenger {
            passenger_type: self
                .passenger_type
                .unwrap_or_else(|| PassengerType::from_age(self.age)),
            name: self.name.trim().to_string(),
            age: self.age,
            passport_number: Masked::new(self.passport_number.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactInput {
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    pub method: String,
    pub transaction_id: Option<String>,
}

/// A fare computed by the caller, sent in major units.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotedFare {
    #[serde(with = "money::major_units")]
    pub total_price: i64,
    #[serde(with = "money::option_major_units", default)]
    pub original_price: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub flight_id: Uuid,
    #[serde(default)]
    pub seat_class: SeatClass,
    pub passengers: Vec<PassengerInput>,
    pub contact_details: ContactInput,
    pub payment_details: PaymentInput,
    pub quoted_fare: Option<QuotedFare>,
}

impl CreateBookingRequest {
    pub fn validate(&self) -> CoreResult<()> {
        if self.passengers.is_empty() {
            return Err(CoreError::ValidationError(
                "At least one passenger is required".to_string(),
            ));
        }
        for (i, p) in self.passengers.iter().enumerate() {
            if p.name.trim().is_empty() {
                return Err(CoreError::ValidationError(format!(
                    "Passenger {} name is required",
                    i + 1
                )));
            }
            if p.passport_number.trim().is_empty() {
                return Err(CoreError::ValidationError(format!(
                    "Passenger {} passport number is required",
                    i + 1
                )));
            }
        }
        if !self.contact_details.email.contains('@') {
            return Err(CoreError::ValidationError(
                "Please provide a valid contact email".to_string(),
            ));
        }
        if self.payment_details.method.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Payment method is required".to_string(),
            ));
        }
        if let Some(fare) = self.quoted_fare {
            money::ensure_amount(fare.total_price, "Total price")?;
            if let Some(original) = fare.original_price {
                money::ensure_amount(original, "Original price")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub new_flight_id: Uuid,
}

/// The flight as embedded in a booking view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedFlight {
    pub id: Uuid,
    pub flight_number: String,
    pub aircraft: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub status: FlightStatus,
    pub price: ClassFares,
    pub route: Option<RouteSummary>,
}

impl BookedFlight {
    pub fn new(flight: &Flight, route: Option<RouteSummary>) -> Self {
        Self {
            id: flight.id,
            flight_number: flight.flight_number.clone(),
            aircraft: flight.aircraft.clone(),
            departure_time: flight.departure_time,
            arrival_time: flight.arrival_time,
            status: flight.status,
            price: flight.price,
            route,
        }
    }
}

/// A booking joined with its flight and owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub is_refundable: bool,
    pub flight_details: Option<BookedFlight>,
    pub user_details: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResult {
    pub booking: BookingView,
    pub payment: PaymentIntent,
}
