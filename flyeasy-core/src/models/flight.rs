use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{money, CoreResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeatClass {
    #[default]
    Economy,
    Business,
    FirstClass,
}

impl SeatClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatClass::Economy => "economy",
            SeatClass::Business => "business",
            SeatClass::FirstClass => "firstClass",
        }
    }
}

impl std::fmt::Display for SeatClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-class fares, held in cents and written as major units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassFares {
    #[serde(with = "money::major_units")]
    pub economy: i64,
    #[serde(with = "money::major_units")]
    pub business: i64,
    #[serde(with = "money::major_units", default)]
    pub first_class: i64,
}

impl ClassFares {
    pub fn validate(&self) -> CoreResult<()> {
        money::ensure_amount(self.economy, "Economy price")?;
        money::ensure_amount(self.business, "Business price")?;
        money::ensure_amount(self.first_class, "First class price")
    }

    pub fn for_class(&self, class: SeatClass) -> i64 {
        match class {
            SeatClass::Economy => self.economy,
            SeatClass::Business => self.business,
            SeatClass::FirstClass => self.first_class,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatInventory {
    pub economy: u32,
    pub business: u32,
    #[serde(default)]
    pub first_class: u32,
}

impl SeatInventory {
    pub fn get(&self, class: SeatClass) -> u32 {
        match class {
            SeatClass::Economy => self.economy,
            SeatClass::Business => self.business,
            SeatClass::FirstClass => self.first_class,
        }
    }

    fn slot(&mut self, class: SeatClass) -> &mut u32 {
        match class {
            SeatClass::Economy => &mut self.economy,
            SeatClass::Business => &mut self.business,
            SeatClass::FirstClass => &mut self.first_class,
        }
    }

    pub fn has_available(&self, class: SeatClass, count: u32) -> bool {
        self.get(class) >= count
    }

    pub fn is_full(&self) -> bool {
        self.economy == 0 && self.business == 0 && self.first_class == 0
    }

    /// Applies a signed change to one class. Returns the new count, or `None`
    /// (leaving the inventory untouched) when the result would be negative.
    pub fn apply_delta(&mut self, class: SeatClass, delta: i64) -> Option<u32> {
        let slot = self.slot(class);
        let next = i64::from(*slot) + delta;
        if next < 0 || next > i64::from(u32::MAX) {
            return None;
        }
        *slot = next as u32;
        Some(*slot)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    #[default]
    Scheduled,
    Delayed,
    #[serde(alias = "in-air")]
    Departed,
    #[serde(alias = "landed")]
    Arrived,
    Cancelled,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "scheduled",
            FlightStatus::Delayed => "delayed",
            FlightStatus::Departed => "departed",
            FlightStatus::Arrived => "arrived",
            FlightStatus::Cancelled => "cancelled",
        }
    }

    pub fn has_departed(&self) -> bool {
        matches!(self, FlightStatus::Departed | FlightStatus::Arrived)
    }

    /// Statuses only move forward; nothing returns to `Scheduled`.
    pub fn can_transition_to(&self, next: FlightStatus) -> bool {
        use FlightStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Scheduled, Delayed)
                | (Scheduled, Departed)
                | (Scheduled, Cancelled)
                | (Delayed, Departed)
                | (Delayed, Cancelled)
                | (Departed, Arrived)
        )
    }
}

impl std::fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FlightStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(FlightStatus::Scheduled),
            "delayed" => Ok(FlightStatus::Delayed),
            "departed" | "in-air" => Ok(FlightStatus::Departed),
            "arrived" | "landed" => Ok(FlightStatus::Arrived),
            "cancelled" => Ok(FlightStatus::Cancelled),
            other => Err(format!("Invalid status value: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    #[serde(rename = "route")]
    pub route_id: Uuid,
    pub aircraft: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    /// Minutes.
    pub duration: u32,
    pub price: ClassFares,
    pub seats_available: SeatInventory,
    pub status: FlightStatus,
    pub created_at: DateTime<Utc>,
}

impl Flight {
    pub fn is_full(&self) -> bool {
        self.seats_available.is_full()
    }

    pub fn has_available_seats(&self, class: SeatClass) -> bool {
        self.seats_available.has_available(class, 1)
    }

    pub fn summary(&self) -> FlightSummary {
        FlightSummary {
            id: self.id,
            flight_number: self.flight_number.clone(),
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSummary {
    pub id: Uuid,
    pub flight_number: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub status: FlightStatus,
}
