use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub origin: Airport,
    pub destination: Airport,
    /// Kilometres.
    pub distance: f64,
    /// Minutes.
    pub estimated_duration: u32,
    /// Flights currently referencing this route, in attach order.
    #[serde(default)]
    pub active_flights: Vec<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Route {
    pub fn new(
        origin: Airport,
        destination: Airport,
        distance: f64,
        estimated_duration: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            destination,
            distance,
            estimated_duration,
            active_flights: Vec::new(),
            is_active: true,
            created_at: now,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} - {}", self.origin.code, self.destination.code)
    }

    pub fn full_display_name(&self) -> String {
        format!(
            "{}, {} ({}) to {}, {} ({})",
            self.origin.city,
            self.origin.country,
            self.origin.code,
            self.destination.city,
            self.destination.country,
            self.destination.code
        )
    }

    pub fn has_active_flights(&self) -> bool {
        !self.active_flights.is_empty()
    }

    /// Returns false when the flight was already attached.
    pub fn attach_flight(&mut self, flight_id: Uuid) -> bool {
        if self.active_flights.contains(&flight_id) {
            return false;
        }
        self.active_flights.push(flight_id);
        true
    }

    /// Returns false when the flight was not attached.
    pub fn detach_flight(&mut self, flight_id: Uuid) -> bool {
        let before = self.active_flights.len();
        self.active_flights.retain(|id| *id != flight_id);
        self.active_flights.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(code: &str, city: &str) -> Airport {
        Airport {
            code: code.to_string(),
            city: city.to_string(),
            country: "India".to_string(),
        }
    }

    #[test]
    fn display_names() {
        let route = Route::new(airport("DEL", "Delhi"), airport("BOM", "Mumbai"), 1150.0, 130, Utc::now());
        assert_eq!(route.display_name(), "DEL - BOM");
        assert_eq!(
            route.full_display_name(),
            "Delhi, India (DEL) to Mumbai, India (BOM)"
        );
    }

    #[test]
    fn attach_is_idempotent_and_detach_removes() {
        let mut route = Route::new(airport("DEL", "Delhi"), airport("BOM", "Mumbai"), 1150.0, 130, Utc::now());
        let flight = Uuid::new_v4();

        assert!(route.attach_flight(flight));
        assert!(!route.attach_flight(flight));
        assert_eq!(route.active_flights, vec![flight]);

        assert!(route.detach_flight(flight));
        assert!(!route.detach_flight(flight));
        assert!(!route.has_active_flights());
    }
}
