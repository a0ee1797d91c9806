pub mod inventory;
pub mod network;
pub mod pricing;
pub mod schedule;

pub use inventory::SeatAllocator;
pub use network::{
    FlightStatusView, FlightUpdate, FlightView, NetworkManager, NewFlight, NewRoute, RouteDetails,
    RouteSummary, RouteUpdate,
};
pub use pricing::{PassengerMix, PricedFare, PricingConfig, PricingEngine};
pub use schedule::{NewSchedule, ScheduleOutcome, SchedulePage, ScheduleQuery, ScheduleService};
