pub mod booking;
pub mod flight;
pub mod route;
pub mod user;

pub use booking::{
    Booking, BookingStatus, ContactDetails, Passenger, PassengerType, PaymentDetails, PaymentStatus,
    RescheduleEntry,
};
pub use flight::{ClassFares, Flight, FlightStatus, FlightSummary, SeatClass, SeatInventory};
pub use route::{Airport, Route};
pub use user::{Role, User, UserPreferences, UserProfile, UserSummary};
