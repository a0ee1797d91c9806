pub mod eligibility;
pub mod manager;
pub mod models;
pub mod orchestrator;
pub mod reference;

pub use eligibility::{DiscountEligibility, FixedEligibility, RecentTravelEligibility};
pub use manager::BookingManager;
pub use models::{
    BookingView, CheckoutResult, ContactInput, CreateBookingRequest, PassengerInput, PaymentInput,
    QuotedFare, RescheduleRequest,
};
pub use orchestrator::{MockPaymentAdapter, PaymentOrchestrator};
pub use reference::{RandomReferences, ReferenceGenerator, ReferenceSource, ScriptedReferences};
