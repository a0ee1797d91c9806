use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use flyeasy_catalog::pricing::format_amount;
use flyeasy_catalog::{PassengerMix, PricedFare, PricingEngine, RouteSummary, SeatAllocator};
use flyeasy_core::models::{
    Booking, BookingStatus, ContactDetails, Flight, FlightStatus, Passenger, PaymentDetails,
    PaymentStatus,
};
use flyeasy_core::payment::PaymentError;
use flyeasy_core::repository::{
    BookingFilter, BookingRepository, FlightRepository, RouteRepository, UserRepository,
};
use flyeasy_core::{Actor, Clock, CoreError, CoreResult, StoreError, SystemClock};
use flyeasy_shared::Masked;

use crate::eligibility::{DiscountEligibility, RecentTravelEligibility};
use crate::models::{BookedFlight, BookingView, CheckoutResult, CreateBookingRequest};
use crate::orchestrator::{MockPaymentAdapter, PaymentOrchestrator};
use crate::reference::{RandomReferences, ReferenceGenerator, ReferenceSource};

/// Runs the booking lifecycle: create, cancel, reschedule and pay, keeping
/// seat inventory in step with every transition.
#[derive(Clone)]
pub struct BookingManager {
    bookings: Arc<dyn BookingRepository>,
    flights: Arc<dyn FlightRepository>,
    routes: Arc<dyn RouteRepository>,
    users: Arc<dyn UserRepository>,
    seats: SeatAllocator,
    references: ReferenceGenerator,
    eligibility: Arc<dyn DiscountEligibility>,
    pricing: Arc<PricingEngine>,
    payments: PaymentOrchestrator,
    clock: Arc<dyn Clock>,
}

impl BookingManager {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        flights: Arc<dyn FlightRepository>,
        routes: Arc<dyn RouteRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            seats: SeatAllocator::new(flights.clone()),
            references: ReferenceGenerator::new(Arc::new(RandomReferences), bookings.clone()),
            eligibility: Arc::new(RecentTravelEligibility::new(bookings.clone())),
            pricing: Arc::new(PricingEngine::default()),
            payments: PaymentOrchestrator::new(Arc::new(MockPaymentAdapter), "USD"),
            clock: Arc::new(SystemClock),
            bookings,
            flights,
            routes,
            users,
        }
    }

    pub fn with_eligibility(mut self, eligibility: Arc<dyn DiscountEligibility>) -> Self {
        self.eligibility = eligibility;
        self
    }

    pub fn with_reference_source(mut self, source: Arc<dyn ReferenceSource>) -> Self {
        self.references = ReferenceGenerator::new(source, self.bookings.clone());
        self
    }

    pub fn with_pricing(mut self, pricing: PricingEngine) -> Self {
        self.pricing = Arc::new(pricing);
        self
    }

    pub fn with_payments(mut self, payments: PaymentOrchestrator) -> Self {
        self.payments = payments;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// validate → load flight → load user → reserve seats → price →
    /// allocate reference and persist. Seats are released if anything after
    /// the reservation fails.
    pub async fn create_booking(
        &self,
        actor: &Actor,
        request: CreateBookingRequest,
    ) -> CoreResult<BookingView> {
        request.validate()?;

        let flight = self.load_flight(request.flight_id, "Flight not found").await?;
        if matches!(flight.status, FlightStatus::Cancelled) || flight.status.has_departed() {
            return Err(CoreError::InvalidState(format!(
                "Flight {} is {} and cannot be booked",
                flight.flight_number, flight.status
            )));
        }

        let user = self
            .users
            .find_by_id(actor.user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("User not found".to_string()))?;

        let seat_class = request.seat_class;
        let quoted = request
            .quoted_fare
            .map(|q| (q.total_price, q.original_price));
        let passengers: Vec<Passenger> = request
            .passengers
            .into_iter()
            .map(|p| p.into_passenger())
            .collect();
        let seat_count = passengers.len() as u32;

        self.seats.reserve(flight.id, seat_class, seat_count).await?;

        let now = self.clock.now();
        let draft = Booking {
            id: Uuid::new_v4(),
            booking_reference: String::new(),
            user_id: user.id,
            flight_id: flight.id,
            seat_class,
            passengers,
            contact_details: ContactDetails {
                email: Masked::new(request.contact_details.email.trim().to_string()),
                phone: request.contact_details.phone.trim().to_string(),
            },
            payment_details: PaymentDetails {
                method: request.payment_details.method.trim().to_string(),
                transaction_id: request
                    .payment_details
                    .transaction_id
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| format!("TXN-{}", now.timestamp_millis())),
            },
            booking_date: now,
            flight_date: flight.departure_time,
            total_price: 0,
            original_price: 0,
            discount_applied: false,
            discount_reason: String::new(),
            discount_amount: 0,
            payment_status: PaymentStatus::Pending,
            status: BookingStatus::Confirmed,
            cancelled_at: None,
            reschedule_history: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let booking = match self.price_and_persist(draft, &flight, quoted, now).await {
            Ok(booking) => booking,
            Err(e) => {
                if let Err(release) = self.seats.release(flight.id, seat_class, seat_count).await {
                    warn!(flight_id = %flight.id, error = %release, "could not release seats after failed booking");
                }
                return Err(e);
            }
        };

        info!(
            booking_id = %booking.id,
            reference = %booking.booking_reference,
            flight_number = %flight.flight_number,
            passengers = seat_count,
            total = %format_amount(booking.total_price),
            discount = booking.discount_applied,
            "booking created"
        );

        self.view(booking).await
    }

    async fn price_and_persist(
        &self,
        mut booking: Booking,
        flight: &Flight,
        quoted: Option<(i64, Option<i64>)>,
        now: DateTime<Utc>,
    ) -> CoreResult<Booking> {
        let (total, quoted_original) = match quoted {
            Some((total, original)) => (total, original),
            None => {
                let base = flight.price.for_class(booking.seat_class);
                let mix = PassengerMix::from_passengers(&booking.passengers);
                (self.pricing.passenger_fare(base, mix)?, None)
            }
        };
        let eligible = self.eligibility.is_eligible(booking.user_id, now).await?;
        apply_fare(&mut booking, self.pricing.apply_discount(total, quoted_original, eligible)?);

        let mut budget = self.references.budget();
        loop {
            booking.booking_reference = self.references.next_unused(&mut budget).await?;
            match self.bookings.insert(&booking).await {
                Ok(()) => return Ok(booking),
                Err(StoreError::Duplicate(key)) => {
                    warn!(reference = %booking.booking_reference, %key, "booking reference taken on insert, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Admins see every booking; everyone else only their own. Newest first.
    pub async fn list_bookings(
        &self,
        actor: &Actor,
        mut filter: BookingFilter,
    ) -> CoreResult<Vec<BookingView>> {
        if !actor.is_admin() {
            filter.user_id = Some(actor.user_id);
        }
        let bookings = self.bookings.list(&filter).await?;
        self.views(bookings).await
    }

    pub async fn my_bookings(&self, actor: &Actor) -> CoreResult<Vec<BookingView>> {
        let bookings = self
            .bookings
            .list(&BookingFilter::for_user(actor.user_id))
            .await?;
        self.views(bookings).await
    }

    pub async fn get_booking(&self, actor: &Actor, id: Uuid) -> CoreResult<BookingView> {
        let booking = self.load_owned(actor, id).await?;
        self.view(booking).await
    }

    pub async fn cancel_booking(&self, actor: &Actor, id: Uuid) -> CoreResult<BookingView> {
        let mut booking = self.load_owned(actor, id).await?;
        booking.cancel(self.clock.now())?;

        let booking = self.save(&booking).await?;
        if let Err(e) = self
            .seats
            .release(booking.flight_id, booking.seat_class, booking.seats_held())
            .await
        {
            warn!(booking_id = %id, error = %e, "could not release seats for cancelled booking");
        }

        info!(
            booking_id = %id,
            reference = %booking.booking_reference,
            payment_status = ?booking.payment_status,
            "booking cancelled"
        );
        self.view(booking).await
    }

    /// Moves a booking to another flight. Seats on the new flight are taken
    /// before the booking is written and the old ones returned afterwards.
    pub async fn reschedule_booking(
        &self,
        actor: &Actor,
        id: Uuid,
        new_flight_id: Uuid,
    ) -> CoreResult<BookingView> {
        let new_flight = self.load_flight(new_flight_id, "New flight not found").await?;
        let mut booking = self.load_owned(actor, id).await?;
        if booking.is_cancelled() {
            return Err(CoreError::InvalidState(
                "Cannot reschedule a cancelled booking".to_string(),
            ));
        }
        if matches!(new_flight.status, FlightStatus::Cancelled) || new_flight.status.has_departed() {
            return Err(CoreError::InvalidState(format!(
                "Flight {} is {} and cannot be booked",
                new_flight.flight_number, new_flight.status
            )));
        }

        let class = booking.seat_class;
        let seats = booking.seats_held();
        let moving = booking.flight_id != new_flight.id;

        if moving {
            self.seats.reserve(new_flight.id, class, seats).await?;
        }

        let previous_flight =
            booking.reschedule(new_flight.id, new_flight.departure_time, self.clock.now())?;

        let saved = match self.save(&booking).await {
            Ok(saved) => saved,
            Err(e) => {
                if moving {
                    if let Err(release) = self.seats.release(new_flight.id, class, seats).await {
                        warn!(flight_id = %new_flight.id, error = %release, "could not release seats after failed reschedule");
                    }
                }
                return Err(e);
            }
        };

        if moving {
            if let Err(e) = self.seats.release(previous_flight, class, seats).await {
                warn!(flight_id = %previous_flight, error = %e, "could not return seats to previous flight");
            }
        }

        info!(
            booking_id = %id,
            from = %previous_flight,
            to = %new_flight.id,
            "booking rescheduled"
        );
        self.view(saved).await
    }

    /// Settles the booking through the payment gateway and confirms it.
    pub async fn pay_booking(&self, actor: &Actor, id: Uuid) -> CoreResult<CheckoutResult> {
        let mut booking = self.load_owned(actor, id).await?;

        // Reject cancelled or already paid bookings before charging.
        booking.clone().mark_paid(self.clock.now())?;

        let intent = match self.payments.settle(&booking).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(booking_id = %id, error = %e, "payment failed");
                booking.mark_payment_failed(self.clock.now());
                self.save(&booking).await?;
                return Err(match e {
                    PaymentError::Declined(msg) => {
                        CoreError::InvalidState(format!("Payment declined: {}", msg))
                    }
                    PaymentError::Provider(msg) => {
                        CoreError::InvalidState(format!("Payment failed: {}", msg))
                    }
                });
            }
        };

        booking.mark_paid(self.clock.now())?;
        booking.payment_details.transaction_id = intent.id.clone();
        let saved = self.save(&booking).await?;

        info!(booking_id = %id, intent = %intent.id, amount = intent.amount, "booking paid");
        Ok(CheckoutResult {
            booking: self.view(saved).await?,
            payment: intent,
        })
    }

    async fn save(&self, booking: &Booking) -> CoreResult<Booking> {
        self.bookings.update(booking).await.map_err(|e| match e {
            StoreError::VersionConflict => CoreError::Conflict(
                "Booking was modified by another request, please retry".to_string(),
            ),
            StoreError::NotFound => CoreError::NotFound("Booking not found".to_string()),
            other => CoreError::Store(other),
        })
    }

    async fn load_owned(&self, actor: &Actor, id: Uuid) -> CoreResult<Booking> {
        let booking = self
            .bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Booking not found".to_string()))?;
        actor.ensure_owner_or_admin(booking.user_id, "booking")?;
        Ok(booking)
    }

    async fn load_flight(&self, id: Uuid, not_found: &str) -> CoreResult<Flight> {
        self.flights
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(not_found.to_string()))
    }

    async fn view(&self, booking: Booking) -> CoreResult<BookingView> {
        let flight = self.flights.find_by_id(booking.flight_id).await?;
        let flight_details = match flight {
            Some(flight) => {
                let route = self.routes.find_by_id(flight.route_id).await?;
                Some(BookedFlight::new(&flight, route.as_ref().map(RouteSummary::from)))
            }
            None => None,
        };
        let user_details = self
            .users
            .find_by_id(booking.user_id)
            .await?
            .map(|u| u.summary());

        Ok(BookingView {
            is_refundable: booking.is_refundable(self.clock.now()),
            booking,
            flight_details,
            user_details,
        })
    }

    async fn views(&self, bookings: Vec<Booking>) -> CoreResult<Vec<BookingView>> {
        let mut views = Vec::with_capacity(bookings.len());
        for booking in bookings {
            views.push(self.view(booking).await?);
        }
        Ok(views)
    }
}

fn apply_fare(booking: &mut Booking, fare: PricedFare) {
    booking.original_price = fare.original_price;
    booking.total_price = fare.total_price;
    booking.discount_applied = fare.discount_applied;
    booking.discount_reason = fare.discount_reason;
    booking.discount_amount = fare.discount_amount;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::FixedEligibility;
    use crate::models::{ContactInput, PassengerInput, PaymentInput, QuotedFare};
    use crate::orchestrator::MOCK_DECLINED_METHOD;
    use crate::reference::{is_valid_reference, ScriptedReferences};
    use chrono::{Duration, TimeZone};
    use flyeasy_catalog::{NetworkManager, NewFlight, NewRoute};
    use flyeasy_core::models::{Airport, ClassFares, Role, SeatClass, SeatInventory, User};
    use flyeasy_core::FixedClock;
    use flyeasy_store::InMemoryStore;

    struct Fixture {
        store: Arc<InMemoryStore>,
        clock: Arc<FixedClock>,
        manager: BookingManager,
        network: NetworkManager,
        owner: Actor,
        stranger: Actor,
        admin: Actor,
        fl100: Flight,
        fl200: Flight,
    }

    fn airport(code: &str, city: &str) -> Airport {
        Airport {
            code: code.to_string(),
            city: city.to_string(),
            country: "India".to_string(),
        }
    }

    fn new_flight(route_id: Uuid, number: &str, economy: u32, days_out: i64) -> NewFlight {
        let departure = Utc.with_ymd_and_hms(2030, 2, 1, 9, 0, 0).unwrap() + Duration::days(days_out);
        NewFlight {
            flight_number: number.to_string(),
            route_id,
            aircraft: "A320".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::minutes(130),
            duration: None,
            price: ClassFares {
                economy: 500_000,
                business: 1_200_000,
                first_class: 0,
            },
            seats_available: SeatInventory {
                economy,
                business: 4,
                first_class: 0,
            },
        }
    }

    async fn user(store: &InMemoryStore, name: &str, role: Role) -> Actor {
        let user = User::new(
            name.to_string(),
            &format!("{}@example.com", name.to_lowercase()),
            None,
            "hash".to_string(),
            role,
            Utc::now(),
        );
        UserRepository::insert(store, &user).await.unwrap();
        Actor::new(user.id, role)
    }

    async fn fixture(eligible: Option<bool>) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2030, 1, 20, 12, 0, 0).unwrap(),
        ));
        let network = NetworkManager::new(store.clone(), store.clone(), store.clone(), clock.clone());

        let route = network
            .create_route(NewRoute {
                origin: airport("DEL", "Delhi"),
                destination: airport("BOM", "Mumbai"),
                distance: 1150.0,
                estimated_duration: 130,
                is_active: true,
            })
            .await
            .unwrap();
        let fl100 = network.create_flight(new_flight(route.id, "FL100", 10, 0)).await.unwrap();
        let fl200 = network.create_flight(new_flight(route.id, "FL200", 3, 2)).await.unwrap();

        let mut manager = BookingManager::new(store.clone(), store.clone(), store.clone(), store.clone())
            .with_clock(clock.clone());
        if let Some(eligible) = eligible {
            manager = manager.with_eligibility(Arc::new(FixedEligibility(eligible)));
        }

        Fixture {
            owner: user(&store, "Asha", Role::Passenger).await,
            stranger: user(&store, "Ravi", Role::Passenger).await,
            admin: user(&store, "Admin", Role::Admin).await,
            store,
            clock,
            manager,
            network,
            fl100,
            fl200,
        }
    }

    fn passenger(name: &str, age: u32) -> PassengerInput {
        PassengerInput {
            name: name.to_string(),
            age,
            passport_number: format!("P{}", age),
            passenger_type: None,
        }
    }

    fn request(flight_id: Uuid, passengers: Vec<PassengerInput>) -> CreateBookingRequest {
        CreateBookingRequest {
            flight_id,
            seat_class: SeatClass::Economy,
            passengers,
            contact_details: ContactInput {
                email: "asha@example.com".to_string(),
                phone: "+91 90000 00000".to_string(),
            },
            payment_details: PaymentInput {
                method: "credit_card".to_string(),
                transaction_id: None,
            },
            quoted_fare: None,
        }
    }

    async fn seats(f: &Fixture, flight_id: Uuid) -> u32 {
        FlightRepository::find_by_id(f.store.as_ref(), flight_id)
            .await
            .unwrap()
            .unwrap()
            .seats_available
            .economy
    }

    #[tokio::test]
    async fn two_adults_and_an_infant_then_cancel_twice() {
        let f = fixture(None).await;
        let view = f
            .manager
            .create_booking(
                &f.owner,
                request(f.fl100.id, vec![passenger("A", 34), passenger("B", 31), passenger("C", 1)]),
            )
            .await
            .unwrap();

        let booking = &view.booking;
        assert_eq!(format_amount(booking.total_price), "10500.00");
        assert_eq!(booking.original_price, booking.total_price);
        assert!(!booking.discount_applied);
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert!(is_valid_reference(&booking.booking_reference));
        assert!(booking.payment_details.transaction_id.starts_with("TXN-"));
        assert_eq!(booking.passengers[2].passenger_type, flyeasy_core::models::PassengerType::Infant);
        assert_eq!(view.flight_details.as_ref().unwrap().flight_number, "FL100");
        assert_eq!(view.user_details.as_ref().unwrap().name, "Asha");
        assert!(view.is_refundable);
        assert_eq!(seats(&f, f.fl100.id).await, 7);

        let cancelled = f.manager.cancel_booking(&f.owner, booking.id).await.unwrap();
        assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
        let first_cancel = cancelled.booking.cancelled_at;
        assert!(first_cancel.is_some());
        assert_eq!(seats(&f, f.fl100.id).await, 10);

        f.clock.advance(Duration::minutes(10));
        let err = f.manager.cancel_booking(&f.owner, booking.id).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
        let reread = f.manager.get_booking(&f.owner, booking.id).await.unwrap();
        assert_eq!(reread.booking.cancelled_at, first_cancel);
        assert_eq!(seats(&f, f.fl100.id).await, 10);
    }

    #[tokio::test]
    async fn eligible_user_pays_eighty_percent() {
        let f = fixture(Some(true)).await;
        let view = f
            .manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("A", 30)]))
            .await
            .unwrap();
        let b = view.booking;
        assert!(b.discount_applied);
        assert_eq!(b.original_price, 500_000);
        assert_eq!(b.total_price, 400_000);
        assert_eq!(b.total_price * 10, b.original_price * 8);
        assert_eq!(b.discount_reason, "Recent flight in the past 20 days");
    }

    #[tokio::test]
    async fn quoted_fare_is_used_as_the_total() {
        let f = fixture(Some(false)).await;
        let mut req = request(f.fl100.id, vec![passenger("A", 30)]);
        req.quoted_fare = Some(QuotedFare {
            total_price: 450_000,
            original_price: Some(500_000),
        });
        let b = f.manager.create_booking(&f.owner, req).await.unwrap().booking;
        assert_eq!(b.total_price, 450_000);
        assert_eq!(b.original_price, 500_000);
        assert!(!b.discount_applied);
    }

    #[tokio::test]
    async fn recent_flight_earns_the_discount_on_the_next_booking() {
        let f = fixture(None).await;
        f.manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("A", 30)]))
            .await
            .unwrap();

        // Five days after FL100 departed.
        f.clock.set(f.fl100.departure_time + Duration::days(5));
        let later = f
            .network
            .create_flight(new_flight(f.fl100.route_id, "FL300", 5, 20))
            .await
            .unwrap();
        let b = f
            .manager
            .create_booking(&f.owner, request(later.id, vec![passenger("A", 30)]))
            .await
            .unwrap()
            .booking;
        assert!(b.discount_applied);
        assert_eq!(b.total_price, 400_000);

        let other = f
            .manager
            .create_booking(&f.stranger, request(later.id, vec![passenger("R", 30)]))
            .await
            .unwrap()
            .booking;
        assert!(!other.discount_applied);
    }

    #[tokio::test]
    async fn strangers_are_forbidden_and_admins_are_not() {
        let f = fixture(None).await;
        let id = f
            .manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("A", 30)]))
            .await
            .unwrap()
            .booking
            .id;

        assert!(matches!(
            f.manager.get_booking(&f.stranger, id).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            f.manager.cancel_booking(&f.stranger, id).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            f.manager.reschedule_booking(&f.stranger, id, f.fl200.id).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(f.manager.get_booking(&f.admin, id).await.is_ok());
        assert!(matches!(
            f.manager.get_booking(&f.owner, Uuid::new_v4()).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn reschedule_records_the_previous_flight_and_moves_seats() {
        let f = fixture(None).await;
        let id = f
            .manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("A", 30), passenger("B", 8)]))
            .await
            .unwrap()
            .booking
            .id;
        assert_eq!(seats(&f, f.fl100.id).await, 8);

        let view = f.manager.reschedule_booking(&f.owner, id, f.fl200.id).await.unwrap();
        let b = &view.booking;
        assert_eq!(b.flight_id, f.fl200.id);
        assert_eq!(b.flight_date, f.fl200.departure_time);
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert_eq!(b.reschedule_history.len(), 1);
        assert_eq!(b.reschedule_history[0].previous_flight, f.fl100.id);
        assert_eq!(b.reschedule_history[0].new_flight, f.fl200.id);
        assert_eq!(seats(&f, f.fl100.id).await, 10);
        assert_eq!(seats(&f, f.fl200.id).await, 1);

        let back = f.manager.reschedule_booking(&f.owner, id, f.fl100.id).await.unwrap();
        assert_eq!(back.booking.reschedule_history[1].previous_flight, f.fl200.id);
        assert_eq!(seats(&f, f.fl200.id).await, 3);
    }

    #[tokio::test]
    async fn reschedule_checks_new_flight_then_cancellation_then_capacity() {
        let f = fixture(None).await;
        let id = f
            .manager
            .create_booking(
                &f.owner,
                request(f.fl100.id, vec![passenger("A", 30), passenger("B", 30), passenger("C", 30), passenger("D", 30)]),
            )
            .await
            .unwrap()
            .booking
            .id;

        assert!(matches!(
            f.manager.reschedule_booking(&f.owner, id, Uuid::new_v4()).await,
            Err(CoreError::NotFound(_))
        ));

        // FL200 has three seats.
        assert!(matches!(
            f.manager.reschedule_booking(&f.owner, id, f.fl200.id).await,
            Err(CoreError::InvalidState(_))
        ));
        assert_eq!(seats(&f, f.fl100.id).await, 6);
        assert_eq!(seats(&f, f.fl200.id).await, 3);

        f.manager.cancel_booking(&f.owner, id).await.unwrap();
        let err = f
            .manager
            .reschedule_booking(&f.owner, id, f.fl200.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
        assert!(f
            .manager
            .get_booking(&f.owner, id)
            .await
            .unwrap()
            .booking
            .reschedule_history
            .is_empty());
    }

    #[tokio::test]
    async fn sold_out_class_rejects_the_booking_without_persisting() {
        let f = fixture(None).await;
        let party = (0..4).map(|i| passenger("P", 20 + i)).collect();
        let err = f
            .manager
            .create_booking(&f.owner, request(f.fl200.id, party))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
        assert!(f.manager.my_bookings(&f.owner).await.unwrap().is_empty());
        assert_eq!(seats(&f, f.fl200.id).await, 3);
    }

    #[tokio::test]
    async fn unpriceable_fare_fails_and_returns_the_seats() {
        let f = fixture(None).await;
        let mut legacy = f.fl100.clone();
        legacy.price.economy = 100_000_000_000_000_000;
        FlightRepository::update(f.store.as_ref(), &legacy).await.unwrap();

        let err = f
            .manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("A", 30)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
        assert!(f.manager.my_bookings(&f.owner).await.unwrap().is_empty());
        assert_eq!(seats(&f, f.fl100.id).await, 10);
    }

    #[tokio::test]
    async fn oversized_quoted_fare_is_rejected_up_front() {
        let f = fixture(None).await;
        let mut req = request(f.fl100.id, vec![passenger("A", 30)]);
        req.quoted_fare = Some(QuotedFare {
            total_price: flyeasy_core::money::MAX_AMOUNT + 1,
            original_price: None,
        });
        let err = f.manager.create_booking(&f.owner, req).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
        assert_eq!(seats(&f, f.fl100.id).await, 10);
    }

    #[tokio::test]
    async fn taken_reference_is_skipped() {
        let f = fixture(None).await;
        let manager = f
            .manager
            .clone()
            .with_reference_source(Arc::new(ScriptedReferences::new(["AAAAAA", "AAAAAA", "BBBBBB"])));

        let first = manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("A", 30)]))
            .await
            .unwrap();
        let second = manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("B", 30)]))
            .await
            .unwrap();
        assert_eq!(first.booking.booking_reference, "AAAAAA");
        assert_eq!(second.booking.booking_reference, "BBBBBB");
    }

    #[tokio::test]
    async fn exhausted_references_release_the_seats() {
        let f = fixture(None).await;
        let manager = f
            .manager
            .clone()
            .with_reference_source(Arc::new(ScriptedReferences::new(vec!["AAAAAA"; 12])));

        manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("A", 30)]))
            .await
            .unwrap();
        let err = manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("B", 30)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ReferenceExhausted(_)));
        assert_eq!(seats(&f, f.fl100.id).await, 9);
    }

    #[tokio::test]
    async fn listing_is_scoped_and_newest_first() {
        let f = fixture(None).await;
        let first = f
            .manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("A", 30)]))
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(1));
        let second = f
            .manager
            .create_booking(&f.owner, request(f.fl200.id, vec![passenger("A", 30)]))
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(1));
        f.manager
            .create_booking(&f.stranger, request(f.fl100.id, vec![passenger("R", 30)]))
            .await
            .unwrap();

        let mine = f.manager.list_bookings(&f.owner, BookingFilter::default()).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].booking.id, second.booking.id);
        assert_eq!(mine[1].booking.id, first.booking.id);

        let all = f.manager.list_bookings(&f.admin, BookingFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(f.manager.my_bookings(&f.admin).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn checkout_confirms_once_and_refunds_on_early_cancel() {
        let f = fixture(None).await;
        let id = f
            .manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("A", 30)]))
            .await
            .unwrap()
            .booking
            .id;

        let paid = f.manager.pay_booking(&f.owner, id).await.unwrap();
        assert_eq!(paid.booking.booking.payment_status, PaymentStatus::Completed);
        assert_eq!(paid.booking.booking.status, BookingStatus::Confirmed);
        assert_eq!(paid.booking.booking.payment_details.transaction_id, paid.payment.id);

        assert!(matches!(
            f.manager.pay_booking(&f.owner, id).await,
            Err(CoreError::InvalidState(_))
        ));

        let cancelled = f.manager.cancel_booking(&f.owner, id).await.unwrap();
        assert_eq!(cancelled.booking.payment_status, PaymentStatus::Refunded);
        assert!(matches!(
            f.manager.pay_booking(&f.owner, id).await,
            Err(CoreError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn declined_payment_marks_the_booking_failed() {
        let f = fixture(None).await;
        let mut req = request(f.fl100.id, vec![passenger("A", 30)]);
        req.payment_details.method = MOCK_DECLINED_METHOD.to_string();
        let id = f.manager.create_booking(&f.owner, req).await.unwrap().booking.id;

        let err = f.manager.pay_booking(&f.owner, id).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
        let b = f.manager.get_booking(&f.owner, id).await.unwrap().booking;
        assert_eq!(b.payment_status, PaymentStatus::Failed);
        assert_eq!(b.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let f = fixture(None).await;
        let id = f
            .manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("A", 30)]))
            .await
            .unwrap()
            .booking
            .id;

        let stale = BookingRepository::find_by_id(f.store.as_ref(), id).await.unwrap().unwrap();
        f.manager.cancel_booking(&f.owner, id).await.unwrap();

        let mut racing = stale.clone();
        racing.cancel(Utc::now()).unwrap();
        assert!(matches!(
            f.manager.save(&racing).await,
            Err(CoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn view_serializes_with_joined_details() {
        let f = fixture(None).await;
        let view = f
            .manager
            .create_booking(&f.owner, request(f.fl100.id, vec![passenger("A", 30)]))
            .await
            .unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["flight"], serde_json::json!(f.fl100.id));
        assert_eq!(json["flightDetails"]["flightNumber"], "FL100");
        assert_eq!(json["flightDetails"]["route"]["origin"]["code"], "DEL");
        assert_eq!(json["userDetails"]["name"], "Asha");
        assert_eq!(json["isRefundable"], true);
        assert_eq!(json["passengers"][0]["passportNumber"], "P30");
    }
}
