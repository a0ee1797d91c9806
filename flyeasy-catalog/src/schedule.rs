use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use flyeasy_core::models::{ClassFares, Flight, FlightStatus, SeatInventory};
use flyeasy_core::repository::{FlightFilter, RouteFilter};
use flyeasy_core::{CoreError, CoreResult, StoreError};

use crate::network::{route_error, FlightUpdate, FlightView, NetworkManager, NewFlight};

/// Recurrences start one week after the base departure.
pub const RECURRENCE_OFFSET_DAYS: i64 = 7;
/// ...and stop before this many calendar months after it.
pub const RECURRENCE_HORIZON_MONTHS: u32 = 3;
/// Largest page the schedule listing serves.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSchedule {
    pub route_id: Uuid,
    pub flight_number: String,
    pub aircraft: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub duration: Option<u32>,
    pub price: ClassFares,
    pub seats_available: SeatInventory,
    /// 0 = Sunday .. 6 = Saturday.
    #[serde(default)]
    pub recurring_days: Vec<u8>,
}

impl NewSchedule {
    fn base_flight(&self) -> NewFlight {
        NewFlight {
            flight_number: self.flight_number.clone(),
            route_id: self.route_id,
            aircraft: self.aircraft.clone(),
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            duration: self.duration,
            price: self.price,
            seats_available: self.seats_available,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub flight_number: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

/// Expands a base departure into weekly recurrences on `days`.
///
/// Days are walked from `departure + 7 days` (inclusive) while strictly before
/// `departure + 3 months`. Each occurrence keeps the base times of day; an
/// arrival whose time of day is earlier than the departure's lands on the
/// following day.
pub fn plan_recurrences(
    flight_number: &str,
    departure: DateTime<Utc>,
    arrival: DateTime<Utc>,
    days: &[u8],
) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();
    if days.is_empty() {
        return occurrences;
    }

    let Some(end) = departure.checked_add_months(Months::new(RECURRENCE_HORIZON_MONTHS)) else {
        return occurrences;
    };
    let overnight = arrival.time() < departure.time();

    let mut cursor = departure + Duration::days(RECURRENCE_OFFSET_DAYS);
    while cursor < end {
        let weekday = cursor.weekday().num_days_from_sunday() as u8;
        if days.contains(&weekday) {
            let date = cursor.date_naive();
            let mut arrival_at = date.and_time(arrival.time()).and_utc();
            if overnight {
                arrival_at += Duration::days(1);
            }
            occurrences.push(Occurrence {
                flight_number: format!("{}-{}", flight_number, date.format("%Y-%m-%d")),
                departure_time: cursor,
                arrival_time: arrival_at,
            });
        }
        cursor += Duration::days(1);
    }
    occurrences
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ScheduleOutcome {
    Single(Flight),
    #[serde(rename_all = "camelCase")]
    Recurring {
        main_flight: Flight,
        recurring_flights_count: usize,
        message: String,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleQuery {
    pub route: Option<Uuid>,
    pub status: Option<FlightStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PageRef {
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePage {
    pub count: usize,
    pub pagination: Pagination,
    pub total_pages: usize,
    pub data: Vec<FlightView>,
}

/// Schedules are flights viewed through the timetable: created with optional
/// weekly recurrence and listed with pagination.
#[derive(Clone)]
pub struct ScheduleService {
    network: NetworkManager,
}

impl ScheduleService {
    pub fn new(network: NetworkManager) -> Self {
        Self { network }
    }

    pub async fn create(&self, schedule: NewSchedule) -> CoreResult<ScheduleOutcome> {
        let base = schedule.base_flight();
        base.validate()?;

        if self
            .network
            .routes()
            .find_by_id(schedule.route_id)
            .await?
            .is_none()
        {
            return Err(CoreError::NotFound("Route not found".to_string()));
        }

        let occurrences = plan_recurrences(
            base.flight_number.trim(),
            schedule.departure_time,
            schedule.arrival_time,
            &schedule.recurring_days,
        );

        let mut numbers: Vec<String> = occurrences.iter().map(|o| o.flight_number.clone()).collect();
        numbers.push(base.flight_number.trim().to_string());
        let taken = self.network.flights().existing_numbers(&numbers).await?;
        if !taken.is_empty() {
            return Err(CoreError::Conflict(format!(
                "Flight number already exists: {}",
                taken.join(", ")
            )));
        }

        let now = self.network.now();
        let template = base.into_flight(now);
        let main_flight = self.network.insert_flight(template.clone()).await?;

        if occurrences.is_empty() {
            return Ok(ScheduleOutcome::Single(main_flight));
        }

        let recurring: Vec<Flight> = occurrences
            .into_iter()
            .map(|o| Flight {
                id: Uuid::new_v4(),
                flight_number: o.flight_number,
                departure_time: o.departure_time,
                arrival_time: o.arrival_time,
                created_at: now,
                ..template.clone()
            })
            .collect();
        let ids: Vec<Uuid> = recurring.iter().map(|f| f.id).collect();

        self.network
            .routes()
            .attach_flights(schedule.route_id, &ids)
            .await
            .map_err(|e| route_error(e, "Route not found"))?;

        let mut inserted: Vec<Uuid> = Vec::with_capacity(recurring.len());
        for flight in &recurring {
            if let Err(e) = self.network.flights().insert(flight).await {
                warn!(
                    flight_number = %flight.flight_number,
                    error = %e,
                    inserted = inserted.len(),
                    "recurring flight insert failed, rolling back"
                );
                self.roll_back(schedule.route_id, &ids, &inserted).await;
                return Err(match e {
                    StoreError::Duplicate(_) => {
                        CoreError::Conflict("Flight number already exists".to_string())
                    }
                    other => CoreError::Store(other),
                });
            }
            inserted.push(flight.id);
        }

        let count = inserted.len();
        info!(
            flight_id = %main_flight.id,
            flight_number = %main_flight.flight_number,
            recurring = count,
            "schedule created"
        );
        Ok(ScheduleOutcome::Recurring {
            main_flight,
            recurring_flights_count: count,
            message: format!("Successfully scheduled {} recurring flights", count),
        })
    }

    async fn roll_back(&self, route_id: Uuid, attached: &[Uuid], inserted: &[Uuid]) {
        for id in inserted {
            if let Err(e) = self.network.flights().delete(*id).await {
                warn!(flight_id = %id, error = %e, "could not remove recurring flight");
            }
        }
        for id in attached {
            self.network.compensate_detach(route_id, *id).await;
        }
    }

    pub async fn list(&self, query: &ScheduleQuery) -> CoreResult<SchedulePage> {
        let page = query.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = query.limit.filter(|l| *l > 0).unwrap_or(10).min(MAX_PAGE_SIZE);

        let mut filter = FlightFilter {
            status: query.status,
            route_ids: query.route.map(|r| vec![r]),
            ..Default::default()
        };
        if let (Some(from), Some(to)) = (query.from, query.to) {
            filter.departure_from = Some(from);
            filter.departure_to = Some(to);
        }

        let route_filter = RouteFilter {
            origin_code: query.origin.clone(),
            destination_code: query.destination.clone(),
            active_only: false,
        };
        if !route_filter.is_empty() {
            let routes = self.network.routes().list(&route_filter).await?;
            if routes.is_empty() {
                return Ok(SchedulePage {
                    count: 0,
                    pagination: Pagination::default(),
                    total_pages: 0,
                    data: Vec::new(),
                });
            }
            filter.route_ids = Some(routes.into_iter().map(|r| r.id).collect());
        }

        // Pages past the end come back empty.
        let start = (page - 1).saturating_mul(limit);
        let end = start.saturating_add(limit);
        let total = self.network.flights().count(&filter).await?;
        let flights = self.network.flights().list_page(&filter, start, limit).await?;
        let data = self.network.join_routes(flights).await?;

        let pagination = Pagination {
            next: (end < total).then_some(PageRef {
                page: page + 1,
                limit,
            }),
            prev: (start > 0).then_some(PageRef {
                page: page - 1,
                limit,
            }),
        };

        Ok(SchedulePage {
            count: data.len(),
            pagination,
            total_pages: total.div_ceil(limit),
            data,
        })
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<FlightView> {
        self.network.get_flight(id).await.map_err(schedule_not_found)
    }

    pub async fn update(&self, id: Uuid, update: FlightUpdate) -> CoreResult<FlightView> {
        self.network.load_flight(id).await.map_err(schedule_not_found)?;
        self.network.update_flight(id, update).await
    }

    pub async fn delete(&self, id: Uuid) -> CoreResult<()> {
        self.network.load_flight(id).await.map_err(schedule_not_found)?;
        self.network.delete_flight(id).await
    }
}

fn schedule_not_found(err: CoreError) -> CoreError {
    match err {
        CoreError::NotFound(_) => CoreError::NotFound("Flight schedule not found".to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{manager, new_route};
    use chrono::TimeZone;

    fn monday_departure() -> (DateTime<Utc>, DateTime<Utc>) {
        // 2025-01-06 is a Monday.
        let dep = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        (dep, dep + Duration::minutes(130))
    }

    fn schedule(route_id: Uuid, days: Vec<u8>) -> NewSchedule {
        let (dep, arr) = monday_departure();
        NewSchedule {
            route_id,
            flight_number: "FL100".to_string(),
            aircraft: "A320".to_string(),
            departure_time: dep,
            arrival_time: arr,
            duration: None,
            price: ClassFares {
                economy: 500_000,
                business: 1_200_000,
                first_class: 0,
            },
            seats_available: SeatInventory {
                economy: 150,
                business: 20,
                first_class: 0,
            },
            recurring_days: days,
        }
    }

    #[test]
    fn monday_and_wednesday_over_three_months() {
        let (dep, arr) = monday_departure();
        let plan = plan_recurrences("FL100", dep, arr, &[1, 3]);

        // Mondays 13 Jan .. 31 Mar and Wednesdays 15 Jan .. 2 Apr.
        assert_eq!(plan.len(), 24);
        assert_eq!(plan[0].flight_number, "FL100-2025-01-13");
        assert_eq!(plan[1].flight_number, "FL100-2025-01-15");
        assert_eq!(plan.last().unwrap().flight_number, "FL100-2025-04-02");
        for o in &plan {
            let weekday = o.departure_time.weekday().num_days_from_sunday();
            assert!(weekday == 1 || weekday == 3);
            assert_eq!(o.departure_time.time(), dep.time());
            assert_eq!(o.arrival_time - o.departure_time, Duration::minutes(130));
        }
    }

    #[test]
    fn start_day_is_included() {
        let (dep, arr) = monday_departure();
        let plan = plan_recurrences("FL1", dep, arr, &[1]);
        assert_eq!(plan[0].departure_time, dep + Duration::days(7));
    }

    #[test]
    fn overnight_arrival_moves_to_next_day() {
        let dep = Utc.with_ymd_and_hms(2025, 1, 6, 23, 0, 0).unwrap();
        let arr = dep + Duration::hours(3);
        let plan = plan_recurrences("RED1", dep, arr, &[1]);
        assert_eq!(plan[0].arrival_time, Utc.with_ymd_and_hms(2025, 1, 14, 2, 0, 0).unwrap());
    }

    #[test]
    fn no_days_no_recurrences() {
        let (dep, arr) = monday_departure();
        assert!(plan_recurrences("FL100", dep, arr, &[]).is_empty());
    }

    #[tokio::test]
    async fn create_attaches_every_generated_flight() {
        let (_store, network) = manager();
        let route = network.create_route(new_route("DEL", "BOM")).await.unwrap();
        let service = ScheduleService::new(network.clone());

        let outcome = service.create(schedule(route.id, vec![1, 3])).await.unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["recurringFlightsCount"], 24);
        assert_eq!(json["mainFlight"]["flightNumber"], "FL100");

        let ScheduleOutcome::Recurring {
            main_flight,
            recurring_flights_count,
            ..
        } = outcome
        else {
            panic!("expected recurring outcome");
        };
        assert_eq!(recurring_flights_count, 24);
        assert_eq!(main_flight.flight_number, "FL100");

        let details = network.get_route(route.id).await.unwrap();
        assert_eq!(details.route.active_flights.len(), 25);
        assert_eq!(details.route.active_flights[0], main_flight.id);
    }

    #[tokio::test]
    async fn existing_generated_number_rejects_the_whole_schedule() {
        let (_store, network) = manager();
        let route = network.create_route(new_route("DEL", "BOM")).await.unwrap();
        let service = ScheduleService::new(network.clone());

        let mut clash = schedule(route.id, vec![]);
        clash.flight_number = "FL100-2025-01-13".to_string();
        // Generated numbers exceed the caller limit, so seed it through the store.
        let flight = clash.base_flight().into_flight(Utc::now());
        network.insert_flight(flight).await.unwrap();

        let err = service.create(schedule(route.id, vec![1])).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(network.get_route(route.id).await.unwrap().route.active_flights.len(), 1);
    }

    #[tokio::test]
    async fn without_days_a_single_flight_is_created() {
        let (_store, network) = manager();
        let route = network.create_route(new_route("DEL", "BOM")).await.unwrap();
        let service = ScheduleService::new(network);

        let outcome = service.create(schedule(route.id, vec![])).await.unwrap();
        assert!(matches!(outcome, ScheduleOutcome::Single(_)));
    }

    #[tokio::test]
    async fn listing_is_paginated_by_departure() {
        let (_store, network) = manager();
        let route = network.create_route(new_route("DEL", "BOM")).await.unwrap();
        let service = ScheduleService::new(network);
        service.create(schedule(route.id, vec![1, 3])).await.unwrap();

        let first = service
            .list(&ScheduleQuery {
                limit: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(first.count, 10);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.pagination.next, Some(PageRef { page: 2, limit: 10 }));
        assert!(first.pagination.prev.is_none());
        assert_eq!(first.data[0].flight.flight_number, "FL100");

        let last = service
            .list(&ScheduleQuery {
                page: Some(3),
                limit: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(last.count, 5);
        assert!(last.pagination.next.is_none());

        let none = service
            .list(&ScheduleQuery {
                origin: Some("BLR".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(none.count, 0);
        assert!(none.data.is_empty());
    }

    #[tokio::test]
    async fn extreme_page_and_limit_are_served_without_overflow() {
        let (_store, network) = manager();
        let route = network.create_route(new_route("DEL", "BOM")).await.unwrap();
        let service = ScheduleService::new(network);
        service.create(schedule(route.id, vec![1, 3])).await.unwrap();

        let far = service
            .list(&ScheduleQuery {
                page: Some(usize::MAX),
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(far.data.is_empty());
        assert!(far.pagination.next.is_none());
        assert_eq!(far.total_pages, 13);

        let capped = service
            .list(&ScheduleQuery {
                limit: Some(usize::MAX),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(capped.count, 25);
        assert_eq!(capped.total_pages, 1);
        assert!(capped.pagination.next.is_none());
    }
}
