use flyeasy_core::models::{Passenger, PassengerType};
use flyeasy_core::{CoreError, CoreResult};

/// Fare ratios are in percent of the base fare.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub child_fare_percent: i64,
    pub infant_fare_percent: i64,
    pub recent_travel_discount_percent: i64,
    pub recent_travel_discount_reason: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            child_fare_percent: 75,
            infant_fare_percent: 10,
            recent_travel_discount_percent: 20,
            recent_travel_discount_reason: "Recent flight in the past 20 days".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassengerMix {
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
}

impl PassengerMix {
    pub fn new(adults: u32, children: u32, infants: u32) -> Self {
        Self {
            adults,
            children,
            infants,
        }
    }

    pub fn from_passengers(passengers: &[Passenger]) -> Self {
        passengers
            .iter()
            .fold(Self::default(), |mut mix, p| {
                match p.passenger_type {
                    PassengerType::Adult => mix.adults += 1,
                    PassengerType::Child => mix.children += 1,
                    PassengerType::Infant => mix.infants += 1,
                }
                mix
            })
    }

    pub fn total(&self) -> u32 {
        self.adults + self.children + self.infants
    }
}

/// Final price breakdown written onto a booking. Amounts are cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedFare {
    pub original_price: i64,
    pub total_price: i64,
    pub discount_applied: bool,
    pub discount_reason: String,
    pub discount_amount: i64,
}

pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// `adults × base + children × base × 0.75 + infants × base × 0.10`,
    /// rounded half-up to the cent. Totals that do not fit an `i64` are a
    /// validation error.
    pub fn passenger_fare(&self, base_fare: i64, mix: PassengerMix) -> CoreResult<i64> {
        let share = |count: u32, percent: i64| {
            i64::from(count)
                .checked_mul(base_fare)
                .and_then(|v| v.checked_mul(percent))
        };
        share(mix.adults, 100)
            .zip(share(mix.children, self.config.child_fare_percent))
            .and_then(|(a, c)| a.checked_add(c))
            .zip(share(mix.infants, self.config.infant_fare_percent))
            .and_then(|(ac, i)| ac.checked_add(i))
            .map(round_hundredths)
            .ok_or_else(overflow)
    }

    /// Applies the recent-travel discount to `total`. When a quoted original
    /// price is supplied and no discount applies, it is carried through as is.
    pub fn apply_discount(
        &self,
        total: i64,
        quoted_original: Option<i64>,
        eligible: bool,
    ) -> CoreResult<PricedFare> {
        if eligible {
            let amount = total
                .checked_mul(self.config.recent_travel_discount_percent)
                .map(round_hundredths)
                .ok_or_else(overflow)?;
            return Ok(PricedFare {
                original_price: total,
                total_price: total - amount,
                discount_applied: true,
                discount_reason: self.config.recent_travel_discount_reason.clone(),
                discount_amount: amount,
            });
        }

        Ok(PricedFare {
            original_price: quoted_original.unwrap_or(total),
            total_price: total,
            discount_applied: false,
            discount_reason: String::new(),
            discount_amount: 0,
        })
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

fn round_hundredths(value: i64) -> i64 {
    let rounded = value / 100;
    match value % 100 {
        r if r >= 50 => rounded + 1,
        r if r <= -50 => rounded - 1,
        _ => rounded,
    }
}

fn overflow() -> CoreError {
    CoreError::ValidationError("Fare is too large to price".to_string())
}

/// Formats cents as a decimal amount, e.g. `1050000` → `"10500.00"`.
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
