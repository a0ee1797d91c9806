//! Amounts are held as integer cents and cross the wire as major-unit
//! decimals (`10500.0` for `1_050_000`).

use serde::{de, Deserialize, Deserializer, Serializer};

use crate::{CoreError, CoreResult};

/// Largest amount accepted for a fare or quoted price: 1,000,000,000.00.
pub const MAX_AMOUNT: i64 = 100_000_000_000;

// Beyond this the f64 no longer holds every cent exactly.
const MAX_WIRE_CENTS: f64 = 9_000_000_000_000_000.0;

/// Rejects negative amounts and amounts above [`MAX_AMOUNT`].
pub fn ensure_amount(cents: i64, what: &str) -> CoreResult<()> {
    if cents < 0 {
        return Err(CoreError::ValidationError(format!("{} cannot be negative", what)));
    }
    if cents > MAX_AMOUNT {
        return Err(CoreError::ValidationError(format!(
            "{} cannot exceed {}.00",
            what,
            MAX_AMOUNT / 100
        )));
    }
    Ok(())
}

pub fn to_major(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Rounds to the nearest cent. Fails on NaN, infinities and values no
/// amount could reach.
pub fn from_major(value: f64) -> Option<i64> {
    let cents = (value * 100.0).round();
    if !cents.is_finite() || cents.abs() > MAX_WIRE_CENTS {
        return None;
    }
    Some(cents as i64)
}

/// `#[serde(with = "money::major_units")]` for `i64` cent fields.
pub mod major_units {
    use super::*;

    pub fn serialize<S: Serializer>(cents: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(to_major(*cents))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let value = f64::deserialize(deserializer)?;
        from_major(value).ok_or_else(|| de::Error::custom("amount out of range"))
    }
}

/// `#[serde(with = "money::option_major_units", default)]` for optional cents.
pub mod option_major_units {
    use super::*;

    pub fn serialize<S: Serializer>(cents: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match cents {
            Some(c) => serializer.serialize_some(&to_major(*c)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        match Option::<f64>::deserialize(deserializer)? {
            Some(value) => from_major(value)
                .map(Some)
                .ok_or_else(|| de::Error::custom("amount out of range")),
            None => Ok(None),
        }
    }
}
