use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};

use crate::domain::Error;

/// A validated, positive monetary amount.
///
/// Every amount entering the engine passes through here, so the operations
/// themselves never see zero, negative, or non-numeric values. Amounts are
/// normalized to two decimal places with banker's rounding (round half to
/// even), matching how they are displayed in confirmation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    pub const DECIMALS: u32 = 2;

    pub fn new(value: Decimal) -> Result<Self, Error> {
        if value <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "amount must be positive, got {}",
                value
            )));
        }
        Ok(Self(value.round_dp_with_strategy(
            Self::DECIMALS,
            RoundingStrategy::MidpointNearestEven,
        )))
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        let value: Decimal = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidAmount(format!("not a number: {:?}", s)))?;
        Self::new(value)
    }

    pub fn get(&self) -> Decimal {
        self.0
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::parse(&s).map_err(serde::de::Error::custom)
    }
}
