//! Native-currency amounts.
//!
//! Amounts are held as integer lamports (the chain's smallest unit) so that
//! matching an observed transfer against an issued amount is exact integer
//! equality. The decimal SOL rendering exists only at the API and storage
//! boundary.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::ValidationError;

/// Number of decimal places in one SOL.
pub const DECIMALS: u32 = 9;

/// An amount of the native currency, in lamports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lamports(u64);

impl Lamports {
    pub const ZERO: Self = Self(0);

    /// Lamports in one SOL.
    pub const PER_SOL: u64 = 1_000_000_000;

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Render as a fixed-point SOL string with exactly nine fractional
    /// digits, one per lamport place: `4210` renders as `"0.000004210"` and
    /// one SOL as `"1.000000000"`.
    pub fn to_decimal_string(&self) -> String {
        let whole = self.0 / Self::PER_SOL;
        let frac = self.0 % Self::PER_SOL;
        format!("{}.{:0width$}", whole, frac, width = DECIMALS as usize)
    }

    /// Parse a decimal SOL string into an exact lamport count.
    ///
    /// Rejects signs, exponents, empty components, and more than nine
    /// fractional digits: a value that cannot be represented exactly is an
    /// error, never a rounding.
    pub fn parse_decimal(s: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidField {
            field: "amount",
            reason: format!("{reason}: {s:?}"),
        };

        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("empty amount"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("not a plain decimal"));
        }
        if frac.len() > DECIMALS as usize {
            return Err(invalid("more precision than one lamport"));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("whole part out of range"))?
        };
        let mut frac_lamports: u64 = 0;
        if !frac.is_empty() {
            let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
            frac_lamports = padded
                .parse()
                .map_err(|_| invalid("fraction out of range"))?;
        }

        whole
            .checked_mul(Self::PER_SOL)
            .and_then(|w| w.checked_add(frac_lamports))
            .map(Self)
            .ok_or_else(|| invalid("amount overflows u64 lamports"))
    }
}

impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl FromStr for Lamports {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_decimal(s)
    }
}

impl Serialize for Lamports {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for Lamports {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_decimal(&s).map_err(serde::de::Error::custom)
    }
}
