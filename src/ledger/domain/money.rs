use std::{fmt, iter::Sum, ops};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The number of decimal places carried by every amount.
const MINOR_UNITS: usize = 2;

/// A monetary amount in a single implied currency.
///
/// The amount is always stored as a whole number of minor units so that we
/// do not have to deal with floating point precision errors.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct Money(i64);

#[derive(Debug, Error, Eq, PartialEq)]
pub enum MoneyParseError {
    /// The provided amount could not be parsed as a number.
    #[error("{0:?} is not a numeric amount")]
    InvalidNumber(String),

    /// The provided amount included more precision than the minor units
    /// allow for.
    #[error("amount has {0} decimal places but only {units} are allowed", units = MINOR_UNITS)]
    TooManyDecimals(usize),
}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Build an amount from a whole number of minor units.
    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Parse an amount from a string representation.
    ///
    /// # Arguments
    /// * `raw` - A string containing a numeric amount. This can include
    ///   whitespace and thousands separators.
    ///
    /// # Returns
    ///
    /// The parsed amount as an integer in minor units.
    pub fn parse(raw: &str) -> Result<Self, MoneyParseError> {
        let cleaned = raw.replace(',', "").replace(' ', "");

        let number_to_parse = match cleaned.rsplit_once('.') {
            // The number has no decimals, so pad it with the full number of
            // minor unit zeroes.
            None => format!("{}{}", cleaned, "0".repeat(MINOR_UNITS)),

            // The number includes a decimal component, so validate that it
            // does not contain too many decimal places.
            Some((whole_part, decimal_part)) => {
                if decimal_part.len() <= MINOR_UNITS {
                    format!("{}{:0<width$}", whole_part, decimal_part, width = MINOR_UNITS)
                } else {
                    return Err(MoneyParseError::TooManyDecimals(decimal_part.len()));
                }
            }
        };

        number_to_parse
            .parse()
            .map(Self)
            .map_err(|_| MoneyParseError::InvalidNumber(raw.to_owned()))
    }

    pub fn minor(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Split the amount evenly into `parts` shares.
    ///
    /// Integer division can lose minor units, so the remainder is handed
    /// out one unit at a time starting with the first share. The returned
    /// shares always sum to exactly the original amount.
    pub fn split_even(self, parts: usize) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }

        let count = parts as i64;
        let base = self.0.div_euclid(count);
        let remainder = self.0.rem_euclid(count) as usize;

        (0..parts)
            .map(|index| Money(base + i64::from(index < remainder)))
            .collect()
    }

    /// Render the amount with a leading dollar sign for user-facing text.
    pub fn format_dollars(self) -> String {
        if self.0.is_negative() {
            format!("-${}", Money(self.0.abs()))
        } else {
            format!("${}", self)
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Preserve the sign, but do the string manipulation on the absolute
        // value so the padding does not have to account for a negative sign.
        let sign = if self.0.is_negative() { "-" } else { "" };
        let digits = self.0.abs().to_string();

        // Pad the value so the string is always long enough to insert the
        // decimal point.
        let padded = format!("{:0>width$}", digits, width = MINOR_UNITS + 1);
        let decimal_location = padded.len() - MINOR_UNITS;

        write!(
            f,
            "{}{}.{}",
            sign,
            &padded[..decimal_location],
            &padded[decimal_location..]
        )
    }
}

impl ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, ops::Add::add)
    }
}
