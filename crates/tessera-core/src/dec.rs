// crates/tessera-core/src/dec.rs
//
// Signed fixed-point decimal used for every rate, weight, and indicator.
//
// A `Dec` is an i128 mantissa scaled by 10^18. Multiplication and division
// widen to 256 bits and round half-to-even at the 18th fractional digit, so
// every node computes bit-identical results. There is no binary floating
// point anywhere in the treasury.

use primitive_types::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::coin::Amount;
use crate::error::TesseraError;

/// Number of fractional decimal digits carried by a `Dec`.
pub const DEC_PRECISION: u32 = 18;

/// 10^18, the scale of the mantissa.
const PRECISION_MULTIPLIER: i128 = 1_000_000_000_000_000_000;

/// Fixed-point decimal with 18 fractional digits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Dec(i128);

impl Dec {
    /// Zero.
    pub const ZERO: Dec = Dec(0);

    /// One.
    pub const ONE: Dec = Dec(PRECISION_MULTIPLIER);

    /// Largest whole amount `from_amount` accepts.
    pub const MAX_AMOUNT: Amount = (i128::MAX / PRECISION_MULTIPLIER) as Amount;

    /// Returns zero.
    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// Returns one.
    pub const fn one() -> Self {
        Self::ONE
    }

    /// Create `value * 10^-prec`, e.g. `Dec::with_prec(25, 5)` is 0.00025.
    ///
    /// # Panics
    /// Panics if `prec` is greater than 18. Intended for constants.
    pub const fn with_prec(value: i64, prec: u32) -> Self {
        Dec(value as i128 * 10i128.pow(DEC_PRECISION - prec))
    }

    /// Create a decimal from a whole number.
    pub const fn from_int(value: i64) -> Self {
        Dec(value as i128 * PRECISION_MULTIPLIER)
    }

    /// Create a decimal from a token amount.
    pub fn from_amount(amount: Amount) -> Result<Self, TesseraError> {
        i128::try_from(amount)
            .ok()
            .and_then(|v| v.checked_mul(PRECISION_MULTIPLIER))
            .map(Dec)
            .ok_or_else(|| TesseraError::overflow(format!("amount {} does not fit a Dec", amount)))
    }

    /// The raw scaled mantissa.
    pub const fn raw(&self) -> i128 {
        self.0
    }

    /// Build a decimal from a raw scaled mantissa.
    pub const fn from_raw(raw: i128) -> Self {
        Dec(raw)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, rhs: Dec) -> Result<Dec, TesseraError> {
        self.0
            .checked_add(rhs.0)
            .map(Dec)
            .ok_or_else(|| TesseraError::overflow(format!("{} + {}", self, rhs)))
    }

    pub fn checked_sub(self, rhs: Dec) -> Result<Dec, TesseraError> {
        self.0
            .checked_sub(rhs.0)
            .map(Dec)
            .ok_or_else(|| TesseraError::overflow(format!("{} - {}", self, rhs)))
    }

    /// Multiply two decimals, rounding half-to-even at the 18th digit.
    pub fn checked_mul(self, rhs: Dec) -> Result<Dec, TesseraError> {
        let negative = (self.0 < 0) != (rhs.0 < 0);
        // |a| * |b| < 2^254, always fits in 256 bits.
        let product = U256::from(self.0.unsigned_abs()) * U256::from(rhs.0.unsigned_abs());
        let scaled = round_half_even(product, U256::from(PRECISION_MULTIPLIER as u128));
        to_signed(scaled, negative).map_err(|_| TesseraError::overflow(format!("{} * {}", self, rhs)))
    }

    /// Divide two decimals, rounding half-to-even at the 18th digit.
    ///
    /// # Errors
    /// Returns `TesseraError::InvalidState` on division by zero and
    /// `TesseraError::Overflow` if the quotient does not fit.
    pub fn checked_quo(self, rhs: Dec) -> Result<Dec, TesseraError> {
        if rhs.is_zero() {
            return Err(TesseraError::InvalidState(format!("division of {} by zero", self)));
        }
        let negative = (self.0 < 0) != (rhs.0 < 0);
        let numerator =
            U256::from(self.0.unsigned_abs()) * U256::from(PRECISION_MULTIPLIER as u128);
        let quotient = round_half_even(numerator, U256::from(rhs.0.unsigned_abs()));
        to_signed(quotient, negative).map_err(|_| TesseraError::overflow(format!("{} / {}", self, rhs)))
    }

    /// Multiply by an integer amount. Exact, no rounding.
    pub fn mul_int(self, amount: Amount) -> Result<Dec, TesseraError> {
        let product = U256::from(self.0.unsigned_abs()) * U256::from(amount);
        to_signed(product, self.0 < 0)
            .map_err(|_| TesseraError::overflow(format!("{} * {}", self, amount)))
    }

    /// `floor(self * amount)` as an amount. The product is never narrowed to
    /// a `Dec`, so any `Amount` can be scaled by a fraction.
    ///
    /// # Errors
    /// Returns `TesseraError::InvalidState` for negative values and
    /// `TesseraError::Overflow` if the result exceeds `Amount`.
    pub fn mul_amount_floor(self, amount: Amount) -> Result<Amount, TesseraError> {
        if self.0 < 0 {
            return Err(TesseraError::InvalidState(format!(
                "negative decimal {} cannot scale an amount",
                self
            )));
        }
        let product = U256::from(self.0 as u128) * U256::from(amount)
            / U256::from(PRECISION_MULTIPLIER as u128);
        if product > U256::from(Amount::MAX) {
            return Err(TesseraError::overflow(format!("{} * {}", self, amount)));
        }
        Ok(product.low_u128())
    }

    /// Divide by an integer amount, rounding half-to-even.
    pub fn quo_int(self, amount: Amount) -> Result<Dec, TesseraError> {
        if amount == 0 {
            return Err(TesseraError::InvalidState(format!("division of {} by zero", self)));
        }
        let quotient = round_half_even(U256::from(self.0.unsigned_abs()), U256::from(amount));
        to_signed(quotient, self.0 < 0)
    }

    /// Drop the fractional part and return the integer amount.
    ///
    /// # Errors
    /// Returns `TesseraError::InvalidState` for negative values, which have no
    /// amount representation.
    pub fn truncate_to_amount(self) -> Result<Amount, TesseraError> {
        if self.0 < 0 {
            return Err(TesseraError::InvalidState(format!(
                "negative decimal {} cannot be converted to an amount",
                self
            )));
        }
        Ok((self.0 / PRECISION_MULTIPLIER) as Amount)
    }

    pub fn abs(self) -> Dec {
        Dec(self.0.abs())
    }
}

/// `num / den` rounded half-to-even.
fn round_half_even(num: U256, den: U256) -> U256 {
    let quotient = num / den;
    let remainder = num % den;
    // remainder < den <= 2^128, so doubling cannot overflow.
    match (remainder << 1).cmp(&den) {
        Ordering::Greater => quotient + U256::one(),
        Ordering::Equal if quotient.low_u64() & 1 == 1 => quotient + U256::one(),
        _ => quotient,
    }
}

fn to_signed(magnitude: U256, negative: bool) -> Result<Dec, TesseraError> {
    if magnitude > U256::from(i128::MAX as u128) {
        return Err(TesseraError::overflow("decimal magnitude exceeds 128 bits"));
    }
    let value = magnitude.low_u128() as i128;
    Ok(Dec(if negative { -value } else { value }))
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.0.unsigned_abs();
        let multiplier = PRECISION_MULTIPLIER as u128;
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:018}",
            sign,
            magnitude / multiplier,
            magnitude % multiplier
        )
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({})", self)
    }
}

impl FromStr for Dec {
    type Err = TesseraError;

    /// Parse a decimal string such as `"0.001"`, `"-12"`, or `"1.070000000000000000"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TesseraError::InvalidInput(format!("invalid decimal string {:?}", s));

        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) || body.ends_with('.') {
            return Err(invalid());
        }
        if frac_part.len() > DEC_PRECISION as usize {
            return Err(TesseraError::InvalidInput(format!(
                "decimal {:?} has more than {} fractional digits",
                s, DEC_PRECISION
            )));
        }

        let whole: i128 = int_part.parse().map_err(|_| invalid())?;
        let mut frac: i128 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| invalid())?
        };
        frac *= 10i128.pow(DEC_PRECISION - frac_part.len() as u32);

        let magnitude = whole
            .checked_mul(PRECISION_MULTIPLIER)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(|| TesseraError::overflow(format!("decimal {:?} out of range", s)))?;
        Ok(Dec(if negative { -magnitude } else { magnitude }))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Dec::from_str(&s).map_err(de::Error::custom)
    }
}
