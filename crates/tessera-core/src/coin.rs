// crates/tessera-core/src/coin.rs
//
// Token amounts, denominations, coins, and coin baskets.
//
// All accounting uses integer micro-units. `Amount` is unsigned, so a
// negative amount cannot be constructed; parsing one is rejected at the
// boundary. Baskets keep their denominations in a BTreeMap so iteration
// order is identical on every node.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::TesseraError;

/// Integer token amount in micro-units.
pub type Amount = u128;

/// Micro-units per whole token.
pub const MICRO_UNIT: Amount = 1_000_000;

/// Denomination of the native staking asset (micro-tessera).
pub const NATIVE_DENOM: &str = "utes";

/// Denomination of the reference currency indicators are measured in (micro-SDR).
pub const REFERENCE_DENOM: &str = "usdr";

/// Check that a denomination matches `[a-z][a-z0-9]{2,15}`.
pub fn validate_denom(denom: &str) -> Result<(), TesseraError> {
    let bytes = denom.as_bytes();
    let valid = (3..=16).contains(&bytes.len())
        && bytes[0].is_ascii_lowercase()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(TesseraError::InvalidInput(format!("invalid denom {:?}", denom)))
    }
}

/// A single amount of a single denomination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Amount,
}

impl Coin {
    /// Create a coin, validating the denomination.
    pub fn new(denom: impl Into<String>, amount: Amount) -> Result<Self, TesseraError> {
        let denom = denom.into();
        validate_denom(&denom)?;
        Ok(Self { denom, amount })
    }

    /// A coin of the native denomination.
    pub fn native(amount: Amount) -> Self {
        Self {
            denom: NATIVE_DENOM.to_string(),
            amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A basket of coins keyed by denomination.
///
/// Zero-amount entries are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(BTreeMap<String, Amount>);

impl Coins {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build a basket from a list of coins, merging duplicate denominations.
    pub fn from_coins<'a>(coins: impl IntoIterator<Item = &'a Coin>) -> Result<Self, TesseraError> {
        let mut basket = Coins::new();
        for coin in coins {
            basket.add(coin)?;
        }
        Ok(basket)
    }

    /// Add a coin to the basket.
    ///
    /// # Errors
    /// Returns `TesseraError::InvalidInput` for a malformed denom and
    /// `TesseraError::Overflow` if the running amount overflows.
    pub fn add(&mut self, coin: &Coin) -> Result<(), TesseraError> {
        validate_denom(&coin.denom)?;
        if coin.is_zero() {
            return Ok(());
        }
        let entry = self.0.entry(coin.denom.clone()).or_insert(0);
        *entry = entry.checked_add(coin.amount).ok_or_else(|| {
            TesseraError::overflow(format!("basket amount of {} overflows", coin.denom))
        })?;
        Ok(())
    }

    /// Add every coin of another basket.
    pub fn merge(&mut self, other: &Coins) -> Result<(), TesseraError> {
        for (denom, amount) in other.iter() {
            self.add(&Coin {
                denom: denom.to_string(),
                amount,
            })?;
        }
        Ok(())
    }

    /// Amount held of `denom` (zero if absent).
    pub fn amount_of(&self, denom: &str) -> Amount {
        self.0.get(denom).copied().unwrap_or(0)
    }

    /// Iterate `(denom, amount)` pairs in ascending denom order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Amount)> {
        self.0.iter().map(|(d, a)| (d.as_str(), *a))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The basket as a list of coins, in denom order.
    pub fn to_vec(&self) -> Vec<Coin> {
        self.iter()
            .map(|(denom, amount)| Coin {
                denom: denom.to_string(),
                amount,
            })
            .collect()
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(d, a)| format!("{}{}", a, d)).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_denom() {
        assert!(validate_denom("usdr").is_ok());
        assert!(validate_denom("ukrw").is_ok());
        assert!(validate_denom("u2x").is_ok());
        assert!(validate_denom("").is_err());
        assert!(validate_denom("us").is_err());
        assert!(validate_denom("USDR").is_err());
        assert!(validate_denom("1abc").is_err());
        assert!(validate_denom("abcdefghijklmnopq").is_err());
    }

    #[test]
    fn test_coin_new_rejects_bad_denom() {
        assert!(Coin::new("Bad Denom", 5).is_err());
        assert_eq!(Coin::new("usdr", 5).unwrap().to_string(), "5usdr");
    }

    #[test]
    fn test_basket_merges_duplicates() {
        let coins = vec![
            Coin::new("usdr", 10).unwrap(),
            Coin::new("ukrw", 3).unwrap(),
            Coin::new("usdr", 5).unwrap(),
        ];
        let basket = Coins::from_coins(&coins).unwrap();
        assert_eq!(basket.amount_of("usdr"), 15);
        assert_eq!(basket.amount_of("ukrw"), 3);
        assert_eq!(basket.amount_of("umnt"), 0);
        assert_eq!(basket.len(), 2);
    }

    #[test]
    fn test_basket_skips_zero() {
        let mut basket = Coins::new();
        basket.add(&Coin::new("usdr", 0).unwrap()).unwrap();
        assert!(basket.is_empty());
    }

    #[test]
    fn test_basket_iterates_in_denom_order() {
        let coins = vec![
            Coin::new("usdr", 1).unwrap(),
            Coin::new("ukrw", 2).unwrap(),
            Coin::new("umnt", 3).unwrap(),
        ];
        let basket = Coins::from_coins(&coins).unwrap();
        let denoms: Vec<&str> = basket.iter().map(|(d, _)| d).collect();
        assert_eq!(denoms, vec!["ukrw", "umnt", "usdr"]);
        assert_eq!(basket.to_string(), "2ukrw,3umnt,1usdr");
    }

    #[test]
    fn test_basket_overflow() {
        let mut basket = Coins::new();
        basket.add(&Coin::new("usdr", u128::MAX).unwrap()).unwrap();
        let result = basket.add(&Coin::new("usdr", 1).unwrap());
        assert!(matches!(result, Err(TesseraError::Overflow(_))));
    }

    #[test]
    fn test_basket_json_roundtrip_keeps_order() {
        let basket = Coins::from_coins(&[Coin::new("usdr", 7).unwrap()]).unwrap();
        let json = serde_json::to_string(&basket).unwrap();
        assert_eq!(json, "{\"usdr\":7}");
        let back: Coins = serde_json::from_str(&json).unwrap();
        assert_eq!(back, basket);
    }
}
