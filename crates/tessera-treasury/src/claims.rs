// crates/tessera-treasury/src/claims.rs
//
// The claim ledger: weighted entitlements to a share of the next settlement,
// keyed by (class, beneficiary).
//
// Claims are stored under `claim:{class}:{account_hex}`, so a prefix scan
// yields them ordered by class tag then beneficiary. Settlement relies on
// that order being identical on every node.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use tessera_core::account::AccountId;
use tessera_core::dec::Dec;
use tessera_core::error::TesseraError;
use tessera_core::traits::KvStore;

use crate::keeper::{Keeper, CLAIM_PREFIX};

/// The subsystem that generated a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimClass {
    /// Oracle voting rewards.
    Oracle,
    /// Budget program grants.
    Budget,
}

impl ClaimClass {
    /// Every class, in key order.
    pub const ALL: [ClaimClass; 2] = [ClaimClass::Budget, ClaimClass::Oracle];

    /// Stable tag used in store keys.
    pub fn tag(&self) -> &'static str {
        match self {
            ClaimClass::Oracle => "oracle",
            ClaimClass::Budget => "budget",
        }
    }
}

impl fmt::Display for ClaimClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ClaimClass {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oracle" => Ok(ClaimClass::Oracle),
            "budget" => Ok(ClaimClass::Budget),
            other => Err(TesseraError::InvalidInput(format!("unknown claim class {:?}", other))),
        }
    }
}

/// A pending weighted entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub class: ClaimClass,
    pub beneficiary: AccountId,
    pub weight: Dec,
}

impl Claim {
    pub fn new(class: ClaimClass, beneficiary: AccountId, weight: Dec) -> Self {
        Self {
            class,
            beneficiary,
            weight,
        }
    }

    fn key(class: ClaimClass, beneficiary: &AccountId) -> String {
        format!("{}{}:{}", CLAIM_PREFIX, class.tag(), beneficiary.to_hex())
    }
}

impl<S: KvStore> Keeper<S> {
    /// Add `weight` to the claim of `(class, beneficiary)`, creating it if absent.
    ///
    /// # Errors
    /// Returns `TesseraError::InvalidInput` for a negative weight; the ledger
    /// is left unchanged.
    pub fn add_claim(
        &mut self,
        class: ClaimClass,
        beneficiary: &AccountId,
        weight: Dec,
    ) -> Result<(), TesseraError> {
        if weight.is_negative() {
            warn!(%class, %beneficiary, %weight, "Rejected negative claim weight");
            return Err(TesseraError::InvalidInput(format!(
                "claim weight must not be negative: {}",
                weight
            )));
        }
        let key = Claim::key(class, beneficiary);
        let total = match self.get_json::<Claim>(&key)? {
            Some(existing) => existing.weight.checked_add(weight)?,
            None => weight,
        };
        self.put_json(&key, &Claim::new(class, *beneficiary, total))
    }

    /// The claim of `(class, beneficiary)`, if any.
    pub fn claim(&self, class: ClaimClass, beneficiary: &AccountId) -> Result<Option<Claim>, TesseraError> {
        self.get_json(&Claim::key(class, beneficiary))
    }

    /// Visit every claim in key order. The visitor may abort with an error.
    pub fn iterate_claims<F>(&self, mut visitor: F) -> Result<(), TesseraError>
    where
        F: FnMut(&Claim) -> Result<(), TesseraError>,
    {
        for (_, claim) in self.scan_json::<Claim>(CLAIM_PREFIX)? {
            visitor(&claim)?;
        }
        Ok(())
    }

    /// Every claim in key order.
    pub fn claims(&self) -> Result<Vec<Claim>, TesseraError> {
        let mut claims = Vec::new();
        self.iterate_claims(|claim| {
            claims.push(claim.clone());
            Ok(())
        })?;
        Ok(claims)
    }

    /// Delete every claim. Returns how many were removed.
    pub fn clear_claims(&mut self) -> Result<usize, TesseraError> {
        let keys: Vec<Vec<u8>> = self
            .store()
            .prefix_scan(CLAIM_PREFIX.as_bytes())?
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        let count = keys.len();
        for key in keys {
            let key = String::from_utf8(key)
                .map_err(|e| TesseraError::Serialization(format!("non-UTF-8 claim key: {}", e)))?;
            self.delete_key(&key)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_store::MemStore;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    fn account(byte: u8) -> AccountId {
        AccountId::new([byte; 20])
    }

    #[test]
    fn test_class_tags_roundtrip() {
        for class in ClaimClass::ALL {
            assert_eq!(class.tag().parse::<ClaimClass>().unwrap(), class);
        }
        assert!("grant".parse::<ClaimClass>().is_err());
    }

    #[test]
    fn test_add_claim_accumulates() {
        let mut keeper = Keeper::new(MemStore::new());
        keeper.add_claim(ClaimClass::Oracle, &account(1), dec("10")).unwrap();
        keeper.add_claim(ClaimClass::Oracle, &account(1), dec("5")).unwrap();
        keeper.add_claim(ClaimClass::Budget, &account(1), dec("2")).unwrap();

        let oracle = keeper.claim(ClaimClass::Oracle, &account(1)).unwrap().unwrap();
        assert_eq!(oracle.weight, dec("15"));
        let budget = keeper.claim(ClaimClass::Budget, &account(1)).unwrap().unwrap();
        assert_eq!(budget.weight, dec("2"));
        assert_eq!(keeper.claims().unwrap().len(), 2);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut keeper = Keeper::new(MemStore::new());
        keeper.add_claim(ClaimClass::Oracle, &account(1), dec("3")).unwrap();
        let result = keeper.add_claim(ClaimClass::Oracle, &account(1), dec("-1"));
        assert!(matches!(result, Err(TesseraError::InvalidInput(_))));
        let claim = keeper.claim(ClaimClass::Oracle, &account(1)).unwrap().unwrap();
        assert_eq!(claim.weight, dec("3"));
    }

    #[test]
    fn test_iteration_order_is_class_then_beneficiary() {
        let mut keeper = Keeper::new(MemStore::new());
        keeper.add_claim(ClaimClass::Oracle, &account(9), dec("1")).unwrap();
        keeper.add_claim(ClaimClass::Budget, &account(5), dec("1")).unwrap();
        keeper.add_claim(ClaimClass::Oracle, &account(2), dec("1")).unwrap();
        keeper.add_claim(ClaimClass::Budget, &account(3), dec("1")).unwrap();

        let order: Vec<(ClaimClass, AccountId)> = keeper
            .claims()
            .unwrap()
            .into_iter()
            .map(|c| (c.class, c.beneficiary))
            .collect();
        assert_eq!(
            order,
            vec![
                (ClaimClass::Budget, account(3)),
                (ClaimClass::Budget, account(5)),
                (ClaimClass::Oracle, account(2)),
                (ClaimClass::Oracle, account(9)),
            ]
        );
    }

    #[test]
    fn test_visitor_error_aborts_iteration() {
        let mut keeper = Keeper::new(MemStore::new());
        keeper.add_claim(ClaimClass::Budget, &account(1), dec("1")).unwrap();
        keeper.add_claim(ClaimClass::Budget, &account(2), dec("1")).unwrap();
        let mut seen = 0;
        let result = keeper.iterate_claims(|_| {
            seen += 1;
            Err(TesseraError::InvalidState("stop".into()))
        });
        assert!(result.is_err());
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_clear_claims() {
        let mut keeper = Keeper::new(MemStore::new());
        keeper.add_claim(ClaimClass::Oracle, &account(1), dec("1")).unwrap();
        keeper.add_claim(ClaimClass::Budget, &account(2), dec("1")).unwrap();
        keeper.set_income_pool(5).unwrap();
        assert_eq!(keeper.clear_claims().unwrap(), 2);
        assert!(keeper.claims().unwrap().is_empty());
        assert_eq!(keeper.income_pool().unwrap(), 5);
    }
}
