//! Desired-state fingerprinting.
//!
//! A deterministic SHA-256 over the normalized desired state, so a run
//! report can be tied to the exact input it reconciled.

use alloy::primitives::U256;
use sha2::{Digest, Sha256};

use super::desired::{DesiredState, InitReserveInput};

/// Hasher for computing desired-state fingerprints.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a desired state.
    ///
    /// Absent fields hash differently from present ones, so "leave as-is"
    /// and "set to zero" never collide.
    #[must_use]
    pub fn hash_desired(&self, desired: &DesiredState) -> String {
        let mut hasher = Sha256::new();

        hasher.update(desired.asset);
        match desired.price_feed {
            Some(feed) => {
                hasher.update([1u8]);
                hasher.update(feed);
            }
            None => hasher.update([0u8]),
        }

        let risk = &desired.risk;
        for value in [
            risk.ltv,
            risk.liquidation_threshold,
            risk.liquidation_bonus,
            risk.reserve_factor,
            risk.borrow_cap,
            risk.supply_cap,
            risk.liquidation_protocol_fee,
            risk.debt_ceiling,
        ] {
            Self::update_uint(&mut hasher, value);
        }
        for flag in [
            risk.borrowing_enabled,
            risk.flashloan_enabled,
            risk.active,
            risk.frozen,
        ] {
            hasher.update([match flag {
                None => 0u8,
                Some(false) => 1,
                Some(true) => 2,
            }]);
        }

        if let Some(input) = &desired.init_reserve {
            hasher.update(self.hash_init_reserve(input).as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a hash of the reserve-initialization block.
    #[must_use]
    pub fn hash_init_reserve(&self, input: &InitReserveInput) -> String {
        let mut hasher = Sha256::new();

        hasher.update(input.a_token_impl);
        hasher.update(input.variable_debt_token_impl);
        hasher.update(input.underlying_asset);
        for text in [
            &input.a_token_name,
            &input.a_token_symbol,
            &input.variable_debt_token_name,
            &input.variable_debt_token_symbol,
        ] {
            // Length prefix keeps adjacent strings unambiguous.
            hasher.update((text.len() as u64).to_be_bytes());
            hasher.update(text.as_bytes());
        }
        hasher.update((input.params.len() as u64).to_be_bytes());
        hasher.update(&input.params);
        hasher.update((input.interest_rate_data.len() as u64).to_be_bytes());
        hasher.update(&input.interest_rate_data);

        hex::encode(hasher.finalize())
    }

    /// Returns a short version of a hash (first 8 characters).
    #[must_use]
    pub fn short_hash(hash: &str) -> &str {
        &hash[..8.min(hash.len())]
    }

    fn update_uint(hasher: &mut Sha256, value: Option<U256>) {
        match value {
            Some(v) => {
                hasher.update([1u8]);
                hasher.update(v.to_be_bytes::<32>());
            }
            None => hasher.update([0u8]),
        }
    }
}
