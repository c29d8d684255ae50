//! Strongly-typed desired state for one market.
//!
//! Produced by the [`ConfigNormalizer`](super::ConfigNormalizer) from an
//! untyped JSON document. Every risk field is optional: `None` means
//! "leave as-is" and is never compared.

use alloy::primitives::{Address, Bytes, U256};

/// Desired configuration of one market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    /// The market's underlying asset.
    pub asset: Address,
    /// Oracle price source for the asset.
    pub price_feed: Option<Address>,
    /// Risk parameters, caps and flags.
    pub risk: RiskConfig,
    /// Reserve initialization parameters (listing only).
    pub init_reserve: Option<InitReserveInput>,
}

/// Risk parameters, caps and flags of a market.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskConfig {
    /// Loan-to-value, in basis points.
    pub ltv: Option<U256>,
    /// Liquidation threshold, in basis points.
    pub liquidation_threshold: Option<U256>,
    /// Liquidation bonus, in basis points.
    pub liquidation_bonus: Option<U256>,
    /// Reserve factor, in basis points.
    pub reserve_factor: Option<U256>,
    /// Borrow cap in whole tokens, zero meaning unlimited.
    pub borrow_cap: Option<U256>,
    /// Supply cap in whole tokens, zero meaning unlimited.
    pub supply_cap: Option<U256>,
    /// Liquidation protocol fee, in basis points.
    pub liquidation_protocol_fee: Option<U256>,
    /// Isolation-mode debt ceiling.
    pub debt_ceiling: Option<U256>,
    /// Whether borrowing is enabled.
    pub borrowing_enabled: Option<bool>,
    /// Whether flash loans are enabled.
    pub flashloan_enabled: Option<bool>,
    /// Whether the reserve is active.
    pub active: Option<bool>,
    /// Whether the reserve is frozen.
    pub frozen: Option<bool>,
}

impl RiskConfig {
    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parameters of the reserve-initialization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReserveInput {
    /// aToken implementation.
    pub a_token_impl: Address,
    /// Variable debt token implementation.
    pub variable_debt_token_impl: Address,
    /// Underlying asset; always equal to the desired asset.
    pub underlying_asset: Address,
    /// aToken name.
    pub a_token_name: String,
    /// aToken symbol.
    pub a_token_symbol: String,
    /// Variable debt token name.
    pub variable_debt_token_name: String,
    /// Variable debt token symbol.
    pub variable_debt_token_symbol: String,
    /// Opaque initialization params.
    pub params: Bytes,
    /// Encoded interest rate data.
    pub interest_rate_data: Bytes,
}

impl DesiredState {
    /// Creates a desired state for `asset` with nothing else set.
    #[must_use]
    pub fn for_asset(asset: Address) -> Self {
        Self {
            asset,
            price_feed: None,
            risk: RiskConfig::default(),
            init_reserve: None,
        }
    }

    /// Sets the desired price feed.
    #[must_use]
    pub const fn with_price_feed(mut self, feed: Address) -> Self {
        self.price_feed = Some(feed);
        self
    }

    /// Sets the desired risk configuration.
    #[must_use]
    pub fn with_risk(mut self, risk: RiskConfig) -> Self {
        self.risk = risk;
        self
    }

    /// Returns true if no comparable field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.price_feed.is_none() && self.risk.is_empty()
    }
}
