//! The session handle to the remote contract system.
//!
//! [`MarketGateway`] is passed explicitly to everything that talks to the
//! chain: the state reader, the action phases and the runner. Production
//! code uses [`ChainGateway`](super::ChainGateway); tests use an in-memory
//! fake.

use std::fmt;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::config::InitReserveInput;
use crate::error::RemoteResult;

/// Raw reserve configuration as reported by the data provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReserveConfiguration {
    /// Token decimals.
    pub decimals: U256,
    /// Loan-to-value.
    pub ltv: U256,
    /// Liquidation threshold.
    pub liquidation_threshold: U256,
    /// Liquidation bonus.
    pub liquidation_bonus: U256,
    /// Reserve factor.
    pub reserve_factor: U256,
    /// Whether the asset can be used as collateral.
    pub usage_as_collateral_enabled: bool,
    /// Whether borrowing is enabled.
    pub borrowing_enabled: bool,
    /// Whether stable-rate borrowing is enabled.
    pub stable_borrow_rate_enabled: bool,
    /// Whether the reserve is active.
    pub is_active: bool,
    /// Whether the reserve is frozen.
    pub is_frozen: bool,
}

/// Borrow and supply caps of a reserve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReserveCaps {
    /// Borrow cap.
    pub borrow_cap: U256,
    /// Supply cap.
    pub supply_cap: U256,
}

/// Token contracts of a reserve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReserveTokens {
    /// aToken.
    pub a_token: Address,
    /// Stable debt token.
    pub stable_debt_token: Address,
    /// Variable debt token.
    pub variable_debt_token: Address,
}

/// A state-changing remote operation, with its exact arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// `AaveOracle.setAssetSources([asset], [source])`.
    SetAssetSource {
        /// Asset.
        asset: Address,
        /// New price source.
        source: Address,
    },
    /// `PoolConfigurator.initReserves([input])`.
    InitReserve {
        /// Initialization parameters.
        input: Box<InitReserveInput>,
    },
    /// `PoolConfigurator.dropReserve(asset)`.
    DropReserve {
        /// Asset.
        asset: Address,
    },
    /// `PoolConfigurator.setReserveActive(asset, active)`.
    SetReserveActive {
        /// Asset.
        asset: Address,
        /// New flag.
        active: bool,
    },
    /// `PoolConfigurator.setReserveFreeze(asset, freeze)`.
    SetReserveFreeze {
        /// Asset.
        asset: Address,
        /// New flag.
        frozen: bool,
    },
    /// `PoolConfigurator.setReserveBorrowing(asset, enabled)`.
    SetReserveBorrowing {
        /// Asset.
        asset: Address,
        /// New flag.
        enabled: bool,
    },
    /// `PoolConfigurator.configureReserveAsCollateral(asset, ltv, threshold, bonus)`.
    ConfigureCollateral {
        /// Asset.
        asset: Address,
        /// Loan-to-value.
        ltv: U256,
        /// Liquidation threshold.
        liquidation_threshold: U256,
        /// Liquidation bonus.
        liquidation_bonus: U256,
    },
    /// `PoolConfigurator.setReserveFactor(asset, factor)`.
    SetReserveFactor {
        /// Asset.
        asset: Address,
        /// New value.
        value: U256,
    },
    /// `PoolConfigurator.setBorrowCap(asset, cap)`.
    SetBorrowCap {
        /// Asset.
        asset: Address,
        /// New value.
        value: U256,
    },
    /// `PoolConfigurator.setSupplyCap(asset, cap)`.
    SetSupplyCap {
        /// Asset.
        asset: Address,
        /// New value.
        value: U256,
    },
    /// `PoolConfigurator.setLiquidationProtocolFee(asset, fee)`.
    SetLiquidationProtocolFee {
        /// Asset.
        asset: Address,
        /// New value.
        value: U256,
    },
    /// `PoolConfigurator.setReserveFlashLoaning(asset, enabled)`.
    SetReserveFlashLoaning {
        /// Asset.
        asset: Address,
        /// New flag.
        enabled: bool,
    },
    /// `PoolConfigurator.setDebtCeiling(asset, ceiling)`.
    SetDebtCeiling {
        /// Asset.
        asset: Address,
        /// New value.
        value: U256,
    },
}

impl Mutation {
    /// Returns the remote function name.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::SetAssetSource { .. } => "setAssetSources",
            Self::InitReserve { .. } => "initReserves",
            Self::DropReserve { .. } => "dropReserve",
            Self::SetReserveActive { .. } => "setReserveActive",
            Self::SetReserveFreeze { .. } => "setReserveFreeze",
            Self::SetReserveBorrowing { .. } => "setReserveBorrowing",
            Self::ConfigureCollateral { .. } => "configureReserveAsCollateral",
            Self::SetReserveFactor { .. } => "setReserveFactor",
            Self::SetBorrowCap { .. } => "setBorrowCap",
            Self::SetSupplyCap { .. } => "setSupplyCap",
            Self::SetLiquidationProtocolFee { .. } => "setLiquidationProtocolFee",
            Self::SetReserveFlashLoaning { .. } => "setReserveFlashLoaning",
            Self::SetDebtCeiling { .. } => "setDebtCeiling",
        }
    }

    /// Returns the asset the mutation applies to.
    #[must_use]
    pub fn asset(&self) -> Address {
        match self {
            Self::InitReserve { input } => input.underlying_asset,
            Self::SetAssetSource { asset, .. }
            | Self::DropReserve { asset }
            | Self::SetReserveActive { asset, .. }
            | Self::SetReserveFreeze { asset, .. }
            | Self::SetReserveBorrowing { asset, .. }
            | Self::ConfigureCollateral { asset, .. }
            | Self::SetReserveFactor { asset, .. }
            | Self::SetBorrowCap { asset, .. }
            | Self::SetSupplyCap { asset, .. }
            | Self::SetLiquidationProtocolFee { asset, .. }
            | Self::SetReserveFlashLoaning { asset, .. }
            | Self::SetDebtCeiling { asset, .. } => *asset,
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.operation();
        match self {
            Self::SetAssetSource { asset, source } => write!(f, "{op}([{asset}], [{source}])"),
            Self::InitReserve { input } => write!(
                f,
                "{op}([{} / {} / {}])",
                input.underlying_asset, input.a_token_symbol, input.variable_debt_token_symbol
            ),
            Self::DropReserve { asset } => write!(f, "{op}({asset})"),
            Self::SetReserveActive { asset, active: flag }
            | Self::SetReserveFreeze { asset, frozen: flag }
            | Self::SetReserveBorrowing { asset, enabled: flag }
            | Self::SetReserveFlashLoaning { asset, enabled: flag } => {
                write!(f, "{op}({asset}, {flag})")
            }
            Self::ConfigureCollateral {
                asset,
                ltv,
                liquidation_threshold,
                liquidation_bonus,
            } => write!(
                f,
                "{op}({asset}, {ltv}, {liquidation_threshold}, {liquidation_bonus})"
            ),
            Self::SetReserveFactor { asset, value }
            | Self::SetBorrowCap { asset, value }
            | Self::SetSupplyCap { asset, value }
            | Self::SetLiquidationProtocolFee { asset, value }
            | Self::SetDebtCeiling { asset, value } => write!(f, "{op}({asset}, {value})"),
        }
    }
}

/// Session handle to the pool, configurator, oracle, ACL manager and data provider.
///
/// Every method is a single remote call. Reads never mutate; `simulate`
/// executes a mutation read-only from the acting identity, `send` submits
/// it and waits for a successful receipt.
#[async_trait]
pub trait MarketGateway: Send + Sync {
    /// Lists the assets of every listed reserve.
    async fn reserves_list(&self) -> RemoteResult<Vec<Address>>;

    /// Reads the reserve's risk and flag configuration.
    async fn reserve_configuration(&self, asset: Address) -> RemoteResult<ReserveConfiguration>;

    /// Reads the reserve's caps.
    async fn reserve_caps(&self, asset: Address) -> RemoteResult<ReserveCaps>;

    /// Reads the reserve's liquidation protocol fee.
    async fn liquidation_protocol_fee(&self, asset: Address) -> RemoteResult<U256>;

    /// Reads whether flash loans are enabled.
    async fn flash_loan_enabled(&self, asset: Address) -> RemoteResult<bool>;

    /// Reads the reserve's debt ceiling.
    async fn debt_ceiling(&self, asset: Address) -> RemoteResult<U256>;

    /// Reads whether the reserve is paused.
    async fn paused(&self, asset: Address) -> RemoteResult<bool>;

    /// Reads the aToken total supply.
    async fn a_token_total_supply(&self, asset: Address) -> RemoteResult<U256>;

    /// Reads the reserve's total debt.
    async fn total_debt(&self, asset: Address) -> RemoteResult<U256>;

    /// Reads the reserve's token contracts.
    async fn reserve_tokens(&self, asset: Address) -> RemoteResult<ReserveTokens>;

    /// Reads the reserve's interest rate strategy.
    async fn interest_rate_strategy(&self, asset: Address) -> RemoteResult<Address>;

    /// Reads the asset's oracle price source.
    async fn source_of_asset(&self, asset: Address) -> RemoteResult<Address>;

    /// Reads the asset's oracle price.
    async fn asset_price(&self, asset: Address) -> RemoteResult<U256>;

    /// Reads an ERC-20 symbol.
    async fn token_symbol(&self, token: Address) -> RemoteResult<String>;

    /// Reads an ERC-20 name.
    async fn token_name(&self, token: Address) -> RemoteResult<String>;

    /// Reads ERC-20 decimals.
    async fn token_decimals(&self, token: Address) -> RemoteResult<u8>;

    /// Checks the pool-admin role.
    async fn is_pool_admin(&self, account: Address) -> RemoteResult<bool>;

    /// Checks the risk-admin role.
    async fn is_risk_admin(&self, account: Address) -> RemoteResult<bool>;

    /// Checks the asset-listing-admin role.
    async fn is_asset_listing_admin(&self, account: Address) -> RemoteResult<bool>;

    /// Executes the mutation read-only; surfaces the rejection reason verbatim.
    async fn simulate(&self, mutation: &Mutation) -> RemoteResult<()>;

    /// Submits the mutation and waits for a successful receipt.
    async fn send(&self, mutation: &Mutation) -> RemoteResult<TxHash>;
}

#[async_trait]
impl<T: MarketGateway + ?Sized> MarketGateway for Box<T> {
    async fn reserves_list(&self) -> RemoteResult<Vec<Address>> {
        (**self).reserves_list().await
    }

    async fn reserve_configuration(&self, asset: Address) -> RemoteResult<ReserveConfiguration> {
        (**self).reserve_configuration(asset).await
    }

    async fn reserve_caps(&self, asset: Address) -> RemoteResult<ReserveCaps> {
        (**self).reserve_caps(asset).await
    }

    async fn liquidation_protocol_fee(&self, asset: Address) -> RemoteResult<U256> {
        (**self).liquidation_protocol_fee(asset).await
    }

    async fn flash_loan_enabled(&self, asset: Address) -> RemoteResult<bool> {
        (**self).flash_loan_enabled(asset).await
    }

    async fn debt_ceiling(&self, asset: Address) -> RemoteResult<U256> {
        (**self).debt_ceiling(asset).await
    }

    async fn paused(&self, asset: Address) -> RemoteResult<bool> {
        (**self).paused(asset).await
    }

    async fn a_token_total_supply(&self, asset: Address) -> RemoteResult<U256> {
        (**self).a_token_total_supply(asset).await
    }

    async fn total_debt(&self, asset: Address) -> RemoteResult<U256> {
        (**self).total_debt(asset).await
    }

    async fn reserve_tokens(&self, asset: Address) -> RemoteResult<ReserveTokens> {
        (**self).reserve_tokens(asset).await
    }

    async fn interest_rate_strategy(&self, asset: Address) -> RemoteResult<Address> {
        (**self).interest_rate_strategy(asset).await
    }

    async fn source_of_asset(&self, asset: Address) -> RemoteResult<Address> {
        (**self).source_of_asset(asset).await
    }

    async fn asset_price(&self, asset: Address) -> RemoteResult<U256> {
        (**self).asset_price(asset).await
    }

    async fn token_symbol(&self, token: Address) -> RemoteResult<String> {
        (**self).token_symbol(token).await
    }

    async fn token_name(&self, token: Address) -> RemoteResult<String> {
        (**self).token_name(token).await
    }

    async fn token_decimals(&self, token: Address) -> RemoteResult<u8> {
        (**self).token_decimals(token).await
    }

    async fn is_pool_admin(&self, account: Address) -> RemoteResult<bool> {
        (**self).is_pool_admin(account).await
    }

    async fn is_risk_admin(&self, account: Address) -> RemoteResult<bool> {
        (**self).is_risk_admin(account).await
    }

    async fn is_asset_listing_admin(&self, account: Address) -> RemoteResult<bool> {
        (**self).is_asset_listing_admin(account).await
    }

    async fn simulate(&self, mutation: &Mutation) -> RemoteResult<()> {
        (**self).simulate(mutation).await
    }

    async fn send(&self, mutation: &Mutation) -> RemoteResult<TxHash> {
        (**self).send(mutation).await
    }
}
