//! In-memory market used by unit tests.
//!
//! [`FakeMarket`] behaves like a small pool: sends apply their mutation,
//! simulations validate without applying, and individual operations can
//! be made to fail.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::error::{RemoteError, RemoteResult};
use crate::market::{Mutation, ReserveCaps, ReserveConfiguration, ReserveTokens};
use crate::market::MarketGateway;

/// Remote state of one reserve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeReserve {
    pub config: ReserveConfiguration,
    pub caps: ReserveCaps,
    pub protocol_fee: U256,
    pub flashloan: bool,
    pub debt_ceiling: U256,
    pub paused: bool,
    pub total_supply: U256,
    pub total_debt: U256,
}

impl FakeReserve {
    /// A typical live market.
    pub fn listed() -> Self {
        Self {
            config: ReserveConfiguration {
                decimals: U256::from(18),
                ltv: U256::from(7500),
                liquidation_threshold: U256::from(8000),
                liquidation_bonus: U256::from(10500),
                reserve_factor: U256::from(1000),
                usage_as_collateral_enabled: true,
                borrowing_enabled: true,
                stable_borrow_rate_enabled: false,
                is_active: true,
                is_frozen: false,
            },
            caps: ReserveCaps {
                borrow_cap: U256::from(1_000),
                supply_cap: U256::from(2_000),
            },
            protocol_fee: U256::from(1000),
            flashloan: true,
            debt_ceiling: U256::ZERO,
            paused: false,
            total_supply: U256::ZERO,
            total_debt: U256::ZERO,
        }
    }

    /// A reserve as it looks right after initialization.
    fn initialized() -> Self {
        Self {
            config: ReserveConfiguration {
                decimals: U256::from(18),
                is_active: true,
                ..ReserveConfiguration::default()
            },
            flashloan: true,
            ..Self::unlisted()
        }
    }

    /// What the data provider reports for an unknown asset: all zeros.
    fn unlisted() -> Self {
        Self {
            config: ReserveConfiguration::default(),
            caps: ReserveCaps::default(),
            protocol_fee: U256::ZERO,
            flashloan: false,
            debt_ceiling: U256::ZERO,
            paused: false,
            total_supply: U256::ZERO,
            total_debt: U256::ZERO,
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    listed: Vec<Address>,
    reserves: HashMap<Address, FakeReserve>,
    sources: HashMap<Address, Address>,
    symbols: HashMap<Address, String>,
    simulated: Vec<Mutation>,
    sent: Vec<Mutation>,
    rejections: HashMap<&'static str, String>,
    inert: HashSet<&'static str>,
    failing_reads: HashSet<&'static str>,
}

/// Stateful in-memory implementation of [`MarketGateway`].
#[derive(Debug, Default)]
pub struct FakeMarket {
    state: Mutex<FakeState>,
}

impl FakeMarket {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().expect("fake market poisoned"));
    }

    fn read<T>(&self, operation: &'static str, f: impl FnOnce(&FakeState) -> T) -> RemoteResult<T> {
        let state = self.state.lock().expect("fake market poisoned");
        if state.failing_reads.contains(operation) {
            return Err(RemoteError::read(operation, "execution reverted"));
        }
        Ok(f(&state))
    }

    /// Lists `asset` with the given reserve state and price source.
    pub fn with_reserve(self, asset: Address, reserve: FakeReserve, source: Address) -> Self {
        self.with_state(|s| {
            s.listed.push(asset);
            s.reserves.insert(asset, reserve);
            s.sources.insert(asset, source);
        });
        self
    }

    /// Registers an oracle source for an asset that is not listed.
    pub fn with_source(self, asset: Address, source: Address) -> Self {
        self.with_state(|s| {
            s.sources.insert(asset, source);
        });
        self
    }

    /// Sets the ERC-20 symbol of `token`; name and decimals stay unreadable.
    pub fn with_symbol(self, token: Address, symbol: &str) -> Self {
        self.with_state(|s| {
            s.symbols.insert(token, symbol.to_string());
        });
        self
    }

    /// Makes both simulation and send of `operation` fail with `reason`.
    pub fn rejecting(self, operation: &'static str, reason: &str) -> Self {
        self.with_state(|s| {
            s.rejections.insert(operation, reason.to_string());
        });
        self
    }

    /// Makes sends of `operation` succeed without changing state.
    pub fn inert(self, operation: &'static str) -> Self {
        self.with_state(|s| {
            s.inert.insert(operation);
        });
        self
    }

    /// Makes the read `operation` fail.
    pub fn failing_read(self, operation: &'static str) -> Self {
        self.with_state(|s| {
            s.failing_reads.insert(operation);
        });
        self
    }

    /// Changes the totals of a listed reserve.
    pub fn set_totals(&self, asset: Address, supply: U256, debt: U256) {
        self.with_state(|s| {
            if let Some(reserve) = s.reserves.get_mut(&asset) {
                reserve.total_supply = supply;
                reserve.total_debt = debt;
            }
        });
    }

    pub fn sent(&self) -> Vec<Mutation> {
        self.state.lock().expect("fake market poisoned").sent.clone()
    }

    pub fn simulated(&self) -> Vec<Mutation> {
        self.state.lock().expect("fake market poisoned").simulated.clone()
    }

    pub fn is_listed(&self, asset: Address) -> bool {
        self.state.lock().expect("fake market poisoned").listed.contains(&asset)
    }

    pub fn source(&self, asset: Address) -> Option<Address> {
        self.state.lock().expect("fake market poisoned").sources.get(&asset).copied()
    }

    pub fn reserve(&self, asset: Address) -> Option<FakeReserve> {
        self.state.lock().expect("fake market poisoned").reserves.get(&asset).cloned()
    }

    fn reserve_or_default(state: &FakeState, asset: Address) -> FakeReserve {
        state.reserves.get(&asset).cloned().unwrap_or_else(FakeReserve::unlisted)
    }

    fn validate(state: &FakeState, mutation: &Mutation) -> RemoteResult<()> {
        let operation = mutation.operation();
        if let Some(reason) = state.rejections.get(operation) {
            return Err(RemoteError::rejected(operation, reason));
        }
        match mutation {
            Mutation::InitReserve { input } if state.listed.contains(&input.underlying_asset) => {
                Err(RemoteError::rejected(operation, "execution reverted: RESERVE_ALREADY_INITIALIZED"))
            }
            Mutation::SetAssetSource { .. } | Mutation::InitReserve { .. } => Ok(()),
            other if !state.listed.contains(&other.asset()) => {
                Err(RemoteError::rejected(operation, "execution reverted: ASSET_NOT_LISTED"))
            }
            Mutation::DropReserve { asset } => {
                let reserve = Self::reserve_or_default(state, *asset);
                if reserve.total_supply.is_zero() && reserve.total_debt.is_zero() {
                    Ok(())
                } else {
                    Err(RemoteError::rejected(operation, "execution reverted: UNDERLYING_CLAIMABLE_RIGHTS_NOT_ZERO"))
                }
            }
            _ => Ok(()),
        }
    }

    fn apply(state: &mut FakeState, mutation: &Mutation) {
        if state.inert.contains(mutation.operation()) {
            return;
        }
        let asset = mutation.asset();
        if let Mutation::SetAssetSource { source, .. } = mutation {
            state.sources.insert(asset, *source);
            return;
        }
        if let Mutation::InitReserve { .. } = mutation {
            state.listed.push(asset);
            state.reserves.insert(asset, FakeReserve::initialized());
            return;
        }
        if let Mutation::DropReserve { .. } = mutation {
            state.listed.retain(|a| *a != asset);
            state.reserves.remove(&asset);
            return;
        }
        let Some(reserve) = state.reserves.get_mut(&asset) else {
            return;
        };
        match mutation {
            Mutation::SetReserveActive { active, .. } => reserve.config.is_active = *active,
            Mutation::SetReserveFreeze { frozen, .. } => reserve.config.is_frozen = *frozen,
            Mutation::SetReserveBorrowing { enabled, .. } => reserve.config.borrowing_enabled = *enabled,
            Mutation::ConfigureCollateral {
                ltv,
                liquidation_threshold,
                liquidation_bonus,
                ..
            } => {
                reserve.config.ltv = *ltv;
                reserve.config.liquidation_threshold = *liquidation_threshold;
                reserve.config.liquidation_bonus = *liquidation_bonus;
            }
            Mutation::SetReserveFactor { value, .. } => reserve.config.reserve_factor = *value,
            Mutation::SetBorrowCap { value, .. } => reserve.caps.borrow_cap = *value,
            Mutation::SetSupplyCap { value, .. } => reserve.caps.supply_cap = *value,
            Mutation::SetLiquidationProtocolFee { value, .. } => reserve.protocol_fee = *value,
            Mutation::SetReserveFlashLoaning { enabled, .. } => reserve.flashloan = *enabled,
            Mutation::SetDebtCeiling { value, .. } => reserve.debt_ceiling = *value,
            Mutation::SetAssetSource { .. } | Mutation::InitReserve { .. } | Mutation::DropReserve { .. } => {}
        }
    }
}

#[async_trait]
impl MarketGateway for FakeMarket {
    async fn reserves_list(&self) -> RemoteResult<Vec<Address>> {
        self.read("getReservesList", |s| s.listed.clone())
    }

    async fn reserve_configuration(&self, asset: Address) -> RemoteResult<ReserveConfiguration> {
        self.read("getReserveConfigurationData", |s| Self::reserve_or_default(s, asset).config)
    }

    async fn reserve_caps(&self, asset: Address) -> RemoteResult<ReserveCaps> {
        self.read("getReserveCaps", |s| Self::reserve_or_default(s, asset).caps)
    }

    async fn liquidation_protocol_fee(&self, asset: Address) -> RemoteResult<U256> {
        self.read("getLiquidationProtocolFee", |s| Self::reserve_or_default(s, asset).protocol_fee)
    }

    async fn flash_loan_enabled(&self, asset: Address) -> RemoteResult<bool> {
        self.read("getFlashLoanEnabled", |s| Self::reserve_or_default(s, asset).flashloan)
    }

    async fn debt_ceiling(&self, asset: Address) -> RemoteResult<U256> {
        self.read("getDebtCeiling", |s| Self::reserve_or_default(s, asset).debt_ceiling)
    }

    async fn paused(&self, asset: Address) -> RemoteResult<bool> {
        self.read("getPaused", |s| Self::reserve_or_default(s, asset).paused)
    }

    async fn a_token_total_supply(&self, asset: Address) -> RemoteResult<U256> {
        self.read("getATokenTotalSupply", |s| Self::reserve_or_default(s, asset).total_supply)
    }

    async fn total_debt(&self, asset: Address) -> RemoteResult<U256> {
        self.read("getTotalDebt", |s| Self::reserve_or_default(s, asset).total_debt)
    }

    async fn reserve_tokens(&self, asset: Address) -> RemoteResult<ReserveTokens> {
        self.read("getReserveTokensAddresses", |s| {
            if s.listed.contains(&asset) {
                ReserveTokens {
                    a_token: Address::repeat_byte(0xa0),
                    stable_debt_token: Address::ZERO,
                    variable_debt_token: Address::repeat_byte(0xd0),
                }
            } else {
                ReserveTokens::default()
            }
        })
    }

    async fn interest_rate_strategy(&self, _asset: Address) -> RemoteResult<Address> {
        self.read("getInterestRateStrategyAddress", |_| Address::repeat_byte(0x5e))
    }

    async fn source_of_asset(&self, asset: Address) -> RemoteResult<Address> {
        self.read("getSourceOfAsset", |s| s.sources.get(&asset).copied().unwrap_or_default())
    }

    async fn asset_price(&self, asset: Address) -> RemoteResult<U256> {
        self.read("getAssetPrice", |s| {
            if s.sources.contains_key(&asset) {
                U256::from(100_000_000u64)
            } else {
                U256::ZERO
            }
        })
    }

    async fn token_symbol(&self, token: Address) -> RemoteResult<String> {
        self.read("symbol", |s| s.symbols.get(&token).cloned())?
            .ok_or_else(|| RemoteError::read("symbol", "execution reverted"))
    }

    async fn token_name(&self, _token: Address) -> RemoteResult<String> {
        Err(RemoteError::read("name", "execution reverted"))
    }

    async fn token_decimals(&self, _token: Address) -> RemoteResult<u8> {
        Err(RemoteError::read("decimals", "execution reverted"))
    }

    async fn is_pool_admin(&self, _account: Address) -> RemoteResult<bool> {
        self.read("isPoolAdmin", |_| true)
    }

    async fn is_risk_admin(&self, _account: Address) -> RemoteResult<bool> {
        self.read("isRiskAdmin", |_| false)
    }

    async fn is_asset_listing_admin(&self, _account: Address) -> RemoteResult<bool> {
        self.read("isAssetListingAdmin", |_| true)
    }

    async fn simulate(&self, mutation: &Mutation) -> RemoteResult<()> {
        let mut state = self.state.lock().expect("fake market poisoned");
        Self::validate(&state, mutation)?;
        state.simulated.push(mutation.clone());
        Ok(())
    }

    async fn send(&self, mutation: &Mutation) -> RemoteResult<TxHash> {
        let mut state = self.state.lock().expect("fake market poisoned");
        Self::validate(&state, mutation)?;
        Self::apply(&mut state, mutation);
        state.sent.push(mutation.clone());
        let nonce = u8::try_from(state.sent.len()).unwrap_or(u8::MAX);
        Ok(TxHash::repeat_byte(nonce))
    }
}
