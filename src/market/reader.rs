//! Read-only views of a market: the reconciliation snapshot, token
//! metadata, role membership and the detailed listing view.

use std::fmt;

use alloy::primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, warn};

use super::gateway::{MarketGateway, ReserveTokens};
use crate::config::short_address;
use crate::error::{MarketAdminError, RemoteResult, Result};

/// Placeholder for token metadata that could not be read.
pub const UNKNOWN: &str = "UNKNOWN";

/// Current remote values of every managed field of one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Asset.
    pub asset: Address,
    /// Oracle price source.
    pub price_feed: Address,
    /// Loan-to-value.
    pub ltv: U256,
    /// Liquidation threshold.
    pub liquidation_threshold: U256,
    /// Liquidation bonus.
    pub liquidation_bonus: U256,
    /// Reserve factor.
    pub reserve_factor: U256,
    /// Borrow cap.
    pub borrow_cap: U256,
    /// Supply cap.
    pub supply_cap: U256,
    /// Liquidation protocol fee.
    pub liquidation_protocol_fee: U256,
    /// Debt ceiling.
    pub debt_ceiling: U256,
    /// Borrowing flag.
    pub borrowing_enabled: bool,
    /// Flash-loan flag.
    pub flashloan_enabled: bool,
    /// Active flag.
    pub is_active: bool,
    /// Frozen flag.
    pub is_frozen: bool,
    /// Token decimals as reported by the data provider.
    pub decimals: U256,
    /// aToken total supply.
    pub total_supply: U256,
    /// Total debt.
    pub total_debt: U256,
}

/// ERC-20 metadata of an asset; unreadable fields fall back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMetadata {
    /// Symbol, or [`UNKNOWN`].
    pub symbol: String,
    /// Name, or [`UNKNOWN`].
    pub name: String,
    /// Decimals, if readable.
    pub decimals: Option<u8>,
}

impl TokenMetadata {
    /// Returns the decimals as text, `?` when unreadable.
    #[must_use]
    pub fn decimals_display(&self) -> String {
        self.decimals
            .map_or_else(|| String::from("?"), |d| d.to_string())
    }
}

/// Role membership of the acting identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSnapshot {
    /// The acting identity.
    pub account: Address,
    /// Holds the pool-admin role.
    pub is_pool_admin: bool,
    /// Holds the risk-admin role.
    pub is_risk_admin: bool,
    /// Holds the asset-listing-admin role.
    pub is_asset_listing_admin: bool,
}

impl fmt::Display for RoleSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} poolAdmin={} riskAdmin={} assetListingAdmin={}",
            short_address(&self.account),
            self.is_pool_admin,
            self.is_risk_admin,
            self.is_asset_listing_admin
        )
    }
}

/// Everything the detailed listing shows about a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDetail {
    /// Reconciliation snapshot.
    pub snapshot: Snapshot,
    /// Token metadata.
    pub metadata: TokenMetadata,
    /// aToken.
    pub a_token: Address,
    /// Variable debt token.
    pub variable_debt_token: Address,
    /// Interest rate strategy.
    pub interest_rate_strategy: Address,
    /// Oracle price.
    pub price: U256,
    /// Paused flag.
    pub paused: bool,
}

/// Reads market state through a gateway.
#[derive(Clone, Copy)]
pub struct StateReader<'a> {
    gateway: &'a dyn MarketGateway,
}

impl fmt::Debug for StateReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateReader").finish_non_exhaustive()
    }
}

impl<'a> StateReader<'a> {
    /// Creates a reader over `gateway`.
    #[must_use]
    pub const fn new(gateway: &'a dyn MarketGateway) -> Self {
        Self { gateway }
    }

    /// Reads the current values of every managed field of `asset`.
    ///
    /// # Errors
    ///
    /// Returns a remote error if any read fails.
    pub async fn read_snapshot(&self, asset: Address) -> Result<Snapshot> {
        let g = self.gateway;
        let (config, caps, fee, flashloan, ceiling, source, supply, debt) = tokio::try_join!(
            g.reserve_configuration(asset),
            g.reserve_caps(asset),
            g.liquidation_protocol_fee(asset),
            g.flash_loan_enabled(asset),
            g.debt_ceiling(asset),
            g.source_of_asset(asset),
            g.a_token_total_supply(asset),
            g.total_debt(asset),
        )?;

        debug!(asset = %asset, "Read market snapshot");

        Ok(Snapshot {
            asset,
            price_feed: source,
            ltv: config.ltv,
            liquidation_threshold: config.liquidation_threshold,
            liquidation_bonus: config.liquidation_bonus,
            reserve_factor: config.reserve_factor,
            borrow_cap: caps.borrow_cap,
            supply_cap: caps.supply_cap,
            liquidation_protocol_fee: fee,
            debt_ceiling: ceiling,
            borrowing_enabled: config.borrowing_enabled,
            flashloan_enabled: flashloan,
            is_active: config.is_active,
            is_frozen: config.is_frozen,
            decimals: config.decimals,
            total_supply: supply,
            total_debt: debt,
        })
    }

    /// Returns true if `asset` has a reserve.
    ///
    /// # Errors
    ///
    /// Returns a remote error if the reserve list cannot be read.
    pub async fn reserve_exists(&self, asset: Address) -> RemoteResult<bool> {
        Ok(self.gateway.reserves_list().await?.contains(&asset))
    }

    /// Lists the assets of every listed reserve.
    ///
    /// # Errors
    ///
    /// Returns a remote error if the reserve list cannot be read.
    pub async fn listed_assets(&self) -> Result<Vec<Address>> {
        Ok(self.gateway.reserves_list().await?)
    }

    /// Reads ERC-20 metadata; each unreadable field falls back independently.
    pub async fn token_metadata(&self, asset: Address) -> TokenMetadata {
        let g = self.gateway;
        let (symbol, name, decimals) =
            tokio::join!(g.token_symbol(asset), g.token_name(asset), g.token_decimals(asset));

        let symbol = symbol.unwrap_or_else(|e| {
            warn!(asset = %asset, error = %e, "Token symbol unreadable");
            String::from(UNKNOWN)
        });
        let name = name.unwrap_or_else(|e| {
            warn!(asset = %asset, error = %e, "Token name unreadable");
            String::from(UNKNOWN)
        });
        let decimals = decimals
            .map_err(|e| warn!(asset = %asset, error = %e, "Token decimals unreadable"))
            .ok();

        TokenMetadata {
            symbol,
            name,
            decimals,
        }
    }

    /// Reads the role membership of `account`.
    ///
    /// # Errors
    ///
    /// Returns a remote error if any role check fails.
    pub async fn role_snapshot(&self, account: Address) -> Result<RoleSnapshot> {
        let g = self.gateway;
        let (is_pool_admin, is_risk_admin, is_asset_listing_admin) = tokio::try_join!(
            g.is_pool_admin(account),
            g.is_risk_admin(account),
            g.is_asset_listing_admin(account),
        )?;

        Ok(RoleSnapshot {
            account,
            is_pool_admin,
            is_risk_admin,
            is_asset_listing_admin,
        })
    }

    /// Reads the detailed listing view of `asset`.
    ///
    /// # Errors
    ///
    /// Returns a remote error if any non-metadata read fails.
    pub async fn market_detail(&self, asset: Address) -> Result<MarketDetail> {
        let g = self.gateway;
        let reads = async {
            tokio::try_join!(
                self.read_snapshot(asset),
                async { g.reserve_tokens(asset).await.map_err(MarketAdminError::from) },
                async { g.interest_rate_strategy(asset).await.map_err(MarketAdminError::from) },
                async { g.asset_price(asset).await.map_err(MarketAdminError::from) },
                async { g.paused(asset).await.map_err(MarketAdminError::from) },
            )
        };
        let (reads, metadata) = tokio::join!(reads, self.token_metadata(asset));
        let (snapshot, tokens, strategy, price, paused): (Snapshot, ReserveTokens, Address, U256, bool) =
            reads?;

        Ok(MarketDetail {
            snapshot,
            metadata,
            a_token: tokens.a_token,
            variable_debt_token: tokens.variable_debt_token,
            interest_rate_strategy: strategy,
            price,
            paused,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::testing::{FakeMarket, FakeReserve};

    fn asset() -> Address {
        Address::repeat_byte(0xaa)
    }

    #[tokio::test]
    async fn test_read_snapshot() {
        let market = FakeMarket::new().with_reserve(asset(), FakeReserve::listed(), Address::repeat_byte(0xfe));
        let snapshot = StateReader::new(&market)
            .read_snapshot(asset())
            .await
            .expect("snapshot");

        assert_eq!(snapshot.price_feed, Address::repeat_byte(0xfe));
        assert_eq!(snapshot.ltv, U256::from(7500));
        assert_eq!(snapshot.supply_cap, U256::from(2_000));
        assert!(snapshot.flashloan_enabled);
        assert!(!snapshot.is_frozen);
    }

    #[tokio::test]
    async fn test_read_snapshot_fails_on_any_read() {
        let market = FakeMarket::new()
            .with_reserve(asset(), FakeReserve::listed(), Address::repeat_byte(0xfe))
            .failing_read("getDebtCeiling");

        let err = StateReader::new(&market)
            .read_snapshot(asset())
            .await
            .expect_err("should fail");

        assert!(matches!(
            err,
            MarketAdminError::Remote(RemoteError::ReadFailed { ref operation, .. }) if operation == "getDebtCeiling"
        ));
    }

    #[tokio::test]
    async fn test_token_metadata_falls_back_per_field() {
        let market = FakeMarket::new().with_symbol(asset(), "WETH");
        let metadata = StateReader::new(&market).token_metadata(asset()).await;

        assert_eq!(metadata.symbol, "WETH");
        assert_eq!(metadata.name, UNKNOWN);
        assert_eq!(metadata.decimals, None);
        assert_eq!(metadata.decimals_display(), "?");
    }

    #[tokio::test]
    async fn test_role_snapshot_and_listing() {
        let market = FakeMarket::new().with_reserve(asset(), FakeReserve::listed(), Address::repeat_byte(0xfe));
        let reader = StateReader::new(&market);

        let roles = reader
            .role_snapshot(Address::repeat_byte(0x11))
            .await
            .expect("roles");
        assert!(roles.is_pool_admin);
        assert!(!roles.is_risk_admin);
        assert!(roles.to_string().contains("riskAdmin=false"));

        assert!(reader.reserve_exists(asset()).await.expect("exists"));
        assert!(!reader.reserve_exists(Address::repeat_byte(0xbb)).await.expect("exists"));
        assert_eq!(reader.listed_assets().await.expect("list"), vec![asset()]);
    }

    #[tokio::test]
    async fn test_market_detail() {
        let market = FakeMarket::new().with_reserve(asset(), FakeReserve::listed(), Address::repeat_byte(0xfe));
        let detail = StateReader::new(&market)
            .market_detail(asset())
            .await
            .expect("detail");

        assert_eq!(detail.a_token, Address::repeat_byte(0xa0));
        assert_eq!(detail.price, U256::from(100_000_000u64));
        assert_eq!(detail.metadata.symbol, UNKNOWN);
        assert!(!detail.paused);

        let market = FakeMarket::new()
            .with_reserve(asset(), FakeReserve::listed(), Address::repeat_byte(0xfe))
            .failing_read("getPaused");
        assert!(StateReader::new(&market).market_detail(asset()).await.is_err());
    }
}
