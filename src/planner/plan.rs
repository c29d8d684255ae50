//! Action plans and their construction.
//!
//! A plan is an ordered list of [`MarketAction`]s. Each action wraps one
//! remote mutation and exposes four phases: precheck, simulate, send and
//! an optional postcheck.

use alloy::primitives::{Address, TxHash};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DesiredState;
use crate::error::{ActionError, Result, ValidationError};
use crate::market::{MarketGateway, Mutation, Snapshot, StateReader};

use super::diff::{Diff, Field};

/// A named unit of remote mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketAction {
    label: &'static str,
    mutation: Mutation,
    verify: bool,
}

/// Serializable description of a planned action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSummary {
    /// Action label.
    pub label: String,
    /// Remote operation name.
    pub operation: String,
    /// Call with arguments.
    pub call: String,
    /// Whether the action re-verifies its effect.
    pub has_postcheck: bool,
}

impl MarketAction {
    fn new(label: &'static str, mutation: Mutation) -> Self {
        Self {
            label,
            mutation,
            verify: false,
        }
    }

    const fn verified(mut self) -> Self {
        self.verify = true;
        self
    }

    /// Returns the action label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Returns the wrapped mutation.
    #[must_use]
    pub const fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    /// Returns true if the action re-verifies its effect after sending.
    #[must_use]
    pub const fn has_postcheck(&self) -> bool {
        self.verify
    }

    /// Returns a serializable description of the action.
    #[must_use]
    pub fn summary(&self) -> ActionSummary {
        ActionSummary {
            label: self.label.to_string(),
            operation: self.mutation.operation().to_string(),
            call: self.mutation.to_string(),
            has_postcheck: self.verify,
        }
    }

    fn precondition_failed(&self, message: impl Into<String>) -> ActionError {
        ActionError::PreconditionFailed {
            label: self.label.to_string(),
            message: message.into(),
        }
    }

    fn postcondition_failed(&self, message: impl Into<String>) -> ActionError {
        ActionError::PostconditionFailed {
            label: self.label.to_string(),
            message: message.into(),
        }
    }

    /// Checks, read-only, that the mutation may still be applied.
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` if the precondition does not hold, or a
    /// remote error if a read fails.
    pub async fn precheck(&self, gateway: &dyn MarketGateway) -> Result<()> {
        let reader = StateReader::new(gateway);
        match &self.mutation {
            Mutation::SetAssetSource { asset, .. } => {
                let current = gateway.source_of_asset(*asset).await?;
                info!(label = self.label, asset = %asset, current = %current, "Current oracle source");
            }
            Mutation::InitReserve { input } => {
                if reader.reserve_exists(input.underlying_asset).await? {
                    return Err(self
                        .precondition_failed("asset became listed during precheck")
                        .into());
                }
            }
            Mutation::DropReserve { asset } => {
                let (supply, debt) = tokio::try_join!(
                    gateway.a_token_total_supply(*asset),
                    gateway.total_debt(*asset)
                )?;
                if !supply.is_zero() || !debt.is_zero() {
                    return Err(self
                        .precondition_failed(format!(
                            "reserve has non-zero supply/debt; drain market first (supply={supply}, debt={debt})"
                        ))
                        .into());
                }
            }
            _ => {}
        }
        debug!(label = self.label, "Precheck passed");
        Ok(())
    }

    /// Executes the exact mutation read-only.
    ///
    /// # Errors
    ///
    /// Returns `SimulationFailed` carrying the remote reason verbatim.
    pub async fn simulate(&self, gateway: &dyn MarketGateway) -> Result<()> {
        gateway
            .simulate(&self.mutation)
            .await
            .map_err(|e| ActionError::SimulationFailed {
                label: self.label.to_string(),
                reason: e.reason(),
            })?;
        Ok(())
    }

    /// Submits the mutation and waits for inclusion.
    ///
    /// # Errors
    ///
    /// Returns `SendFailed` if the mutation is rejected or reverts.
    pub async fn send(&self, gateway: &dyn MarketGateway) -> Result<TxHash> {
        let tx_hash = gateway
            .send(&self.mutation)
            .await
            .map_err(|e| ActionError::SendFailed {
                label: self.label.to_string(),
                reason: e.reason(),
            })?;
        Ok(tx_hash)
    }

    /// Confirms, read-only, that the mutation took effect.
    ///
    /// Actions without a postcheck always pass.
    ///
    /// # Errors
    ///
    /// Returns `PostconditionFailed` if the effect is not observable, or a
    /// remote error if a read fails.
    pub async fn postcheck(&self, gateway: &dyn MarketGateway) -> Result<()> {
        if !self.verify {
            return Ok(());
        }

        let reader = StateReader::new(gateway);
        match &self.mutation {
            Mutation::SetAssetSource { asset, source } => {
                let current = gateway.source_of_asset(*asset).await?;
                if current != *source {
                    return Err(self
                        .postcondition_failed(format!(
                            "oracle source mismatch (expected {source}, got {current})"
                        ))
                        .into());
                }
            }
            Mutation::InitReserve { input } => {
                if !reader.reserve_exists(input.underlying_asset).await? {
                    return Err(self
                        .postcondition_failed("reserve is not listed after initReserves")
                        .into());
                }
            }
            Mutation::DropReserve { asset } => {
                if reader.reserve_exists(*asset).await? {
                    return Err(self
                        .postcondition_failed("reserve is still listed after dropReserve")
                        .into());
                }
            }
            _ => {}
        }
        debug!(label = self.label, "Postcheck passed");
        Ok(())
    }
}

/// Builds action plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionPlanner;

impl ActionPlanner {
    /// Creates a new planner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Plans the actions that bring a listed market in line with `diff`.
    ///
    /// Plan order is fixed: price feed, active, frozen, borrowing, collateral
    /// parameters, reserve factor, borrow cap, supply cap, liquidation
    /// protocol fee, flash loans, debt ceiling. Collateral parameters are one
    /// action; members absent from the diff keep their current value.
    #[must_use]
    pub fn plan_update(&self, current: &Snapshot, diff: &Diff) -> Vec<MarketAction> {
        let asset = current.asset;
        let mut actions = Vec::new();

        if let Some(source) = diff.target_address(Field::PriceFeed) {
            actions.push(MarketAction::new(
                "Set price feed",
                Mutation::SetAssetSource { asset, source },
            ));
        }
        if let Some(active) = diff.target_flag(Field::Active) {
            actions.push(MarketAction::new(
                "Set reserve active flag",
                Mutation::SetReserveActive { asset, active },
            ));
        }
        if let Some(frozen) = diff.target_flag(Field::Frozen) {
            actions.push(MarketAction::new(
                "Set reserve frozen flag",
                Mutation::SetReserveFreeze { asset, frozen },
            ));
        }
        if let Some(enabled) = diff.target_flag(Field::BorrowingEnabled) {
            actions.push(MarketAction::new(
                "Set reserve borrowing flag",
                Mutation::SetReserveBorrowing { asset, enabled },
            ));
        }

        let collateral = [Field::Ltv, Field::LiquidationThreshold, Field::LiquidationBonus];
        if collateral.iter().any(|f| diff.contains(*f)) {
            actions.push(MarketAction::new(
                "Configure collateral params",
                Mutation::ConfigureCollateral {
                    asset,
                    ltv: diff.target_amount(Field::Ltv).unwrap_or(current.ltv),
                    liquidation_threshold: diff
                        .target_amount(Field::LiquidationThreshold)
                        .unwrap_or(current.liquidation_threshold),
                    liquidation_bonus: diff
                        .target_amount(Field::LiquidationBonus)
                        .unwrap_or(current.liquidation_bonus),
                },
            ));
        }

        if let Some(value) = diff.target_amount(Field::ReserveFactor) {
            actions.push(MarketAction::new(
                "Set reserve factor",
                Mutation::SetReserveFactor { asset, value },
            ));
        }
        if let Some(value) = diff.target_amount(Field::BorrowCap) {
            actions.push(MarketAction::new(
                "Set borrow cap",
                Mutation::SetBorrowCap { asset, value },
            ));
        }
        if let Some(value) = diff.target_amount(Field::SupplyCap) {
            actions.push(MarketAction::new(
                "Set supply cap",
                Mutation::SetSupplyCap { asset, value },
            ));
        }
        if let Some(value) = diff.target_amount(Field::LiquidationProtocolFee) {
            actions.push(MarketAction::new(
                "Set liquidation protocol fee",
                Mutation::SetLiquidationProtocolFee { asset, value },
            ));
        }
        if let Some(enabled) = diff.target_flag(Field::FlashloanEnabled) {
            actions.push(MarketAction::new(
                "Set flashloan enabled flag",
                Mutation::SetReserveFlashLoaning { asset, enabled },
            ));
        }
        if let Some(value) = diff.target_amount(Field::DebtCeiling) {
            actions.push(MarketAction::new(
                "Set debt ceiling",
                Mutation::SetDebtCeiling { asset, value },
            ));
        }

        debug!(asset = %asset, actions = actions.len(), "Planned update");
        actions
    }

    /// Plans the listing of a new market: set price feed, then initialize reserve.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the price feed or the initialization
    /// block is missing.
    pub fn plan_listing(&self, desired: &DesiredState) -> Result<Vec<MarketAction>> {
        let source = desired.price_feed.ok_or_else(|| ValidationError::MissingField {
            field: String::from("priceFeed"),
        })?;
        let input = desired
            .init_reserve
            .clone()
            .ok_or_else(|| ValidationError::MissingField {
                field: String::from("initReserveInput"),
            })?;

        Ok(vec![
            MarketAction::new(
                "Set price feed",
                Mutation::SetAssetSource {
                    asset: desired.asset,
                    source,
                },
            )
            .verified(),
            MarketAction::new(
                "Initialize reserve",
                Mutation::InitReserve {
                    input: Box::new(input),
                },
            )
            .verified(),
        ])
    }

    /// Plans the removal of a market.
    #[must_use]
    pub fn plan_removal(&self, asset: Address) -> Vec<MarketAction> {
        vec![MarketAction::new("Drop reserve", Mutation::DropReserve { asset }).verified()]
    }

    /// Plans a standalone oracle source update.
    #[must_use]
    pub fn plan_price_feed(&self, asset: Address, source: Address) -> Vec<MarketAction> {
        vec![
            MarketAction::new(
                "Update oracle source",
                Mutation::SetAssetSource { asset, source },
            )
            .verified(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InitReserveInput, RiskConfig};
    use crate::error::MarketAdminError;
    use crate::planner::DiffEngine;
    use crate::testing::{FakeMarket, FakeReserve};
    use alloy::primitives::{Bytes, U256};

    fn asset() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn feed() -> Address {
        Address::repeat_byte(0xfe)
    }

    async fn snapshot_of(market: &FakeMarket) -> Snapshot {
        StateReader::new(market)
            .read_snapshot(asset())
            .await
            .expect("snapshot")
    }

    fn init_input(underlying: Address) -> InitReserveInput {
        InitReserveInput {
            a_token_impl: Address::repeat_byte(0x0a),
            variable_debt_token_impl: Address::repeat_byte(0x0b),
            underlying_asset: underlying,
            a_token_name: String::from("Aave WETH"),
            a_token_symbol: String::from("aWETH"),
            variable_debt_token_name: String::from("Aave Variable Debt WETH"),
            variable_debt_token_symbol: String::from("variableDebtWETH"),
            params: Bytes::from(vec![0x10]),
            interest_rate_data: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn test_collateral_group_keeps_current_members() {
        let market = FakeMarket::new().with_reserve(asset(), FakeReserve::listed(), feed());
        let current = snapshot_of(&market).await;
        let desired = DesiredState::for_asset(asset()).with_risk(RiskConfig {
            liquidation_bonus: Some(U256::from(11000)),
            ..RiskConfig::default()
        });
        let diff = DiffEngine::new().diff(&current, &desired);

        let actions = ActionPlanner::new().plan_update(&current, &diff);

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].label(), "Configure collateral params");
        assert_eq!(
            actions[0].mutation(),
            &Mutation::ConfigureCollateral {
                asset: asset(),
                ltv: U256::from(7500),
                liquidation_threshold: U256::from(8000),
                liquidation_bonus: U256::from(11000),
            }
        );
        assert!(!actions[0].has_postcheck());
    }

    #[tokio::test]
    async fn test_plan_order_is_fixed() {
        let market = FakeMarket::new().with_reserve(asset(), FakeReserve::listed(), feed());
        let current = snapshot_of(&market).await;
        let desired = DesiredState::for_asset(asset())
            .with_price_feed(Address::repeat_byte(0x01))
            .with_risk(RiskConfig {
                debt_ceiling: Some(U256::from(1)),
                flashloan_enabled: Some(false),
                supply_cap: Some(U256::from(3)),
                ltv: Some(U256::from(7000)),
                frozen: Some(true),
                reserve_factor: Some(U256::from(2000)),
                ..RiskConfig::default()
            });
        let diff = DiffEngine::new().diff(&current, &desired);

        let labels: Vec<_> = ActionPlanner::new()
            .plan_update(&current, &diff)
            .iter()
            .map(MarketAction::label)
            .collect();

        assert_eq!(
            labels,
            vec![
                "Set price feed",
                "Set reserve frozen flag",
                "Configure collateral params",
                "Set reserve factor",
                "Set supply cap",
                "Set flashloan enabled flag",
                "Set debt ceiling",
            ]
        );
    }

    #[test]
    fn test_listing_plan_is_two_verified_actions() {
        let desired = DesiredState {
            init_reserve: Some(init_input(asset())),
            ..DesiredState::for_asset(asset()).with_price_feed(feed())
        };
        let actions = ActionPlanner::new().plan_listing(&desired).expect("plan");

        let summaries: Vec<_> = actions.iter().map(MarketAction::summary).collect();
        assert_eq!(summaries[0].operation, "setAssetSources");
        assert_eq!(summaries[1].operation, "initReserves");
        assert!(summaries.iter().all(|s| s.has_postcheck));

        let err = ActionPlanner::new()
            .plan_listing(&DesiredState::for_asset(asset()).with_price_feed(feed()))
            .expect_err("missing init block");
        assert!(matches!(
            err,
            MarketAdminError::Validation(ValidationError::MissingField { ref field }) if field == "initReserveInput"
        ));
    }

    #[tokio::test]
    async fn test_drop_precheck_requires_drained_market() {
        let market = FakeMarket::new().with_reserve(asset(), FakeReserve::listed(), feed());
        let action = ActionPlanner::new().plan_removal(asset()).remove(0);

        action.precheck(&market).await.expect("drained market passes");

        market.set_totals(asset(), U256::from(5), U256::ZERO);
        let err = action.precheck(&market).await.expect_err("should fail");
        assert!(matches!(
            err,
            MarketAdminError::Action(ActionError::PreconditionFailed { ref message, .. })
                if message.contains("drain market first")
        ));
    }

    #[tokio::test]
    async fn test_drop_precheck_reads_only_totals() {
        let market = FakeMarket::new()
            .with_reserve(asset(), FakeReserve::listed(), feed())
            .failing_read("getReserveCaps")
            .failing_read("getLiquidationProtocolFee")
            .failing_read("getSourceOfAsset");
        let action = ActionPlanner::new().plan_removal(asset()).remove(0);

        action.precheck(&market).await.expect("unrelated reads are not needed");
    }

    #[tokio::test]
    async fn test_init_precheck_rejects_listed_asset() {
        let market = FakeMarket::new().with_reserve(asset(), FakeReserve::listed(), feed());
        let desired = DesiredState {
            init_reserve: Some(init_input(asset())),
            ..DesiredState::for_asset(asset()).with_price_feed(feed())
        };
        let actions = ActionPlanner::new().plan_listing(&desired).expect("plan");

        actions[0].precheck(&market).await.expect("source precheck only logs");
        assert!(actions[1].precheck(&market).await.is_err());
    }

    #[tokio::test]
    async fn test_simulation_failure_carries_reason() {
        let market = FakeMarket::new()
            .with_reserve(asset(), FakeReserve::listed(), feed())
            .rejecting("setAssetSources", "execution reverted: 1");
        let action = ActionPlanner::new()
            .plan_price_feed(asset(), Address::repeat_byte(0x01))
            .remove(0);

        let err = action.simulate(&market).await.expect_err("should fail");
        assert!(matches!(
            err,
            MarketAdminError::Action(ActionError::SimulationFailed { ref reason, .. })
                if reason == "execution reverted: 1"
        ));
    }

    #[tokio::test]
    async fn test_price_feed_postcheck_detects_unchanged_source() {
        let market = FakeMarket::new()
            .with_reserve(asset(), FakeReserve::listed(), feed())
            .inert("setAssetSources");
        let action = ActionPlanner::new()
            .plan_price_feed(asset(), Address::repeat_byte(0x01))
            .remove(0);

        action.send(&market).await.expect("send");
        let err = action.postcheck(&market).await.expect_err("should fail");
        assert!(matches!(
            err,
            MarketAdminError::Action(ActionError::PostconditionFailed { .. })
        ));
        assert_eq!(market.source(asset()), Some(feed()));
    }
}
