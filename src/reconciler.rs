//! End-to-end market operations.
//!
//! Each operation reads the acting identity's roles, checks listing state,
//! computes what has to change, passes the confirmation gate and runs the
//! resulting plan. Update runs are re-verified against the original
//! desired state.

use std::fmt;

use alloy::primitives::Address;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ConfigHasher, DesiredState, short_address};
use crate::error::{MarketAdminError, Result};
use crate::market::{MarketDetail, MarketGateway, RoleSnapshot, StateReader};
use crate::planner::{
    ActionPlanner, ActionRunner, ActionSummary, ConfirmationGate, Diff, DiffEngine, Field,
    MarketAction, RunMode, RunReport,
};

/// A market operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// List a new market.
    AddMarket,
    /// Reconcile a listed market.
    UpdateMarket,
    /// Drop a listed market.
    RemoveMarket,
    /// Change a market's oracle source.
    UpdatePriceFeed,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AddMarket => "add-market",
            Self::UpdateMarket => "update-market",
            Self::RemoveMarket => "remove-market",
            Self::UpdatePriceFeed => "update-price-feed",
        };
        f.write_str(name)
    }
}

/// Operator choices for a mutating operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Simulate instead of sending.
    pub dry_run: bool,
    /// Operator confirmation for live runs.
    pub confirmed: bool,
}

impl RunOptions {
    /// Returns the run mode.
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        RunMode::from_dry_run(self.dry_run)
    }
}

/// Outcome of one market operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReport {
    /// The operation.
    pub operation: Operation,
    /// The market's asset.
    pub asset: Address,
    /// Run mode.
    pub mode: RunMode,
    /// Role membership of the acting identity.
    pub roles: RoleSnapshot,
    /// Desired-state fingerprint, for document-driven operations.
    pub fingerprint: Option<String>,
    /// Fields that had to change.
    pub diff: Diff,
    /// Planned actions, in order.
    pub plan: Vec<ActionSummary>,
    /// The run, unless nothing had to change.
    pub run: Option<RunReport>,
    /// Fields still differing after a live update.
    pub remaining: Diff,
}

impl OperationReport {
    fn new(operation: Operation, asset: Address, options: RunOptions, roles: RoleSnapshot) -> Self {
        Self {
            operation,
            asset,
            mode: options.mode(),
            roles,
            fingerprint: None,
            diff: Diff::new(),
            plan: Vec::new(),
            run: None,
            remaining: Diff::new(),
        }
    }

    /// Returns true if the market already matched and nothing ran.
    #[must_use]
    pub const fn is_up_to_date(&self) -> bool {
        self.run.is_none()
    }

    /// Converts the report into the operation's final result.
    ///
    /// # Errors
    ///
    /// Returns the failure that stopped the run, or `SyncVerificationFailed`
    /// if fields still differ after a live update.
    pub fn ensure_success(self) -> Result<()> {
        if let Some(failure) = self.run.and_then(|run| run.failure) {
            return Err(failure);
        }
        if !self.remaining.is_empty() {
            return Err(MarketAdminError::SyncVerificationFailed {
                fields: self.remaining.field_names(),
            });
        }
        Ok(())
    }
}

/// Drives market operations through one gateway and acting identity.
pub struct MarketReconciler<'a> {
    gateway: &'a dyn MarketGateway,
    account: Address,
    hasher: ConfigHasher,
    diff_engine: DiffEngine,
    planner: ActionPlanner,
}

impl fmt::Debug for MarketReconciler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketReconciler")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl<'a> MarketReconciler<'a> {
    /// Creates a reconciler acting as `account`.
    #[must_use]
    pub const fn new(gateway: &'a dyn MarketGateway, account: Address) -> Self {
        Self {
            gateway,
            account,
            hasher: ConfigHasher::new(),
            diff_engine: DiffEngine::new(),
            planner: ActionPlanner::new(),
        }
    }

    const fn reader(&self) -> StateReader<'a> {
        StateReader::new(self.gateway)
    }

    async fn roles(&self) -> Result<RoleSnapshot> {
        let roles = self.reader().role_snapshot(self.account).await?;
        info!(roles = %roles, "Acting identity");
        Ok(roles)
    }

    async fn require_listed(&self, asset: Address, listed: bool) -> Result<()> {
        let exists = self.reader().reserve_exists(asset).await?;
        match (exists, listed) {
            (true, false) => Err(MarketAdminError::AssetAlreadyListed {
                asset: asset.to_string(),
            }),
            (false, true) => Err(MarketAdminError::AssetNotListed {
                asset: asset.to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn execute(&self, report: &mut OperationReport, actions: &[MarketAction]) {
        report.plan = actions.iter().map(MarketAction::summary).collect();
        report.run = Some(ActionRunner::new(self.gateway).run(actions, report.mode).await);
    }

    /// Lists a new market: sets its price feed, then initializes the reserve.
    ///
    /// # Errors
    ///
    /// Returns `AssetAlreadyListed` if the asset has a reserve,
    /// `ConfirmationRequired` for an unconfirmed live run, a validation error
    /// if the listing block is incomplete, or a remote error. Action failures
    /// are carried in the report.
    pub async fn add_market(
        &self,
        desired: &DesiredState,
        options: RunOptions,
    ) -> Result<OperationReport> {
        let asset = desired.asset;
        info!(asset = %asset, mode = %options.mode(), "Adding market");

        let roles = self.roles().await?;
        self.require_listed(asset, false).await?;

        let mut report = OperationReport::new(Operation::AddMarket, asset, options, roles);
        report.fingerprint = Some(self.hasher.hash_desired(desired));
        if let Some(feed) = desired.price_feed {
            let current = self.gateway.source_of_asset(asset).await?;
            report.diff.record(Field::PriceFeed, current, Some(feed));
        }

        ConfirmationGate::assert_confirmed(options.mode(), options.confirmed)?;
        let actions = self.planner.plan_listing(desired)?;
        self.execute(&mut report, &actions).await;
        Ok(report)
    }

    /// Reconciles a listed market with `desired`.
    ///
    /// An empty diff ends the operation before the confirmation gate. After
    /// a successful live run the market is read again and any field still
    /// differing is reported in `remaining`.
    ///
    /// # Errors
    ///
    /// Returns `AssetNotListed`, `ConfirmationRequired` or a remote error.
    pub async fn update_market(
        &self,
        desired: &DesiredState,
        options: RunOptions,
    ) -> Result<OperationReport> {
        let asset = desired.asset;
        info!(asset = %asset, mode = %options.mode(), "Updating market");

        let roles = self.roles().await?;
        self.require_listed(asset, true).await?;

        let current = self.reader().read_snapshot(asset).await?;
        let mut report = OperationReport::new(Operation::UpdateMarket, asset, options, roles);
        report.fingerprint = Some(self.hasher.hash_desired(desired));
        report.diff = self.diff_engine.diff(&current, desired);

        if report.diff.is_empty() {
            info!(asset = %asset, "Market already up to date");
            return Ok(report);
        }

        ConfirmationGate::assert_confirmed(options.mode(), options.confirmed)?;
        let actions = self.planner.plan_update(&current, &report.diff);
        self.execute(&mut report, &actions).await;

        let succeeded = report.run.as_ref().is_some_and(RunReport::is_success);
        if succeeded && options.mode() == RunMode::Live {
            let after = self.reader().read_snapshot(asset).await?;
            report.remaining = self.diff_engine.diff(&after, desired);
            if report.remaining.is_empty() {
                info!(asset = %asset, "Market synced with config");
            } else {
                warn!(asset = %asset, fields = ?report.remaining.field_names(), "Market still differs after update");
            }
        }

        Ok(report)
    }

    /// Drops a listed market.
    ///
    /// # Errors
    ///
    /// Returns `AssetNotListed`, `ConfirmationRequired` or a remote error.
    pub async fn remove_market(
        &self,
        asset: Address,
        options: RunOptions,
    ) -> Result<OperationReport> {
        info!(asset = %asset, mode = %options.mode(), "Removing market");

        let roles = self.roles().await?;
        self.require_listed(asset, true).await?;

        let mut report = OperationReport::new(Operation::RemoveMarket, asset, options, roles);
        ConfirmationGate::assert_confirmed(options.mode(), options.confirmed)?;
        let actions = self.planner.plan_removal(asset);
        self.execute(&mut report, &actions).await;
        Ok(report)
    }

    /// Points a market's oracle source at `feed`.
    ///
    /// # Errors
    ///
    /// Returns `ConfirmationRequired` or a remote error.
    pub async fn update_price_feed(
        &self,
        asset: Address,
        feed: Address,
        options: RunOptions,
    ) -> Result<OperationReport> {
        info!(asset = %asset, feed = %feed, mode = %options.mode(), "Updating price feed");

        let roles = self.roles().await?;
        let current = self.gateway.source_of_asset(asset).await?;

        let mut report = OperationReport::new(Operation::UpdatePriceFeed, asset, options, roles);
        report.diff.record(Field::PriceFeed, current, Some(feed));

        if report.diff.is_empty() {
            info!(asset = %asset, "Price feed already up to date");
            return Ok(report);
        }

        let price = self.gateway.asset_price(asset).await?;
        info!(asset = %asset, source = %short_address(&current), price = %price, "Current oracle price");

        ConfirmationGate::assert_confirmed(options.mode(), options.confirmed)?;
        let actions = self.planner.plan_price_feed(asset, feed);
        self.execute(&mut report, &actions).await;
        Ok(report)
    }

    /// Reads the detailed view of every listed market, or only of `asset`.
    ///
    /// # Errors
    ///
    /// Returns `AssetNotListed` if `asset` has no reserve, or a remote error.
    pub async fn list_markets(&self, asset: Option<Address>) -> Result<Vec<MarketDetail>> {
        let reader = self.reader();
        let assets = match asset {
            Some(asset) => {
                self.require_listed(asset, true).await?;
                vec![asset]
            }
            None => reader.listed_assets().await?,
        };
        debug!(count = assets.len(), "Reading markets");

        let mut details = Vec::with_capacity(assets.len());
        for asset in assets {
            details.push(reader.market_detail(asset).await?);
        }
        Ok(details)
    }
}
