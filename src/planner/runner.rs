//! Plan runner and confirmation gate.
//!
//! Actions run strictly in order. The first failing phase stops the run;
//! later actions stay pending and nothing already sent is rolled back.

use std::fmt;

use alloy::primitives::TxHash;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{MarketAdminError, Result};
use crate::market::MarketGateway;

use super::plan::MarketAction;

/// Whether mutations are simulated or sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Simulate every mutation; nothing is sent.
    DryRun,
    /// Send every mutation.
    Live,
}

impl RunMode {
    /// Returns the mode for a dry-run flag.
    #[must_use]
    pub const fn from_dry_run(dry_run: bool) -> Self {
        if dry_run { Self::DryRun } else { Self::Live }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun => write!(f, "dry-run"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// Phase state of one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionState {
    /// Not attempted.
    Pending,
    /// Precheck passed.
    Prechecked,
    /// Simulation passed (dry-run).
    Simulated,
    /// Mutation included (live).
    Sent,
    /// Postcheck passed.
    Verified,
    /// A phase failed.
    Failed,
}

impl ActionState {
    /// Returns true if `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Prechecked | Self::Failed)
                | (Self::Prechecked, Self::Simulated | Self::Sent | Self::Failed)
                | (Self::Sent, Self::Verified | Self::Failed)
        )
    }

    /// Returns true if the action completed successfully in its mode.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Simulated | Self::Sent | Self::Verified)
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Prechecked => "PRECHECKED",
            Self::Simulated => "SIMULATED",
            Self::Sent => "SENT",
            Self::Verified => "VERIFIED",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Final state of one action in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    /// One-based position in the plan.
    pub index: usize,
    /// Action label.
    pub label: String,
    /// Final state.
    pub state: ActionState,
    /// Transaction hash, for sent actions.
    pub tx_hash: Option<TxHash>,
    /// Failure message, for the failed action.
    pub error: Option<String>,
}

impl ActionOutcome {
    fn pending(index: usize, action: &MarketAction) -> Self {
        Self {
            index,
            label: action.label().to_string(),
            state: ActionState::Pending,
            tx_hash: None,
            error: None,
        }
    }

    fn advance(&mut self, next: ActionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        self.state = next;
    }
}

/// Report of one run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Run identifier.
    pub run_id: Uuid,
    /// Run mode.
    pub mode: RunMode,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// Per-action outcomes, in plan order.
    pub outcomes: Vec<ActionOutcome>,
    /// The failure that stopped the run.
    #[serde(skip)]
    pub failure: Option<MarketAdminError>,
}

impl RunReport {
    /// Returns true if every action completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Number of completed actions.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.state.is_completed()).count()
    }

    /// Number of actions never attempted.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == ActionState::Pending)
            .count()
    }
}

/// Refuses live runs without operator confirmation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmationGate;

impl ConfirmationGate {
    /// Passes in dry-run mode, or in live mode when `confirmed`.
    ///
    /// # Errors
    ///
    /// Returns `ConfirmationRequired` for an unconfirmed live run.
    pub const fn assert_confirmed(mode: RunMode, confirmed: bool) -> Result<()> {
        match mode {
            RunMode::Live if !confirmed => Err(MarketAdminError::ConfirmationRequired),
            RunMode::Live | RunMode::DryRun => Ok(()),
        }
    }
}

/// Executes action plans against a gateway.
pub struct ActionRunner<'a> {
    gateway: &'a dyn MarketGateway,
}

impl fmt::Debug for ActionRunner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRunner").finish_non_exhaustive()
    }
}

impl<'a> ActionRunner<'a> {
    /// Creates a runner over `gateway`.
    #[must_use]
    pub const fn new(gateway: &'a dyn MarketGateway) -> Self {
        Self { gateway }
    }

    /// Runs `actions` in order, stopping at the first failure.
    pub async fn run(&self, actions: &[MarketAction], mode: RunMode) -> RunReport {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, mode = %mode, actions = actions.len(), "Starting run");

        let mut report = RunReport {
            run_id,
            mode,
            started_at: Utc::now(),
            outcomes: actions
                .iter()
                .enumerate()
                .map(|(i, action)| ActionOutcome::pending(i + 1, action))
                .collect(),
            failure: None,
        };

        for (action, outcome) in actions.iter().zip(report.outcomes.iter_mut()) {
            info!(index = outcome.index, label = action.label(), "Running action");

            if let Err(e) = self.run_action(action, mode, outcome).await {
                error!(index = outcome.index, label = action.label(), error = %e, "Action failed");
                outcome.advance(ActionState::Failed);
                outcome.error = Some(e.to_string());
                report.failure = Some(e);
                break;
            }
        }

        if report.failure.is_some() {
            let completed = report.completed();
            if completed > 0 && mode == RunMode::Live {
                warn!(completed, "Run stopped after partial application; earlier actions are not rolled back");
            }
        } else {
            info!(run_id = %run_id, completed = report.completed(), "Run completed");
        }

        report
    }

    async fn run_action(
        &self,
        action: &MarketAction,
        mode: RunMode,
        outcome: &mut ActionOutcome,
    ) -> Result<()> {
        action.precheck(self.gateway).await?;
        outcome.advance(ActionState::Prechecked);

        match mode {
            RunMode::DryRun => {
                action.simulate(self.gateway).await?;
                outcome.advance(ActionState::Simulated);
                info!(label = action.label(), call = %action.mutation(), "Simulation passed");
            }
            RunMode::Live => {
                let tx_hash = action.send(self.gateway).await?;
                outcome.tx_hash = Some(tx_hash);
                outcome.advance(ActionState::Sent);
                info!(label = action.label(), tx_hash = %tx_hash, "Mutation sent");

                if action.has_postcheck() {
                    action.postcheck(self.gateway).await?;
                    outcome.advance(ActionState::Verified);
                    info!(label = action.label(), "Postcheck passed");
                }
            }
        }

        Ok(())
    }
}
