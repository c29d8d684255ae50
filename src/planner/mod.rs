//! Planning module for market reconciliation.
//!
//! This module compares a market snapshot with a desired state, turns the
//! differences into an ordered action plan and runs that plan.

mod diff;
mod plan;
mod runner;

pub use diff::{Diff, DiffEngine, Field, FieldChange, FieldValue};
pub use plan::{ActionPlanner, ActionSummary, MarketAction};
pub use runner::{ActionOutcome, ActionRunner, ActionState, ConfirmationGate, RunMode, RunReport};
