// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Aave Market Admin
//!
//! Declarative, verifiable reconciliation of Aave V3 market configuration.
//!
//! ## Overview
//!
//! A market's desired state lives in a JSON document. The tool reads the
//! live market, computes the minimal set of field changes and applies them
//! as an ordered sequence of actions, each checked before and after it
//! runs:
//!
//! - List a new market, update or remove a listed one
//! - Point a market at a new oracle source
//! - List live markets and export them as desired-state documents
//!
//! ## Architecture
//!
//! 1. **Desired State**: a normalized JSON document under `configs/`
//! 2. **Observed State**: a snapshot read through the [`market::MarketGateway`]
//! 3. **Reconciler**: diffs both and runs the resulting plan, dry-run or live
//!
//! Live runs refuse to start without explicit operator confirmation.
//!
//! ## Modules
//!
//! - [`config`]: Document loading, normalization, fingerprints and export
//! - [`market`]: Endpoint resolution, the remote gateway and state reading
//! - [`planner`]: Diff computation, action planning and execution
//! - [`reconciler`]: End-to-end market operations
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```json
//! {
//!   "market": {
//!     "asset": "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1",
//!     "priceFeed": "0x639Fe6ab55C921f74e7fac1ee960C0B6293ba612",
//!     "riskConfig": {
//!       "ltv": "7500",
//!       "liquidationThreshold": "8000",
//!       "supplyCap": "2000000",
//!       "borrowingEnabled": true
//!     }
//!   }
//! }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod market;
pub mod planner;
pub mod reconciler;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigExporter, ConfigHasher, ConfigNormalizer, ConfigParser, DesiredState};
pub use error::{MarketAdminError, Result};
pub use market::{AddressResolver, ChainSession, MarketGateway, StateReader};
pub use planner::{ActionPlanner, ActionRunner, DiffEngine, RunReport};
pub use reconciler::{MarketReconciler, OperationReport, RunOptions};
