//! Command-line interface for the market admin tool.
//!
//! Argument model in [`commands`], report and listing rendering in
//! [`output`].

mod commands;
mod output;

pub use commands::{Cli, Commands, MarketArgs, OutputFormat, RunArgs};
pub use output::OutputFormatter;
