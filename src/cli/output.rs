//! Output formatting for CLI commands.
//!
//! Operation reports and market listings render either as colored text
//! with tables or as pretty JSON.

use colored::Colorize;
use std::fmt::Write;
use std::path::PathBuf;
use tabled::{Table, Tabled};

use crate::config::short_address;
use crate::market::MarketDetail;
use crate::planner::{ActionState, RunMode, RunReport};
use crate::reconciler::OperationReport;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Market row for the summary table.
#[derive(Tabled)]
struct MarketRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Flags")]
    flags: String,
    #[tabled(rename = "LTV")]
    ltv: String,
    #[tabled(rename = "LT")]
    liquidation_threshold: String,
    #[tabled(rename = "RF")]
    reserve_factor: String,
    #[tabled(rename = "Supply cap")]
    supply_cap: String,
    #[tabled(rename = "Borrow cap")]
    borrow_cap: String,
    #[tabled(rename = "Feed")]
    price_feed: String,
}

/// Diff row.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Target")]
    target: String,
}

/// Plan action row.
#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    label: String,
    #[tabled(rename = "Call")]
    call: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Tx")]
    tx: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the outcome of a market operation.
    #[must_use]
    pub fn format_report(&self, report: &OperationReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    fn format_report_text(report: &OperationReport) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "\n{} {}", "▶".cyan(), report.operation.to_string().bold());
        let _ = writeln!(output, "   Asset: {}", report.asset);
        let _ = writeln!(output, "   Identity: {}", report.roles);
        let _ = writeln!(output, "   Mode: {}", report.mode);
        if let Some(fingerprint) = &report.fingerprint {
            let _ = writeln!(output, "   Config hash: {}", &fingerprint[..8.min(fingerprint.len())]);
        }

        if report.is_up_to_date() {
            let _ = writeln!(
                output,
                "\n{} Already up to date - no changes required.",
                "✓".green()
            );
            return output;
        }

        if !report.diff.is_empty() {
            let rows: Vec<ChangeRow> = report
                .diff
                .iter()
                .map(|(field, change)| ChangeRow {
                    field: field.to_string(),
                    current: change.current.to_string(),
                    target: change.target.to_string(),
                })
                .collect();
            let _ = writeln!(output, "\nChanges ({}):", report.diff.len());
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        if let Some(run) = &report.run {
            output.push_str(&Self::format_run_text(report, run));
        }

        if !report.remaining.is_empty() {
            let _ = writeln!(
                output,
                "\n{} Still out of sync: {}",
                "⚠".yellow(),
                report.remaining.field_names().join(", ")
            );
        }

        output
    }

    fn format_run_text(report: &OperationReport, run: &RunReport) -> String {
        let mut output = String::new();

        let rows: Vec<ActionRow> = report
            .plan
            .iter()
            .zip(&run.outcomes)
            .map(|(action, outcome)| ActionRow {
                index: outcome.index,
                label: action.label.clone(),
                call: Self::truncate(&action.call, 60),
                state: Self::format_state(outcome.state),
                tx: outcome
                    .tx_hash
                    .map_or_else(|| String::from("-"), |hash| hash.to_string()),
            })
            .collect();

        let _ = writeln!(output, "\nPlan (run {}):", run.run_id);
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if let Some(failed) = run.outcomes.iter().find(|o| o.state == ActionState::Failed) {
            let _ = writeln!(
                output,
                "\n{} [{}] {}: {}",
                "✗".red(),
                failed.index,
                failed.label,
                failed.error.as_deref().unwrap_or("unknown error")
            );
            let _ = writeln!(
                output,
                "   {} completed, {} not attempted",
                run.completed(),
                run.pending()
            );
        } else {
            let _ = writeln!(
                output,
                "\n{} {} action(s) {}",
                "✓".green(),
                run.completed(),
                if run.mode == RunMode::DryRun { "simulated" } else { "applied" }
            );
        }

        output
    }

    /// Formats listed markets.
    #[must_use]
    pub fn format_markets(&self, markets: &[MarketDetail], detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(markets).unwrap_or_default(),
            OutputFormat::Text => Self::format_markets_text(markets, detailed),
        }
    }

    fn format_markets_text(markets: &[MarketDetail], detailed: bool) -> String {
        if markets.is_empty() {
            return String::from("\n   No markets listed.\n");
        }

        let mut output = String::new();
        let _ = writeln!(output, "\n📊 Markets ({})\n", markets.len());

        let rows: Vec<MarketRow> = markets
            .iter()
            .map(|m| MarketRow {
                symbol: m.metadata.symbol.clone(),
                asset: short_address(&m.snapshot.asset),
                flags: Self::format_flags(m),
                ltv: m.snapshot.ltv.to_string(),
                liquidation_threshold: m.snapshot.liquidation_threshold.to_string(),
                reserve_factor: m.snapshot.reserve_factor.to_string(),
                supply_cap: m.snapshot.supply_cap.to_string(),
                borrow_cap: m.snapshot.borrow_cap.to_string(),
                price_feed: short_address(&m.snapshot.price_feed),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if detailed || markets.len() == 1 {
            for market in markets {
                output.push_str(&Self::format_detail_text(market));
            }
        }

        output
    }

    fn format_detail_text(market: &MarketDetail) -> String {
        let s = &market.snapshot;
        let mut output = String::new();

        let _ = writeln!(
            output,
            "\n{} ({}, {} decimals)",
            market.metadata.symbol.bold(),
            market.metadata.name,
            market.metadata.decimals_display()
        );
        let _ = writeln!(output, "   Asset: {}", s.asset);
        let _ = writeln!(output, "   aToken: {}", market.a_token);
        let _ = writeln!(output, "   Variable debt token: {}", market.variable_debt_token);
        let _ = writeln!(output, "   Interest rate strategy: {}", market.interest_rate_strategy);
        let _ = writeln!(output, "   Price feed: {} (price {})", s.price_feed, market.price);
        let _ = writeln!(
            output,
            "   Risk: ltv={} threshold={} bonus={} reserveFactor={} protocolFee={}",
            s.ltv, s.liquidation_threshold, s.liquidation_bonus, s.reserve_factor,
            s.liquidation_protocol_fee
        );
        let _ = writeln!(
            output,
            "   Caps: supply={} borrow={} debtCeiling={}",
            s.supply_cap, s.borrow_cap, s.debt_ceiling
        );
        let _ = writeln!(
            output,
            "   Liquidity: supplied={} borrowed={}",
            s.total_supply, s.total_debt
        );
        let _ = writeln!(
            output,
            "   Flags: active={} frozen={} paused={} borrowing={} flashloan={}",
            s.is_active, s.is_frozen, market.paused, s.borrowing_enabled, s.flashloan_enabled
        );

        output
    }

    /// Formats the files written by an export.
    #[must_use]
    pub fn format_exports(&self, paths: &[PathBuf]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(paths).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("\n{} Exported {} config(s):\n", "✓".green(), paths.len());
                for path in paths {
                    let _ = writeln!(output, "   - {}", path.display());
                }
                output
            }
        }
    }

    /// Compact flag column: active, frozen, paused, borrowing, flash loans.
    fn format_flags(market: &MarketDetail) -> String {
        let s = &market.snapshot;
        let mut flags = Vec::new();
        flags.push(if s.is_active { "A" } else { "-" });
        flags.push(if s.is_frozen { "F" } else { "-" });
        flags.push(if market.paused { "P" } else { "-" });
        flags.push(if s.borrowing_enabled { "B" } else { "-" });
        flags.push(if s.flashloan_enabled { "L" } else { "-" });
        flags.concat()
    }

    /// Formats an action state with color.
    fn format_state(state: ActionState) -> String {
        match state {
            ActionState::Pending => "pending".dimmed().to_string(),
            ActionState::Prechecked => "prechecked".yellow().to_string(),
            ActionState::Simulated => "simulated".cyan().to_string(),
            ActionState::Sent => "sent".green().to_string(),
            ActionState::Verified => "verified".green().to_string(),
            ActionState::Failed => "failed".red().to_string(),
        }
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{head}...")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DesiredState;
    use crate::market::StateReader;
    use crate::reconciler::{MarketReconciler, RunOptions};
    use crate::testing::{FakeMarket, FakeReserve};
    use alloy::primitives::{Address, U256};

    const ASSET: Address = Address::repeat_byte(0x11);
    const FEED: Address = Address::repeat_byte(0x22);

    fn market() -> FakeMarket {
        FakeMarket::new()
            .with_reserve(ASSET, FakeReserve::listed(), FEED)
            .with_symbol(ASSET, "WETH")
    }

    #[tokio::test]
    async fn test_report_json_shape() {
        let fake = market();
        let reconciler = MarketReconciler::new(&fake, Address::repeat_byte(0x99));
        let mut desired = DesiredState::for_asset(ASSET);
        desired.risk.ltv = Some(U256::from(7000));

        let report = reconciler
            .update_market(&desired, RunOptions { dry_run: true, confirmed: false })
            .await
            .expect("update");

        let json = OutputFormatter::new(OutputFormat::Json).format_report(&report);
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["operation"], "update-market");
        assert_eq!(value["mode"], "dry-run");
        assert_eq!(value["diff"]["ltv"]["target"], "7000");
        assert_eq!(value["run"]["outcomes"][0]["state"], "SIMULATED");
    }

    #[tokio::test]
    async fn test_report_text_up_to_date() {
        let fake = market();
        let reconciler = MarketReconciler::new(&fake, Address::repeat_byte(0x99));
        let report = reconciler
            .update_market(&DesiredState::for_asset(ASSET), RunOptions::default())
            .await
            .expect("update");

        let text = OutputFormatter::new(OutputFormat::Text).format_report(&report);
        assert!(text.contains("update-market"));
        assert!(text.contains("Already up to date"));
    }

    #[tokio::test]
    async fn test_markets_text_shows_detail_for_single_market() {
        let fake = market();
        let detail = StateReader::new(&fake).market_detail(ASSET).await.expect("detail");

        let text = OutputFormatter::new(OutputFormat::Text).format_markets(&[detail], false);
        assert!(text.contains("WETH"));
        assert!(text.contains("A--BL"));
        assert!(text.contains("Liquidity: supplied=0 borrowed=0"));
    }

    #[test]
    fn test_empty_market_list() {
        let text = OutputFormatter::new(OutputFormat::Text).format_markets(&[], true);
        assert!(text.contains("No markets listed"));
        let json = OutputFormatter::new(OutputFormat::Json).format_markets(&[], true);
        assert_eq!(json, "[]");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("abcdefghijkl", 8), "abcde...");
    }
}
