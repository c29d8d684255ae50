//! Export of live markets into desired-state documents.
//!
//! One file per market under `<configs>/<network>/`, always overwritten.
//! The exported `market` object normalizes back into the values it was
//! read from.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::{ConfigError, MarketAdminError, Result};
use crate::market::{Snapshot, TokenMetadata};

const EXPORT_NOTE: &str = "This export contains sync-oriented market params. \
For add-market listing, initReserveInput must be added manually.";

/// Provenance block written next to the exported market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    /// Export time.
    pub exported_at: DateTime<Utc>,
    /// Token symbol.
    pub symbol: String,
    /// Token name.
    pub name: String,
    /// Token decimals, `?` when unreadable.
    pub decimals: String,
    /// Asset address.
    pub asset: String,
    /// Network directory name.
    pub network: String,
    /// Where the values were read from.
    pub source: String,
    /// Operator guidance.
    pub note: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedRiskConfig {
    ltv: String,
    liquidation_threshold: String,
    liquidation_bonus: String,
    reserve_factor: String,
    borrow_cap: String,
    supply_cap: String,
    liquidation_protocol_fee: String,
    debt_ceiling: String,
    borrowing_enabled: bool,
    flashloan_enabled: bool,
    active: bool,
    frozen: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedMarket {
    asset: String,
    price_feed: String,
    risk_config: ExportedRiskConfig,
}

#[derive(Debug, Serialize)]
struct ExportDocument {
    market: ExportedMarket,
    metadata: ExportMetadata,
}

/// Writes desired-state documents for live markets.
#[derive(Debug, Clone)]
pub struct ConfigExporter {
    configs_dir: PathBuf,
    network: String,
}

impl ConfigExporter {
    /// Creates an exporter writing under `configs_dir/<network>`.
    pub fn new(configs_dir: impl Into<PathBuf>, network: &str) -> Self {
        Self {
            configs_dir: configs_dir.into(),
            network: network.replace('_', "-"),
        }
    }

    /// Returns the default network name for a chain.
    #[must_use]
    pub fn default_network(chain_id: u64) -> String {
        format!("chain-{chain_id}")
    }

    /// Returns the directory files are written to.
    #[must_use]
    pub fn network_dir(&self) -> PathBuf {
        self.configs_dir.join(&self.network)
    }

    /// Returns the file name for a market.
    #[must_use]
    pub fn file_name(symbol: &str, snapshot: &Snapshot) -> String {
        let sanitized: String = symbol
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let asset = hex::encode(snapshot.asset);
        let prefix = asset.get(..8).unwrap_or(&asset);
        format!("{sanitized}-{prefix}.json")
    }

    /// Renders the export document for a market.
    ///
    /// # Errors
    ///
    /// Returns an internal error if serialization fails.
    pub fn render(
        &self,
        snapshot: &Snapshot,
        metadata: &TokenMetadata,
        exported_at: DateTime<Utc>,
    ) -> Result<String> {
        let asset = snapshot.asset.to_string();
        let document = ExportDocument {
            market: ExportedMarket {
                asset: asset.clone(),
                price_feed: snapshot.price_feed.to_string(),
                risk_config: ExportedRiskConfig {
                    ltv: snapshot.ltv.to_string(),
                    liquidation_threshold: snapshot.liquidation_threshold.to_string(),
                    liquidation_bonus: snapshot.liquidation_bonus.to_string(),
                    reserve_factor: snapshot.reserve_factor.to_string(),
                    borrow_cap: snapshot.borrow_cap.to_string(),
                    supply_cap: snapshot.supply_cap.to_string(),
                    liquidation_protocol_fee: snapshot.liquidation_protocol_fee.to_string(),
                    debt_ceiling: snapshot.debt_ceiling.to_string(),
                    borrowing_enabled: snapshot.borrowing_enabled,
                    flashloan_enabled: snapshot.flashloan_enabled,
                    active: snapshot.is_active,
                    frozen: snapshot.is_frozen,
                },
            },
            metadata: ExportMetadata {
                exported_at,
                symbol: metadata.symbol.clone(),
                name: metadata.name.clone(),
                decimals: metadata.decimals_display(),
                asset,
                network: self.network.clone(),
                source: String::from("onchain"),
                note: String::from(EXPORT_NOTE),
            },
        };

        let mut content = serde_json::to_string_pretty(&document)
            .map_err(|e| MarketAdminError::internal(e.to_string()))?;
        content.push('\n');
        Ok(content)
    }

    /// Writes the export file for a market and returns its path.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the directory or the file cannot be written.
    pub async fn export(&self, snapshot: &Snapshot, metadata: &TokenMetadata) -> Result<PathBuf> {
        let dir = self.network_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| export_failed(&dir, &e))?;

        let path = dir.join(Self::file_name(&metadata.symbol, snapshot));
        let content = self.render(snapshot, metadata, Utc::now())?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| export_failed(&path, &e))?;

        info!(path = %path.display(), asset = %snapshot.asset, "Exported market config");
        Ok(path)
    }
}

fn export_failed(path: &Path, error: &std::io::Error) -> ConfigError {
    ConfigError::ExportFailed {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigNormalizer, DocumentOverrides, NormalizeMode};
    use alloy::primitives::{Address, U256};
    use tempfile::TempDir;

    fn snapshot() -> Snapshot {
        Snapshot {
            asset: Address::repeat_byte(0xab),
            price_feed: Address::repeat_byte(0xfe),
            ltv: U256::from(7500),
            liquidation_threshold: U256::from(8000),
            liquidation_bonus: U256::from(10500),
            reserve_factor: U256::from(1000),
            borrow_cap: U256::from(0),
            supply_cap: U256::from(2_000_000u64),
            liquidation_protocol_fee: U256::from(1000),
            debt_ceiling: U256::MAX,
            borrowing_enabled: true,
            flashloan_enabled: false,
            is_active: true,
            is_frozen: false,
            decimals: U256::from(18),
            total_supply: U256::ZERO,
            total_debt: U256::ZERO,
        }
    }

    fn metadata(symbol: &str) -> TokenMetadata {
        TokenMetadata {
            symbol: symbol.to_string(),
            name: String::from("Wrapped Ether"),
            decimals: None,
        }
    }

    #[test]
    fn test_file_name_and_network_dir() {
        let exporter = ConfigExporter::new("/tmp/configs", "arbitrum_sepolia");
        assert_eq!(exporter.network_dir(), PathBuf::from("/tmp/configs/arbitrum-sepolia"));
        assert_eq!(
            ConfigExporter::file_name("USDC.e", &snapshot()),
            "USDC_e-abababab.json"
        );
        assert_eq!(ConfigExporter::default_network(421_614), "chain-421614");
    }

    #[tokio::test]
    async fn test_export_round_trips_through_normalizer() {
        let dir = TempDir::new().expect("tempdir");
        let exporter = ConfigExporter::new(dir.path(), "local");
        let snap = snapshot();

        let path = exporter.export(&snap, &metadata("WETH")).await.expect("export");
        let content = std::fs::read_to_string(&path).expect("read");
        assert!(content.ends_with('\n'));

        let raw: serde_json::Value = serde_json::from_str(&content).expect("json");
        assert_eq!(raw["metadata"]["decimals"], "?");
        assert_eq!(raw["market"]["riskConfig"]["frozen"], false);

        let desired = ConfigNormalizer::new()
            .normalize(&raw, &DocumentOverrides::default(), NormalizeMode::Update)
            .expect("normalize");

        assert_eq!(desired.asset, snap.asset);
        assert_eq!(desired.price_feed, Some(snap.price_feed));
        assert_eq!(desired.risk.ltv, Some(snap.ltv));
        assert_eq!(desired.risk.borrow_cap, Some(U256::ZERO));
        assert_eq!(desired.risk.debt_ceiling, Some(U256::MAX));
        assert_eq!(desired.risk.flashloan_enabled, Some(false));
        assert_eq!(desired.risk.active, Some(true));
    }

    #[tokio::test]
    async fn test_export_overwrites() {
        let dir = TempDir::new().expect("tempdir");
        let exporter = ConfigExporter::new(dir.path(), "local");
        let mut snap = snapshot();

        let first = exporter.export(&snap, &metadata("WETH")).await.expect("export");
        snap.ltv = U256::from(1);
        let second = exporter.export(&snap, &metadata("WETH")).await.expect("export");

        assert_eq!(first, second);
        let content = std::fs::read_to_string(&second).expect("read");
        assert!(content.contains("\"ltv\": \"1\""));
    }
}
