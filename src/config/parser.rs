//! Document loading for desired-state files and deployment records.
//!
//! Desired-state documents must live inside a fixed configuration
//! directory, carry a `.json` extension and exist. Paths are resolved
//! lexically, so `..` components cannot escape the directory.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ConfigError, MarketAdminError, Result};

use super::desired::DesiredState;
use super::normalizer::{ConfigNormalizer, DocumentOverrides, NormalizeMode};

/// Default configuration directory, relative to the working directory.
pub const DEFAULT_CONFIGS_DIR: &str = "configs";

/// Default deployment record path.
pub const DEFAULT_DEPLOYMENT_FILE: &str = "deployments/arbitrum-sepolia/market-deployment.json";

/// Parser for desired-state documents.
#[derive(Debug, Clone)]
pub struct ConfigParser {
    /// Directory every document must resolve into.
    configs_dir: PathBuf,
}

impl Default for ConfigParser {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIGS_DIR)
    }
}

impl ConfigParser {
    /// Creates a parser rooted at `configs_dir`.
    #[must_use]
    pub fn new(configs_dir: impl Into<PathBuf>) -> Self {
        Self {
            configs_dir: configs_dir.into(),
        }
    }

    /// Returns the configuration directory.
    #[must_use]
    pub fn configs_dir(&self) -> &Path {
        &self.configs_dir
    }

    /// Resolves a requested document path or name inside the configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing was requested, the path escapes the
    /// directory, lacks a `.json` extension, or does not exist.
    pub fn resolve_config_path(&self, requested: Option<&str>) -> Result<PathBuf> {
        let requested = requested
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(ConfigError::MissingConfigPath)?;

        let base = normalize_lexically(&std::path::absolute(&self.configs_dir)?);
        let candidate = normalize_lexically(&base.join(requested));

        if candidate == base || !candidate.starts_with(&base) {
            return Err(ConfigError::OutsideConfigDir {
                path: candidate,
                base,
            }
            .into());
        }

        if candidate.extension().and_then(|e| e.to_str()) != Some("json") {
            return Err(ConfigError::InvalidExtension { path: candidate }.into());
        }

        if !candidate.is_file() {
            return Err(ConfigError::FileNotFound { path: candidate }.into());
        }

        debug!("Resolved config path: {}", candidate.display());
        Ok(candidate)
    }

    /// Loads a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load_document(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());
        read_json(path)
    }

    /// Resolves, loads and normalizes a desired-state document.
    ///
    /// Touches only the local filesystem, so every document error surfaces
    /// before a remote session exists.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the document cannot be located or
    /// read, or a validation error naming the first offending field.
    pub fn load_desired(
        &self,
        requested: Option<&str>,
        overrides: &DocumentOverrides,
        mode: NormalizeMode,
    ) -> Result<(PathBuf, DesiredState)> {
        let path = self.resolve_config_path(requested)?;
        let raw = self.load_document(&path)?;
        let desired = ConfigNormalizer::new().normalize(&raw, overrides, mode)?;
        info!(config = %path.display(), asset = %desired.asset, "Loaded desired state");
        Ok((path, desired))
    }

    /// Loads the .env file from the working directory if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = PathBuf::from(".env");

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                MarketAdminError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Loads the deployment record. A missing file yields an empty record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is not a valid record.
    pub fn load_deployment_record(&self, path: Option<&Path>) -> Result<DeploymentRecord> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_DEPLOYMENT_FILE));
        if !path.is_file() {
            debug!("Deployment record not found at: {}", path.display());
            return Ok(DeploymentRecord::default());
        }

        info!("Loading deployment record from: {}", path.display());
        let value = read_json(path)?;
        serde_json::from_value(value).map_err(|e| {
            MarketAdminError::Config(ConfigError::ParseError {
                message: format!("Invalid deployment record: {e}"),
                location: Some(path.display().to_string()),
            })
        })
    }
}

/// Endpoint addresses recorded by a previous deployment.
///
/// Values are kept as raw strings and validated during endpoint resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentRecord {
    /// Registry of the market's core contracts.
    pub pool_addresses_provider: Option<String>,
    /// Pool configurator proxy.
    pub pool_configurator_proxy: Option<String>,
    /// Price oracle.
    pub aave_oracle: Option<String>,
    /// Access-control manager.
    pub acl_manager: Option<String>,
    /// Pool proxy.
    pub pool_proxy: Option<String>,
    /// Protocol data provider.
    pub protocol_data_provider: Option<String>,
    /// Any other recorded entries.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Returns the first non-blank value among `keys`, trimmed.
#[must_use]
pub fn env_value(keys: &[&str]) -> Option<String> {
    first_present(keys, |key| std::env::var(key).ok())
}

/// Returns the first non-blank value among `keys` according to `lookup`.
pub fn first_present(keys: &[&str], lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    keys.iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MarketAdminError::Config(ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })
    })?;

    serde_json::from_str(&content).map_err(|e| {
        MarketAdminError::Config(ConfigError::ParseError {
            message: format!("JSON parse error: {e}"),
            location: Some(path.display().to_string()),
        })
    })
}

/// Resolves `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ConfigParser) {
        let dir = TempDir::new().expect("tempdir");
        let configs = dir.path().join("configs");
        std::fs::create_dir_all(configs.join("arbitrum-sepolia")).expect("mkdir");
        std::fs::write(configs.join("weth.json"), r#"{"market":{"asset":"0x0"}}"#).expect("write");
        std::fs::write(configs.join("arbitrum-sepolia/usdc.json"), "{}").expect("write");
        std::fs::write(configs.join("notes.txt"), "x").expect("write");
        std::fs::write(dir.path().join("outside.json"), "{}").expect("write");
        let parser = ConfigParser::new(configs);
        (dir, parser)
    }

    #[test]
    fn test_resolves_inside_dir() {
        let (_dir, parser) = setup();
        let path = parser.resolve_config_path(Some("weth.json")).expect("inside");
        assert!(path.ends_with("configs/weth.json"));

        let nested = parser
            .resolve_config_path(Some("arbitrum-sepolia/../arbitrum-sepolia/usdc.json"))
            .expect("nested");
        assert!(nested.ends_with("arbitrum-sepolia/usdc.json"));
    }

    #[test]
    fn test_rejects_traversal_and_absolute_escape() {
        let (dir, parser) = setup();
        let err = parser.resolve_config_path(Some("../outside.json")).expect_err("escape");
        assert!(matches!(err, MarketAdminError::Config(ConfigError::OutsideConfigDir { .. })));

        let absolute = dir.path().join("outside.json");
        let err = parser
            .resolve_config_path(absolute.to_str())
            .expect_err("absolute escape");
        assert!(matches!(err, MarketAdminError::Config(ConfigError::OutsideConfigDir { .. })));

        let err = parser.resolve_config_path(Some(".")).expect_err("directory itself");
        assert!(matches!(err, MarketAdminError::Config(ConfigError::OutsideConfigDir { .. })));
    }

    #[test]
    fn test_rejects_missing_extension_and_file() {
        let (_dir, parser) = setup();
        let err = parser.resolve_config_path(None).expect_err("missing");
        assert!(matches!(err, MarketAdminError::Config(ConfigError::MissingConfigPath)));

        let err = parser.resolve_config_path(Some("notes.txt")).expect_err("extension");
        assert!(matches!(err, MarketAdminError::Config(ConfigError::InvalidExtension { .. })));

        let err = parser.resolve_config_path(Some("dai.json")).expect_err("not found");
        assert!(matches!(err, MarketAdminError::Config(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_load_document() {
        let (_dir, parser) = setup();
        let path = parser.resolve_config_path(Some("weth.json")).expect("inside");
        let doc = parser.load_document(&path).expect("json");
        assert_eq!(doc["market"]["asset"], "0x0");
    }

    #[tokio::test]
    async fn test_invalid_listing_fails_before_endpoint_resolution() {
        use crate::error::ValidationError;
        use crate::market::resolver::MockAddressRegistry;
        use crate::market::{AddressResolver, EndpointOverrides};

        let (_dir, parser) = setup();
        let asset = "0x2222222222222222222222222222222222222222";
        let implementation = "0x1111111111111111111111111111111111111111";
        let document = serde_json::json!({
            "market": {
                "asset": asset,
                "priceFeed": "0x3333333333333333333333333333333333333333",
                "initReserveInput": {
                    "aTokenImpl": implementation,
                    "variableDebtTokenImpl": implementation,
                    "underlyingAsset": asset,
                    "aTokenName": "Aave Test Token",
                    "variableDebtTokenName": "Aave Variable Debt Test Token",
                    "variableDebtTokenSymbol": "variableDebtTST",
                    "params": "0x10",
                    "interestRateData": "0x"
                }
            }
        });
        std::fs::write(
            parser.configs_dir().join("listing.json"),
            document.to_string(),
        )
        .expect("write");

        let mut registry = MockAddressRegistry::new();
        registry.expect_lookup().never();
        let overrides = EndpointOverrides {
            registry: Some(String::from("0x4444444444444444444444444444444444444444")),
            ..EndpointOverrides::default()
        };

        let result = async {
            let (_, desired) = parser.load_desired(
                Some("listing.json"),
                &DocumentOverrides::default(),
                NormalizeMode::Listing,
            )?;
            AddressResolver::new().resolve(&overrides, Some(&registry)).await?;
            Ok::<_, MarketAdminError>(desired)
        }
        .await;

        let err = result.expect_err("incomplete listing");
        assert!(matches!(
            err,
            MarketAdminError::Validation(ValidationError::MissingField { ref field })
                if field == "initReserveInput.aTokenSymbol"
        ));
    }

    #[test]
    fn test_load_desired_for_update() {
        let (_dir, parser) = setup();
        std::fs::write(
            parser.configs_dir().join("dai.json"),
            r#"{"market":{"asset":"0x2222222222222222222222222222222222222222","riskConfig":{"ltv":"7000"}}}"#,
        )
        .expect("write");

        let (path, desired) = parser
            .load_desired(Some("dai.json"), &DocumentOverrides::default(), NormalizeMode::Update)
            .expect("valid document");
        assert!(path.ends_with("configs/dai.json"));
        assert_eq!(desired.risk.ltv, Some(alloy::primitives::U256::from(7000)));
    }

    #[test]
    fn test_deployment_record() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("market-deployment.json");
        std::fs::write(
            &path,
            r#"{"poolAddressesProvider":"0xabc","aaveOracle":"0xdef","network":"arbitrum-sepolia"}"#,
        )
        .expect("write");

        let parser = ConfigParser::default();
        let record = parser.load_deployment_record(Some(&path)).expect("record");
        assert_eq!(record.pool_addresses_provider.as_deref(), Some("0xabc"));
        assert_eq!(record.aave_oracle.as_deref(), Some("0xdef"));
        assert!(record.pool_proxy.is_none());
        assert!(record.extra.contains_key("network"));

        let missing = parser
            .load_deployment_record(Some(&dir.path().join("absent.json")))
            .expect("empty record");
        assert_eq!(missing, DeploymentRecord::default());
    }

    #[test]
    fn test_first_present_skips_blank() {
        let env: HashMap<&str, &str> = HashMap::from([("AAVE_POOL", "  "), ("POOL", " 0x1 ")]);
        let value = first_present(&["AAVE_POOL", "POOL"], |k| env.get(k).map(ToString::to_string));
        assert_eq!(value.as_deref(), Some("0x1"));
        assert_eq!(first_present(&["NONE"], |k| env.get(k).map(ToString::to_string)), None);
    }
}
