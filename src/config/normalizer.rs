//! Desired-state normalization.
//!
//! Turns an untyped JSON document into a [`DesiredState`]. Nothing past
//! this boundary sees raw input: addresses are syntax-checked, numbers are
//! parsed into `U256`, flags into `bool`, and omitted fields stay `None`.

use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ValidationError;

use super::address::parse_address;
use super::desired::{DesiredState, InitReserveInput, RiskConfig};

/// Explicit values that win over the document.
#[derive(Debug, Clone, Default)]
pub struct DocumentOverrides {
    /// Asset override (CLI or `AAVE_ASSET`).
    pub asset: Option<String>,
    /// Price feed override (CLI or `AAVE_PRICE_FEED`).
    pub price_feed: Option<String>,
}

/// Which operation the document is normalized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeMode {
    /// Partial reconciliation of a listed market.
    Update,
    /// Listing a new market: price feed and `initReserveInput` are mandatory.
    Listing,
}

/// Normalizer for desired-state documents.
#[derive(Debug, Default)]
pub struct ConfigNormalizer;

/// Field names of the initialization block, in validation order.
const INIT_RESERVE_FIELDS: [&str; 9] = [
    "aTokenImpl",
    "variableDebtTokenImpl",
    "underlyingAsset",
    "aTokenName",
    "aTokenSymbol",
    "variableDebtTokenName",
    "variableDebtTokenSymbol",
    "params",
    "interestRateData",
];

impl ConfigNormalizer {
    /// Creates a new normalizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Normalizes a document for the given operation.
    ///
    /// The market object is read from `market` when present, otherwise from
    /// the document root.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first offending field.
    pub fn normalize(
        &self,
        raw: &Value,
        overrides: &DocumentOverrides,
        mode: NormalizeMode,
    ) -> Result<DesiredState, ValidationError> {
        let market = Self::market_object(raw)?;
        let doc = Section::root(market);

        let asset = match present_override(overrides.asset.as_deref()) {
            Some(value) => parse_address("asset", value)?,
            None => doc.required_address("asset")?,
        };

        let price_feed = match present_override(overrides.price_feed.as_deref()) {
            Some(value) => Some(parse_address("priceFeed", value)?),
            None if mode == NormalizeMode::Listing => Some(doc.required_address("priceFeed")?),
            None => doc.optional_address("priceFeed")?,
        };

        let risk = match doc.section("riskConfig")? {
            Some(section) => Self::risk_config(&section)?,
            None => RiskConfig::default(),
        };

        let init_reserve = match mode {
            NormalizeMode::Update => None,
            NormalizeMode::Listing => {
                let section = doc
                    .section("initReserveInput")?
                    .ok_or_else(|| ValidationError::MissingField {
                        field: String::from("initReserveInput"),
                    })?;
                let input = Self::init_reserve_input(&section)?;
                if input.underlying_asset != asset {
                    return Err(ValidationError::AssetMismatch {
                        asset: asset.to_string(),
                        underlying: input.underlying_asset.to_string(),
                    });
                }
                Some(input)
            }
        };

        debug!("Normalized desired state for asset {asset}");
        Ok(DesiredState {
            asset,
            price_feed,
            risk,
            init_reserve,
        })
    }

    fn market_object(raw: &Value) -> Result<&Map<String, Value>, ValidationError> {
        let root = raw.as_object().ok_or_else(|| ValidationError::InvalidField {
            field: String::from("market"),
            message: String::from("document must be a JSON object"),
        })?;
        match root.get("market") {
            Some(Value::Object(market)) => Ok(market),
            Some(Value::Null) | None => Ok(root),
            Some(_) => Err(ValidationError::InvalidField {
                field: String::from("market"),
                message: String::from("expected an object"),
            }),
        }
    }

    fn risk_config(section: &Section<'_>) -> Result<RiskConfig, ValidationError> {
        Ok(RiskConfig {
            ltv: section.optional_uint("ltv")?,
            liquidation_threshold: section.optional_uint("liquidationThreshold")?,
            liquidation_bonus: section.optional_uint("liquidationBonus")?,
            reserve_factor: section.optional_uint("reserveFactor")?,
            borrow_cap: section.optional_uint("borrowCap")?,
            supply_cap: section.optional_uint("supplyCap")?,
            liquidation_protocol_fee: section.optional_uint("liquidationProtocolFee")?,
            debt_ceiling: section.optional_uint("debtCeiling")?,
            borrowing_enabled: section.optional_bool("borrowingEnabled")?,
            flashloan_enabled: section.optional_bool("flashloanEnabled")?,
            active: section.optional_bool("active")?,
            frozen: section.optional_bool("frozen")?,
        })
    }

    fn init_reserve_input(section: &Section<'_>) -> Result<InitReserveInput, ValidationError> {
        for key in INIT_RESERVE_FIELDS {
            if section.present(key).is_none() {
                return Err(ValidationError::MissingField {
                    field: section.label(key),
                });
            }
        }

        Ok(InitReserveInput {
            a_token_impl: section.required_address("aTokenImpl")?,
            variable_debt_token_impl: section.required_address("variableDebtTokenImpl")?,
            underlying_asset: section.required_address("underlyingAsset")?,
            a_token_name: section.required_string("aTokenName")?,
            a_token_symbol: section.required_string("aTokenSymbol")?,
            variable_debt_token_name: section.required_string("variableDebtTokenName")?,
            variable_debt_token_symbol: section.required_string("variableDebtTokenSymbol")?,
            params: section.required_bytes("params")?,
            interest_rate_data: section.required_bytes("interestRateData")?,
        })
    }
}

fn present_override(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A JSON object plus the dotted prefix used to name its fields in errors.
struct Section<'a> {
    map: &'a Map<String, Value>,
    prefix: String,
}

impl<'a> Section<'a> {
    const fn root(map: &'a Map<String, Value>) -> Self {
        Self {
            map,
            prefix: String::new(),
        }
    }

    fn label(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.prefix)
        }
    }

    /// Returns the value unless it is missing, null or an empty string.
    fn present(&self, key: &str) -> Option<&'a Value> {
        match self.map.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(value) => Some(value),
        }
    }

    fn section(&self, key: &str) -> Result<Option<Section<'a>>, ValidationError> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(Section {
                map,
                prefix: self.label(key),
            })),
            Some(_) => Err(ValidationError::InvalidField {
                field: self.label(key),
                message: String::from("expected an object"),
            }),
        }
    }

    fn optional_address(&self, key: &str) -> Result<Option<Address>, ValidationError> {
        self.present(key)
            .map(|value| match value {
                Value::String(s) => parse_address(&self.label(key), s),
                other => Err(ValidationError::InvalidAddress {
                    field: self.label(key),
                    value: other.to_string(),
                }),
            })
            .transpose()
    }

    fn required_address(&self, key: &str) -> Result<Address, ValidationError> {
        self.optional_address(key)?
            .ok_or_else(|| ValidationError::MissingField {
                field: self.label(key),
            })
    }

    fn optional_uint(&self, key: &str) -> Result<Option<U256>, ValidationError> {
        let Some(value) = self.present(key) else {
            return Ok(None);
        };
        let invalid = || ValidationError::InvalidNumber {
            field: self.label(key),
            value: value.to_string(),
        };
        let parsed = match value {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s),
            _ => None,
        };
        parsed.map(Some).ok_or_else(invalid)
    }

    fn optional_bool(&self, key: &str) -> Result<Option<bool>, ValidationError> {
        let Some(value) = self.present(key) else {
            return Ok(None);
        };
        match value {
            Value::Bool(b) => Ok(Some(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
            other => Err(ValidationError::InvalidBoolean {
                field: self.label(key),
                value: other.to_string(),
            }),
        }
    }

    fn required_string(&self, key: &str) -> Result<String, ValidationError> {
        match self.present(key) {
            None => Err(ValidationError::MissingField {
                field: self.label(key),
            }),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(ValidationError::InvalidField {
                field: self.label(key),
                message: format!("expected a string, got {other}"),
            }),
        }
    }

    fn required_bytes(&self, key: &str) -> Result<Bytes, ValidationError> {
        let raw = self.required_string(key)?;
        if !raw.starts_with("0x") {
            return Err(ValidationError::InvalidBytes {
                field: self.label(key),
                value: raw,
            });
        }
        Bytes::from_str(&raw).map_err(|_| ValidationError::InvalidBytes {
            field: self.label(key),
            value: raw.clone(),
        })
    }
}

/// Parses a non-negative decimal integer of at most 256 bits.
fn parse_decimal(text: &str) -> Option<U256> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_str_radix(text, 10).ok()
}
