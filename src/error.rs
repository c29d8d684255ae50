//! Error types for the market administration system.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration, document validation, remote reads, action phases and
//! post-run verification.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the market administration system.
#[derive(Debug, Error)]
pub enum MarketAdminError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Desired-state document validation errors.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A live run was requested without operator confirmation.
    #[error("Confirmation required: set AAVE_YES=true (--yes) for state-changing execution, or use AAVE_DRY_RUN=true (--dry-run)")]
    ConfirmationRequired,

    /// An action phase failed mid-run.
    #[error("Action failed: {0}")]
    Action(#[from] ActionError),

    /// A remote call failed.
    #[error("Remote read error: {0}")]
    Remote(#[from] RemoteError),

    /// The asset is already listed in the pool.
    #[error("Asset already listed: {asset}")]
    AssetAlreadyListed {
        /// The listed asset.
        asset: String,
    },

    /// The asset is not listed in the pool.
    #[error("Asset is not listed: {asset}")]
    AssetNotListed {
        /// The missing asset.
        asset: String,
    },

    /// The market still differs from the desired state after an update run.
    #[error("Sync verification failed: market is not fully synced with config ({})", fields.join(", "))]
    SyncVerificationFailed {
        /// Fields that still differ.
        fields: Vec<String>,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No desired-state document was named.
    #[error("missing config path (set AAVE_CONFIG or pass --config)")]
    MissingConfigPath,

    /// The document path escapes the configuration directory.
    #[error("config must be inside {base}: {path}")]
    OutsideConfigDir {
        /// Resolved document path.
        path: PathBuf,
        /// Configuration directory.
        base: PathBuf,
    },

    /// The document does not carry a `.json` extension.
    #[error("config file must have .json extension: {path}")]
    InvalidExtension {
        /// Offending path.
        path: PathBuf,
    },

    /// The configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// An endpoint role could not be resolved.
    #[error("missing {role} address (set it explicitly or provide a pool addresses provider)")]
    MissingEndpoint {
        /// Endpoint role name.
        role: String,
    },

    /// An endpoint resolved to a malformed address.
    #[error("invalid {role} address: {value}")]
    InvalidEndpoint {
        /// Endpoint role name.
        role: String,
        /// The rejected value.
        value: String,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// The RPC endpoint URL is malformed.
    #[error("Invalid RPC URL {url}: {message}")]
    InvalidRpcUrl {
        /// The rejected URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// The signing key could not be parsed.
    #[error("Invalid signer key: {message}")]
    InvalidSignerKey {
        /// Parser message.
        message: String,
    },

    /// A desired-state export could not be written.
    #[error("Failed to export {path}: {message}")]
    ExportFailed {
        /// Target file.
        path: PathBuf,
        /// Underlying failure.
        message: String,
    },
}

/// Desired-state document validation errors.
///
/// Every variant names the offending field, e.g. `riskConfig.ltv` or
/// `initReserveInput.aTokenSymbol`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is absent, null or empty.
    #[error("{field} is required")]
    MissingField {
        /// Field name.
        field: String,
    },

    /// A field does not hold a valid address.
    #[error("invalid {field} address: {value}")]
    InvalidAddress {
        /// Field name.
        field: String,
        /// The rejected value.
        value: String,
    },

    /// A field does not hold a non-negative decimal integer.
    #[error("invalid numeric value for {field}: {value}")]
    InvalidNumber {
        /// Field name.
        field: String,
        /// The rejected value.
        value: String,
    },

    /// A field does not hold a boolean.
    #[error("invalid boolean value for {field}: {value}")]
    InvalidBoolean {
        /// Field name.
        field: String,
        /// The rejected value.
        value: String,
    },

    /// A field does not hold a hex byte string.
    #[error("invalid byte string for {field}: {value}")]
    InvalidBytes {
        /// Field name.
        field: String,
        /// The rejected value.
        value: String,
    },

    /// A field holds a value of the wrong kind.
    #[error("invalid value for {field}: {message}")]
    InvalidField {
        /// Field name.
        field: String,
        /// What was wrong.
        message: String,
    },

    /// The asset and the reserve-initialization underlying asset diverge.
    #[error("asset must match initReserveInput.underlyingAsset ({asset} != {underlying})")]
    AssetMismatch {
        /// Resolved asset.
        asset: String,
        /// Underlying asset of the initialization block.
        underlying: String,
    },
}

impl ValidationError {
    /// Returns the name of the field that failed validation.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field }
            | Self::InvalidAddress { field, .. }
            | Self::InvalidNumber { field, .. }
            | Self::InvalidBoolean { field, .. }
            | Self::InvalidBytes { field, .. }
            | Self::InvalidField { field, .. } => field,
            Self::AssetMismatch { .. } => "initReserveInput.underlyingAsset",
        }
    }
}

/// Failures of the individual action phases.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    /// The precheck did not hold; nothing was mutated.
    #[error("[{label}] precondition failed: {message}")]
    PreconditionFailed {
        /// Action label.
        label: String,
        /// Why the precondition failed.
        message: String,
    },

    /// The remote system rejected the simulated mutation.
    #[error("[{label}] simulation failed: {reason}")]
    SimulationFailed {
        /// Action label.
        label: String,
        /// Remote rejection reason, verbatim.
        reason: String,
    },

    /// The live mutation was rejected or reverted.
    #[error("[{label}] send failed: {reason}")]
    SendFailed {
        /// Action label.
        label: String,
        /// Remote rejection reason, verbatim.
        reason: String,
    },

    /// The mutation landed but its effect could not be confirmed.
    #[error("[{label}] postcondition failed: {message} (the change was sent; investigate manually)")]
    PostconditionFailed {
        /// Action label.
        label: String,
        /// What could not be confirmed.
        message: String,
    },
}

/// Remote contract system errors.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// A read-only call failed.
    #[error("{operation} failed: {message}")]
    ReadFailed {
        /// Remote operation name.
        operation: String,
        /// Transport or revert message.
        message: String,
    },

    /// A mutating call was rejected.
    #[error("{operation} rejected: {reason}")]
    Rejected {
        /// Remote operation name.
        operation: String,
        /// Remote rejection reason.
        reason: String,
    },

    /// A transaction was included but reverted.
    #[error("{operation} reverted in transaction {tx_hash}")]
    Reverted {
        /// Remote operation name.
        operation: String,
        /// Transaction hash.
        tx_hash: String,
    },

    /// A mutation was attempted without a signing identity.
    #[error("no signing identity configured (set AAVE_PRIVATE_KEY)")]
    MissingSigner,
}

impl RemoteError {
    /// Creates a read failure for the named operation.
    #[must_use]
    pub fn read(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::ReadFailed {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Creates a rejection for the named mutating operation.
    #[must_use]
    pub fn rejected(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Rejected {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the remote reason, without the operation prefix, where one exists.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::ReadFailed { message, .. } => message.clone(),
            Self::Rejected { reason, .. } => reason.clone(),
            Self::Reverted { .. } | Self::MissingSigner => self.to_string(),
        }
    }
}

/// Result type alias for market administration operations.
pub type Result<T> = std::result::Result<T, MarketAdminError>;

/// Result type alias for calls against the remote contract system.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

impl MarketAdminError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if the error happened after mutations may have landed.
    #[must_use]
    pub const fn is_mid_run(&self) -> bool {
        matches!(self, Self::Action(_) | Self::SyncVerificationFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_field() {
        let err = ValidationError::MissingField {
            field: String::from("initReserveInput.aTokenSymbol"),
        };
        assert_eq!(err.field(), "initReserveInput.aTokenSymbol");
        assert_eq!(err.to_string(), "initReserveInput.aTokenSymbol is required");
    }

    #[test]
    fn test_action_error_display_carries_label() {
        let err = ActionError::PreconditionFailed {
            label: String::from("Drop reserve"),
            message: String::from("non-zero supply"),
        };
        assert!(err.to_string().contains("Drop reserve"));
        assert!(MarketAdminError::from(err).is_mid_run());
    }

    #[test]
    fn test_sync_failure_lists_fields() {
        let err = MarketAdminError::SyncVerificationFailed {
            fields: vec![String::from("ltv"), String::from("supplyCap")],
        };
        assert!(err.to_string().contains("ltv, supplyCap"));
    }

    #[test]
    fn test_remote_reason_is_verbatim() {
        let err = RemoteError::rejected("dropReserve", "execution reverted: 62");
        assert_eq!(err.reason(), "execution reverted: 62");
    }
}
