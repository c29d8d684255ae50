//! Configuration module for the market administrator.
//!
//! This module handles all configuration-related functionality:
//! - Locating and loading desired-state documents and deployment records
//! - Normalizing untyped documents into a typed [`DesiredState`]
//! - Computing fingerprints of desired states
//! - Exporting live markets back into desired-state documents

mod address;
mod desired;
mod export;
mod hash;
mod normalizer;
mod parser;

pub use address::{parse_address, short_address};
pub use desired::{DesiredState, InitReserveInput, RiskConfig};
pub use export::{ConfigExporter, ExportMetadata};
pub use hash::ConfigHasher;
pub use normalizer::{ConfigNormalizer, DocumentOverrides, NormalizeMode};
pub use parser::{
    ConfigParser, DEFAULT_CONFIGS_DIR, DEFAULT_DEPLOYMENT_FILE, DeploymentRecord, env_value,
    first_present,
};
