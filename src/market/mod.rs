//! Remote contract system access.
//!
//! - [`resolver`]: endpoint resolution for the five contract roles
//! - [`gateway`]: the session handle every remote call goes through
//! - [`chain`]: JSON-RPC implementation of the gateway
//! - [`reader`]: snapshots, token metadata and role membership

pub mod chain;
pub mod contracts;
pub mod gateway;
pub mod reader;
pub mod resolver;

pub use chain::{ChainGateway, ChainRegistry, ChainSession};
pub use gateway::{MarketGateway, Mutation, ReserveCaps, ReserveConfiguration, ReserveTokens};
pub use reader::{MarketDetail, RoleSnapshot, Snapshot, StateReader, TokenMetadata, UNKNOWN};
pub use resolver::{
    AddressRegistry, AddressResolver, EndpointOverrides, EndpointRole, Endpoints,
    REGISTRY_ENV_KEYS,
};
