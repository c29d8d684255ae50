//! Endpoint resolution for the five contract roles.
//!
//! An explicit value (environment, then deployment record) always wins.
//! Only missing roles are looked up in the pool addresses provider.

use std::fmt;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::config::{DeploymentRecord, first_present, parse_address};
use crate::error::{ConfigError, RemoteResult, Result};

/// A contract role the administrator talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRole {
    /// The lending pool.
    Pool,
    /// The pool configurator.
    PoolConfigurator,
    /// The price oracle.
    Oracle,
    /// The access-control manager.
    AclManager,
    /// The protocol data provider.
    DataProvider,
}

impl EndpointRole {
    /// Every role, in resolution order.
    pub const ALL: [Self; 5] = [
        Self::Pool,
        Self::PoolConfigurator,
        Self::Oracle,
        Self::AclManager,
        Self::DataProvider,
    ];

    /// Returns the role name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pool => "pool",
            Self::PoolConfigurator => "poolConfigurator",
            Self::Oracle => "aaveOracle",
            Self::AclManager => "aclManager",
            Self::DataProvider => "protocolDataProvider",
        }
    }

    /// Returns the environment keys for the role, preferred first.
    #[must_use]
    pub const fn env_keys(self) -> &'static [&'static str] {
        match self {
            Self::Pool => &["AAVE_POOL", "POOL"],
            Self::PoolConfigurator => &["AAVE_POOL_CONFIGURATOR", "POOL_CONFIGURATOR"],
            Self::Oracle => &["AAVE_AAVE_ORACLE", "AAVE_ORACLE"],
            Self::AclManager => &["AAVE_ACL_MANAGER", "ACL_MANAGER"],
            Self::DataProvider => &["AAVE_PROTOCOL_DATA_PROVIDER", "PROTOCOL_DATA_PROVIDER"],
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Environment keys for the pool addresses provider.
pub const REGISTRY_ENV_KEYS: &[&str] = &["AAVE_POOL_ADDRESSES_PROVIDER", "POOL_ADDRESSES_PROVIDER"];

/// Resolved addresses for all five roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    /// Pool.
    pub pool: Address,
    /// Pool configurator.
    pub pool_configurator: Address,
    /// Price oracle.
    pub oracle: Address,
    /// ACL manager.
    pub acl_manager: Address,
    /// Protocol data provider.
    pub data_provider: Address,
}

impl Endpoints {
    /// Returns the address for a role.
    #[must_use]
    pub const fn get(&self, role: EndpointRole) -> Address {
        match role {
            EndpointRole::Pool => self.pool,
            EndpointRole::PoolConfigurator => self.pool_configurator,
            EndpointRole::Oracle => self.oracle,
            EndpointRole::AclManager => self.acl_manager,
            EndpointRole::DataProvider => self.data_provider,
        }
    }
}

/// Raw, unvalidated endpoint values from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointOverrides {
    /// Pool addresses provider.
    pub registry: Option<String>,
    /// Pool.
    pub pool: Option<String>,
    /// Pool configurator.
    pub pool_configurator: Option<String>,
    /// Price oracle.
    pub oracle: Option<String>,
    /// ACL manager.
    pub acl_manager: Option<String>,
    /// Protocol data provider.
    pub data_provider: Option<String>,
}

impl EndpointOverrides {
    /// Collects values through a key lookup, typically the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let role = |role: EndpointRole| first_present(role.env_keys(), &lookup);
        Self {
            registry: first_present(REGISTRY_ENV_KEYS, &lookup),
            pool: role(EndpointRole::Pool),
            pool_configurator: role(EndpointRole::PoolConfigurator),
            oracle: role(EndpointRole::Oracle),
            acl_manager: role(EndpointRole::AclManager),
            data_provider: role(EndpointRole::DataProvider),
        }
    }

    /// Collects values recorded by a previous deployment.
    #[must_use]
    pub fn from_deployment(record: &DeploymentRecord) -> Self {
        Self {
            registry: record.pool_addresses_provider.clone(),
            pool: record.pool_proxy.clone(),
            pool_configurator: record.pool_configurator_proxy.clone(),
            oracle: record.aave_oracle.clone(),
            acl_manager: record.acl_manager.clone(),
            data_provider: record.protocol_data_provider.clone(),
        }
    }

    /// Fills every unset value from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        fn pick(primary: Option<String>, fallback: Option<String>) -> Option<String> {
            primary
                .filter(|v| !v.trim().is_empty())
                .or(fallback)
        }

        Self {
            registry: pick(self.registry, fallback.registry),
            pool: pick(self.pool, fallback.pool),
            pool_configurator: pick(self.pool_configurator, fallback.pool_configurator),
            oracle: pick(self.oracle, fallback.oracle),
            acl_manager: pick(self.acl_manager, fallback.acl_manager),
            data_provider: pick(self.data_provider, fallback.data_provider),
        }
    }

    /// Returns the explicit value for a role, if any.
    #[must_use]
    pub fn get(&self, role: EndpointRole) -> Option<&str> {
        let value = match role {
            EndpointRole::Pool => &self.pool,
            EndpointRole::PoolConfigurator => &self.pool_configurator,
            EndpointRole::Oracle => &self.oracle,
            EndpointRole::AclManager => &self.acl_manager,
            EndpointRole::DataProvider => &self.data_provider,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// Returns true if every role has an explicit value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        EndpointRole::ALL.iter().all(|role| self.get(*role).is_some())
    }

    /// Parses the registry address, if one was given.
    pub fn registry_address(&self) -> Result<Option<Address>> {
        let Some(raw) = self
            .registry
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        else {
            return Ok(None);
        };

        parse_address("poolAddressesProvider", raw)
            .map(Some)
            .map_err(|_| {
                ConfigError::InvalidEndpoint {
                    role: String::from("poolAddressesProvider"),
                    value: raw.to_string(),
                }
                .into()
            })
    }
}

/// Registry of the market's core contracts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AddressRegistry: Send + Sync {
    /// Looks up the address registered for a role.
    async fn lookup(&self, role: EndpointRole) -> RemoteResult<Address>;
}

/// Resolves the five endpoint roles.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressResolver;

impl AddressResolver {
    /// Creates a new resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves every role, consulting the registry only for missing ones.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the role when an explicit value
    /// is malformed, or when a role has no value and the registry has none
    /// registered. A failed registry call is returned as a remote error.
    pub async fn resolve<R>(
        &self,
        overrides: &EndpointOverrides,
        registry: Option<&R>,
    ) -> Result<Endpoints>
    where
        R: AddressRegistry + ?Sized,
    {
        if overrides.is_complete() {
            debug!("All endpoints set explicitly, registry not consulted");
        }

        let mut resolved = [Address::ZERO; 5];

        for (slot, role) in resolved.iter_mut().zip(EndpointRole::ALL) {
            *slot = self.resolve_role(role, overrides, registry).await?;
        }

        let [pool, pool_configurator, oracle, acl_manager, data_provider] = resolved;
        Ok(Endpoints {
            pool,
            pool_configurator,
            oracle,
            acl_manager,
            data_provider,
        })
    }

    async fn resolve_role<R>(
        &self,
        role: EndpointRole,
        overrides: &EndpointOverrides,
        registry: Option<&R>,
    ) -> Result<Address>
    where
        R: AddressRegistry + ?Sized,
    {
        if let Some(raw) = overrides.get(role) {
            return parse_address(role.name(), raw).map_err(|_| {
                ConfigError::InvalidEndpoint {
                    role: role.name().to_string(),
                    value: raw.to_string(),
                }
                .into()
            });
        }

        let missing = || ConfigError::MissingEndpoint {
            role: role.name().to_string(),
        };

        let Some(registry) = registry else {
            return Err(missing().into());
        };

        match registry.lookup(role).await {
            Ok(address) if address != Address::ZERO => {
                debug!(role = %role, address = %address, "Resolved endpoint from registry");
                Ok(address)
            }
            Ok(_) => Err(missing().into()),
            Err(e) => Err(e.into()),
        }
    }
}
