//! JSON-RPC implementation of the market gateway.

use std::fmt;

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use tracing::{debug, info};

use super::contracts::{
    ConfiguratorInitReserveInput, IACLManager, IAaveOracle, IERC20Metadata, IPool,
    IPoolAddressesProvider, IPoolConfigurator, IPoolDataProvider,
};
use super::gateway::{MarketGateway, Mutation, ReserveCaps, ReserveConfiguration, ReserveTokens};
use super::resolver::{AddressRegistry, EndpointRole, Endpoints};
use crate::config::InitReserveInput;
use crate::error::{ConfigError, RemoteError, RemoteResult, Result};

/// A connection to the chain, optionally with a signing identity.
#[derive(Clone)]
pub struct ChainSession {
    provider: DynProvider,
    account: Option<Address>,
}

impl fmt::Debug for ChainSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainSession")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl ChainSession {
    /// Builds a session against `rpc_url`, signing with `private_key` when given.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL or the key is malformed.
    pub fn connect(rpc_url: &str, private_key: Option<&str>) -> Result<Self> {
        let url = Url::parse(rpc_url.trim()).map_err(|e| ConfigError::InvalidRpcUrl {
            url: rpc_url.to_string(),
            message: e.to_string(),
        })?;

        let Some(key) = private_key.map(str::trim).filter(|k| !k.is_empty()) else {
            debug!(url = %url, "Connecting read-only");
            let provider = ProviderBuilder::new().connect_http(url).erased();
            return Ok(Self {
                provider,
                account: None,
            });
        };

        let signer = key
            .parse::<PrivateKeySigner>()
            .map_err(|e| ConfigError::InvalidSignerKey {
                message: e.to_string(),
            })?;
        let account = signer.address();

        debug!(url = %url, account = %account, "Connecting with signer");
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self {
            provider,
            account: Some(account),
        })
    }

    /// Returns the acting identity, if a signer is configured.
    #[must_use]
    pub const fn account(&self) -> Option<Address> {
        self.account
    }

    /// Reads the chain identifier.
    ///
    /// # Errors
    ///
    /// Returns a remote error if the node cannot be reached.
    pub async fn chain_id(&self) -> RemoteResult<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| RemoteError::read("eth_chainId", e))
    }

    /// Returns a registry bound to the pool addresses provider at `address`.
    #[must_use]
    pub fn registry(&self, address: Address) -> ChainRegistry {
        ChainRegistry {
            provider: self.provider.clone(),
            address,
        }
    }

    /// Returns a gateway bound to the resolved endpoints.
    #[must_use]
    pub fn gateway(&self, endpoints: Endpoints) -> ChainGateway {
        ChainGateway {
            provider: self.provider.clone(),
            account: self.account,
            endpoints,
        }
    }
}

/// Pool addresses provider reached over JSON-RPC.
#[derive(Clone)]
pub struct ChainRegistry {
    provider: DynProvider,
    address: Address,
}

impl fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AddressRegistry for ChainRegistry {
    async fn lookup(&self, role: EndpointRole) -> RemoteResult<Address> {
        let registry = IPoolAddressesProvider::new(self.address, self.provider.clone());
        let result = match role {
            EndpointRole::Pool => registry.getPool().call().await,
            EndpointRole::PoolConfigurator => registry.getPoolConfigurator().call().await,
            EndpointRole::Oracle => registry.getPriceOracle().call().await,
            EndpointRole::AclManager => registry.getACLManager().call().await,
            EndpointRole::DataProvider => registry.getPoolDataProvider().call().await,
        };
        result.map_err(|e| RemoteError::read(format!("registry.{role}"), e))
    }
}

/// Market gateway reached over JSON-RPC.
#[derive(Clone)]
pub struct ChainGateway {
    provider: DynProvider,
    account: Option<Address>,
    endpoints: Endpoints,
}

impl fmt::Debug for ChainGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainGateway")
            .field("account", &self.account)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl ChainGateway {
    /// Returns the endpoints this gateway talks to.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn pool(&self) -> IPool::IPoolInstance<DynProvider> {
        IPool::new(self.endpoints.pool, self.provider.clone())
    }

    fn oracle(&self) -> IAaveOracle::IAaveOracleInstance<DynProvider> {
        IAaveOracle::new(self.endpoints.oracle, self.provider.clone())
    }

    fn acl(&self) -> IACLManager::IACLManagerInstance<DynProvider> {
        IACLManager::new(self.endpoints.acl_manager, self.provider.clone())
    }

    fn data_provider(&self) -> IPoolDataProvider::IPoolDataProviderInstance<DynProvider> {
        IPoolDataProvider::new(self.endpoints.data_provider, self.provider.clone())
    }

    fn erc20(&self, token: Address) -> IERC20Metadata::IERC20MetadataInstance<DynProvider> {
        IERC20Metadata::new(token, self.provider.clone())
    }

    /// Returns the target contract and calldata of a mutation.
    fn encode(&self, mutation: &Mutation) -> (Address, Bytes) {
        let configurator = self.endpoints.pool_configurator;
        let calldata = match mutation.clone() {
            Mutation::SetAssetSource { asset, source } => {
                let call = IAaveOracle::setAssetSourcesCall {
                    assets: vec![asset],
                    sources: vec![source],
                };
                return (self.endpoints.oracle, call.abi_encode().into());
            }
            Mutation::InitReserve { input } => IPoolConfigurator::initReservesCall {
                input: vec![init_reserve_tuple(&input)],
            }
            .abi_encode(),
            Mutation::DropReserve { asset } => {
                IPoolConfigurator::dropReserveCall { asset }.abi_encode()
            }
            Mutation::SetReserveActive { asset, active } => {
                IPoolConfigurator::setReserveActiveCall { asset, active }.abi_encode()
            }
            Mutation::SetReserveFreeze { asset, frozen } => {
                IPoolConfigurator::setReserveFreezeCall { asset, freeze: frozen }.abi_encode()
            }
            Mutation::SetReserveBorrowing { asset, enabled } => {
                IPoolConfigurator::setReserveBorrowingCall { asset, enabled }.abi_encode()
            }
            Mutation::ConfigureCollateral {
                asset,
                ltv,
                liquidation_threshold,
                liquidation_bonus,
            } => IPoolConfigurator::configureReserveAsCollateralCall {
                asset,
                ltv,
                liquidationThreshold: liquidation_threshold,
                liquidationBonus: liquidation_bonus,
            }
            .abi_encode(),
            Mutation::SetReserveFactor { asset, value } => IPoolConfigurator::setReserveFactorCall {
                asset,
                newReserveFactor: value,
            }
            .abi_encode(),
            Mutation::SetBorrowCap { asset, value } => IPoolConfigurator::setBorrowCapCall {
                asset,
                newBorrowCap: value,
            }
            .abi_encode(),
            Mutation::SetSupplyCap { asset, value } => IPoolConfigurator::setSupplyCapCall {
                asset,
                newSupplyCap: value,
            }
            .abi_encode(),
            Mutation::SetLiquidationProtocolFee { asset, value } => {
                IPoolConfigurator::setLiquidationProtocolFeeCall { asset, newFee: value }.abi_encode()
            }
            Mutation::SetReserveFlashLoaning { asset, enabled } => {
                IPoolConfigurator::setReserveFlashLoaningCall { asset, enabled }.abi_encode()
            }
            Mutation::SetDebtCeiling { asset, value } => IPoolConfigurator::setDebtCeilingCall {
                asset,
                newDebtCeiling: value,
            }
            .abi_encode(),
        };
        (configurator, calldata.into())
    }

    fn request(&self, mutation: &Mutation) -> RemoteResult<TransactionRequest> {
        let from = self.account.ok_or(RemoteError::MissingSigner)?;
        let (to, input) = self.encode(mutation);
        Ok(TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(input))
    }
}

fn init_reserve_tuple(input: &InitReserveInput) -> ConfiguratorInitReserveInput {
    ConfiguratorInitReserveInput {
        aTokenImpl: input.a_token_impl,
        variableDebtTokenImpl: input.variable_debt_token_impl,
        underlyingAsset: input.underlying_asset,
        aTokenName: input.a_token_name.clone(),
        aTokenSymbol: input.a_token_symbol.clone(),
        variableDebtTokenName: input.variable_debt_token_name.clone(),
        variableDebtTokenSymbol: input.variable_debt_token_symbol.clone(),
        params: input.params.clone(),
        interestRateData: input.interest_rate_data.clone(),
    }
}

#[async_trait]
impl MarketGateway for ChainGateway {
    async fn reserves_list(&self) -> RemoteResult<Vec<Address>> {
        self.pool()
            .getReservesList()
            .call()
            .await
            .map_err(|e| RemoteError::read("getReservesList", e))
    }

    async fn reserve_configuration(&self, asset: Address) -> RemoteResult<ReserveConfiguration> {
        let data = self
            .data_provider()
            .getReserveConfigurationData(asset)
            .call()
            .await
            .map_err(|e| RemoteError::read("getReserveConfigurationData", e))?;

        Ok(ReserveConfiguration {
            decimals: data.decimals,
            ltv: data.ltv,
            liquidation_threshold: data.liquidationThreshold,
            liquidation_bonus: data.liquidationBonus,
            reserve_factor: data.reserveFactor,
            usage_as_collateral_enabled: data.usageAsCollateralEnabled,
            borrowing_enabled: data.borrowingEnabled,
            stable_borrow_rate_enabled: data.stableBorrowRateEnabled,
            is_active: data.isActive,
            is_frozen: data.isFrozen,
        })
    }

    async fn reserve_caps(&self, asset: Address) -> RemoteResult<ReserveCaps> {
        let caps = self
            .data_provider()
            .getReserveCaps(asset)
            .call()
            .await
            .map_err(|e| RemoteError::read("getReserveCaps", e))?;

        Ok(ReserveCaps {
            borrow_cap: caps.borrowCap,
            supply_cap: caps.supplyCap,
        })
    }

    async fn liquidation_protocol_fee(&self, asset: Address) -> RemoteResult<U256> {
        self.data_provider()
            .getLiquidationProtocolFee(asset)
            .call()
            .await
            .map_err(|e| RemoteError::read("getLiquidationProtocolFee", e))
    }

    async fn flash_loan_enabled(&self, asset: Address) -> RemoteResult<bool> {
        self.data_provider()
            .getFlashLoanEnabled(asset)
            .call()
            .await
            .map_err(|e| RemoteError::read("getFlashLoanEnabled", e))
    }

    async fn debt_ceiling(&self, asset: Address) -> RemoteResult<U256> {
        self.data_provider()
            .getDebtCeiling(asset)
            .call()
            .await
            .map_err(|e| RemoteError::read("getDebtCeiling", e))
    }

    async fn paused(&self, asset: Address) -> RemoteResult<bool> {
        self.data_provider()
            .getPaused(asset)
            .call()
            .await
            .map_err(|e| RemoteError::read("getPaused", e))
    }

    async fn a_token_total_supply(&self, asset: Address) -> RemoteResult<U256> {
        self.data_provider()
            .getATokenTotalSupply(asset)
            .call()
            .await
            .map_err(|e| RemoteError::read("getATokenTotalSupply", e))
    }

    async fn total_debt(&self, asset: Address) -> RemoteResult<U256> {
        self.data_provider()
            .getTotalDebt(asset)
            .call()
            .await
            .map_err(|e| RemoteError::read("getTotalDebt", e))
    }

    async fn reserve_tokens(&self, asset: Address) -> RemoteResult<ReserveTokens> {
        let tokens = self
            .data_provider()
            .getReserveTokensAddresses(asset)
            .call()
            .await
            .map_err(|e| RemoteError::read("getReserveTokensAddresses", e))?;

        Ok(ReserveTokens {
            a_token: tokens.aTokenAddress,
            stable_debt_token: tokens.stableDebtTokenAddress,
            variable_debt_token: tokens.variableDebtTokenAddress,
        })
    }

    async fn interest_rate_strategy(&self, asset: Address) -> RemoteResult<Address> {
        self.data_provider()
            .getInterestRateStrategyAddress(asset)
            .call()
            .await
            .map_err(|e| RemoteError::read("getInterestRateStrategyAddress", e))
    }

    async fn source_of_asset(&self, asset: Address) -> RemoteResult<Address> {
        self.oracle()
            .getSourceOfAsset(asset)
            .call()
            .await
            .map_err(|e| RemoteError::read("getSourceOfAsset", e))
    }

    async fn asset_price(&self, asset: Address) -> RemoteResult<U256> {
        self.oracle()
            .getAssetPrice(asset)
            .call()
            .await
            .map_err(|e| RemoteError::read("getAssetPrice", e))
    }

    async fn token_symbol(&self, token: Address) -> RemoteResult<String> {
        self.erc20(token)
            .symbol()
            .call()
            .await
            .map_err(|e| RemoteError::read("symbol", e))
    }

    async fn token_name(&self, token: Address) -> RemoteResult<String> {
        self.erc20(token)
            .name()
            .call()
            .await
            .map_err(|e| RemoteError::read("name", e))
    }

    async fn token_decimals(&self, token: Address) -> RemoteResult<u8> {
        self.erc20(token)
            .decimals()
            .call()
            .await
            .map_err(|e| RemoteError::read("decimals", e))
    }

    async fn is_pool_admin(&self, account: Address) -> RemoteResult<bool> {
        self.acl()
            .isPoolAdmin(account)
            .call()
            .await
            .map_err(|e| RemoteError::read("isPoolAdmin", e))
    }

    async fn is_risk_admin(&self, account: Address) -> RemoteResult<bool> {
        self.acl()
            .isRiskAdmin(account)
            .call()
            .await
            .map_err(|e| RemoteError::read("isRiskAdmin", e))
    }

    async fn is_asset_listing_admin(&self, account: Address) -> RemoteResult<bool> {
        self.acl()
            .isAssetListingAdmin(account)
            .call()
            .await
            .map_err(|e| RemoteError::read("isAssetListingAdmin", e))
    }

    async fn simulate(&self, mutation: &Mutation) -> RemoteResult<()> {
        let request = self.request(mutation)?;
        self.provider
            .call(request)
            .await
            .map_err(|e| RemoteError::rejected(mutation.operation(), e))?;
        debug!(mutation = %mutation, "Simulation succeeded");
        Ok(())
    }

    async fn send(&self, mutation: &Mutation) -> RemoteResult<TxHash> {
        let request = self.request(mutation)?;
        let operation = mutation.operation();

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| RemoteError::rejected(operation, e))?;
        info!(operation, tx_hash = %pending.tx_hash(), "Transaction submitted");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| RemoteError::rejected(operation, e))?;

        if !receipt.status() {
            return Err(RemoteError::Reverted {
                operation: operation.to_string(),
                tx_hash: receipt.transaction_hash.to_string(),
            });
        }

        Ok(receipt.transaction_hash)
    }
}
