//! Solidity bindings for the Aave V3 contracts the administrator touches.
#![allow(missing_docs)]

use alloy::sol;

sol! {
    /// Reserve-initialization tuple accepted by the pool configurator.
    struct ConfiguratorInitReserveInput {
        address aTokenImpl;
        address variableDebtTokenImpl;
        address underlyingAsset;
        string aTokenName;
        string aTokenSymbol;
        string variableDebtTokenName;
        string variableDebtTokenSymbol;
        bytes params;
        bytes interestRateData;
    }

    #[sol(rpc)]
    interface IPoolAddressesProvider {
        function getPool() external view returns (address);
        function getPoolConfigurator() external view returns (address);
        function getPriceOracle() external view returns (address);
        function getACLManager() external view returns (address);
        function getPoolDataProvider() external view returns (address);
    }

    #[sol(rpc)]
    interface IPool {
        function getReservesList() external view returns (address[]);
    }

    #[sol(rpc)]
    interface IPoolConfigurator {
        function initReserves(ConfiguratorInitReserveInput[] input) external;
        function dropReserve(address asset) external;
        function setReserveBorrowing(address asset, bool enabled) external;
        function configureReserveAsCollateral(address asset, uint256 ltv, uint256 liquidationThreshold, uint256 liquidationBonus) external;
        function setReserveFlashLoaning(address asset, bool enabled) external;
        function setReserveActive(address asset, bool active) external;
        function setReserveFreeze(address asset, bool freeze) external;
        function setReserveFactor(address asset, uint256 newReserveFactor) external;
        function setBorrowCap(address asset, uint256 newBorrowCap) external;
        function setSupplyCap(address asset, uint256 newSupplyCap) external;
        function setLiquidationProtocolFee(address asset, uint256 newFee) external;
        function setDebtCeiling(address asset, uint256 newDebtCeiling) external;
    }

    #[sol(rpc)]
    interface IAaveOracle {
        function setAssetSources(address[] assets, address[] sources) external;
        function getSourceOfAsset(address asset) external view returns (address);
        function getAssetPrice(address asset) external view returns (uint256);
    }

    #[sol(rpc)]
    interface IACLManager {
        function isPoolAdmin(address admin) external view returns (bool);
        function isRiskAdmin(address admin) external view returns (bool);
        function isAssetListingAdmin(address admin) external view returns (bool);
    }

    #[sol(rpc)]
    interface IPoolDataProvider {
        function getReserveConfigurationData(address asset) external view returns (uint256 decimals, uint256 ltv, uint256 liquidationThreshold, uint256 liquidationBonus, uint256 reserveFactor, bool usageAsCollateralEnabled, bool borrowingEnabled, bool stableBorrowRateEnabled, bool isActive, bool isFrozen);
        function getReserveCaps(address asset) external view returns (uint256 borrowCap, uint256 supplyCap);
        function getLiquidationProtocolFee(address asset) external view returns (uint256);
        function getFlashLoanEnabled(address asset) external view returns (bool);
        function getDebtCeiling(address asset) external view returns (uint256);
        function getPaused(address asset) external view returns (bool);
        function getATokenTotalSupply(address asset) external view returns (uint256);
        function getTotalDebt(address asset) external view returns (uint256);
        function getReserveTokensAddresses(address asset) external view returns (address aTokenAddress, address stableDebtTokenAddress, address variableDebtTokenAddress);
        function getInterestRateStrategyAddress(address asset) external view returns (address);
    }

    #[sol(rpc)]
    interface IERC20Metadata {
        function symbol() external view returns (string);
        function name() external view returns (string);
        function decimals() external view returns (uint8);
    }
}
