//! Contract bindings for the two managed contract families.
//!
//! The registry family is the factory that deploys membership locks; the lock
//! family is the per-instance membership contract. Only the methods the
//! version-specific adapters actually call are declared here; the full
//! on-chain surface belongs to the contracts themselves.

use alloy_sol_types::sol;

sol! {
    /// The lock registry (factory) contract family.
    ///
    /// `registryVersion` is the standardized self-reporting probe; very old
    /// deployments predate it and are identified by bytecode hash instead
    /// (see [`crate::version`]).
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface ILockRegistry {
        function registryVersion() external view returns (uint16);
        function createLock(
            uint256 expirationDuration,
            address tokenAddress,
            uint256 keyPrice,
            uint256 maxNumberOfKeys,
            string calldata lockName,
            bytes32 salt
        ) external returns (address);
        function lockTemplate() external view returns (address);
    }

    /// The per-instance membership lock contract family.
    ///
    /// `lockVersion` is the standardized self-reporting probe; deployments
    /// that predate it resolve to version 0. The rest of the surface varies
    /// by version and is reached only through the per-version capability
    /// tables.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IMembershipLock {
        function lockVersion() external view returns (uint16);

        function balanceOf(address owner) external view returns (uint256);
        function getHasValidKey(address owner) external view returns (bool);
        function keyExpirationTimestampFor(address owner) external view returns (uint256);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);
        function isLockManager(address account) external view returns (bool);
        function isKeyGranter(address account) external view returns (bool);
        function totalSupply() external view returns (uint256);
        function keyPrice() external view returns (uint256);
        function expirationDuration() external view returns (uint256);
        function tokenAddress() external view returns (address);

        function purchase(
            uint256[] calldata values,
            address[] calldata recipients,
            address[] calldata referrers,
            address[] calldata keyManagers,
            bytes[] calldata data
        ) external payable returns (uint256[] memory);
        // Single-recipient purchase shape used by pre-v9 deployments.
        function purchaseFor(address recipient) external payable;
        function extend(
            uint256 value,
            uint256 tokenId,
            address referrer,
            bytes calldata data
        ) external payable;
        function grantKeys(
            address[] calldata recipients,
            uint256[] calldata expirationTimestamps,
            address[] calldata keyManagers
        ) external;
        function withdraw(
            address tokenAddress,
            address recipient,
            uint256 amount
        ) external;
    }
}
