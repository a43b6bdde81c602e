//! Registry of well-known networks and their lock registry deployments.
//!
//! The configuration map (see [`crate::config`]) may omit the registry
//! address for a network; this module supplies the canonical deployment for
//! the networks the protocol ships on. It also provides name lookups for
//! logging and display.

use alloy_primitives::{Address, address};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::types::NetworkId;

/// A known network with its canonical lock registry deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownNetwork {
    /// Human-readable network name (e.g. "mainnet", "polygon").
    pub name: &'static str,
    /// Numeric network id.
    pub id: u64,
    /// Canonical lock registry (factory) deployment.
    pub registry: Address,
}

impl KnownNetwork {
    /// The network id as a [`NetworkId`].
    pub fn network_id(&self) -> NetworkId {
        NetworkId::new(self.id)
    }
}

/// The networks the lock registry ships on, mainnets first.
static KNOWN_NETWORKS: &[KnownNetwork] = &[
    KnownNetwork {
        name: "mainnet",
        id: 1,
        registry: address!("0x7aa12c34e8d86dda591a9b0cb8c1bf6a1c9ed415"),
    },
    KnownNetwork {
        name: "optimism",
        id: 10,
        registry: address!("0x99b1348a9129ac49c6de7f11245773de2f51fb0c"),
    },
    KnownNetwork {
        name: "gnosis",
        id: 100,
        registry: address!("0x1bc53f4303c711cc693f6ec3477b83703dcb317f"),
    },
    KnownNetwork {
        name: "polygon",
        id: 137,
        registry: address!("0x52c6c24a1c82a3895fbd59cbaf866913bb2f2c59"),
    },
    KnownNetwork {
        name: "base",
        id: 8453,
        registry: address!("0xd0b14797b9d08493392865647384974470202a78"),
    },
    KnownNetwork {
        name: "arbitrum",
        id: 42161,
        registry: address!("0x1ff7e338d5e582138c46044dc238543ce555c963"),
    },
    KnownNetwork {
        name: "sepolia",
        id: 11155111,
        registry: address!("0x36b34e10295cce69b652eeb5a8046041074515da"),
    },
];

static ID_TO_NETWORK: Lazy<HashMap<NetworkId, &'static KnownNetwork>> = Lazy::new(|| {
    KNOWN_NETWORKS
        .iter()
        .map(|n| (n.network_id(), n))
        .collect()
});

static NAME_TO_NETWORK: Lazy<HashMap<&'static str, &'static KnownNetwork>> =
    Lazy::new(|| KNOWN_NETWORKS.iter().map(|n| (n.name, n)).collect());

/// The known network entry for an id, if any.
pub fn known_network_by_id(id: NetworkId) -> Option<&'static KnownNetwork> {
    ID_TO_NETWORK.get(&id).copied()
}

/// Human-readable name for a network id.
pub fn network_name_by_id(id: NetworkId) -> Option<&'static str> {
    known_network_by_id(id).map(|n| n.name)
}

/// Network id for a human-readable name. Case-sensitive.
pub fn network_id_by_name(name: &str) -> Option<NetworkId> {
    NAME_TO_NETWORK.get(name).map(|n| n.network_id())
}

/// Canonical lock registry deployment for a network id.
pub fn registry_address_by_id(id: NetworkId) -> Option<Address> {
    known_network_by_id(id).map(|n| n.registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        let polygon = network_id_by_name("polygon").unwrap();
        assert_eq!(polygon.inner(), 137);
        assert!(network_id_by_name("unknown-network").is_none());
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(network_name_by_id(NetworkId::new(1)), Some("mainnet"));
        assert_eq!(network_name_by_id(NetworkId::new(8453)), Some("base"));
        assert!(network_name_by_id(NetworkId::new(999999)).is_none());
    }

    #[test]
    fn registry_deployments_are_distinct() {
        let mainnet = registry_address_by_id(NetworkId::new(1)).unwrap();
        let polygon = registry_address_by_id(NetworkId::new(137)).unwrap();
        assert_ne!(mainnet, polygon);
        assert!(registry_address_by_id(NetworkId::new(999999)).is_none());
    }
}
