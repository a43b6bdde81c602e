//! Deterministic pre-deployment address derivation.
//!
//! The registry deploys each membership lock as an EIP-1167 minimal proxy via
//! CREATE2, which makes the address of a not-yet-created lock computable:
//!
//! ```text
//! address = last20( keccak256( 0xff ++ registry ++ salt' ++ keccak256(init_code) ) )
//! ```
//!
//! where `init_code` is the fixed minimal-proxy bytecode wrapped around the
//! implementation template address, and `salt'` binds the deployer into the
//! caller-chosen salt. The bytes here must match what the registry computes
//! on-chain exactly; downstream code compares the two values.

use alloy_primitives::{Address, B256, hex, keccak256};

use crate::types::ChecksummedAddress;

/// EIP-1167 minimal proxy init code, up to the embedded implementation
/// address.
pub const MINIMAL_PROXY_PREFIX: [u8; 20] = hex!("3d602d80600a3d3981f3363d3d373d3d3d363d73");
/// EIP-1167 minimal proxy init code after the embedded implementation
/// address.
pub const MINIMAL_PROXY_SUFFIX: [u8; 15] = hex!("5af43d82803e903d91602b57fd5bf3");

/// The init code the registry uses to clone `template`.
pub fn minimal_proxy_init_code(template: Address) -> [u8; 55] {
    let mut code = [0u8; 55];
    code[..20].copy_from_slice(&MINIMAL_PROXY_PREFIX);
    code[20..40].copy_from_slice(template.as_slice());
    code[40..].copy_from_slice(&MINIMAL_PROXY_SUFFIX);
    code
}

/// Raw CREATE2 address computation (EIP-1014).
pub fn create2_address(deployer: Address, salt: B256, init_code: &[u8]) -> Address {
    deployer.create2_from_code(salt, init_code)
}

/// The effective CREATE2 salt: the caller-chosen salt bound to the deployer
/// address, matching the registry's own derivation.
pub fn clone_salt(salt: B256, deployer: Address) -> B256 {
    let mut buf = [0u8; 52];
    buf[..32].copy_from_slice(salt.as_slice());
    buf[32..].copy_from_slice(deployer.as_slice());
    keccak256(buf)
}

/// Predicts the address the registry will assign to a lock created with
/// `salt` by `deployer`, cloning `template`. Checksummed for display.
pub fn predicted_lock_address(
    registry: Address,
    template: Address,
    deployer: Address,
    salt: B256,
) -> ChecksummedAddress {
    let init_code = minimal_proxy_init_code(template);
    let address = create2_address(registry, clone_salt(salt, deployer), &init_code);
    ChecksummedAddress(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    // EIP-1014 example vectors.
    #[test]
    fn create2_matches_eip1014_vectors() {
        let zero_salt = B256::ZERO;

        let derived = create2_address(Address::ZERO, zero_salt, &hex!("00"));
        assert_eq!(derived, address!("0x4D1A2e2bB4F88F0250f26Ffff098B0b30B26BF38"));

        let derived = create2_address(
            address!("0xdeadbeef00000000000000000000000000000000"),
            zero_salt,
            &hex!("00"),
        );
        assert_eq!(derived, address!("0xB928f69Bb1D91Cd65274e3c79d8986362984fDA3"));

        let derived = create2_address(
            address!("0x00000000000000000000000000000000deadbeef"),
            b256!("0x00000000000000000000000000000000000000000000000000000000cafebabe"),
            &hex!("deadbeef"),
        );
        assert_eq!(derived, address!("0x60f3f640a8508fC6a86d45DF051962668E1e8AC7"));
    }

    #[test]
    fn minimal_proxy_wraps_template_address() {
        let template = address!("0xbebebebebebebebebebebebebebebebebebebebe");
        let code = minimal_proxy_init_code(template);
        assert_eq!(
            hex::encode(code),
            "3d602d80600a3d3981f3363d3d373d3d3d363d73\
             bebebebebebebebebebebebebebebebebebebebe\
             5af43d82803e903d91602b57fd5bf3"
        );
    }

    #[test]
    fn prediction_is_deterministic() {
        let registry = address!("0x7aa12c34e8d86dda591a9b0cb8c1bf6a1c9ed415");
        let template = address!("0x2f1a005ea19c1d1c2b9e0f05a1e29fc4fd5bd601");
        let deployer = address!("0xab5801a7d398351b8be11c439e05c5b3259aec9b");
        let salt = b256!("0x0000000000000000000000000000000000000000000000000000000000000001");

        let first = predicted_lock_address(registry, template, deployer, salt);
        let second = predicted_lock_address(registry, template, deployer, salt);
        assert_eq!(first, second);

        // Any input change moves the address.
        let other_salt =
            b256!("0x0000000000000000000000000000000000000000000000000000000000000002");
        assert_ne!(
            first,
            predicted_lock_address(registry, template, deployer, other_salt)
        );
        assert_ne!(
            first,
            predicted_lock_address(registry, template, registry, salt)
        );

        // Checksummed rendering parses back to the same address.
        let rendered = first.to_string();
        let parsed: ChecksummedAddress = rendered.parse().unwrap();
        assert_eq!(parsed, first);
    }

    #[test]
    fn deployer_is_bound_into_the_salt() {
        let salt = B256::ZERO;
        let a = address!("0x00000000000000000000000000000000000000a1");
        let b = address!("0x00000000000000000000000000000000000000b2");
        assert_ne!(clone_salt(salt, a), clone_salt(salt, b));
    }
}
