//! Identity key — the deduplication key for one-vote-per-voter.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 32-byte key derived from a voter's enrolled identity.
///
/// Derived from the claimed registration identity and the enrollment name the
/// biometric service matched against, so two captures of the same enrolled
/// voter always map to the same key. This is the unique key of the
/// idempotency ledger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey([u8; 32]);

impl IdentityKey {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive the key from a claimed identity and the matched enrollment name.
    ///
    /// The two inputs are separated by a NUL byte so `("ab", "c")` and
    /// `("a", "bc")` hash differently.
    pub fn derive(claimed_identity: &str, matched_name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(claimed_identity.as_bytes());
        hasher.update([0u8]);
        hasher.update(matched_name.as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKey({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

// Inline hex encoding to avoid adding the `hex` crate as a dependency of types.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_stable() {
        let a = IdentityKey::derive("REG-001", "alice");
        let b = IdentityKey::derive("REG-001", "alice");
        assert_eq!(a, b);
    }

    #[test]
    fn separator_prevents_concatenation_collisions() {
        assert_ne!(
            IdentityKey::derive("ab", "c"),
            IdentityKey::derive("a", "bc")
        );
    }

    #[test]
    fn different_voters_get_different_keys() {
        assert_ne!(
            IdentityKey::derive("REG-001", "alice"),
            IdentityKey::derive("REG-002", "bob")
        );
    }
}
