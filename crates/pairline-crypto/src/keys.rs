//! Key types.

use std::fmt;

use zeroize::Zeroize;

use crate::error::CryptoError;

/// Public half of a keypair, `(e, n)`.
///
/// This is what travels on the wire in a key announcement. Values received
/// from a peer are untrusted; check [`PublicKey::is_valid`] before use.
///
/// Keys order by `(e, n)`, which gives two peers a shared tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey {
    /// Public exponent
    pub e: i64,
    /// Modulus
    pub n: i64,
}

impl PublicKey {
    /// Create a public key without validation.
    #[must_use]
    pub fn new(e: i64, n: i64) -> Self {
        Self { e, n }
    }

    /// Both components are strictly positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.e > 0 && self.n > 0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.e, self.n)
    }
}

/// Private half of a keypair, `(d, n)`.
///
/// Zeroized on drop. `Debug` output never shows the exponent.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    d: i64,
    n: i64,
}

impl PrivateKey {
    /// Private exponent.
    #[must_use]
    pub fn d(&self) -> i64 {
        self.d
    }

    /// Modulus.
    #[must_use]
    pub fn n(&self) -> i64 {
        self.n
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey").field("d", &"<redacted>").field("n", &self.n).finish()
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.d.zeroize();
        self.n.zeroize();
    }
}

/// Local keypair, owned by the endpoint for the lifetime of the process.
///
/// # Invariants
///
/// - `e > 0`, `n > 0`, `d > 0`
/// - Public and private halves share the same modulus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Build a keypair from raw components.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InvalidKey` if any component is not strictly positive
    pub fn from_parts(e: i64, d: i64, n: i64) -> Result<Self, CryptoError> {
        if e <= 0 || d <= 0 || n <= 0 {
            return Err(CryptoError::InvalidKey {
                reason: format!("components must be positive (e={e}, n={n})"),
            });
        }

        Ok(Self { public: PublicKey { e, n }, private: PrivateKey { d, n } })
    }

    /// Public half.
    #[must_use]
    pub fn public(&self) -> PublicKey {
        self.public
    }

    /// Private half.
    #[must_use]
    pub fn private(&self) -> &PrivateKey {
        &self.private
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_rejects_non_positive() {
        assert!(KeyPair::from_parts(0, 1, 1).is_err());
        assert!(KeyPair::from_parts(1, -1, 1).is_err());
        assert!(KeyPair::from_parts(1, 1, 0).is_err());
    }

    #[test]
    fn from_parts_shares_modulus() {
        let pair = KeyPair::from_parts(17, 113, 221).unwrap();
        assert_eq!(pair.public(), PublicKey::new(17, 221));
        assert_eq!(pair.private().d(), 113);
        assert_eq!(pair.private().n(), 221);
    }

    #[test]
    fn private_key_debug_is_redacted() {
        let pair = KeyPair::from_parts(17, 113, 221).unwrap();
        let debug = format!("{:?}", pair.private());
        assert!(!debug.contains("113"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn public_key_validity() {
        assert!(PublicKey::new(3, 323).is_valid());
        assert!(!PublicKey::new(0, 5).is_valid());
        assert!(!PublicKey::new(5, -1).is_valid());
    }
}
