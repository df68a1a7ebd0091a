//! Toy RSA errors.

use thiserror::Error;

/// Errors from key generation, encryption, or decryption.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key component is zero or negative
    #[error("invalid key: {reason}")]
    InvalidKey {
        /// Which component was rejected
        reason: String,
    },

    /// No keypair could be produced from the supplied randomness
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Plaintext byte cannot be represented under this modulus
    #[error("plaintext byte {byte} does not fit modulus {modulus}")]
    PlaintextOutOfRange {
        /// Offending byte
        byte: u8,
        /// Modulus of the encryption key
        modulus: i64,
    },

    /// Ciphertext value outside `[0, n)`
    #[error("ciphertext value {value} outside [0, {modulus})")]
    CiphertextOutOfRange {
        /// Offending value
        value: i64,
        /// Modulus of the decryption key
        modulus: i64,
    },

    /// Decrypted value is not a byte (wrong key or corrupted ciphertext)
    #[error("decrypted value {0} is not a byte")]
    NotAByte(u64),

    /// Decrypted bytes are not valid UTF-8
    #[error("decrypted text is not valid UTF-8")]
    InvalidUtf8,
}
