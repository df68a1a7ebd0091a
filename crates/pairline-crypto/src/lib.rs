//! Toy RSA for the Pairline chat protocol.
//!
//! Textbook RSA over primes in `[100, 500]`, encrypting one byte at a time.
//! This is an educational stand-in for a real key-exchange scheme and
//! provides no confidentiality against anyone willing to factor a six-digit
//! number.
//!
//! Key generation takes its randomness as a closure so callers can inject a
//! seeded generator in tests and the OS RNG in production.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod keys;
pub mod toy_rsa;

pub use error::CryptoError;
pub use keys::{KeyPair, PrivateKey, PublicKey};
pub use toy_rsa::{decrypt, encrypt, generate_key_pair};
