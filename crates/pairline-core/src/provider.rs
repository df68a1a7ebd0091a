//! Asymmetric cipher capability.
//!
//! The session never touches key arithmetic directly. It asks a
//! [`KeyProvider`] for a keypair once at startup and for encrypt/decrypt per
//! message, so the scheme can be swapped (or fixed in tests) without
//! touching the protocol.

use pairline_crypto::{CryptoError, KeyPair, PrivateKey, PublicKey, toy_rsa};

use crate::env::Environment;

/// Key generation and per-message encryption.
pub trait KeyProvider: Send + Sync {
    /// Produce the local keypair.
    ///
    /// # Errors
    ///
    /// Failure here is fatal at startup.
    fn generate_key_pair(&self) -> Result<KeyPair, CryptoError>;

    /// Encrypt `text` under a peer's public key, one value per UTF-8 byte.
    ///
    /// # Errors
    ///
    /// - `CryptoError` if the key is unusable or the text cannot be encoded
    fn encrypt(&self, text: &str, key: &PublicKey) -> Result<Vec<i64>, CryptoError>;

    /// Decrypt ciphertext with the local private key.
    ///
    /// # Errors
    ///
    /// - `CryptoError` if the ciphertext does not decode under `key`
    fn decrypt(&self, cipher: &[i64], key: &PrivateKey) -> Result<String, CryptoError>;
}

/// Textbook RSA over small primes, seeded from an [`Environment`].
#[derive(Debug, Clone)]
pub struct ToyRsaProvider<E: Environment> {
    env: E,
}

impl<E: Environment> ToyRsaProvider<E> {
    /// Create a provider drawing randomness from `env`.
    pub fn new(env: E) -> Self {
        Self { env }
    }
}

impl<E: Environment> KeyProvider for ToyRsaProvider<E> {
    fn generate_key_pair(&self) -> Result<KeyPair, CryptoError> {
        let pair = toy_rsa::generate_key_pair(|| self.env.random_u64())?;
        tracing::debug!(e = pair.public().e, n = pair.public().n, "generated key pair");
        Ok(pair)
    }

    fn encrypt(&self, text: &str, key: &PublicKey) -> Result<Vec<i64>, CryptoError> {
        toy_rsa::encrypt(text, key)
    }

    fn decrypt(&self, cipher: &[i64], key: &PrivateKey) -> Result<String, CryptoError> {
        toy_rsa::decrypt(cipher, key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rand_chacha::{
        ChaCha8Rng,
        rand_core::{RngCore, SeedableRng},
    };

    use super::*;

    #[derive(Clone)]
    struct SeededEnv(Arc<Mutex<ChaCha8Rng>>);

    impl SeededEnv {
        fn new(seed: u64) -> Self {
            Self(Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))))
        }
    }

    impl Environment for SeededEnv {
        fn random_bytes(&self, buffer: &mut [u8]) {
            self.0.lock().unwrap().fill_bytes(buffer);
        }
    }

    #[test]
    fn same_seed_same_keys() {
        let a = ToyRsaProvider::new(SeededEnv::new(7)).generate_key_pair().unwrap();
        let b = ToyRsaProvider::new(SeededEnv::new(7)).generate_key_pair().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn roundtrip_through_provider() {
        let provider = ToyRsaProvider::new(SeededEnv::new(42));
        let pair = provider.generate_key_pair().unwrap();

        let cipher = provider.encrypt("hello there", &pair.public()).unwrap();
        assert_eq!(cipher.len(), "hello there".len());

        let plain = provider.decrypt(&cipher, pair.private()).unwrap();
        assert_eq!(plain, "hello there");
    }

    #[test]
    fn provider_is_object_safe() {
        let provider: Arc<dyn KeyProvider> = Arc::new(ToyRsaProvider::new(SeededEnv::new(1)));
        assert!(provider.generate_key_pair().is_ok());
    }
}
