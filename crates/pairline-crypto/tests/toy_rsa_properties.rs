//! Property-based tests for toy RSA
//!
//! Keys are generated from a seeded ChaCha stream so failures reproduce.

use pairline_crypto::{CryptoError, decrypt, encrypt, generate_key_pair, toy_rsa};
use proptest::prelude::*;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{RngCore, SeedableRng},
};

fn seeded_key_pair(seed: u64) -> pairline_crypto::KeyPair {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    generate_key_pair(|| rng.next_u64()).unwrap()
}

#[test]
fn prop_encrypt_decrypt_roundtrip() {
    proptest!(|(seed in any::<u64>(), text in "[ -~]{1,64}")| {
        let pair = seeded_key_pair(seed);

        let cipher = encrypt(&text, &pair.public()).unwrap();
        let plain = decrypt(&cipher, pair.private()).unwrap();

        prop_assert_eq!(plain, text);
    });
}

#[test]
fn prop_generated_keys_are_consistent() {
    proptest!(|(seed in any::<u64>())| {
        let pair = seeded_key_pair(seed);
        let public = pair.public();

        prop_assert!(public.is_valid());
        prop_assert_eq!(public.n, pair.private().n());
        prop_assert!(public.e >= 3 && public.e % 2 == 1);
        prop_assert!(public.n >= 101 * 103 && public.n <= 499 * 491);
    });
}

#[test]
fn prop_ciphertext_values_below_modulus() {
    proptest!(|(seed in any::<u64>(), text in "\\PC{1,32}")| {
        let pair = seeded_key_pair(seed);

        let cipher = encrypt(&text, &pair.public()).unwrap();

        prop_assert_eq!(cipher.len(), text.len());
        prop_assert!(cipher.iter().all(|&c| c >= 0 && c < pair.public().n));
    });
}

#[test]
fn prop_decrypt_never_panics_on_hostile_input() {
    proptest!(|(seed in any::<u64>(), values in prop::collection::vec(any::<i64>(), 0..16))| {
        let pair = seeded_key_pair(seed);

        match decrypt(&values, pair.private()) {
            Ok(_)
            | Err(
                CryptoError::CiphertextOutOfRange { .. }
                | CryptoError::NotAByte(_)
                | CryptoError::InvalidUtf8,
            ) => {},
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    });
}

#[test]
fn prop_mod_pow_stays_below_modulus() {
    proptest!(|(base in any::<u64>(), exp in any::<u64>(), modulus in 2..=u64::MAX)| {
        prop_assert!(toy_rsa::mod_pow(base, exp, modulus) < modulus);
    });
}
