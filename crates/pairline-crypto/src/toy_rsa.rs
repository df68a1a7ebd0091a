//! Textbook RSA over tiny primes.
//!
//! Primes are drawn from `[PRIME_MIN, PRIME_MAX]`, so moduli stay below
//! 250,000 and every key can be brute-forced instantly. Each plaintext byte
//! is encrypted independently with no padding.
//!
//! All modular arithmetic is done in `u128`. Peer keys are untrusted and may
//! carry moduli near `i64::MAX`; squaring a residue below 2^63 fits in 2^126.

use crate::{
    error::CryptoError,
    keys::{KeyPair, PrivateKey, PublicKey},
};

/// Smallest prime candidate.
pub const PRIME_MIN: u64 = 100;

/// Largest prime candidate.
pub const PRIME_MAX: u64 = 500;

/// Random draws allowed per prime before giving up.
const MAX_PRIME_DRAWS: usize = 10_000;

/// Generate a keypair from the supplied randomness.
///
/// `p` and `q` are distinct primes drawn uniformly from
/// `[PRIME_MIN, PRIME_MAX]`. `e` is the smallest odd number `>= 3` coprime to
/// `φ = (p-1)(q-1)`, and `d = e⁻¹ mod φ`.
///
/// # Errors
///
/// - `CryptoError::KeyGeneration` if `random` never yields a usable prime
pub fn generate_key_pair(mut random: impl FnMut() -> u64) -> Result<KeyPair, CryptoError> {
    let p = draw_prime(&mut random, None)?;
    let q = draw_prime(&mut random, Some(p))?;

    let n = p * q;
    let phi = (p - 1) * (q - 1);

    let mut e = 3;
    while gcd(e, phi) != 1 {
        e += 2;
    }

    let d = mod_inverse(e, phi)
        .ok_or_else(|| CryptoError::KeyGeneration(format!("{e} has no inverse mod {phi}")))?;

    KeyPair::from_parts(to_i64(e)?, to_i64(d)?, to_i64(n)?)
}

fn draw_prime(random: &mut impl FnMut() -> u64, exclude: Option<u64>) -> Result<u64, CryptoError> {
    let span = PRIME_MAX - PRIME_MIN + 1;

    for _ in 0..MAX_PRIME_DRAWS {
        let candidate = PRIME_MIN + random() % span;
        if is_prime(candidate) && Some(candidate) != exclude {
            return Ok(candidate);
        }
    }

    Err(CryptoError::KeyGeneration(format!("no prime found after {MAX_PRIME_DRAWS} draws")))
}

/// Encrypt `text` byte by byte: `c = mᵉ mod n`.
///
/// Returns exactly one value per UTF-8 byte of `text`.
///
/// # Errors
///
/// - `CryptoError::InvalidKey` if `e` or `n` is not strictly positive
/// - `CryptoError::PlaintextOutOfRange` if a byte is `>= n`
pub fn encrypt(text: &str, key: &PublicKey) -> Result<Vec<i64>, CryptoError> {
    if !key.is_valid() {
        return Err(CryptoError::InvalidKey {
            reason: format!("public key {key} has a non-positive component"),
        });
    }

    let modulus = key.n.unsigned_abs();
    let exponent = key.e.unsigned_abs();

    text.bytes()
        .map(|byte| {
            if u64::from(byte) >= modulus {
                return Err(CryptoError::PlaintextOutOfRange { byte, modulus: key.n });
            }
            let cipher = mod_pow(u64::from(byte), exponent, modulus);
            to_i64(cipher)
        })
        .collect()
}

/// Decrypt ciphertext value by value: `m = cᵈ mod n`.
///
/// # Errors
///
/// - `CryptoError::InvalidKey` if `d` or `n` is not strictly positive
/// - `CryptoError::CiphertextOutOfRange` if a value lies outside `[0, n)`
/// - `CryptoError::NotAByte` if a decrypted value exceeds 255
/// - `CryptoError::InvalidUtf8` if the recovered bytes are not UTF-8
pub fn decrypt(cipher: &[i64], key: &PrivateKey) -> Result<String, CryptoError> {
    if key.d() <= 0 || key.n() <= 0 {
        return Err(CryptoError::InvalidKey {
            reason: "private key has a non-positive component".to_string(),
        });
    }

    let modulus = key.n().unsigned_abs();
    let exponent = key.d().unsigned_abs();

    let bytes = cipher
        .iter()
        .map(|&value| {
            if value < 0 || value.unsigned_abs() >= modulus {
                return Err(CryptoError::CiphertextOutOfRange { value, modulus: key.n() });
            }
            let plain = mod_pow(value.unsigned_abs(), exponent, modulus);
            u8::try_from(plain).map_err(|_| CryptoError::NotAByte(plain))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    String::from_utf8(bytes).map_err(|_| CryptoError::InvalidUtf8)
}

/// Trial-division primality test.
#[must_use]
pub fn is_prime(candidate: u64) -> bool {
    if candidate < 2 {
        return false;
    }
    if candidate % 2 == 0 {
        return candidate == 2;
    }

    let mut divisor = 3;
    while divisor * divisor <= candidate {
        if candidate % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}

/// Greatest common divisor.
#[must_use]
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Multiplicative inverse of `a` modulo `m`, if one exists.
#[must_use]
pub fn mod_inverse(a: u64, m: u64) -> Option<u64> {
    if m == 0 {
        return None;
    }

    let (mut old_r, mut r) = (i128::from(a), i128::from(m));
    let (mut old_s, mut s) = (1_i128, 0_i128);

    while r != 0 {
        let quotient = old_r / r;
        (old_r, r) = (r, old_r - quotient * r);
        (old_s, s) = (s, old_s - quotient * s);
    }

    if old_r != 1 {
        return None;
    }

    u64::try_from(old_s.rem_euclid(i128::from(m))).ok()
}

/// `base^exp mod modulus` by square-and-multiply.
///
/// Returns 0 when `modulus` is 1, and also when it is 0 (no residue class).
#[must_use]
pub fn mod_pow(base: u64, mut exp: u64, modulus: u64) -> u64 {
    if modulus <= 1 {
        return 0;
    }

    let modulus = u128::from(modulus);
    let mut base = u128::from(base) % modulus;
    let mut result = 1_u128;

    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % modulus;
        }
        base = base * base % modulus;
        exp >>= 1;
    }

    // result < modulus <= u64::MAX
    u64::try_from(result).unwrap_or(u64::MAX)
}

fn to_i64(value: u64) -> Result<i64, CryptoError> {
    i64::try_from(value)
        .map_err(|_| CryptoError::InvalidKey { reason: format!("{value} exceeds i64 range") })
}
