//! Environment abstraction for deterministic testing.
//!
//! Decouples key generation from the system entropy source. Production uses
//! the OS RNG; tests inject a seeded generator so generated keys reproduce.

/// Source of randomness.
///
/// # Invariants
///
/// - Given the same seed, a test implementation produces the same sequence
/// - Production implementations draw from the operating system
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
