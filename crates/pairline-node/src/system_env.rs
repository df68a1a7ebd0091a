//! Production environment backed by the OS RNG.

use pairline_core::Environment;

/// Production environment using getrandom.
///
/// # Panics
///
/// Panics if the OS RNG fails. A node without working entropy cannot
/// generate its keypair.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_differ() {
        let env = SystemEnv::new();

        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        env.random_bytes(&mut first);
        env.random_bytes(&mut second);

        assert_ne!(first, second, "Random bytes should differ");
    }

    #[test]
    fn random_u64_varies() {
        let env = SystemEnv::new();
        let draws: Vec<u64> = (0..8).map(|_| env.random_u64()).collect();
        assert!(draws.windows(2).any(|pair| pair[0] != pair[1]));
    }
}
