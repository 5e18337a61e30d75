//! Seeded junk-stream generation.
//!
//! Junk payloads only need to be statistically noisy, not unpredictable, so
//! they come from a fast non-cryptographic stream. The seed is the single
//! cryptographic input: 32 bytes drawn once from the operating system's
//! entropy source at construction. Instances are never reseeded.

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use rand_core::OsRng;
use zeroize::Zeroizing;

/// Fast, seeded generator for junk payload bytes and sizes.
///
/// Not suitable for key material or any other cryptographic value; use the
/// OS entropy source directly for those.
#[derive(Debug)]
pub struct JunkRng {
    inner: SmallRng,
}

impl JunkRng {
    /// Create a generator seeded from the OS entropy source.
    ///
    /// Fails with [`Error::EntropyUnavailable`](crate::Error::EntropyUnavailable)
    /// when the seed cannot be drawn.
    pub fn new() -> crate::Result<Self> {
        let mut seed = Zeroizing::new([0u8; 32]);
        OsRng
            .try_fill_bytes(seed.as_mut())
            .map_err(|_| crate::Error::EntropyUnavailable)?;

        Ok(Self {
            inner: SmallRng::from_seed(*seed),
        })
    }

    /// Fill a buffer with junk bytes.
    pub fn fill(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    /// Produce exactly `n` junk bytes.
    pub fn read(&mut self, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        self.fill(&mut buf);
        buf
    }

    /// Draw a value in `[lo, hi]` inclusive.
    ///
    /// Degenerate ranges (`hi <= lo`) yield `lo`. The modulo bias over wide
    /// ranges is acceptable for junk sizing.
    pub fn uniform(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        match (hi - lo).checked_add(1) {
            Some(span) => lo + self.inner.next_u64() % span,
            // [0, u64::MAX] is the full domain
            None => self.inner.next_u64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_read_exact_length() {
        let mut rng = JunkRng::new().unwrap();
        for n in [0usize, 1, 17, 1000] {
            assert_eq!(rng.read(n).len(), n);
        }
    }

    #[test]
    fn test_streams_differ_across_instances() {
        let mut a = JunkRng::new().unwrap();
        let mut b = JunkRng::new().unwrap();
        assert_ne!(a.read(32), b.read(32));
    }

    #[test]
    fn test_uniform_bounds() {
        let mut rng = JunkRng::new().unwrap();

        let mut seen = HashSet::new();
        for _ in 0..200 {
            let v = rng.uniform(40, 50);
            assert!((40..=50).contains(&v));
            seen.insert(v);
        }
        // Inclusive range should produce variety
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_uniform_degenerate_range() {
        let mut rng = JunkRng::new().unwrap();
        assert_eq!(rng.uniform(7, 7), 7);
        assert_eq!(rng.uniform(9, 3), 9);
    }

    #[test]
    fn test_uniform_full_domain() {
        let mut rng = JunkRng::new().unwrap();
        // Must not overflow the span computation
        let _ = rng.uniform(0, u64::MAX);
    }
}
