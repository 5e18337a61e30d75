//! Unstructured junk packets and header filler.
//!
//! The plain half of junk generation: batches of random-size, random-content
//! packets sent ahead of a handshake, and fixed-size random filler prepended
//! to protocol frames. Content comes from a private [`JunkRng`] seeded at
//! construction.

use std::io::Write;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::Result;
use crate::prng::JunkRng;

/// Produces unstructured junk according to the configured count and bounds.
#[derive(Debug)]
pub struct JunkCreator {
    count: usize,
    min_size: usize,
    max_size: usize,
    rng: Mutex<JunkRng>,
}

impl JunkCreator {
    /// Create a junk creator with its own seeded stream.
    ///
    /// Bounds are assumed pre-validated (`min_size <= max_size`); a
    /// degenerate range just pins the packet size.
    pub fn new(count: usize, min_size: usize, max_size: usize) -> Result<Self> {
        Ok(Self {
            count,
            min_size,
            max_size,
            rng: Mutex::new(JunkRng::new()?),
        })
    }

    /// Produce the configured number of junk packets, each of uniform
    /// random size within the configured bounds.
    pub fn create_batch(&self) -> Vec<Bytes> {
        if self.count == 0 {
            return Vec::new();
        }

        let mut rng = self.rng.lock();
        (0..self.count)
            .map(|_| {
                let size = rng.uniform(self.min_size as u64, self.max_size as u64) as usize;
                Bytes::from(rng.read(size))
            })
            .collect()
    }

    /// Write `size` bytes of filler to `writer`.
    ///
    /// A zero size is a strict no-op: nothing is written and the junk
    /// stream is not consulted.
    pub fn append_junk<W: Write>(&self, writer: &mut W, size: usize) -> Result<()> {
        if size == 0 {
            return Ok(());
        }

        let junk = self.rng.lock().read(size);
        writer.write_all(&junk)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Writer that rejects every write, and counts attempts.
    struct RefusingWriter {
        attempts: usize,
    }

    impl Write for RefusingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "refused"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_batch_count_and_bounds() {
        let creator = JunkCreator::new(3, 40, 50).unwrap();

        let batch = creator.create_batch();
        assert_eq!(batch.len(), 3);
        for packet in &batch {
            assert!((40..=50).contains(&packet.len()));
        }
    }

    #[test]
    fn test_batch_empty_when_count_zero() {
        let creator = JunkCreator::new(0, 40, 50).unwrap();
        assert!(creator.create_batch().is_empty());
    }

    #[test]
    fn test_batch_pinned_size() {
        let creator = JunkCreator::new(5, 64, 64).unwrap();
        for packet in creator.create_batch() {
            assert_eq!(packet.len(), 64);
        }
    }

    #[test]
    fn test_append_exact_size() {
        let creator = JunkCreator::new(0, 0, 0).unwrap();

        let mut buf = Vec::new();
        creator.append_junk(&mut buf, 17).unwrap();
        assert_eq!(buf.len(), 17);
    }

    #[test]
    fn test_append_zero_size_touches_nothing() {
        let creator = JunkCreator::new(0, 0, 0).unwrap();

        let mut writer = RefusingWriter { attempts: 0 };
        creator.append_junk(&mut writer, 0).unwrap();
        assert_eq!(writer.attempts, 0);
    }

    #[test]
    fn test_append_surfaces_write_failure() {
        let creator = JunkCreator::new(0, 0, 0).unwrap();

        let mut writer = RefusingWriter { attempts: 0 };
        let err = creator.append_junk(&mut writer, 8).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }

    #[test]
    fn test_batches_are_not_repeated() {
        let creator = JunkCreator::new(2, 32, 32).unwrap();
        let first = creator.create_batch();
        let second = creator.create_batch();
        assert_ne!(first[0], second[0]);
    }
}
