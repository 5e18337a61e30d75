//! Element generators composed into tagged junk packets.
//!
//! Each DSL tag maps to one variant. The set is closed, so the variants live
//! in an enum rather than behind a trait object and `size()` stays a cheap
//! match. Only [`Element::Random`] carries state: its own junk stream behind
//! a mutex, seeded once at parse time.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{BufMut, BytesMut};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::prng::JunkRng;

/// Upper bound on `<r>` payload size in bytes.
pub const MAX_RANDOM_SIZE: usize = 1000;

/// Upper bound on `<wt>` delay in milliseconds.
pub const MAX_WAIT_TIMEOUT_MS: u64 = 5000;

/// Wire size of a `<t>` timestamp.
pub const TIMESTAMP_SIZE: usize = 8;

/// One generator in a tagged packet's element sequence.
#[derive(Debug)]
pub enum Element {
    /// `<b 0x..>` — a fixed byte literal
    Bytes(Vec<u8>),
    /// `<c>` — reserved; contributes no payload in this build
    Counter,
    /// `<t>` — Unix seconds, 8-byte big-endian, read at assembly time
    Timestamp,
    /// `<r n>` — `n` fresh bytes from a private junk stream
    Random {
        /// Payload size in bytes
        size: usize,
        /// Private stream, never reseeded
        rng: Mutex<JunkRng>,
    },
    /// `<wt ms>` — no payload; assembly pauses for `ms`
    WaitTimeout(Duration),
    /// `<wr>` — reserved; no payload, no blocking in this build
    WaitResponse,
}

impl Element {
    /// Build a `<b>` element from a `0x`-prefixed hex literal.
    ///
    /// An odd nibble count is left-padded with a zero nibble, so `0xf6a`
    /// decodes as `0x0f6a`.
    pub fn bytes(param: &str) -> Result<Self> {
        let digits = param
            .strip_prefix("0x")
            .or_else(|| param.strip_prefix("0X"))
            .ok_or_else(|| Error::parse("b", format!("not a hex literal: {param:?}")))?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::parse("b", format!("not a hex literal: {param:?}")));
        }

        let padded;
        let digits = if digits.len() % 2 == 0 {
            digits
        } else {
            padded = format!("0{digits}");
            &padded
        };

        let value = hex::decode(digits)
            .map_err(|e| Error::parse("b", format!("{param:?}: {e}")))?;
        Ok(Element::Bytes(value))
    }

    /// Build a `<c>` element. The parameter is ignored.
    pub fn counter(_param: &str) -> Result<Self> {
        Ok(Element::Counter)
    }

    /// Build a `<t>` element. The tag takes no parameter.
    pub fn timestamp(param: &str) -> Result<Self> {
        if !param.is_empty() {
            return Err(Error::parse(
                "t",
                format!("parameter must be empty: {param:?}"),
            ));
        }
        Ok(Element::Timestamp)
    }

    /// Build an `<r>` element with its own seeded junk stream.
    pub fn random(param: &str) -> Result<Self> {
        let size: usize = param
            .parse()
            .map_err(|e| Error::parse("r", format!("{param:?}: {e}")))?;

        if size > MAX_RANDOM_SIZE {
            return Err(Error::ParamOutOfRange {
                element: "r",
                value: size as u64,
                limit: MAX_RANDOM_SIZE as u64,
            });
        }

        Ok(Element::Random {
            size,
            rng: Mutex::new(JunkRng::new()?),
        })
    }

    /// Build a `<wt>` element.
    pub fn wait_timeout(param: &str) -> Result<Self> {
        let ms: u64 = param
            .parse()
            .map_err(|e| Error::parse("wt", format!("{param:?}: {e}")))?;

        if ms > MAX_WAIT_TIMEOUT_MS {
            return Err(Error::ParamOutOfRange {
                element: "wt",
                value: ms,
                limit: MAX_WAIT_TIMEOUT_MS,
            });
        }

        Ok(Element::WaitTimeout(Duration::from_millis(ms)))
    }

    /// Build a `<wr>` element. The parameter is ignored.
    pub fn wait_response(_param: &str) -> Result<Self> {
        Ok(Element::WaitResponse)
    }

    /// Contribution to the assembled packet size. Wait tags contribute 0.
    pub fn size(&self) -> usize {
        match self {
            Element::Bytes(value) => value.len(),
            Element::Counter => 0,
            Element::Timestamp => TIMESTAMP_SIZE,
            Element::Random { size, .. } => *size,
            Element::WaitTimeout(_) => 0,
            Element::WaitResponse => 0,
        }
    }

    /// The pause this element imposes during assembly, if any.
    pub fn wait_duration(&self) -> Option<Duration> {
        match self {
            Element::WaitTimeout(d) => Some(*d),
            _ => None,
        }
    }

    /// Append this element's payload to the packet under assembly.
    ///
    /// Sleeping is the assembler's job; wait tags append nothing here.
    pub fn write_to(&self, out: &mut BytesMut) {
        match self {
            Element::Bytes(value) => out.put_slice(value),
            Element::Counter => {}
            Element::Timestamp => out.put_u64(unix_seconds()),
            Element::Random { size, rng } => {
                let mut junk = vec![0u8; *size];
                rng.lock().fill(&mut junk);
                out.put_slice(&junk);
            }
            Element::WaitTimeout(_) => {}
            Element::WaitResponse => {}
        }
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(element: &Element) -> Vec<u8> {
        let mut buf = BytesMut::new();
        element.write_to(&mut buf);
        buf.to_vec()
    }

    #[test]
    fn test_bytes_decodes_hex() {
        let el = Element::bytes("0xf6ab3267fa").unwrap();
        assert_eq!(el.size(), 5);
        assert_eq!(rendered(&el), vec![0xf6, 0xab, 0x32, 0x67, 0xfa]);
    }

    #[test]
    fn test_bytes_pads_odd_nibble() {
        let el = Element::bytes("0xf6a").unwrap();
        assert_eq!(rendered(&el), vec![0x0f, 0x6a]);

        let el = Element::bytes("0xF").unwrap();
        assert_eq!(rendered(&el), vec![0x0f]);
    }

    #[test]
    fn test_bytes_rejects_non_hex() {
        assert!(Element::bytes("f6ab").is_err());
        assert!(Element::bytes("0x").is_err());
        assert!(Element::bytes("0xg1").is_err());
        assert!(Element::bytes("").is_err());
    }

    #[test]
    fn test_timestamp_is_big_endian_now() {
        let el = Element::timestamp("").unwrap();
        assert_eq!(el.size(), TIMESTAMP_SIZE);

        let before = unix_seconds();
        let bytes = rendered(&el);
        let after = unix_seconds();

        let stamp = u64::from_be_bytes(bytes.try_into().unwrap());
        assert!(stamp >= before && stamp <= after);
    }

    #[test]
    fn test_timestamp_rejects_param() {
        assert!(Element::timestamp("8").is_err());
    }

    #[test]
    fn test_random_size_and_freshness() {
        let el = Element::random("10").unwrap();
        assert_eq!(el.size(), 10);
        assert_eq!(rendered(&el).len(), 10);
        // Consecutive draws come from a stream, not a constant
        assert_ne!(rendered(&el), rendered(&el));
    }

    #[test]
    fn test_random_limit() {
        assert!(Element::random("1000").is_ok());
        assert!(matches!(
            Element::random("1001"),
            Err(Error::ParamOutOfRange { element: "r", .. })
        ));
        assert!(Element::random("ten").is_err());
    }

    #[test]
    fn test_wait_timeout_limit() {
        let el = Element::wait_timeout("100").unwrap();
        assert_eq!(el.size(), 0);
        assert_eq!(el.wait_duration(), Some(Duration::from_millis(100)));
        assert!(rendered(&el).is_empty());

        assert!(Element::wait_timeout("5000").is_ok());
        assert!(matches!(
            Element::wait_timeout("5001"),
            Err(Error::ParamOutOfRange { element: "wt", .. })
        ));
    }

    #[test]
    fn test_reserved_tags_are_silent() {
        let counter = Element::counter("").unwrap();
        assert_eq!(counter.size(), 0);
        assert!(rendered(&counter).is_empty());

        let wait = Element::wait_response("").unwrap();
        assert_eq!(wait.size(), 0);
        assert!(rendered(&wait).is_empty());
        assert_eq!(wait.wait_duration(), None);
    }
}
