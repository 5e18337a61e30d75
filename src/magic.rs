//! Magic-header ranges for packet-type disguise.
//!
//! A canonical handshake puts a well-known 32-bit discriminator at the front
//! of every frame, which is exactly what passive classifiers key on. Each
//! message type is therefore assigned a configurable interval of discriminator
//! values: outgoing frames sample a fresh value from their type's interval,
//! and incoming frames are canonicalized back to the interval minimum before
//! the surrounding protocol dispatches on them.

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::prng::JunkRng;

/// Message types carrying a magic-header discriminator.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Handshake initiation
    Initiation = 1,
    /// Handshake response
    Response = 2,
    /// Cookie reply sent under load (DoS mitigation)
    Underload = 3,
    /// Symmetric transport data
    Transport = 4,
}

impl MessageKind {
    /// All kinds, in discriminator order.
    pub const ALL: [MessageKind; 4] = [
        MessageKind::Initiation,
        MessageKind::Response,
        MessageKind::Underload,
        MessageKind::Transport,
    ];

    /// Configuration key this kind's range is read from.
    pub fn key(self) -> &'static str {
        match self {
            MessageKind::Initiation => "H1",
            MessageKind::Response => "H2",
            MessageKind::Underload => "H3",
            MessageKind::Transport => "H4",
        }
    }
}

impl TryFrom<u32> for MessageKind {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(MessageKind::Initiation),
            2 => Ok(MessageKind::Response),
            3 => Ok(MessageKind::Underload),
            4 => Ok(MessageKind::Transport),
            other => Err(Error::InvalidMessageType(other)),
        }
    }
}

/// Closed interval of discriminator values assigned to one message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicRange {
    min: u32,
    max: u32,
    kind: MessageKind,
}

impl MagicRange {
    /// Create a range, rejecting `min > max`.
    pub fn new(min: u32, max: u32, kind: MessageKind) -> Result<Self> {
        if min > max {
            return Err(Error::range(kind.key(), u64::from(min), u64::from(max)));
        }
        Ok(Self { min, max, kind })
    }

    /// The canonical single-value range for a kind: its wire discriminator.
    pub fn canonical(kind: MessageKind) -> Self {
        Self {
            min: kind as u32,
            max: kind as u32,
            kind,
        }
    }

    /// Parse a configured range: either a single decimal `u32` or `min-max`.
    pub fn parse(value: &str, kind: MessageKind) -> Result<Self> {
        let key = kind.key();
        match value.split_once('-') {
            Some((lo, hi)) => {
                let min: u32 = lo
                    .parse()
                    .map_err(|e| Error::parse(key, format!("min {lo:?}: {e}")))?;
                let max: u32 = hi
                    .parse()
                    .map_err(|e| Error::parse(key, format!("max {hi:?}: {e}")))?;
                Self::new(min, max, kind)
            }
            None => {
                let v: u32 = value
                    .parse()
                    .map_err(|e| Error::parse(key, format!("{value:?}: {e}")))?;
                Self::new(v, v, kind)
            }
        }
    }

    /// Interval minimum: the canonical discriminator for this kind.
    pub fn min(&self) -> u32 {
        self.min
    }

    /// Interval maximum.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Message type this interval belongs to.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    fn contains(&self, value: u32) -> bool {
        self.min <= value && value <= self.max
    }
}

/// The four per-type intervals, ordered by minimum, plus a sampler.
#[derive(Debug)]
pub struct MagicHeaders {
    /// Indexed by `MessageKind as usize - 1` for sampling.
    by_kind: [MagicRange; 4],
    /// Sorted by `min`; disjoint by construction.
    ranges: Vec<MagicRange>,
    rng: Mutex<JunkRng>,
}

/// Sort the four per-type ranges by minimum and reject overlap.
pub(crate) fn sorted_disjoint(ranges: [MagicRange; 4]) -> Result<Vec<MagicRange>> {
    let mut ranges = ranges.to_vec();
    ranges.sort_by_key(|r| r.min);

    for pair in ranges.windows(2) {
        if pair[1].min <= pair[0].max {
            return Err(Error::range(
                pair[1].kind().key(),
                u64::from(pair[1].min),
                u64::from(pair[1].max),
            ));
        }
    }

    Ok(ranges)
}

impl MagicHeaders {
    /// Build the collection, rejecting overlapping intervals.
    pub fn new(ranges: [MagicRange; 4]) -> Result<Self> {
        let sorted = sorted_disjoint(ranges)?;
        let mut by_kind = ranges;
        by_kind.sort_by_key(|r| r.kind() as u32);

        // Exactly one range per message type
        for (index, range) in by_kind.iter().enumerate() {
            if range.kind() as usize != index + 1 {
                return Err(Error::InvalidMessageType(range.kind() as u32));
            }
        }

        Ok(Self {
            by_kind,
            ranges: sorted,
            rng: Mutex::new(JunkRng::new()?),
        })
    }

    /// The canonical headers: each kind keeps its wire discriminator.
    pub fn canonical() -> Result<Self> {
        Self::new(MessageKind::ALL.map(MagicRange::canonical))
    }

    /// Range configured for a message kind.
    pub fn range(&self, kind: MessageKind) -> MagicRange {
        self.by_kind[kind as usize - 1]
    }

    /// Sample a fresh outbound discriminator for a message kind.
    pub fn sample(&self, kind: MessageKind) -> u32 {
        let range = self.range(kind);
        self.rng
            .lock()
            .uniform(u64::from(range.min), u64::from(range.max)) as u32
    }

    /// Canonicalize an inbound discriminator to its interval minimum.
    ///
    /// Intervals are disjoint, so at most one covers the value; a miss means
    /// the frame does not belong to this configuration.
    pub fn classify(&self, value: u32) -> Result<u32> {
        self.ranges
            .iter()
            .find(|r| r.contains(value))
            .map(MagicRange::min)
            .ok_or(Error::NoSuchRange(value))
    }
}
