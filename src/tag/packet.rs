//! Tagged packet assembly and batch handling.
//!
//! A [`TaggedPacket`] is an ordered element sequence parsed from one DSL
//! definition; a [`TaggedPacketHandler`] owns the packets of one junk class
//! (special or controlled) and emits them as a batch. Batches are accounted
//! against a shared [`PacketCounter`] so the surrounding device can report
//! how many decoy packets a session has produced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::tag::element::Element;

/// Monotonic count of junk packets accounted for by batch generation.
///
/// An explicit capability handed to each handler at construction; increments
/// are atomic with no ordering guarantees beyond monotonicity.
#[derive(Debug, Clone, Default)]
pub struct PacketCounter(Arc<AtomicU64>);

impl PacketCounter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter by `n` packets.
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Current total.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// One named junk packet: an ordered element sequence and its derived size.
#[derive(Debug)]
pub struct TaggedPacket {
    name: String,
    elements: Vec<Element>,
    packet_size: usize,
}

impl TaggedPacket {
    pub(crate) fn new(name: &str, elements: Vec<Element>) -> Self {
        let packet_size = elements.iter().map(Element::size).sum();
        Self {
            name: name.to_string(),
            elements,
            packet_size,
        }
    }

    /// The packet's configured name, e.g. `i1`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parsed element sequence, in declaration order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Assembled size: the sum of element sizes. Wait tags contribute 0.
    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    /// One-based position encoded in the name's trailing digit.
    fn name_index(&self) -> Result<usize> {
        let mut chars = self.name.chars();
        let index = match (chars.next(), chars.next(), chars.next()) {
            (Some(prefix), Some(digit), None) if prefix.is_ascii_alphabetic() => {
                digit.to_digit(10).filter(|&d| d >= 1)
            }
            _ => None,
        };

        index.map(|d| d as usize).ok_or_else(|| {
            Error::parse(&self.name, "packet name must be a letter followed by a digit")
        })
    }

    /// Assemble the packet: element payloads concatenated in declaration
    /// order, pausing at each wait tag.
    ///
    /// Returns `None` when `cancel` fires mid-assembly; a cancelled assembly
    /// produces no packet.
    pub async fn assemble(&self, cancel: &CancellationToken) -> Option<Bytes> {
        let mut buf = BytesMut::with_capacity(self.packet_size);
        for element in &self.elements {
            if let Some(delay) = element.wait_duration() {
                tokio::select! {
                    _ = cancel.cancelled() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            element.write_to(&mut buf);
        }
        Some(buf.freeze())
    }
}

/// Ordered set of tagged packets emitted together as one batch.
#[derive(Debug)]
pub struct TaggedPacketHandler {
    packets: Vec<TaggedPacket>,
    /// Unstructured packets the caller adds alongside this batch; accounted
    /// for here, produced elsewhere.
    default_extra_count: usize,
    counter: PacketCounter,
}

impl TaggedPacketHandler {
    /// Create an empty handler accounting against `counter`.
    pub fn new(counter: PacketCounter) -> Self {
        Self {
            packets: Vec::new(),
            default_extra_count: 0,
            counter,
        }
    }

    /// Set the number of caller-supplied unstructured packets per batch.
    pub fn with_default_extra_count(mut self, count: usize) -> Self {
        self.default_extra_count = count;
        self
    }

    /// Append a packet in declaration order.
    pub fn push(&mut self, packet: TaggedPacket) {
        self.packets.push(packet);
    }

    /// Number of tagged packets per batch.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Whether the handler holds no packets.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Whether this junk class was configured at all.
    pub fn is_defined(&self) -> bool {
        !self.packets.is_empty()
    }

    /// Check that packet names carry exactly the indices 1..N.
    pub fn validate(&self) -> Result<()> {
        let mut seen = vec![false; self.packets.len()];
        for packet in &self.packets {
            let index = packet.name_index()?;
            if index > self.packets.len() || seen[index - 1] {
                return Err(Error::NonConsecutive);
            }
            seen[index - 1] = true;
        }

        if seen.iter().all(|&found| found) {
            Ok(())
        } else {
            Err(Error::NonConsecutive)
        }
    }

    /// Assemble every packet, in declared order.
    ///
    /// Advances the packet counter by batch length plus the default extra
    /// count. Returns `None` when cancelled; nothing is accounted then.
    pub async fn generate_batch(&self, cancel: &CancellationToken) -> Option<Vec<Bytes>> {
        let mut batch = Vec::with_capacity(self.packets.len());
        for packet in &self.packets {
            batch.push(packet.assemble(cancel).await?);
        }

        self.counter
            .add((self.packets.len() + self.default_extra_count) as u64);
        Some(batch)
    }
}
