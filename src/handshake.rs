//! Handshake decoration scheduling.
//!
//! Each peer owns one [`HandshakeDecorator`] for the lifetime of its
//! session. The decorator interleaves tag-programmed junk batches around
//! handshake events: special junk is gated by a per-peer timer so repeated
//! handshakes change their timing signature, controlled junk accompanies
//! every handshake unconditionally.
//!
//! The first special opportunity intentionally yields nothing: the first
//! handshake is already covered by the unstructured junk path, and keeping
//! it deterministic means identically configured peers look identical on
//! session start.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::tag::TaggedPacketHandler;

/// Per-peer scheduler for special and controlled junk batches.
#[derive(Debug)]
pub struct HandshakeDecorator {
    special: Arc<TaggedPacketHandler>,
    controlled: Arc<TaggedPacketHandler>,
    i_timeout: Duration,
    next_send: Instant,
    first_done: bool,
    cancel: CancellationToken,
}

impl HandshakeDecorator {
    pub(crate) fn new(
        special: Arc<TaggedPacketHandler>,
        controlled: Arc<TaggedPacketHandler>,
        i_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            special,
            controlled,
            i_timeout,
            next_send: Instant::now(),
            first_done: false,
            cancel,
        }
    }

    /// Token that aborts any in-flight batch assembly for this peer.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Emit the special junk batch if the per-peer timer permits.
    ///
    /// The first call only arms the timer and returns nothing; afterwards a
    /// call before `next_send_time` returns nothing, and a call at or past
    /// it returns the batch and re-arms. A cancelled assembly returns
    /// nothing.
    pub async fn emit_special(&mut self) -> Vec<Bytes> {
        if !self.special.is_defined() {
            return Vec::new();
        }

        let now = Instant::now();
        if !self.first_done {
            self.first_done = true;
            self.next_send = now + self.i_timeout;
            tracing::trace!(timeout = ?self.i_timeout, "special junk timer armed");
            return Vec::new();
        }

        if now < self.next_send {
            return Vec::new();
        }

        let batch = self
            .special
            .generate_batch(&self.cancel)
            .await
            .unwrap_or_default();
        self.next_send = Instant::now() + self.i_timeout;
        batch
    }

    /// Emit the controlled junk batch. Not timer-gated.
    pub async fn emit_controlled(&self) -> Vec<Bytes> {
        if !self.controlled.is_defined() {
            return Vec::new();
        }

        self.controlled
            .generate_batch(&self.cancel)
            .await
            .unwrap_or_default()
    }
}
