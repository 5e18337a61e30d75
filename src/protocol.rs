//! Protocol facade aggregating the obfuscation subsystems.
//!
//! The surrounding data plane talks to one [`Protocol`] value: header junk
//! on every outbound frame, magic-header sampling and classification on the
//! wire path, and junk batches around handshake events. A validated
//! configuration is frozen into an internal snapshot; reconfiguration swaps
//! the snapshot whole, so concurrent readers observe either the old or the
//! new parameters, never a mix.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::ObfuscationConfig;
use crate::error::{Error, Result};
use crate::handshake::HandshakeDecorator;
use crate::junk::JunkCreator;
use crate::magic::{MagicHeaders, MessageKind};
use crate::tag::{self, PacketCounter, TaggedPacketHandler};

/// Runtime state frozen from one validated configuration.
#[derive(Debug)]
struct Snapshot {
    cfg: ObfuscationConfig,
    junk: JunkCreator,
    magic: MagicHeaders,
    special: Arc<TaggedPacketHandler>,
    controlled: Arc<TaggedPacketHandler>,
}

impl Snapshot {
    fn build(cfg: ObfuscationConfig, counter: &PacketCounter) -> Result<Self> {
        let junk = JunkCreator::new(
            cfg.junk_packet_count(),
            cfg.junk_packet_min_size(),
            cfg.junk_packet_max_size(),
        )?;
        let magic = MagicHeaders::new(cfg.magic_ranges())?;
        let special = Arc::new(build_handler(
            cfg.special_junk(),
            cfg.junk_packet_count(),
            counter,
        )?);
        let controlled = Arc::new(build_handler(
            cfg.controlled_junk(),
            cfg.junk_packet_count(),
            counter,
        )?);

        Ok(Self {
            cfg,
            junk,
            magic,
            special,
            controlled,
        })
    }
}

fn build_handler(
    defs: &[(String, String)],
    extra_count: usize,
    counter: &PacketCounter,
) -> Result<TaggedPacketHandler> {
    let mut handler =
        TaggedPacketHandler::new(counter.clone()).with_default_extra_count(extra_count);
    for (name, input) in defs {
        handler.push(tag::parse(name, input)?);
    }
    handler.validate()?;
    Ok(handler)
}

/// Facade over magic headers, junk creation and handshake decoration.
#[derive(Debug)]
pub struct Protocol {
    /// Mirror of the snapshot's master switch, readable without the lock.
    enabled: AtomicBool,
    state: RwLock<Snapshot>,
    counter: PacketCounter,
}

impl Protocol {
    /// Freeze a validated configuration into an operating facade.
    pub fn new(cfg: ObfuscationConfig) -> Result<Self> {
        let counter = PacketCounter::new();
        let snapshot = Snapshot::build(cfg, &counter)?;
        let enabled = snapshot.cfg.is_enabled();
        tracing::info!(enabled, "obfuscation protocol ready");

        Ok(Self {
            enabled: AtomicBool::new(enabled),
            state: RwLock::new(snapshot),
            counter,
        })
    }

    /// Whether obfuscation is active. When false every operation is a
    /// no-op: the junk paths return empty output and the magic-header
    /// paths fall back to the canonical discriminators.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Swap in a new configuration atomically.
    ///
    /// Peers keep the handlers of the snapshot they were created under
    /// until their decorator is rebuilt.
    pub fn reconfigure(&self, cfg: ObfuscationConfig) -> Result<()> {
        let snapshot = Snapshot::build(cfg, &self.counter)?;
        let enabled = snapshot.cfg.is_enabled();

        *self.state.write() = snapshot;
        self.enabled.store(enabled, Ordering::Relaxed);
        tracing::debug!(enabled, "obfuscation snapshot swapped");
        Ok(())
    }

    /// Junk prepended to an outgoing handshake initiation (`S1`).
    pub fn create_init_header_junk(&self) -> Result<Bytes> {
        self.create_header_junk(MessageKind::Initiation, 0)
    }

    /// Junk prepended to an outgoing handshake response (`S2`).
    pub fn create_response_header_junk(&self) -> Result<Bytes> {
        self.create_header_junk(MessageKind::Response, 0)
    }

    /// Junk prepended to an outgoing cookie reply (`S3`).
    pub fn create_cookie_reply_header_junk(&self) -> Result<Bytes> {
        self.create_header_junk(MessageKind::Underload, 0)
    }

    /// Junk prepended to an outgoing transport frame (`S4`).
    ///
    /// `extra_capacity` reserves room for the frame that will follow the
    /// junk, sparing the caller a reallocation.
    pub fn create_transport_header_junk(&self, extra_capacity: usize) -> Result<Bytes> {
        self.create_header_junk(MessageKind::Transport, extra_capacity)
    }

    fn create_header_junk(&self, kind: MessageKind, extra_capacity: usize) -> Result<Bytes> {
        if !self.is_enabled() {
            return Ok(Bytes::new());
        }

        let state = self.state.read();
        let size = state.cfg.header_junk_size(kind);
        if size == 0 {
            return Ok(Bytes::new());
        }

        let mut writer = BytesMut::with_capacity(size + extra_capacity).writer();
        state.junk.append_junk(&mut writer, size)?;
        Ok(writer.into_inner().freeze())
    }

    /// Canonicalize an inbound magic header to its message type's
    /// configured minimum.
    ///
    /// A disabled facade accepts only the canonical discriminators 1..4
    /// and returns them unchanged; configured ranges are not consulted.
    pub fn magic_header_min_for(&self, value: u32) -> Result<u32> {
        if !self.is_enabled() {
            return match MessageKind::try_from(value) {
                Ok(kind) => Ok(kind as u32),
                Err(_) => Err(Error::NoSuchRange(value)),
            };
        }
        self.state.read().magic.classify(value)
    }

    /// Sample a fresh outbound magic header for message type 1..4.
    ///
    /// A disabled facade returns the canonical discriminator itself.
    pub fn magic_header_sample(&self, msg_type: u32) -> Result<u32> {
        let kind = MessageKind::try_from(msg_type)?;
        if !self.is_enabled() {
            return Ok(kind as u32);
        }
        Ok(self.state.read().magic.sample(kind))
    }

    /// The unstructured junk batch sent ahead of a handshake.
    pub fn unstructured_junk(&self) -> Vec<Bytes> {
        if !self.is_enabled() {
            return Vec::new();
        }
        self.state.read().junk.create_batch()
    }

    /// Create the decoration state for a new peer.
    ///
    /// `cancel` is the peer's teardown token; cancelling it aborts any
    /// in-flight batch assembly. A disabled facade hands out a silent
    /// decorator.
    pub fn decorator(&self, cancel: CancellationToken) -> HandshakeDecorator {
        if !self.is_enabled() {
            return HandshakeDecorator::new(
                Arc::new(TaggedPacketHandler::new(self.counter.clone())),
                Arc::new(TaggedPacketHandler::new(self.counter.clone())),
                std::time::Duration::ZERO,
                cancel,
            );
        }

        let state = self.state.read();
        HandshakeDecorator::new(
            state.special.clone(),
            state.controlled.clone(),
            state.cfg.i_timeout(),
            cancel,
        )
    }

    /// Timer-gated special junk for one peer.
    pub async fn special_junk(&self, peer: &mut HandshakeDecorator) -> Vec<Bytes> {
        peer.emit_special().await
    }

    /// Unconditional controlled junk for one peer.
    pub async fn controlled_junk(&self, peer: &HandshakeDecorator) -> Vec<Bytes> {
        peer.emit_controlled().await
    }

    /// Handle to the monotonic junk packet counter.
    pub fn packet_counter(&self) -> PacketCounter {
        self.counter.clone()
    }
}
