//! # fogwire
//!
//! Traffic-obfuscation core for a WireGuard-style VPN data plane. The crate
//! decorates and shapes a handshake/transport exchange so that on-wire
//! packets deviate from the canonical protocol in configurable,
//! deterministic-yet-randomized ways, defeating passive classifiers while
//! preserving peer-to-peer session establishment.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Surrounding data plane (I/O workers)        │
//! ├─────────────────────────────────────────────────────────┤
//! │  Protocol facade (header junk, magic headers, batches)  │
//! ├───────────────┬────────────────────┬────────────────────┤
//! │  Junk creator │  Magic-header      │  Handshake         │
//! │  (Jc/Jmin/    │  ranges (H1..H4)   │  decorator         │
//! │   Jmax/S1..S4)│                    │  (I*/J*/Itime)     │
//! ├───────────────┴────────────────────┴────────────────────┤
//! │  Tag DSL (parser, element generators, batch assembly)   │
//! ├─────────────────────────────────────────────────────────┤
//! │  Seeded junk streams (OS entropy → fast PRNG)           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Goals
//!
//! 1. **Interoperability**: two endpoints with identical parameters always
//!    classify each other's frames correctly
//! 2. **No signature**: junk content is decorrelated from the session and
//!    never repeats across instances
//! 3. **Immutability**: parameters are validated once and frozen; hot
//!    reconfiguration swaps the snapshot whole
//!
//! The cryptographic handshake, transport encryption and tunnel devices
//! are external collaborators; this crate only shapes what they emit.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod handshake;
pub mod junk;
pub mod magic;
pub mod prng;
pub mod protocol;
pub mod tag;

pub use config::{ObfuscationConfig, ObfuscationConfigBuilder, ObfuscationParams};
pub use error::{Error, Result};
pub use handshake::HandshakeDecorator;
pub use magic::MessageKind;
pub use protocol::Protocol;

/// Largest packet the junk paths will produce (typical Ethernet MTU).
pub const MAX_PACKET_SIZE: usize = 1500;
