//! Tag-programmed junk packets.
//!
//! This module provides the structured half of junk generation:
//! - A mini-language of element generators (`<b>`, `<c>`, `<t>`, `<r>`,
//!   `<wt>`, `<wr>`)
//! - A parser turning packet definitions into element sequences
//! - Batch assembly with shared packet accounting

mod element;
mod packet;
mod parser;

pub use element::{Element, MAX_RANDOM_SIZE, MAX_WAIT_TIMEOUT_MS, TIMESTAMP_SIZE};
pub use packet::{PacketCounter, TaggedPacket, TaggedPacketHandler};
pub use parser::parse;
