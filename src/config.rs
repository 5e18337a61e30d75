//! Obfuscation configuration.
//!
//! Parameters arrive as string key/value pairs from the surrounding
//! interface configuration ([`ObfuscationParams`] is the raw serialized
//! form) and are validated once into an immutable [`ObfuscationConfig`]
//! snapshot. Every error here is fatal at build time; nothing is clamped
//! or silently corrected.
//!
//! Recognized keys:
//!
//! | Key | Meaning |
//! |---|---|
//! | `Jc` | junk packets prepended to a handshake (0..128) |
//! | `Jmin`/`Jmax` | junk packet size bounds |
//! | `S1`..`S4` | header junk size for init/response/cookie-reply/transport |
//! | `H1`..`H4` | magic-header value or `min-max` range per message type |
//! | `I1`..`I9` | tag-DSL definitions of the special junk packets |
//! | `J1`..`J9` | tag-DSL definitions of the controlled junk packets |
//! | `Itime` | special junk timer, seconds (0..3600) |

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::magic::{self, MagicRange, MessageKind};
use crate::tag;
use crate::MAX_PACKET_SIZE;

/// Upper bound on `Jc`.
pub const MAX_JUNK_PACKET_COUNT: usize = 128;

/// Upper bound on `Itime` in seconds.
pub const MAX_ITIME_SECS: u64 = 3600;

/// Raw obfuscation parameters, keyed by configuration key.
///
/// This is the serialization boundary: an interface section deserializes
/// into this map, and [`ObfuscationConfigBuilder::from_params`] consumes
/// it. Keys sort lexicographically, which keeps `I1`..`I9` in definition
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObfuscationParams {
    entries: BTreeMap<String, String>,
}

impl ObfuscationParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Whether no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ObfuscationParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// One junk class definition: the packet name and its raw DSL string.
pub(crate) type JunkDef = (String, String);

/// Validated, immutable obfuscation parameters.
#[derive(Debug, Clone)]
pub struct ObfuscationConfig {
    enabled: bool,
    junk_packet_count: usize,
    junk_packet_min_size: usize,
    junk_packet_max_size: usize,
    init_header_junk_size: usize,
    response_header_junk_size: usize,
    cookie_reply_header_junk_size: usize,
    transport_header_junk_size: usize,
    magic: [MagicRange; 4],
    special_junk: Vec<JunkDef>,
    controlled_junk: Vec<JunkDef>,
    i_timeout: Duration,
}

impl ObfuscationConfig {
    /// Start building a configuration.
    pub fn builder() -> ObfuscationConfigBuilder {
        ObfuscationConfigBuilder::default()
    }

    /// Build directly from raw parameters.
    pub fn from_params(params: &ObfuscationParams) -> Result<Self> {
        ObfuscationConfigBuilder::from_params(params)?.build()
    }

    /// Master switch; a disabled configuration turns the whole facade into
    /// a no-op.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of unstructured junk packets per handshake (`Jc`).
    pub fn junk_packet_count(&self) -> usize {
        self.junk_packet_count
    }

    /// Lower junk packet size bound (`Jmin`).
    pub fn junk_packet_min_size(&self) -> usize {
        self.junk_packet_min_size
    }

    /// Upper junk packet size bound (`Jmax`).
    pub fn junk_packet_max_size(&self) -> usize {
        self.junk_packet_max_size
    }

    /// Header junk size for one frame type (`S1`..`S4`).
    pub fn header_junk_size(&self, kind: MessageKind) -> usize {
        match kind {
            MessageKind::Initiation => self.init_header_junk_size,
            MessageKind::Response => self.response_header_junk_size,
            MessageKind::Underload => self.cookie_reply_header_junk_size,
            MessageKind::Transport => self.transport_header_junk_size,
        }
    }

    /// The four magic-header ranges, indexed by message type.
    pub fn magic_ranges(&self) -> [MagicRange; 4] {
        self.magic
    }

    /// Special junk definitions in declaration order.
    pub(crate) fn special_junk(&self) -> &[JunkDef] {
        &self.special_junk
    }

    /// Controlled junk definitions in declaration order.
    pub(crate) fn controlled_junk(&self) -> &[JunkDef] {
        &self.controlled_junk
    }

    /// Minimum interval between special junk batches (`Itime`).
    pub fn i_timeout(&self) -> Duration {
        self.i_timeout
    }
}

impl Default for ObfuscationConfig {
    /// The disabled configuration: canonical headers, no junk anywhere.
    fn default() -> Self {
        Self {
            enabled: false,
            junk_packet_count: 0,
            junk_packet_min_size: 0,
            junk_packet_max_size: 0,
            init_header_junk_size: 0,
            response_header_junk_size: 0,
            cookie_reply_header_junk_size: 0,
            transport_header_junk_size: 0,
            magic: MessageKind::ALL.map(MagicRange::canonical),
            special_junk: Vec::new(),
            controlled_junk: Vec::new(),
            i_timeout: Duration::ZERO,
        }
    }
}

/// Builder collecting raw keys before validation.
#[derive(Debug, Default)]
pub struct ObfuscationConfigBuilder {
    enabled: Option<bool>,
    junk_packet_count: usize,
    junk_packet_min_size: usize,
    junk_packet_max_size: usize,
    header_junk_sizes: [usize; 4],
    magic: [Option<MagicRange>; 4],
    special: BTreeMap<u8, String>,
    controlled: BTreeMap<u8, String>,
    i_timeout_secs: u64,
    any_set: bool,
}

impl ObfuscationConfigBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every entry of a raw parameter set.
    pub fn from_params(params: &ObfuscationParams) -> Result<Self> {
        let mut builder = Self::new();
        for (key, value) in params.iter() {
            builder.set(key, value)?;
        }
        Ok(builder)
    }

    /// Override the derived master switch.
    ///
    /// Without an override the configuration enables itself as soon as any
    /// key is set.
    pub fn enable(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Apply one configuration key. Keys are matched case-insensitively.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let lower = key.to_ascii_lowercase();
        match lower.as_str() {
            "jc" => {
                self.junk_packet_count =
                    bounded(key, "Jc", value, MAX_JUNK_PACKET_COUNT as u64)? as usize;
            }
            "jmin" => {
                self.junk_packet_min_size =
                    bounded(key, "Jmin", value, MAX_PACKET_SIZE as u64)? as usize;
            }
            "jmax" => {
                self.junk_packet_max_size =
                    bounded(key, "Jmax", value, MAX_PACKET_SIZE as u64)? as usize;
            }
            "s1" => self.header_junk_sizes[0] = bounded(key, "S1", value, MAX_PACKET_SIZE as u64)? as usize,
            "s2" => self.header_junk_sizes[1] = bounded(key, "S2", value, MAX_PACKET_SIZE as u64)? as usize,
            "s3" => self.header_junk_sizes[2] = bounded(key, "S3", value, MAX_PACKET_SIZE as u64)? as usize,
            "s4" => self.header_junk_sizes[3] = bounded(key, "S4", value, MAX_PACKET_SIZE as u64)? as usize,
            "h1" | "h2" | "h3" | "h4" => {
                let kind = MessageKind::ALL[(lower.as_bytes()[1] - b'1') as usize];
                self.magic[kind as usize - 1] = Some(MagicRange::parse(value, kind)?);
            }
            "itime" => {
                self.i_timeout_secs = bounded(key, "Itime", value, MAX_ITIME_SECS)?;
            }
            _ => match junk_def_slot(&lower) {
                Some(('i', index)) => {
                    self.special.insert(index, value.to_string());
                }
                Some(('j', index)) => {
                    self.controlled.insert(index, value.to_string());
                }
                _ => return Err(Error::parse(key, "unknown obfuscation key")),
            },
        }

        self.any_set = true;
        Ok(())
    }

    /// Validate everything and freeze the configuration.
    pub fn build(self) -> Result<ObfuscationConfig> {
        if self.junk_packet_min_size > self.junk_packet_max_size {
            return Err(Error::range(
                "Jmin-Jmax",
                self.junk_packet_min_size as u64,
                self.junk_packet_max_size as u64,
            ));
        }

        let mut ranges = MessageKind::ALL.map(MagicRange::canonical);
        for (slot, configured) in ranges.iter_mut().zip(self.magic) {
            if let Some(range) = configured {
                *slot = range;
            }
        }
        magic::sorted_disjoint(ranges)?;

        let special_junk = collect_junk_defs('i', &self.special)?;
        let controlled_junk = collect_junk_defs('j', &self.controlled)?;

        let [init, response, cookie_reply, transport] = self.header_junk_sizes;
        Ok(ObfuscationConfig {
            enabled: self.enabled.unwrap_or(self.any_set),
            junk_packet_count: self.junk_packet_count,
            junk_packet_min_size: self.junk_packet_min_size,
            junk_packet_max_size: self.junk_packet_max_size,
            init_header_junk_size: init,
            response_header_junk_size: response,
            cookie_reply_header_junk_size: cookie_reply,
            transport_header_junk_size: transport,
            magic: ranges,
            special_junk,
            controlled_junk,
            i_timeout: Duration::from_secs(self.i_timeout_secs),
        })
    }
}

/// Parse a decimal value and enforce its configured ceiling.
fn bounded(key: &str, element: &'static str, value: &str, limit: u64) -> Result<u64> {
    let v: u64 = value
        .parse()
        .map_err(|e| Error::parse(key, format!("{value:?}: {e}")))?;
    if v > limit {
        return Err(Error::ParamOutOfRange {
            element,
            value: v,
            limit,
        });
    }
    Ok(v)
}

/// Match `i1`..`i9` / `j1`..`j9` keys.
fn junk_def_slot(lower: &str) -> Option<(char, u8)> {
    let bytes = lower.as_bytes();
    if bytes.len() != 2 || !matches!(bytes[0], b'i' | b'j') {
        return None;
    }
    match bytes[1] {
        digit @ b'1'..=b'9' => Some((bytes[0] as char, digit - b'0')),
        _ => None,
    }
}

/// Check index consecutiveness and DSL well-formedness of one junk class.
fn collect_junk_defs(prefix: char, defs: &BTreeMap<u8, String>) -> Result<Vec<JunkDef>> {
    for (expected, &actual) in (1..).zip(defs.keys()) {
        if expected != actual {
            return Err(Error::NonConsecutive);
        }
    }

    defs.iter()
        .map(|(index, input)| {
            let name = format!("{prefix}{index}");
            // Parse now so configuration errors surface at build time; the
            // snapshot re-parses when it instantiates the handlers.
            tag::parse(&name, input)?;
            Ok((name, input.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, &str)]) -> ObfuscationParams {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_default_is_disabled_identity() {
        let config = ObfuscationConfig::default();
        assert!(!config.is_enabled());
        assert_eq!(config.junk_packet_count(), 0);
        for kind in MessageKind::ALL {
            assert_eq!(config.header_junk_size(kind), 0);
            assert_eq!(config.magic_ranges()[kind as usize - 1].min(), kind as u32);
        }
    }

    #[test]
    fn test_build_from_params() {
        let config = ObfuscationConfig::from_params(&params(&[
            ("Jc", "3"),
            ("Jmin", "40"),
            ("Jmax", "70"),
            ("S1", "15"),
            ("S2", "68"),
            ("H1", "12345"),
            ("H2", "500-600"),
            ("H3", "700"),
            ("H4", "800"),
            ("I1", "<b 0xf6ab><r 10>"),
            ("I2", "<t>"),
            ("Itime", "120"),
        ]))
        .unwrap();

        assert!(config.is_enabled());
        assert_eq!(config.junk_packet_count(), 3);
        assert_eq!(config.junk_packet_min_size(), 40);
        assert_eq!(config.junk_packet_max_size(), 70);
        assert_eq!(config.header_junk_size(MessageKind::Initiation), 15);
        assert_eq!(config.header_junk_size(MessageKind::Response), 68);
        assert_eq!(config.header_junk_size(MessageKind::Transport), 0);
        assert_eq!(config.magic_ranges()[1].min(), 500);
        assert_eq!(config.magic_ranges()[1].max(), 600);
        assert_eq!(config.special_junk().len(), 2);
        assert_eq!(config.special_junk()[0].0, "i1");
        assert_eq!(config.i_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_enabled_follows_any_key() {
        let config = ObfuscationConfig::from_params(&params(&[("S1", "10")])).unwrap();
        assert!(config.is_enabled());

        let config = ObfuscationConfig::from_params(&ObfuscationParams::new()).unwrap();
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_enable_override() {
        let mut builder = ObfuscationConfig::builder();
        builder.set("S1", "10").unwrap();
        let config = builder.enable(false).build().unwrap();
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut builder = ObfuscationConfig::builder();
        assert!(matches!(
            builder.set("Frob", "1"),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(builder.set("I10", "<t>"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_scalar_limits() {
        let mut builder = ObfuscationConfig::builder();
        assert!(matches!(
            builder.set("Jc", "129"),
            Err(Error::ParamOutOfRange { element: "Jc", .. })
        ));
        assert!(matches!(
            builder.set("S2", "1501"),
            Err(Error::ParamOutOfRange { element: "S2", .. })
        ));
        assert!(matches!(
            builder.set("Itime", "3601"),
            Err(Error::ParamOutOfRange { element: "Itime", .. })
        ));
        assert!(matches!(builder.set("Jc", "three"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_inverted_junk_bounds_rejected() {
        let err = ObfuscationConfig::from_params(&params(&[("Jmin", "50"), ("Jmax", "40")]))
            .unwrap_err();
        assert!(matches!(err, Error::Range { .. }));
    }

    #[test]
    fn test_magic_overlap_rejected() {
        let err = ObfuscationConfig::from_params(&params(&[
            ("H1", "100-200"),
            ("H2", "150-300"),
            ("H3", "400"),
            ("H4", "500"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Range { .. }));
    }

    #[test]
    fn test_configured_range_overlapping_default_rejected() {
        // H2 stays at its canonical value 2, which this H1 range swallows
        let err =
            ObfuscationConfig::from_params(&params(&[("H1", "1-10")])).unwrap_err();
        assert!(matches!(err, Error::Range { .. }));
    }

    #[test]
    fn test_junk_defs_must_be_consecutive() {
        let err = ObfuscationConfig::from_params(&params(&[
            ("I1", "<t>"),
            ("I3", "<r 4>"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::NonConsecutive));
    }

    #[test]
    fn test_junk_def_dsl_validated_at_build() {
        let err = ObfuscationConfig::from_params(&params(&[("J1", "<frob>")])).unwrap_err();
        assert!(matches!(err, Error::UnknownTag(_)));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_params_round_trip_is_ordered() {
        let params = params(&[("I2", "<t>"), ("I1", "<c>")]);
        let keys: Vec<_> = params.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["I1", "I2"]);
    }
}
