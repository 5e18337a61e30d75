//! Error types for the obfuscation core.

use thiserror::Error;

/// Result type alias for obfuscation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or operating the obfuscation core.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration text could not be parsed
    #[error("parse key {key}: {reason}")]
    Parse {
        /// Configuration key or tag the value belonged to
        key: String,
        /// What went wrong with the value
        reason: String,
    },

    /// A numeric range has min above max, or overlaps a sibling range
    #[error("invalid range for {key}: {min}-{max}")]
    Range {
        /// Configuration key the range came from
        key: String,
        /// Lower bound as configured
        min: u64,
        /// Upper bound as configured
        max: u64,
    },

    /// A tag parameter exceeds its hard limit
    #[error("parameter of <{element}> out of range: {value} exceeds {limit}")]
    ParamOutOfRange {
        /// Tag name the parameter belonged to
        element: &'static str,
        /// Offending value
        value: u64,
        /// Maximum permitted value
        limit: u64,
    },

    /// Tag name is not part of the DSL
    #[error("unknown tag: {0}")]
    UnknownTag(String),

    /// A once-only tag appeared more than once in a packet definition
    #[error("tag {0} needs to be unique")]
    DuplicateUniqueTag(String),

    /// Tag input violates the `<name param>` grammar
    #[error("ill-formed tag input: {0}")]
    Malformed(String),

    /// Packet definition contains no tags at all
    #[error("empty input")]
    EmptyInput,

    /// Packet definition contains a `<>` tag
    #[error("empty tag in input: {0}")]
    EmptyTag(String),

    /// A tag's element constructor rejected its parameter
    #[error("tag {tag}: {source}")]
    Param {
        /// Tag the parameter belonged to
        tag: String,
        /// Constructor error
        #[source]
        source: Box<Error>,
    },

    /// Tagged-packet names do not form a consecutive 1..N prefix
    #[error("junk packet index should be consecutive")]
    NonConsecutive,

    /// Message type outside the 1..4 discriminator space
    #[error("invalid message type: {0}")]
    InvalidMessageType(u32),

    /// No configured magic-header range covers the value
    #[error("no range found for message type: {0}")]
    NoSuchRange(u32),

    /// Writer failure while appending header junk
    #[error("write header junk: {0}")]
    Io(#[from] std::io::Error),

    /// The OS entropy source failed to produce a PRNG seed
    #[error("entropy source unavailable")]
    EntropyUnavailable,
}

impl Error {
    /// Create a new parse error for a configuration key or tag.
    pub fn parse(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a new range error for a configuration key.
    pub fn range(key: impl Into<String>, min: u64, max: u64) -> Self {
        Error::Range {
            key: key.into(),
            min,
            max,
        }
    }

    /// Wrap an element-constructor error with the tag it came from.
    pub fn param(tag: impl Into<String>, source: Error) -> Self {
        Error::Param {
            tag: tag.into(),
            source: Box::new(source),
        }
    }

    /// Check if this error is fatal at configuration-build time.
    ///
    /// Runtime misses (`NoSuchRange`, `Io`) are reported to the caller and
    /// the session continues; everything else invalidates the configuration.
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Error::NoSuchRange(_) | Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::parse("Jc", "invalid digit found in string");
        assert_eq!(err.to_string(), "parse key Jc: invalid digit found in string");

        let err = Error::range("H1", 500, 400);
        assert_eq!(err.to_string(), "invalid range for H1: 500-400");

        let err = Error::ParamOutOfRange {
            element: "wt",
            value: 9000,
            limit: 5000,
        };
        assert_eq!(
            err.to_string(),
            "parameter of <wt> out of range: 9000 exceeds 5000"
        );
    }

    #[test]
    fn test_param_wraps_source() {
        let err = Error::param(
            "r",
            Error::ParamOutOfRange {
                element: "r",
                value: 2000,
                limit: 1000,
            },
        );
        assert!(err.to_string().starts_with("tag r:"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(Error::EmptyInput.is_config_error());
        assert!(Error::NonConsecutive.is_config_error());
        assert!(!Error::NoSuchRange(0x150).is_config_error());
        assert!(!Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "sink closed")).is_config_error());
    }
}
