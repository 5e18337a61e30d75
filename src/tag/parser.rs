//! Parser for the tagged-junk packet DSL.
//!
//! A packet definition is a run of tags, each `<name>` or `<name param>`:
//!
//! ```text
//! <b 0xf6ab3267fa><c><t><r 10><wt 100>
//! ```
//!
//! `b` is a byte literal, `c` the reserved counter, `t` a timestamp, `r`
//! random bytes, `wt` a wait-timeout, `wr` the reserved wait-for-response.
//! `c` and `t` may appear at most once per packet; the rest may repeat.

use crate::error::{Error, Result};
use crate::tag::element::Element;
use crate::tag::packet::TaggedPacket;

/// Tags that may appear at most once per packet definition.
const UNIQUE_TAGS: [&str; 2] = ["c", "t"];

/// Parse one packet definition into a named [`TaggedPacket`].
pub fn parse(name: &str, input: &str) -> Result<TaggedPacket> {
    let mut segments = input.split('<');

    // Text before the first '<' is not a tag; a definition with no '<' at
    // all has nothing to parse.
    segments.next();
    let mut elements = Vec::new();
    let mut seen_unique: Vec<&str> = Vec::new();

    for segment in segments {
        if segment.len() <= 1 {
            return Err(Error::EmptyTag(input.to_string()));
        }
        if segment.bytes().filter(|&b| b == b'>').count() != 1 {
            return Err(Error::Malformed(input.to_string()));
        }

        // Safe: the single '>' was counted above.
        let body = &segment[..segment.find('>').unwrap_or_default()];
        let (tag, param) = split_tag(body).ok_or_else(|| Error::Malformed(input.to_string()))?;

        if UNIQUE_TAGS.contains(&tag) {
            if seen_unique.contains(&tag) {
                return Err(Error::DuplicateUniqueTag(tag.to_string()));
            }
            seen_unique.push(tag);
        }

        let element = match tag {
            "b" => Element::bytes(param),
            "c" => Element::counter(param),
            "t" => Element::timestamp(param),
            "r" => Element::random(param),
            "wt" => Element::wait_timeout(param),
            "wr" => Element::wait_response(param),
            other => return Err(Error::UnknownTag(other.to_string())),
        }
        .map_err(|e| Error::param(tag, e))?;

        elements.push(element);
    }

    if elements.is_empty() {
        return Err(Error::EmptyInput);
    }

    Ok(TaggedPacket::new(name, elements))
}

/// Split a tag body into its name and whitespace-separated parameter.
///
/// The name is the leading alphabetic run; anything after it must be
/// separated by whitespace. Returns `None` for bodies like `` or `b0xff`.
fn split_tag(body: &str) -> Option<(&str, &str)> {
    let name_len = body
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    if name_len == 0 {
        return None;
    }

    let (name, rest) = body.split_at(name_len);
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    Some((name, rest.trim()))
}
