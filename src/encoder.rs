//! Comment block encoding.
//!
//! Wire format: `/*key1='value1',key2='value2'*/`. Keys are emitted in
//! byte-wise order of their unescaped form. Keys and values are percent
//! encoded so the block can never contain a quote, a separator, or the
//! comment terminator outside of its own delimiters.

use std::fmt::Write;

use crate::comments::SqlComments;
use crate::error::{Error, Result};

const BLOCK_OPEN: &str = "/*";
const BLOCK_CLOSE: &str = "*/";

/// Bytes that pass through unescaped (RFC 3986 unreserved set).
fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~')
}

/// Percent-encode every byte outside the unreserved set.
///
/// The output only contains `A-Z a-z 0-9 - _ . ~ %`, which makes the
/// encoding bijective and keeps `'`, `,`, `=` and `*/` out of the block.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        if is_unreserved(byte) {
            out.push(byte as char);
        } else {
            // writing to a String cannot fail
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Reverse [`escape`].
pub fn unescape(input: &str) -> Result<String> {
    let invalid = || Error::InvalidEscape {
        input: input.to_string(),
    };

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3).ok_or_else(invalid)?;
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return Err(invalid());
            }
            let hex = std::str::from_utf8(hex).map_err(|_| invalid())?;
            out.push(u8::from_str_radix(hex, 16).map_err(|_| invalid())?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).map_err(|_| invalid())
}

/// Fold provider outputs into one set, in chain order.
///
/// A key emitted by several parts takes the value of the last one.
pub fn merge<I>(parts: I) -> SqlComments
where
    I: IntoIterator<Item = SqlComments>,
{
    parts
        .into_iter()
        .fold(SqlComments::new(), |mut merged, part| {
            merged.merge(part);
            merged
        })
}

/// Serialize the pairs of a comment block without its delimiters.
pub fn serialize(comments: &SqlComments) -> String {
    let mut out = String::new();
    for (i, (key, value)) in comments.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape(key));
        out.push_str("='");
        out.push_str(&escape(value));
        out.push('\'');
    }
    out
}

/// Encode comments as a complete `/*...*/` block.
///
/// Returns an empty string when there is nothing to encode, so callers can
/// skip touching the statement entirely.
///
/// ```rust
/// use sea_orm_sqlcommenter::{encoder, SqlComments};
///
/// let comments = SqlComments::from([("b", "2"), ("a", "1")]);
/// assert_eq!(encoder::encode(&comments), "/*a='1',b='2'*/");
/// assert_eq!(encoder::encode(&SqlComments::new()), "");
/// ```
pub fn encode(comments: &SqlComments) -> String {
    if comments.is_empty() {
        return String::new();
    }
    format!("{BLOCK_OPEN}{}{BLOCK_CLOSE}", serialize(comments))
}

/// Parse a block produced by [`encode`] back into comments.
///
/// Surrounding whitespace is ignored. An empty input decodes to an empty set.
pub fn decode(block: &str) -> Result<SqlComments> {
    let block = block.trim();
    if block.is_empty() {
        return Ok(SqlComments::new());
    }

    let body = block
        .strip_prefix(BLOCK_OPEN)
        .and_then(|rest| rest.strip_suffix(BLOCK_CLOSE))
        .ok_or_else(|| Error::MalformedComment(block.to_string()))?;

    let mut comments = SqlComments::new();
    if body.is_empty() {
        return Ok(comments);
    }

    for pair in body.split(',') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::MalformedComment(pair.to_string()))?;
        let value = value
            .strip_prefix('\'')
            .and_then(|v| v.strip_suffix('\''))
            .ok_or_else(|| Error::MalformedComment(pair.to_string()))?;
        comments.insert(unescape(key)?, unescape(value)?);
    }

    Ok(comments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::keys;

    #[test]
    fn test_sorted_output() {
        let comments = SqlComments::from([("b", "2"), ("a", "1")]);
        assert_eq!(encode(&comments), "/*a='1',b='2'*/");
    }

    #[test]
    fn test_empty_encodes_to_nothing() {
        assert_eq!(encode(&SqlComments::new()), "");
        assert_eq!(serialize(&SqlComments::new()), "");
    }

    #[test]
    fn test_escaping_matches_sqlcommenter() {
        let comments = SqlComments::from([
            ("route", "/param first"),
            ("num", "1234"),
            ("query", "DROP TABLE FOO'"),
            ("injection", "/route/*/;DROP TABLE USERS"),
        ]);

        assert_eq!(
            serialize(&comments),
            "injection='%2Froute%2F%2A%2F%3BDROP%20TABLE%20USERS',\
             num='1234',\
             query='DROP%20TABLE%20FOO%27',\
             route='%2Fparam%20first'"
        );
    }

    #[test]
    fn test_escapes_reserved_characters() {
        assert_eq!(escape(" '\"%/*="), "%20%27%22%25%2F%2A%3D");
        assert_eq!(escape("a,b"), "a%2Cb");
        assert_eq!(escape("tab\there\n"), "tab%09here%0A");
        assert_eq!(escape("safe-chars_1.2~3"), "safe-chars_1.2~3");
        assert_eq!(escape("é"), "%C3%A9");
    }

    #[test]
    fn test_keys_are_escaped() {
        let comments = SqlComments::from([("my key", "v")]);
        assert_eq!(encode(&comments), "/*my%20key='v'*/");
    }

    #[test]
    fn test_no_terminator_inside_block() {
        let hostile = ["*/", "/*", "*/ DROP TABLE users; /*", "'*/--", "%2A%2F"];
        for value in hostile {
            let block = encode(&SqlComments::from([(value, value)]));
            let inner = &block[2..block.len() - 2];
            assert!(!inner.contains("*/"), "terminator leaked in {block}");
            assert!(!inner.contains("/*"), "opener leaked in {block}");
            assert!(block.ends_with("*/"));
        }
    }

    #[test]
    fn test_escape_round_trip() {
        let values = [
            "plain",
            "it's",
            "\"quoted\"",
            "100%",
            "/* nested */",
            "a=b,c=d",
            "line\nbreak\u{7f}",
            "日本語",
            "",
        ];
        for value in values {
            assert_eq!(unescape(&escape(value)).unwrap(), value);
        }
    }

    #[test]
    fn test_decode_round_trip() {
        let comments = SqlComments::from([
            (keys::APPLICATION, "billing api"),
            (keys::ROUTE, "/users/{id}"),
            (keys::TRACEPARENT, "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
            ("odd key='x'", "*/;--"),
        ]);

        assert_eq!(decode(&encode(&comments)).unwrap(), comments);
        assert_eq!(decode("").unwrap(), SqlComments::new());
        assert_eq!(decode("/**/").unwrap(), SqlComments::new());
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(decode("a='1'"), Err(Error::MalformedComment(_))));
        assert!(matches!(decode("/*a=1*/"), Err(Error::MalformedComment(_))));
        assert!(matches!(decode("/*a*/"), Err(Error::MalformedComment(_))));
        assert!(matches!(
            decode("/*a='%G1'*/"),
            Err(Error::InvalidEscape { .. })
        ));
        assert!(matches!(unescape("%4"), Err(Error::InvalidEscape { .. })));
        assert!(matches!(unescape("%FF"), Err(Error::InvalidEscape { .. })));
    }

    #[test]
    fn test_merge_last_wins() {
        let merged = merge([
            SqlComments::from([("k", "first"), ("a", "1")]),
            SqlComments::from([("k", "second")]),
        ]);

        assert_eq!(merged.get("k"), Some("second"));
        assert_eq!(merged.get("a"), Some("1"));
    }

    #[test]
    fn test_deterministic_regardless_of_insertion_order() {
        let forward: SqlComments = (0..50).map(|i| (format!("k{i}"), format!("v{i}"))).collect();
        let backward: SqlComments = (0..50)
            .rev()
            .map(|i| (format!("k{i}"), format!("v{i}")))
            .collect();

        assert_eq!(encode(&forward), encode(&backward));
    }
}
