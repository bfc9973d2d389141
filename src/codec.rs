//! Composite key codec.
//!
//! A stored key is a `(user key, timestamp)` pair encoded so that plain byte
//! comparison orders records by ascending user key and, within one user key,
//! by descending timestamp. The newest version of a key is therefore the
//! first one a forward scan meets.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("string is not terminated")]
    UnterminatedString,

    #[error("invalid escape at byte {pos}")]
    BadEscape { pos: usize },

    #[error("truncated integer")]
    Truncated,

    #[error("invalid integer length prefix at byte {pos}")]
    BadLength { pos: usize },

    #[error("integer overflows i64")]
    Overflow,
}

/// Translates between `(user key, timestamp)` and the stored key bytes.
///
/// Implementations must keep byte order equal to logical order: ascending by
/// user key, then descending by timestamp. Decoded user keys are raw bytes;
/// stored keys need not be UTF-8.
pub trait KeyCodec {
    fn encode(&self, key: &str, ts: i64) -> Vec<u8>;

    fn decode(&self, encoded: &[u8]) -> Result<(Vec<u8>, i64), CodecError>;
}

/// The orderedcode layout: an escaped, terminated string followed by a
/// decreasing signed varint.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderedCode;

const ESCAPE: u8 = 0x00;
const ESCAPE_FF: u8 = 0xFF;
const ESCAPED_00: u8 = 0xFF;
const ESCAPED_FF: u8 = 0x00;
const TERMINATOR: u8 = 0x01;

#[cfg(test)]
const INCR: u8 = 0x00;
const DECR: u8 = 0xFF;

const MAX_INT_LEN: usize = 10;

impl KeyCodec for OrderedCode {
    fn encode(&self, key: &str, ts: i64) -> Vec<u8> {
        let mut buf = Vec::with_capacity(key.len() + 2 + MAX_INT_LEN);
        put_string(&mut buf, key.as_bytes());
        put_i64(&mut buf, ts, DECR);
        buf
    }

    fn decode(&self, encoded: &[u8]) -> Result<(Vec<u8>, i64), CodecError> {
        let (key, rest) = take_string(encoded)?;
        let (ts, _rest) = take_i64(rest, DECR)?;
        Ok((key, ts))
    }
}

fn put_string(buf: &mut Vec<u8>, s: &[u8]) {
    for &b in s {
        match b {
            ESCAPE => buf.extend_from_slice(&[ESCAPE, ESCAPED_00]),
            ESCAPE_FF => buf.extend_from_slice(&[ESCAPE_FF, ESCAPED_FF]),
            b => buf.push(b),
        }
    }
    buf.extend_from_slice(&[ESCAPE, TERMINATOR]);
}

fn take_string(src: &[u8]) -> Result<(Vec<u8>, &[u8]), CodecError> {
    let mut out = Vec::with_capacity(src.len());
    let mut pos = 0;

    while pos < src.len() {
        match (src[pos], src.get(pos + 1).copied()) {
            (ESCAPE, Some(TERMINATOR)) => return Ok((out, &src[pos + 2..])),
            (ESCAPE, Some(ESCAPED_00)) => out.push(ESCAPE),
            (ESCAPE_FF, Some(ESCAPED_FF)) => out.push(ESCAPE_FF),
            (ESCAPE, None) | (ESCAPE_FF, None) => return Err(CodecError::UnterminatedString),
            (ESCAPE, _) | (ESCAPE_FF, _) => return Err(CodecError::BadEscape { pos }),
            (b, _) => {
                out.push(b);
                pos += 1;
                continue;
            }
        }
        pos += 2;
    }

    Err(CodecError::UnterminatedString)
}

/// Appends `x` as `n` one-bits, a zero-bit, and `x` in the remaining `7n-1`
/// bits, choosing the smallest `n`. Negative values are stored as the
/// complement of the encoding of `!x`. `order` is XORed into every byte.
fn put_i64(buf: &mut Vec<u8>, x: i64, order: u8) {
    let neg = x < 0;
    let v = (if neg { !x } else { x }) as u64;

    let mut n = 1;
    while n < MAX_INT_LEN && v >> (7 * n - 1) != 0 {
        n += 1;
    }

    let bits = (((1u128 << n) - 1) << (7 * n)) | v as u128;
    let mask = order ^ if neg { 0xFF } else { 0x00 };
    buf.extend(bits.to_be_bytes()[16 - n..].iter().map(|b| b ^ mask));
}

fn take_i64(src: &[u8], order: u8) -> Result<(i64, &[u8]), CodecError> {
    let first = *src.first().ok_or(CodecError::Truncated)? ^ order;
    let neg = first & 0x80 == 0;
    let mask = order ^ if neg { 0xFF } else { 0x00 };

    let mut n = (src[0] ^ mask).leading_ones() as usize;
    if n == 8 {
        let second = *src.get(1).ok_or(CodecError::Truncated)? ^ mask;
        n += second.leading_ones() as usize;
    }
    if n > MAX_INT_LEN {
        return Err(CodecError::BadLength { pos: 0 });
    }
    if src.len() < n {
        return Err(CodecError::Truncated);
    }

    let bits = src[..n]
        .iter()
        .fold(0u128, |acc, &b| (acc << 8) | (b ^ mask) as u128);
    let v = bits & ((1u128 << (7 * n - 1)) - 1);
    let x = i64::try_from(v).map_err(|_| CodecError::Overflow)?;

    Ok((if neg { !x } else { x }, &src[n..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMESTAMPS: [i64; 14] = [
        i64::MIN,
        -(1 << 40),
        -1_000_000,
        -65,
        -64,
        -1,
        0,
        1,
        63,
        64,
        8191,
        1 << 20,
        1 << 62,
        i64::MAX,
    ];

    #[test]
    fn test_small_integers_take_one_byte() {
        let mut buf = Vec::new();
        put_i64(&mut buf, 5, INCR);
        put_i64(&mut buf, -1, INCR);
        put_i64(&mut buf, 5, DECR);

        assert_eq!(buf, vec![0x85, 0x7F, 0x7A]);
    }

    #[test]
    fn test_integer_decodes_back() {
        for order in [INCR, DECR] {
            for ts in TIMESTAMPS {
                let mut buf = Vec::new();
                put_i64(&mut buf, ts, order);
                buf.push(0xAB);

                let (decoded, rest) = take_i64(&buf, order).unwrap();
                assert_eq!(decoded, ts);
                assert_eq!(rest, &[0xAB]);
            }
        }
    }

    #[test]
    fn test_byte_order_matches_key_then_newest_first() {
        let keys = ["", "a", "a\u{0}", "aa", "ab", "b", "\u{ff}"];

        let mut pairs = Vec::new();
        for key in keys {
            for ts in TIMESTAMPS {
                pairs.push((key, ts));
            }
        }

        let mut by_bytes = pairs.clone();
        by_bytes.sort_by_key(|(key, ts)| OrderedCode.encode(key, *ts));

        let mut by_logic = pairs;
        by_logic.sort_by(|a, b| a.0.cmp(b.0).then(b.1.cmp(&a.1)));

        assert_eq!(by_bytes, by_logic);
    }

    #[test]
    fn test_escaped_bytes_survive_decode() {
        let key = "nul\u{0}in\u{0}side";
        let encoded = OrderedCode.encode(key, -7);

        let (decoded, ts) = OrderedCode.decode(&encoded).unwrap();
        assert_eq!(decoded, key.as_bytes());
        assert_eq!(ts, -7);
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let mut encoded = OrderedCode.encode("k", 3);
        encoded.extend_from_slice(b"junk");

        assert_eq!(OrderedCode.decode(&encoded).unwrap(), (b"k".to_vec(), 3));
    }

    #[test]
    fn test_unterminated_string_is_rejected() {
        assert!(matches!(
            OrderedCode.decode(b"abc"),
            Err(CodecError::UnterminatedString)
        ));
        assert!(matches!(
            OrderedCode.decode(b"abc\x00"),
            Err(CodecError::UnterminatedString)
        ));
    }

    #[test]
    fn test_bad_escape_is_rejected() {
        assert!(matches!(
            OrderedCode.decode(b"ab\x00\x02"),
            Err(CodecError::BadEscape { pos: 2 })
        ));
    }

    #[test]
    fn test_missing_timestamp_is_rejected() {
        assert!(matches!(
            OrderedCode.decode(b"ab\x00\x01"),
            Err(CodecError::Truncated)
        ));
    }

    #[test]
    fn test_truncated_timestamp_is_rejected() {
        let mut encoded = OrderedCode.encode("k", 1 << 40);
        encoded.pop();

        assert!(matches!(
            OrderedCode.decode(&encoded),
            Err(CodecError::Truncated)
        ));
    }

    #[test]
    fn test_oversized_length_prefix_is_rejected() {
        // Decreasing order, so 0x00 bytes read as all-ones headers.
        assert!(matches!(
            OrderedCode.decode(b"k\x00\x01\x00\x00\x00"),
            Err(CodecError::BadLength { .. })
        ));
    }

    #[test]
    fn test_binary_key_decodes_to_its_bytes() {
        let mut encoded = Vec::new();
        put_string(&mut encoded, &[0xC3, 0x28, 0x00, 0xFF]);
        put_i64(&mut encoded, 1, DECR);

        assert_eq!(
            OrderedCode.decode(&encoded).unwrap(),
            (vec![0xC3, 0x28, 0x00, 0xFF], 1)
        );
    }
}
