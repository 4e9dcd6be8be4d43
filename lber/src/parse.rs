//! BER tag/length/value decoding.
//!
//! The parser is written by hand rather than with `nom`'s combinator
//! macros: BER's identifier and length octets don't map cleanly onto
//! `nom`'s byte- or bit-oriented primitives once the long forms (multi-byte
//! tag numbers, multi-byte lengths) are taken into account. `nom`'s error
//! and `Needed` types are reused so callers -- principally the `ldap3`
//! framed codec -- get the usual "ask for more bytes and retry" signal for
//! an incomplete frame.

use nom::error::{Error, ErrorKind};
use nom::{Err, IResult, Needed};

use crate::common::TagClass;
use crate::structure::{StructureTag, PL};

fn need(n: usize) -> Err<Error<&'static [u8]>> {
    Err::Incomplete(Needed::new(n))
}

fn parse_identifier(input: &[u8]) -> IResult<&[u8], (TagClass, bool, u64)> {
    if input.is_empty() {
        return Err(need(1));
    }
    let first = input[0];
    let class = TagClass::from_u8(first >> 6).expect("two bits always map to a class");
    let constructed = first & 0x20 != 0;
    let mut rest = &input[1..];
    let mut id = (first & 0x1f) as u64;
    if id == 0x1f {
        id = 0;
        loop {
            if rest.is_empty() {
                return Err(need(1));
            }
            let b = rest[0];
            rest = &rest[1..];
            id = (id << 7) | (b & 0x7f) as u64;
            if b & 0x80 == 0 {
                break;
            }
        }
    }
    Ok((rest, (class, constructed, id)))
}

fn parse_length(input: &[u8]) -> IResult<&[u8], usize> {
    if input.is_empty() {
        return Err(need(1));
    }
    let first = input[0];
    let rest = &input[1..];
    if first & 0x80 == 0 {
        return Ok((rest, first as usize));
    }
    let n_octets = (first & 0x7f) as usize;
    if n_octets == 0 {
        // Indefinite length isn't used by LDAP's definite-length encoding.
        return Err(Err::Failure(Error::new(input, ErrorKind::LengthValue)));
    }
    if rest.len() < n_octets {
        return Err(need(n_octets - rest.len()));
    }
    let mut len: usize = 0;
    for &b in &rest[..n_octets] {
        len = (len << 8) | b as usize;
    }
    Ok((&rest[n_octets..], len))
}

/// Parse a single BER TLV, recursing into constructed payloads. Returns
/// `Err(Err::Incomplete(_))` when `input` doesn't yet hold a whole tag --
/// the signal the framed codec uses to wait for more bytes from the socket.
pub fn parse_tag(input: &[u8]) -> IResult<&[u8], StructureTag> {
    let (rest, (class, constructed, id)) = parse_identifier(input)?;
    let (rest, len) = parse_length(rest)?;
    if rest.len() < len {
        return Err(need(len - rest.len()));
    }
    let (value, rest) = rest.split_at(len);
    let payload = if constructed {
        let mut inner = Vec::new();
        let mut remaining = value;
        while !remaining.is_empty() {
            let (r, tag) = parse_tag(remaining)?;
            inner.push(tag);
            remaining = r;
        }
        PL::C(inner)
    } else {
        PL::P(value.to_vec())
    };
    Ok((rest, StructureTag { class, id, payload }))
}

/// Parse a big-endian two's-complement integer payload (as produced by
/// [`encode_signed`](../structures/integer/fn.encode_signed.html)) into an
/// unsigned value. Used for fields that are never negative in practice
/// (message ids, result codes, enumerations).
pub fn parse_uint(input: &[u8]) -> IResult<&[u8], u64> {
    if input.is_empty() {
        return Err(need(1));
    }
    let mut val: u64 = 0;
    for &b in input {
        val = (val << 8) | b as u64;
    }
    Ok((&input[input.len()..], val))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn short_form_primitive() {
        let (rest, tag) = parse_tag(&[0x02, 0x01, 0x05]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(tag.id, 2);
        assert_eq!(tag.payload, PL::P(vec![5]));
    }

    #[test]
    fn constructed_sequence() {
        let input = [0x30, 0x03, 0x02, 0x01, 0x07];
        let (rest, tag) = parse_tag(&input).unwrap();
        assert!(rest.is_empty());
        match tag.payload {
            PL::C(inner) => {
                assert_eq!(inner.len(), 1);
                assert_eq!(inner[0].payload, PL::P(vec![7]));
            }
            PL::P(_) => panic!("expected constructed payload"),
        }
    }

    #[test]
    fn incomplete_yields_needed() {
        assert!(parse_tag(&[0x30, 0x05, 0x02, 0x01]).is_err());
    }

    #[test]
    fn long_form_length() {
        let mut input = vec![0x04, 0x81, 0x80];
        input.extend(std::iter::repeat(0x41).take(128));
        let (rest, tag) = parse_tag(&input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(tag.payload, PL::P(vec![0x41; 128]));
    }

    #[test]
    fn parse_uint_big_endian() {
        let (rest, v) = parse_uint(&[0x01, 0x00]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(v, 256);
    }
}
