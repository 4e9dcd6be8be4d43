//! BER tag/length/value encoding.

use std::io;

use bytes::{BufMut, BytesMut};

use crate::common::TagClass;
use crate::structure::{StructureTag, PL};

fn write_identifier(buf: &mut BytesMut, class: TagClass, constructed: bool, id: u64) {
    let class_bits = (class as u8) << 6;
    let pc_bit = if constructed { 0x20 } else { 0x00 };
    if id < 31 {
        buf.put_u8(class_bits | pc_bit | id as u8);
    } else {
        buf.put_u8(class_bits | pc_bit | 0x1f);
        let mut octets = Vec::new();
        let mut n = id;
        octets.push((n & 0x7f) as u8);
        n >>= 7;
        while n > 0 {
            octets.push((n & 0x7f) as u8 | 0x80);
            n >>= 7;
        }
        for &o in octets.iter().rev() {
            buf.put_u8(o);
        }
    }
}

fn write_length(buf: &mut BytesMut, len: usize) {
    if len < 128 {
        buf.put_u8(len as u8);
    } else {
        let mut octets = Vec::new();
        let mut n = len;
        while n > 0 {
            octets.push((n & 0xff) as u8);
            n >>= 8;
        }
        octets.reverse();
        buf.put_u8(0x80 | octets.len() as u8);
        buf.extend_from_slice(&octets);
    }
}

/// Encode a decoded tag tree into its BER wire representation, appending to
/// `into`. Definite-length encoding is used throughout, as mandated for
/// LDAP by RFC 4511 section 5.1.
pub fn encode_into(into: &mut BytesMut, tag: StructureTag) -> io::Result<()> {
    match tag.payload {
        PL::P(bytes) => {
            write_identifier(into, tag.class, false, tag.id);
            write_length(into, bytes.len());
            into.extend_from_slice(&bytes);
        }
        PL::C(tags) => {
            let mut inner = BytesMut::new();
            for t in tags {
                encode_into(&mut inner, t)?;
            }
            write_identifier(into, tag.class, true, tag.id);
            write_length(into, inner.len());
            into.extend_from_slice(&inner);
        }
    }
    Ok(())
}
