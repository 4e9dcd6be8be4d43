use crate::common::TagClass;
use crate::structure::{StructureTag, PL};
use crate::universal::Types;

use byteorder::{BigEndian, WriteBytesExt};

use super::ASNTag;

/// Integer value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Integer {
    pub id: u64,
    pub class: TagClass,
    pub inner: i64,
}

/// Encode a signed integer into the minimal two's-complement big-endian
/// octet string BER requires: the most significant bit of the first octet
/// must agree with the sign, so a positive value whose high bit would
/// otherwise read as negative gets a leading zero octet.
pub(crate) fn encode_signed(id: u64, class: TagClass, inner: i64) -> StructureTag {
    let mut count = 0u8;
    let mut rem: i64 = if inner >= 0 { inner } else { inner * -1 };
    while {
        count += 1;
        rem >>= 8;
        rem > 0
    } {}

    if inner > 0 && inner >> (8 * count - 1) == 1 {
        count += 1;
    }

    let mut out: Vec<u8> = Vec::with_capacity(count as usize);
    out.write_int::<BigEndian>(inner, count as usize).expect("int encode");

    StructureTag {
        id,
        class,
        payload: PL::P(out),
    }
}

impl ASNTag for Integer {
    fn into_structure(self) -> StructureTag {
        encode_signed(self.id, self.class, self.inner)
    }
}

impl Default for Integer {
    fn default() -> Integer {
        Integer {
            id: Types::Integer as u64,
            class: TagClass::Universal,
            inner: 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::encode_signed;
    use crate::common::TagClass;
    use crate::structure::PL;

    #[test]
    fn no_unnecessary_octets() {
        // 127 fits into a single octet.
        let result = encode_signed(2, TagClass::Universal, 127);
        assert_eq!(result.payload, PL::P(vec![127]));
    }

    #[test]
    fn positive_not_read_as_negative() {
        // 128 needs a leading zero octet, or it would decode as -128.
        let result = encode_signed(2, TagClass::Universal, 128);
        assert_eq!(result.payload, PL::P(vec![0, 128]));
    }
}
