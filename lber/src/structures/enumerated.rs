use crate::common::TagClass;
use crate::structure::StructureTag;
use crate::universal::Types;

use super::integer::encode_signed;
use super::ASNTag;

/// An `ENUMERATED` value; encoded identically to `Integer`; kept as a
/// distinct type so the universal tag number defaults correctly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Enumerated {
    pub id: u64,
    pub class: TagClass,
    pub inner: i64,
}

impl ASNTag for Enumerated {
    fn into_structure(self) -> StructureTag {
        encode_signed(self.id, self.class, self.inner)
    }
}

impl Default for Enumerated {
    fn default() -> Enumerated {
        Enumerated {
            id: Types::Enumerated as u64,
            class: TagClass::Universal,
            inner: 0,
        }
    }
}
