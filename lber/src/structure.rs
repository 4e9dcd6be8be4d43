//! The decoded form of a single BER tag.

use crate::common::TagClass;
use crate::universal::Types;

/// Payload of a [`StructureTag`](struct.StructureTag.html): either the raw
/// bytes of a primitive value, or the list of tags nested inside a
/// constructed one.
#[derive(Clone, Debug, PartialEq)]
pub enum PL {
    P(Vec<u8>),
    C(Vec<StructureTag>),
}

/// A fully decoded BER tag: class, tag number, and payload. This is the
/// common currency between the wire parser/encoder and the higher-level
/// `Tag` builder types in [`structures`](../structures/index.html).
#[derive(Clone, Debug, PartialEq)]
pub struct StructureTag {
    pub class: TagClass,
    pub id: u64,
    pub payload: PL,
}

impl StructureTag {
    /// Return `Some(self)` if the tag's class matches, otherwise `None`.
    pub fn match_class(self, class: TagClass) -> Option<StructureTag> {
        if self.class == class {
            Some(self)
        } else {
            None
        }
    }

    /// Return `Some(self)` if the tag number matches, otherwise `None`.
    pub fn match_id(self, id: u64) -> Option<StructureTag> {
        if self.id == id {
            Some(self)
        } else {
            None
        }
    }

    /// Unwrap a constructed payload into its component tags.
    pub fn expect_constructed(self) -> Option<Vec<StructureTag>> {
        match self.payload {
            PL::C(tags) => Some(tags),
            PL::P(_) => None,
        }
    }

    /// Unwrap a primitive payload into its raw bytes.
    pub fn expect_primitive(self) -> Option<Vec<u8>> {
        match self.payload {
            PL::P(bytes) => Some(bytes),
            PL::C(_) => None,
        }
    }

    /// True if this tag is a universal-class tag with the given type number.
    pub fn is_universal(&self, ty: Types) -> bool {
        self.class == TagClass::Universal && self.id == ty as u64
    }
}
