use crate::common::TagClass;
use crate::structure::{StructureTag, PL};
use crate::universal::Types;

use super::{ASNTag, Tag};

/// A `SET OF` tags. Used for attribute value lists in Add/Modify, and for
/// the AttributeList of a Search result entry's per-attribute value set.
#[derive(Clone, Debug, PartialEq)]
pub struct Set {
    pub id: u64,
    pub class: TagClass,
    pub inner: Vec<Tag>,
}

impl ASNTag for Set {
    fn into_structure(self) -> StructureTag {
        StructureTag {
            id: self.id,
            class: self.class,
            payload: PL::C(self.inner.into_iter().map(|t| t.into_structure()).collect()),
        }
    }
}

impl Default for Set {
    fn default() -> Set {
        Set {
            id: Types::Set as u64,
            class: TagClass::Universal,
            inner: Vec::new(),
        }
    }
}
