use crate::common::TagClass;
use crate::structure::{StructureTag, PL};
use crate::universal::Types;

use super::{ASNTag, Tag};

/// A `SEQUENCE` of tags. The LDAP message envelope, every protocol
/// operation, and most controls are sequences at the top level.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    pub id: u64,
    pub class: TagClass,
    pub inner: Vec<Tag>,
}

impl ASNTag for Sequence {
    fn into_structure(self) -> StructureTag {
        StructureTag {
            id: self.id,
            class: self.class,
            payload: PL::C(self.inner.into_iter().map(|t| t.into_structure()).collect()),
        }
    }
}

impl Default for Sequence {
    fn default() -> Sequence {
        Sequence {
            id: Types::Sequence as u64,
            class: TagClass::Universal,
            inner: Vec::new(),
        }
    }
}
