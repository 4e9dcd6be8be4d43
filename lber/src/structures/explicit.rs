use crate::common::TagClass;
use crate::structure::{StructureTag, PL};

use super::{ASNTag, Tag};

/// An explicitly tagged value: the inner tag is encoded in full and then
/// wrapped inside an outer constructed tag carrying `id`/`class`. LDAP uses
/// this for context-tagged SASL credentials and a handful of other
/// `[n] EXPLICIT` fields.
#[derive(Clone, Debug, PartialEq)]
pub struct ExplicitTag {
    pub id: u64,
    pub class: TagClass,
    pub inner: Box<Tag>,
}

impl ASNTag for ExplicitTag {
    fn into_structure(self) -> StructureTag {
        StructureTag {
            id: self.id,
            class: self.class,
            payload: PL::C(vec![self.inner.into_structure()]),
        }
    }
}

impl Default for ExplicitTag {
    fn default() -> ExplicitTag {
        ExplicitTag {
            id: 0,
            class: TagClass::Context,
            inner: Box::new(Tag::Null(crate::structures::Null::default())),
        }
    }
}
