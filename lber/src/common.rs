//! Tag class and construction bits shared by the rest of the crate.

/// The four BER tag classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagClass {
    Universal = 0,
    Application = 1,
    Context = 2,
    Private = 3,
}

impl TagClass {
    pub fn from_u8(b: u8) -> Option<TagClass> {
        match b {
            0 => Some(TagClass::Universal),
            1 => Some(TagClass::Application),
            2 => Some(TagClass::Context),
            3 => Some(TagClass::Private),
            _ => None,
        }
    }
}

/// Whether a tag's payload is a single primitive value or a constructed
/// sequence of other tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagStructure {
    Primitive = 0,
    Constructed = 1,
}

impl TagStructure {
    pub fn from_u8(b: u8) -> Option<TagStructure> {
        match b {
            0 => Some(TagStructure::Primitive),
            1 => Some(TagStructure::Constructed),
            _ => None,
        }
    }
}
