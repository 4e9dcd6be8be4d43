//! Universal-class tag numbers used by LDAP PDUs.

/// Universal-class ASN.1 tag numbers in use by this crate. LDAP only needs
/// a handful of the full ASN.1 universal type set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Types {
    Boolean = 1,
    Integer = 2,
    OctetString = 4,
    Null = 5,
    Enumerated = 10,
    Sequence = 16,
    Set = 17,
}
