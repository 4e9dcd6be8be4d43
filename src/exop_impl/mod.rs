//! Extended operation construction and parsing.
//!
//! A generic exop is represented by [`Exop`](struct.Exop.html). If a
//! particular exop is implemented by this library, it may have one or two
//! associated structs: one for constructing requests, and another for
//! parsing responses. If request and response are the same, there is only
//! the request struct; if they are different, the response struct's name
//! consists of the request struct name with the `Resp` suffix.

use lber::common::TagClass;
use lber::structures::{OctetString, Tag};

mod passmod;
pub use self::passmod::{PasswordModify, PasswordModifyResp, PASSMOD_OID};

mod starttls;
pub use self::starttls::{StartTLS, STARTTLS_OID};

mod whoami;
pub use self::whoami::{WhoAmI, WhoAmIResp, WHOAMI_OID};

/// Generic extended operation: an optional request/response name (OID) and
/// an optional opaque value.
#[derive(Clone, Debug)]
pub struct Exop {
    pub name: Option<String>,
    pub val: Option<Vec<u8>>,
}

/// Parse the opaque value of a recognized extended operation response.
pub trait ExopParser {
    fn parse(val: &[u8]) -> Self;
}

impl From<Exop> for Vec<Tag> {
    fn from(exop: Exop) -> Vec<Tag> {
        construct_exop(exop)
    }
}

pub fn construct_exop(exop: Exop) -> Vec<Tag> {
    assert!(exop.name.is_some());
    let mut seq = vec![Tag::OctetString(OctetString {
        id: 0,
        class: TagClass::Context,
        inner: exop.name.unwrap().into_bytes(),
    })];
    if let Some(val) = exop.val {
        seq.push(Tag::OctetString(OctetString {
            id: 1,
            class: TagClass::Context,
            inner: val,
        }));
    }
    seq
}
