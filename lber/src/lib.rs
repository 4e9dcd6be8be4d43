//! A minimal ASN.1 BER encoder/parser, tailored to the subset of the
//! notation used by LDAPv3 ([RFC 4511](https://tools.ietf.org/html/rfc4511)).
//!
//! This crate intentionally doesn't attempt to be a general-purpose ASN.1
//! toolkit. It implements just enough of BER -- definite-length tag/length/value
//! encoding for the universal types LDAP uses, plus tagged (application- and
//! context-class) variants -- to round-trip LDAP PDUs. Higher-level concerns
//! (the LDAP message envelope, protocol operations, controls) live in the
//! `ldap3` crate and are built on top of the primitives exported here.

pub mod common;
pub mod parse;
pub mod structure;
pub mod structures;
pub mod universal;
pub mod write;

pub use nom::IResult;
