//! A pure-Rust LDAPv3 client, in both async and blocking flavors.
//!
//! Connect with [`LdapConnAsync::new()`](struct.LdapConnAsync.html#method.new)
//! (driven with the [`drive!`](macro.drive.html) macro) for the async API, or
//! [`LdapConn::new()`](struct.LdapConn.html#method.new) for a blocking façade
//! built on an internal single-threaded runtime. Either way, the returned
//! handle exposes the operations: [`simple_bind`](struct.Ldap.html#method.simple_bind),
//! [`search`](struct.Ldap.html#method.search), [`add`](struct.Ldap.html#method.add),
//! [`modify`](struct.Ldap.html#method.modify), and so on.

pub mod asn1 {
    //! Re-exports of the underlying BER/DER primitives from the `lber`
    //! crate, for implementers of third-party controls and extended
    //! operations. Deliberately under-documented -- consult the source of
    //! an existing control or exop for usage examples.
    pub use lber::common::TagClass;
    pub use lber::parse::{parse_tag, parse_uint};
    pub use lber::structure::{StructureTag, PL};
    pub use lber::structures::{
        ASNTag, Boolean, Enumerated, ExplicitTag, Integer, Null, OctetString, Sequence, Set, Tag,
    };
    pub use lber::universal::Types;
    pub use lber::write;
    pub use lber::IResult;
}

pub mod adapters;
mod bind;
#[cfg(feature = "gssapi")]
mod bind_gssapi;
mod conn;
pub mod controls {
    //! Control construction and parsing.
    //!
    //! A control can be associated with a request or a response. Several common
    //! controls, such as [`PagedResults`](struct.PagedResults.html), are implemented
    //! directly by this library. If an implemented control has the same form for
    //! the request and the response, there will be a single structure for both.
    //! (This is the case for `PagedResults`.) If the response control is different,
    //! its name will consist of the request control name with the `Resp` suffix.
    //!
    //! A request control can be created by instantiating its structure and converting
    //! it to ASN.1 with `into()` when passing the instance or constructing the request
    //! control vector in a call to [`Ldap::with_controls()`](../struct.Ldap.html#method.with_controls).
    //! A third-party control must implement the conversion from an instance
    //! of itself to [`RawControl`](struct.RawControl.html), a general form of control.
    //!
    //! `RawControl`, together with an optional instance of [`ControlType`](enum.ControlType.html),
    //! forms the type [`Control`](struct.Control.html); a vector of `Control`s is part
    //! of the result of every LDAP operation which returns one.
    //!
    //! A recognized response control can be parsed by calling
    //! [`parse()`](struct.RawControl.html#method.parse) on the instance of `RawControl`
    //! representing it. A third-party control must implement the
    //! [`ControlParser`](trait.ControlParser.html) trait to support this interface.
    pub use crate::controls_impl::types;
    pub use crate::controls_impl::types::ControlType;
    pub use crate::controls_impl::{Assertion, PagedResults, ProxyAuth, RelaxRules};
    pub use crate::controls_impl::{
        Control, ControlParser, CriticalControl, MakeCritical, RawControl,
    };
    pub use crate::controls_impl::{PostRead, PostReadResp, PreRead, PreReadResp, ReadEntryResp};
}
mod controls_impl;
mod exop_impl;
pub mod exop {
    //! Extended operation construction and parsing.
    //!
    //! A generic exop is represented by [`Exop`](struct.Exop.html). If a particular
    //! exop is implemented by this library, it may have one or two associated structs;
    //! one for constructing requests, and another for parsing responses. If request and
    //! response are the same, there is only the request struct; if they are different,
    //! the response struct's name will consist of the request struct name with the
    //! `Resp` suffix.
    //!
    //! A request struct must implement the `From` conversion of itself into `Exop`.
    //! A response struct must implement the [`ExopParser`](trait.ExopParser.html)
    //! trait.
    pub use crate::exop_impl::{
        Exop, ExopParser, PasswordModify, PasswordModifyResp, StartTLS, WhoAmI, WhoAmIResp,
    };
}
mod filter;
mod ldap;
mod protocol;
pub mod result;
mod rootdse;
mod search;
#[cfg(feature = "sync")]
mod sync;
mod util;

mod add;
mod compare;
mod delete;
mod extended;
mod modify;
mod modifydn;

#[cfg(feature = "gssapi")]
pub use bind_gssapi::KrbConfig;
pub use conn::{LdapConnAsync, LdapConnSettings};
pub use filter::parse as parse_filter;
pub use ldap::{Ldap, Mod};
pub use result::{LdapError, LdapResult, Result};
pub use rootdse::RootDSE;
pub use search::{
    parse_refs, DerefAliases, ResultEntry, Scope, SearchEntry, SearchOptions, SearchStream,
};
#[cfg(feature = "sync")]
pub use sync::LdapConn;
pub use util::{dn_escape, ldap_escape};
