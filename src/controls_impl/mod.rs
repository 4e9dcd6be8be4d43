//! Control construction and parsing.
//!
//! A control can be associated with a request or a response. Several common
//! controls are implemented directly by this module; its submodules define
//! one struct per control (or a request/response pair, when the two forms
//! differ).

use std::collections::HashMap;

use bytes::BytesMut;
use lazy_static::lazy_static;
use lber::structure::{StructureTag, PL};
use lber::structures::{ASNTag, Boolean, OctetString, Sequence, Tag};
use lber::universal::Types;
use lber::write;

pub mod types {
    pub type ControlType = self::inner::_ControlType;
    pub use self::inner::_ControlType::{
        Assertion, ManageDsaIt, MatchedValues, PagedResults, PostRead, PreRead, ProxyAuth,
        RelaxRules,
    };
    mod inner {
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum _ControlType {
            Assertion,
            ManageDsaIt,
            MatchedValues,
            PagedResults,
            PostRead,
            PreRead,
            ProxyAuth,
            RelaxRules,
            #[doc(hidden)]
            _Nonexhaustive,
        }
    }
}
use self::types::ControlType;

mod assertion;
pub use self::assertion::{Assertion, ASSERTION_OID};

mod manage_dsa_it;
pub use self::manage_dsa_it::{ManageDsaIt, MANAGE_DSA_IT_OID};

mod matched_values;
pub use self::matched_values::{MatchedValues, MATCHED_VALUES_OID};

mod paged_results;
pub use self::paged_results::{PagedResults, PAGED_RESULTS_OID};

mod proxy_auth;
pub use self::proxy_auth::{ProxyAuth, PROXY_AUTH_OID};

mod read_entry;
pub use self::read_entry::{PostRead, PostReadResp, PreRead, PreReadResp, ReadEntryResp};

mod relax_rules;
pub use self::relax_rules::{RelaxRules, RELAX_RULES_OID};

lazy_static! {
    static ref CONTROLS: HashMap<&'static str, ControlType> = {
        let mut map = HashMap::new();
        map.insert(self::assertion::ASSERTION_OID, types::Assertion);
        map.insert(self::manage_dsa_it::MANAGE_DSA_IT_OID, types::ManageDsaIt);
        map.insert(self::matched_values::MATCHED_VALUES_OID, types::MatchedValues);
        map.insert(self::paged_results::PAGED_RESULTS_OID, types::PagedResults);
        map.insert(self::proxy_auth::PROXY_AUTH_OID, types::ProxyAuth);
        map.insert(self::read_entry::PRE_READ_OID, types::PreRead);
        map.insert(self::read_entry::POST_READ_OID, types::PostRead);
        map.insert(self::relax_rules::RELAX_RULES_OID, types::RelaxRules);
        map
    };
}

/// Marker trait adding a `.critical()` conversion to a `RawControl`-producing
/// request control struct.
pub trait MakeCritical {
    fn critical(self) -> CriticalControl<Self>
    where
        Self: Sized,
    {
        CriticalControl { control: self }
    }
}

pub struct CriticalControl<T> {
    control: T,
}

impl<T> From<CriticalControl<T>> for RawControl
where
    RawControl: From<T>,
{
    fn from(cc: CriticalControl<T>) -> RawControl {
        let mut raw = RawControl::from(cc.control);
        raw.crit = true;
        raw
    }
}

/// Parse the opaque value of a recognized control.
pub trait ControlParser {
    fn parse(val: &[u8]) -> Self;
}

/// A request or response control: an optional recognized [`ControlType`](types/type.ControlType.html)
/// plus the underlying [`RawControl`](struct.RawControl.html).
#[derive(Clone, Debug)]
pub struct Control(pub Option<ControlType>, pub RawControl);

/// Generic form of a control: an OID, a criticality flag, and an opaque
/// value.
#[derive(Clone, Debug)]
pub struct RawControl {
    pub ctype: String,
    pub crit: bool,
    pub val: Option<Vec<u8>>,
}

impl RawControl {
    /// Parse this control's value as a recognized control type `T`.
    pub fn parse<T: ControlParser>(&self) -> T {
        T::parse(self.val.as_deref().unwrap_or(&[]))
    }
}

impl From<RawControl> for StructureTag {
    fn from(ctrl: RawControl) -> StructureTag {
        construct_control(&ctrl.ctype, ctrl.crit, ctrl.val)
    }
}

pub fn construct_control(oid: &str, crit: bool, val: Option<Vec<u8>>) -> StructureTag {
    let mut seq = vec![Tag::OctetString(OctetString {
        inner: Vec::from(oid.as_bytes()),
        ..Default::default()
    })];
    if crit {
        seq.push(Tag::Boolean(Boolean {
            inner: true,
            ..Default::default()
        }));
    }
    if let Some(val) = val {
        seq.push(Tag::OctetString(OctetString {
            inner: val,
            ..Default::default()
        }));
    }
    Tag::Sequence(Sequence {
        inner: seq,
        ..Default::default()
    })
    .into_structure()
}

/// Encode a vector of request controls as the `[0] Controls` element of a
/// message envelope.
pub fn encode_controls(ctrls: Vec<RawControl>) -> StructureTag {
    StructureTag {
        id: 0,
        class: lber::common::TagClass::Context,
        payload: PL::C(ctrls.into_iter().map(StructureTag::from).collect()),
    }
}

/// Decode the `[0] Controls` element of a response envelope.
pub fn parse_controls(t: StructureTag) -> Vec<Control> {
    let tags = t
        .expect_constructed()
        .expect("controls sequence")
        .into_iter();
    let mut ctrls = Vec::new();
    for ctrl in tags {
        let mut components = ctrl.expect_constructed().expect("components").into_iter();
        let ctype = String::from_utf8(
            components
                .next()
                .expect("element")
                .expect_primitive()
                .expect("octet string"),
        )
        .expect("control type");
        let next = components.next();
        let (crit, maybe_val) = match next {
            None => (false, None),
            Some(c) => match c {
                StructureTag {
                    id,
                    class: _,
                    ref payload,
                } if id == Types::Boolean as u64 => match *payload {
                    PL::P(ref v) => (v[0] != 0, components.next()),
                    PL::C(_) => panic!("decoding error"),
                },
                StructureTag {
                    id,
                    class: _,
                    payload: _,
                } if id == Types::OctetString as u64 => (false, Some(c.clone())),
                _ => panic!("decoding error"),
            },
        };
        let val = maybe_val.map(|v| v.expect_primitive().expect("octet string"));
        let known_type = CONTROLS.get(ctype.as_str()).copied();
        ctrls.push(Control(
            known_type,
            RawControl {
                ctype,
                crit,
                val,
            },
        ));
    }
    ctrls
}

/// Helper for submodule From impls that need to write a tag tree into bytes.
pub(crate) fn encode_value(tag: Tag) -> Vec<u8> {
    let mut buf = BytesMut::new();
    write::encode_into(&mut buf, tag.into_structure()).expect("encoded");
    Vec::from(&buf[..])
}
