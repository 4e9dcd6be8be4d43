//! Extended operation.

use lber::common::TagClass;
use lber::structure::StructureTag;
use lber::structures::{Sequence, Tag};
use lber::universal::Types;

use crate::exop::Exop;
use crate::ldap::Ldap;
use crate::result::{ExopResult, LdapError, LdapResult, Result};

impl Ldap {
    /// Perform an Extended operation. `exop` must implement `Into<Vec<Tag>>`
    /// (every exop request struct in [`exop`](exop/index.html) does).
    pub async fn extended<E>(&mut self, exop: E) -> Result<ExopResult>
    where
        Vec<Tag>: From<E>,
    {
        let req = Tag::Sequence(Sequence {
            id: 23,
            class: TagClass::Application,
            inner: exop.into(),
        });
        let (tag, ctrls) = self.send(req).await?;
        match tag {
            Tag::StructureTag(t) => {
                let (result, exop) = parse_extended_response(t, ctrls);
                Ok(ExopResult(result, exop))
            }
            _ => Err(LdapError::ProtocolError("unexpected response PDU".into())),
        }
    }
}

fn parse_extended_response(tag: StructureTag, ctrls: Option<StructureTag>) -> (LdapResult, Exop) {
    let mut tags = tag.expect_constructed().unwrap_or_default().into_iter();
    let rc = tags
        .next()
        .and_then(|t| t.match_class(TagClass::Universal))
        .and_then(|t| t.match_id(Types::Enumerated as u64))
        .and_then(|t| t.expect_primitive())
        .map(|v| v.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
        .unwrap_or(1);
    let matched = tags
        .next()
        .and_then(|t| t.expect_primitive())
        .map(|v| String::from_utf8_lossy(&v).into_owned())
        .unwrap_or_default();
    let text = tags
        .next()
        .and_then(|t| t.expect_primitive())
        .map(|v| String::from_utf8_lossy(&v).into_owned())
        .unwrap_or_default();
    let mut refs = Vec::new();
    let mut name = None;
    let mut val = None;
    for t in tags {
        if t.class != TagClass::Context {
            continue;
        }
        match t.id {
            3 => refs.push(
                crate::search::parse_refs(t)
                    .into_iter()
                    .collect::<std::collections::HashSet<_>>(),
            ),
            10 => {
                name = t
                    .expect_primitive()
                    .map(|v| String::from_utf8_lossy(&v).into_owned())
            }
            11 => val = t.expect_primitive(),
            _ => {}
        }
    }
    let ctrls = ctrls
        .map(crate::controls_impl::parse_controls)
        .unwrap_or_default();
    (
        LdapResult {
            rc,
            matched,
            text,
            refs,
            ctrls,
        },
        Exop { name, val },
    )
}
