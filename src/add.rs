//! Add operation.

use std::collections::HashSet;
use std::hash::Hash;

use lber::common::TagClass;
use lber::structures::{OctetString, Sequence, Set, Tag};

use crate::ldap::Ldap;
use crate::result::{LdapError, LdapResult, Result};

impl Ldap {
    /// Add an entry named `dn`, with the given set of attribute/value-set
    /// pairs. An empty value set for any attribute is rejected locally: the
    /// wire format cannot represent "an attribute with no values", and the
    /// server would almost certainly bounce it anyway.
    pub async fn add<S: AsRef<str> + Eq + Hash>(
        &mut self,
        dn: S,
        attrs: Vec<(S, HashSet<S>)>,
    ) -> Result<LdapResult> {
        if dn.as_ref().is_empty() {
            return Err(LdapError::InvalidArgument("empty DN for Add".into()));
        }
        if attrs.is_empty() {
            return Err(LdapError::InvalidArgument(
                "empty attribute list for Add".into(),
            ));
        }
        if attrs.iter().any(|(_, vals)| vals.is_empty()) {
            return Err(LdapError::InvalidArgument(
                "empty value set for Add".into(),
            ));
        }
        let req = Tag::Sequence(Sequence {
            id: 8,
            class: TagClass::Application,
            inner: vec![
                Tag::OctetString(OctetString {
                    inner: Vec::from(dn.as_ref()),
                    ..Default::default()
                }),
                Tag::Sequence(Sequence {
                    inner: attrs
                        .into_iter()
                        .map(|(name, vals)| {
                            Tag::Sequence(Sequence {
                                inner: vec![
                                    Tag::OctetString(OctetString {
                                        inner: Vec::from(name.as_ref()),
                                        ..Default::default()
                                    }),
                                    Tag::Set(Set {
                                        inner: vals
                                            .into_iter()
                                            .map(|v| {
                                                Tag::OctetString(OctetString {
                                                    inner: Vec::from(v.as_ref()),
                                                    ..Default::default()
                                                })
                                            })
                                            .collect(),
                                        ..Default::default()
                                    }),
                                ],
                                ..Default::default()
                            })
                        })
                        .collect(),
                    ..Default::default()
                }),
            ],
        });
        self.op(req).await
    }
}
