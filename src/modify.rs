//! Modify operation.

use std::collections::HashSet;
use std::hash::Hash;

use lber::common::TagClass;
use lber::structures::{Enumerated, OctetString, Sequence, Set, Tag};

use crate::ldap::{Ldap, Mod};
use crate::result::{LdapError, LdapResult, Result};

impl Ldap {
    /// Apply the given sequence of attribute changes to the entry named
    /// `dn`. An empty value set on `Mod::Add` is rejected locally for the
    /// same reason as in [`add()`](struct.Ldap.html#method.add).
    pub async fn modify<S: AsRef<str> + Eq + Hash>(
        &mut self,
        dn: &str,
        mods: Vec<Mod<S>>,
    ) -> Result<LdapResult> {
        if mods
            .iter()
            .any(|m| matches!(m, Mod::Add(_, set) if set.is_empty()))
        {
            return Err(LdapError::InvalidArgument(
                "empty value set for Add".into(),
            ));
        }
        let req = Tag::Sequence(Sequence {
            id: 6,
            class: TagClass::Application,
            inner: vec![
                Tag::OctetString(OctetString {
                    inner: Vec::from(dn.as_bytes()),
                    ..Default::default()
                }),
                Tag::Sequence(Sequence {
                    inner: mods.into_iter().map(encode_mod).collect(),
                    ..Default::default()
                }),
            ],
        });
        self.op(req).await
    }
}

fn encode_mod<S: AsRef<str> + Eq + Hash>(m: Mod<S>) -> Tag {
    let (num, attr, values): (i64, S, HashSet<S>) = match m {
        Mod::Add(attr, set) => (0, attr, set),
        Mod::Delete(attr, set) => (1, attr, set),
        Mod::Replace(attr, set) => (2, attr, set),
        Mod::Increment(attr, amount) => (3, attr, HashSet::from([amount])),
    };
    let op = Tag::Enumerated(Enumerated {
        inner: num,
        ..Default::default()
    });
    let part_attr = Tag::Sequence(Sequence {
        inner: vec![
            Tag::OctetString(OctetString {
                inner: Vec::from(attr.as_ref()),
                ..Default::default()
            }),
            Tag::Set(Set {
                inner: values
                    .into_iter()
                    .map(|val| {
                        Tag::OctetString(OctetString {
                            inner: Vec::from(val.as_ref()),
                            ..Default::default()
                        })
                    })
                    .collect(),
                ..Default::default()
            }),
        ],
        ..Default::default()
    });
    Tag::Sequence(Sequence {
        inner: vec![op, part_attr],
        ..Default::default()
    })
}
