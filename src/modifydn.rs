//! Modify DN (rename/move) operation.

use lber::common::TagClass;
use lber::structures::{Boolean, OctetString, Sequence, Tag};

use crate::ldap::Ldap;
use crate::result::{LdapError, LdapResult, Result};

impl Ldap {
    /// Rename or move the entry named `dn`. `rdn` is the new relative DN;
    /// `delete_old` controls whether the old RDN's value is removed from
    /// the entry; `new_sup`, if given, moves the entry under a new parent.
    pub async fn modifydn(
        &mut self,
        dn: &str,
        rdn: &str,
        delete_old: bool,
        new_sup: Option<&str>,
    ) -> Result<LdapResult> {
        if rdn.is_empty() {
            return Err(LdapError::InvalidArgument(
                "empty new RDN for ModifyDN".into(),
            ));
        }
        if new_sup.map(|s| s.is_empty()).unwrap_or(false) {
            return Err(LdapError::InvalidArgument(
                "empty new superior DN for ModifyDN".into(),
            ));
        }
        let mut params = vec![
            Tag::OctetString(OctetString {
                inner: Vec::from(dn.as_bytes()),
                ..Default::default()
            }),
            Tag::OctetString(OctetString {
                inner: Vec::from(rdn.as_bytes()),
                ..Default::default()
            }),
            Tag::Boolean(Boolean {
                inner: delete_old,
                ..Default::default()
            }),
        ];
        if let Some(new_sup) = new_sup {
            params.push(Tag::OctetString(OctetString {
                id: 0,
                class: TagClass::Context,
                inner: Vec::from(new_sup.as_bytes()),
            }));
        }
        let req = Tag::Sequence(Sequence {
            id: 12,
            class: TagClass::Application,
            inner: params,
        });
        self.op(req).await
    }
}
