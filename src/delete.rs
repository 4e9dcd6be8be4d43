//! Delete operation, including the Subtree Delete convenience method.

use lber::common::TagClass;
use lber::structures::{OctetString, Tag};

use crate::controls_impl::RawControl;
use crate::ldap::Ldap;
use crate::result::{LdapError, LdapResult, Result};
use crate::rootdse::RootDSE;

/// OID of the Subtree Delete control (Microsoft AD / OpenLDAP extension,
/// not standardized by an RFC).
pub const SUBTREE_DELETE_OID: &str = "1.2.840.113556.1.4.805";

impl Ldap {
    /// Delete the entry named `dn`. The entry must be a leaf; use
    /// [`delete_subtree()`](#method.delete_subtree) to remove a whole
    /// subtree in one operation.
    pub async fn delete<S: AsRef<str>>(&mut self, dn: S) -> Result<LdapResult> {
        let req = Tag::OctetString(OctetString {
            id: 10,
            class: TagClass::Application,
            inner: Vec::from(dn.as_ref()),
        });
        self.op(req).await
    }

    /// Delete the entry named `dn` and its entire subtree, using the
    /// Subtree Delete control. Fails locally with `LdapError::NotSupported`
    /// if `root_dse` does not advertise the control's OID; servers that
    /// don't support it would otherwise silently reject the whole request
    /// with `unwillingToPerform`, which is a worse failure mode to debug.
    pub async fn delete_subtree<S: AsRef<str>>(
        &mut self,
        dn: S,
        root_dse: &RootDSE,
    ) -> Result<LdapResult> {
        if !root_dse.is_control_supported(SUBTREE_DELETE_OID) {
            return Err(LdapError::NotSupported(
                "server does not advertise the Subtree Delete control".into(),
            ));
        }
        let mut ctrls = self.controls.take().unwrap_or_default();
        ctrls.push(RawControl {
            ctype: SUBTREE_DELETE_OID.to_owned(),
            crit: true,
            val: None,
        });
        self.controls = Some(ctrls);
        let req = Tag::OctetString(OctetString {
            id: 10,
            class: TagClass::Application,
            inner: Vec::from(dn.as_ref()),
        });
        self.op(req).await
    }
}
