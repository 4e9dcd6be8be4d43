//! Root DSE lookup ([RFC 4512 §5.1](https://tools.ietf.org/html/rfc4512#section-5.1)).
//!
//! The root DSE advertises, among other things, the controls and extended
//! operations a server supports. A handful of convenience methods elsewhere
//! in the crate (e.g. [`Ldap::delete_subtree()`](struct.Ldap.html#method.delete_subtree))
//! consult it before attaching a control a server might not understand.

use crate::ldap::Ldap;
use crate::result::Result;
use crate::search::{Scope, SearchEntry};

/// A parsed root DSE entry: the handful of operational attributes this
/// crate has a use for, plus the full attribute map for anything else.
#[derive(Clone, Debug)]
pub struct RootDSE {
    pub naming_contexts: Vec<String>,
    pub supported_controls: Vec<String>,
    pub supported_extensions: Vec<String>,
    pub supported_ldap_version: Vec<String>,
    pub entry: SearchEntry,
}

impl RootDSE {
    fn from_entry(entry: SearchEntry) -> RootDSE {
        let attr = |name: &str| entry.attrs.get(name).cloned().unwrap_or_default();
        RootDSE {
            naming_contexts: attr("namingContexts"),
            supported_controls: attr("supportedControl"),
            supported_extensions: attr("supportedExtension"),
            supported_ldap_version: attr("supportedLDAPVersion"),
            entry,
        }
    }

    /// `true` if the server advertises support for the control identified
    /// by `oid` in `supportedControl`.
    pub fn is_control_supported(&self, oid: &str) -> bool {
        self.supported_controls.iter().any(|c| c == oid)
    }

    /// `true` if the server advertises support for the extended operation
    /// identified by `oid` in `supportedExtension`.
    pub fn is_extension_supported(&self, oid: &str) -> bool {
        self.supported_extensions.iter().any(|e| e == oid)
    }
}

impl Ldap {
    /// Look up a single entry by its DN ([RFC 4511 §4.5.1](https://tools.ietf.org/html/rfc4511#section-4.5.1)),
    /// with a base-object scope Search and `(objectClass=*)` filter. Request
    /// controls set via [`with_controls()`](struct.Ldap.html#method.with_controls)
    /// are attached as usual. Returns `None` if the entry does not exist.
    pub async fn lookup<S, A>(&mut self, dn: &str, attrs: A) -> Result<Option<SearchEntry>>
    where
        S: AsRef<str>,
        A: AsRef<[S]>,
    {
        let (entries, _res) = self
            .search(dn, Scope::Base, "(objectClass=*)", attrs)
            .await?
            .non_error()?;
        Ok(entries.into_iter().next().map(SearchEntry::construct))
    }

    /// Fetch and parse the root DSE, with the conventional empty base DN,
    /// base-object scope, and `(objectClass=*)` filter, requesting every
    /// attribute.
    pub async fn get_root_dse(&mut self) -> Result<RootDSE> {
        let (entries, _res) = self
            .search("", Scope::Base, "(objectClass=*)", vec!["*", "+"])
            .await?
            .success()?;
        let entry = entries
            .into_iter()
            .next()
            .map(SearchEntry::construct)
            .unwrap_or_else(|| SearchEntry {
                dn: String::new(),
                attrs: Default::default(),
                bin_attrs: Default::default(),
            });
        Ok(RootDSE::from_entry(entry))
    }
}
