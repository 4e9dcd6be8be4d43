//! Compare operation.

use lber::common::TagClass;
use lber::structures::{OctetString, Sequence, Tag};

use crate::ldap::Ldap;
use crate::result::{CompareResult, Result};

impl Ldap {
    /// Compare the value of `attr` on the entry named `dn` against `val`.
    /// The returned [`CompareResult`](result/struct.CompareResult.html)
    /// wraps `compareTrue`/`compareFalse` as data rather than as an error;
    /// use [`equal()`](result/struct.CompareResult.html#method.equal) to
    /// collapse it to a plain `bool`.
    pub async fn compare<B: AsRef<[u8]>>(
        &mut self,
        dn: &str,
        attr: &str,
        val: B,
    ) -> Result<CompareResult> {
        let req = Tag::Sequence(Sequence {
            id: 14,
            class: TagClass::Application,
            inner: vec![
                Tag::OctetString(OctetString {
                    inner: Vec::from(dn.as_bytes()),
                    ..Default::default()
                }),
                Tag::Sequence(Sequence {
                    inner: vec![
                        Tag::OctetString(OctetString {
                            inner: Vec::from(attr.as_bytes()),
                            ..Default::default()
                        }),
                        Tag::OctetString(OctetString {
                            inner: Vec::from(val.as_ref()),
                            ..Default::default()
                        }),
                    ],
                    ..Default::default()
                }),
            ],
        });
        Ok(CompareResult(self.op(req).await?))
    }
}
