use super::{MakeCritical, RawControl};

/// RelaxRules control ([draft-zeilenga-ldap-relax](https://tools.ietf.org/html/draft-zeilenga-ldap-relax-03)).
///
/// Asks the server to relax certain schema restrictions for the duration of
/// the operation it's attached to.
pub struct RelaxRules;

pub const RELAX_RULES_OID: &str = "1.3.6.1.4.1.4203.666.5.12";

impl MakeCritical for RelaxRules {}

impl From<RelaxRules> for RawControl {
    fn from(_rr: RelaxRules) -> RawControl {
        RawControl {
            ctype: RELAX_RULES_OID.to_owned(),
            crit: false,
            val: None,
        }
    }
}
