//! Operation result structures and the error taxonomy.
//!
//! Most LDAP operations return an [`LdapResult`]. This module contains its
//! definition, the wrapper structs used by Search/Compare/Extended, and
//! [`LdapError`], the taxonomy of ways a call can fail *before* a server
//! ever gets to render a verdict.
//!
//! A non-success result code is not, by itself, an error as far as this
//! crate is concerned -- it is returned to the caller as data. Use
//! [`LdapResult::success`] or [`LdapResult::non_error`] to convert it into
//! `Err(LdapError::DirectoryError { .. })` when exception-style handling is
//! more convenient.

use std::collections::HashSet;
use std::fmt;

use crate::controls::Control;
use crate::exop::Exop;
use crate::search::ResultEntry;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, LdapError>;

/// The taxonomy of ways an operation can fail without the server rendering
/// a verdict, plus the verdict-rendered-but-unhappy case
/// ([`LdapError::DirectoryError`]).
#[derive(Debug, thiserror::Error)]
pub enum LdapError {
    /// A local contract was violated before anything went on the wire
    /// (empty DN, empty value set, an id that doesn't belong to this
    /// session, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error, peer disconnect, or write failure. The session is no
    /// longer usable after this; the caller must `connect()` again.
    #[error("transport error: {0}")]
    TransportFailed(#[from] std::io::Error),

    /// The effective deadline for the operation expired before a terminal
    /// response arrived. An Abandon for the operation has already been
    /// sent by the time this is returned.
    #[error("operation timed out")]
    Timeout,

    /// TLS negotiation (at connect time or via StartTLS) did not complete.
    #[error("TLS handshake failed: {0}")]
    TlsHandshakeFailed(String),

    /// A Bind returned a non-success result code, or a SASL mechanism
    /// could not be constructed/driven to completion.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The response didn't match what the operation expected (wrong PDU
    /// kind for the message id, or a SASL mechanism reporting success
    /// alongside a non-empty final response).
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A structured `LdapResult` whose code is neither success, referral,
    /// nor (for Compare) compareTrue/compareFalse.
    #[error("{result}")]
    DirectoryError { result: LdapResult },

    /// Local cancellation, or a completed Abandon.
    #[error("operation was cancelled")]
    Cancelled,

    /// The server doesn't advertise support for a feature the caller
    /// requested (e.g. the Subtree-Delete control).
    #[error("not supported by server: {0}")]
    NotSupported(String),

    /// A second Bind was attempted while one was already in flight on the
    /// same session.
    #[error("a Bind operation is already in progress on this session")]
    BindInProgress,

    /// The session is not connected and an implicit `connect()` failed or
    /// was not permitted in this context.
    #[error("not connected")]
    NotConnected,

    /// A Search adapter's `start()` found the operation already configured
    /// in a way incompatible with what the adapter needs to add.
    #[error("adapter initialization failed: {0}")]
    AdapterInit(String),
}

impl LdapError {
    pub fn invalid_argument<S: Into<String>>(msg: S) -> LdapError {
        LdapError::InvalidArgument(msg.into())
    }
}

/// Common components of an LDAP operation result ([RFC 4511 §4.1.9](https://tools.ietf.org/html/rfc4511#section-4.1.9)).
///
/// This struct faithfully replicates the components dictated by the
/// standard, and is distinctly C-like in its reliance on a numeric code to
/// indicate the outcome. It would be tempting to hide it behind an
/// automatic `Result`-like interface, but there are scenarios -- Compare's
/// dual non-error codes, accumulating referrals across a Search -- where
/// that would get in the way. Instead, [`success`](#method.success) and
/// [`non_error`](#method.non_error) provide ergonomic conversion into
/// `Result<Self, LdapError>` when simple condition checking suffices.
#[derive(Clone, Debug, Default)]
pub struct LdapResult {
    /// Result code. Zero indicates success; see
    /// [RFC 4511 Appendix A.1](https://tools.ietf.org/html/rfc4511#appendix-A.1)
    /// for the rest.
    pub rc: u32,
    /// Matched component DN, where applicable.
    pub matched: String,
    /// Additional diagnostic text.
    pub text: String,
    /// Referral URLs, one set per referral received.
    pub refs: Vec<HashSet<String>>,
    /// Response controls. Missing and empty controls are both represented
    /// by an empty vector.
    pub ctrls: Vec<Control>,
}

/// Human-readable name of a result code, per RFC 4511 Appendix A.1 (plus a
/// few well-known LDAPv3 extensions). Unrecognized codes render as
/// `"unknown({rc})"`.
pub fn result_code_text(rc: u32) -> &'static str {
    match rc {
        0 => "success",
        1 => "operationsError",
        2 => "protocolError",
        3 => "timeLimitExceeded",
        4 => "sizeLimitExceeded",
        5 => "compareFalse",
        6 => "compareTrue",
        7 => "authMethodNotSupported",
        8 => "strongerAuthRequired",
        10 => "referral",
        11 => "adminLimitExceeded",
        12 => "unavailableCriticalExtension",
        13 => "confidentialityRequired",
        14 => "saslBindInProgress",
        16 => "noSuchAttribute",
        17 => "undefinedAttributeType",
        18 => "inappropriateMatching",
        19 => "constraintViolation",
        20 => "attributeOrValueExists",
        21 => "invalidAttributeSyntax",
        32 => "noSuchObject",
        33 => "aliasProblem",
        34 => "invalidDNSyntax",
        36 => "aliasDereferencingProblem",
        48 => "inappropriateAuthentication",
        49 => "invalidCredentials",
        50 => "insufficientAccessRights",
        51 => "busy",
        52 => "unavailable",
        53 => "unwillingToPerform",
        54 => "loopDetect",
        64 => "namingViolation",
        65 => "objectClassViolation",
        66 => "notAllowedOnNonLeaf",
        67 => "notAllowedOnRDN",
        68 => "entryAlreadyExists",
        69 => "objectClassModsProhibited",
        71 => "affectsMultipleDSAs",
        80 => "other",
        88 => "abandoned",
        _ => "unknown",
    }
}

impl fmt::Display for LdapResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "rc={} ({}), dn: \"{}\", text: \"{}\"",
            self.rc,
            result_code_text(self.rc),
            self.matched,
            self.text
        )
    }
}

impl LdapResult {
    /// `true` iff the result code is zero.
    pub fn is_success(&self) -> bool {
        self.rc == 0
    }

    /// If the result code is zero, return the instance wrapped in `Ok`,
    /// otherwise wrap it in `Err(LdapError::DirectoryError)`.
    pub fn success(self) -> Result<Self> {
        if self.rc == 0 {
            Ok(self)
        } else {
            Err(LdapError::DirectoryError { result: self })
        }
    }

    /// Like [`success`](#method.success), but also accepts result code 10
    /// (referral) as non-erroneous.
    pub fn non_error(self) -> Result<Self> {
        if self.rc == 0 || self.rc == 10 {
            Ok(self)
        } else {
            Err(LdapError::DirectoryError { result: self })
        }
    }
}

/// Wrapper for the result of a Search operation that returns all entries at
/// once, rather than through a streaming cursor.
#[derive(Clone, Debug)]
pub struct SearchResult(pub Vec<ResultEntry>, pub LdapResult);

impl SearchResult {
    pub fn success(self) -> Result<(Vec<ResultEntry>, LdapResult)> {
        if self.1.rc == 0 {
            Ok((self.0, self.1))
        } else {
            Err(LdapError::DirectoryError { result: self.1 })
        }
    }

    pub fn non_error(self) -> Result<(Vec<ResultEntry>, LdapResult)> {
        if self.1.rc == 0 || self.1.rc == 10 {
            Ok((self.0, self.1))
        } else {
            Err(LdapError::DirectoryError { result: self.1 })
        }
    }
}

/// Wrapper for the result of a Compare operation.
///
/// Compare uniquely has two non-error result codes indicating the outcome
/// of a successful comparison (`compareTrue`/`compareFalse`); any other
/// code (barring referral) indicates an error as usual.
#[derive(Clone, Debug)]
pub struct CompareResult(pub LdapResult);

impl CompareResult {
    /// If the result code is 5 (`compareFalse`) or 6 (`compareTrue`),
    /// return the corresponding boolean, otherwise an error.
    pub fn equal(self) -> Result<bool> {
        match self.0.rc {
            5 => Ok(false),
            6 => Ok(true),
            _ => Err(LdapError::DirectoryError { result: self.0 }),
        }
    }

    /// Like [`equal`](#method.equal), but also accepts referral.
    pub fn non_error(self) -> Result<LdapResult> {
        if matches!(self.0.rc, 0 | 5 | 6 | 10) {
            Ok(self.0)
        } else {
            Err(LdapError::DirectoryError { result: self.0 })
        }
    }
}

/// Wrapper for the result of an Extended operation: the overall
/// `LdapResult`, plus the (possibly reinterpreted) response `Exop`.
#[derive(Clone, Debug)]
pub struct ExopResult(pub LdapResult, pub Exop);

impl ExopResult {
    pub fn success(self) -> Result<(Exop, LdapResult)> {
        if self.0.rc == 0 {
            Ok((self.1, self.0))
        } else {
            Err(LdapError::DirectoryError { result: self.0 })
        }
    }

    pub fn non_error(self) -> Result<(Exop, LdapResult)> {
        if self.0.rc == 0 || self.0.rc == 10 {
            Ok((self.1, self.0))
        } else {
            Err(LdapError::DirectoryError { result: self.0 })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn result(rc: u32) -> LdapResult {
        LdapResult {
            rc,
            matched: String::new(),
            text: String::new(),
            refs: Vec::new(),
            ctrls: Vec::new(),
        }
    }

    #[test]
    fn result_code_text_known_and_unknown() {
        assert_eq!(result_code_text(0), "success");
        assert_eq!(result_code_text(14), "saslBindInProgress");
        assert_eq!(result_code_text(49), "invalidCredentials");
        assert_eq!(result_code_text(9999), "unknown");
    }

    #[test]
    fn success_accepts_only_zero() {
        assert!(result(0).success().is_ok());
        assert!(result(32).success().is_err());
    }

    #[test]
    fn non_error_accepts_referral() {
        assert!(result(10).non_error().is_ok());
        assert!(result(1).non_error().is_err());
    }

    #[test]
    fn compare_result_equal() {
        assert_eq!(CompareResult(result(6)).equal().unwrap(), true);
        assert_eq!(CompareResult(result(5)).equal().unwrap(), false);
        assert!(CompareResult(result(32)).equal().is_err());
    }

    #[test]
    fn compare_result_non_error_accepts_referral() {
        assert!(CompareResult(result(10)).non_error().is_ok());
    }
}
