//! The `Ldap` handle: message id allocation, the send/receive path shared by
//! every operation, and the connection-task command plumbing.
//!
//! `Ldap` is deliberately thin and `Clone`. Cloning it does not open a new
//! connection; every clone shares the same `mpsc` sender into the driver
//! task spawned from [`LdapConnAsync::drive()`](../conn/struct.LdapConnAsync.html#method.drive),
//! so operations issued from different clones are multiplexed over one
//! socket, exactly as the wire protocol intends.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use lber::common::TagClass;
use lber::structure::StructureTag;
use lber::structures::{Integer, Null, Tag};
use lber::universal::Types;

use crate::conn::{ConnCommand, ReplySink};
use crate::controls_impl::{parse_controls, Control, RawControl};
use crate::result::{LdapError, LdapResult, Result};
use crate::search::SearchOptions;

/// A single desired change to an attribute, as used by
/// [`Ldap::modify()`](struct.Ldap.html#method.modify).
#[derive(Clone, Debug)]
pub enum Mod<S: AsRef<[u8]> + Eq + Hash> {
    /// Add the given values to the attribute, creating it if necessary.
    Add(S, HashSet<S>),
    /// Delete the given values from the attribute, or the whole attribute if
    /// the value set is empty.
    Delete(S, HashSet<S>),
    /// Replace the entire value set of the attribute with the given one, or
    /// remove the attribute if the set is empty.
    Replace(S, HashSet<S>),
    /// Increment the attribute's numeric value by the given amount
    /// ([RFC 4525](https://tools.ietf.org/html/rfc4525)).
    Increment(S, S),
}

/// Connection/security/authentication state shared between every clone of
/// an [`Ldap`] handle and the driver task that owns the socket
/// ([`LdapConnAsync`](../conn/struct.LdapConnAsync.html)).
///
/// Each flag is a single atomic, consistent with there being no consistent
/// snapshot across all three -- a caller racing `is_secured()` against a
/// concurrent StartTLS is asking a question that doesn't have one correct
/// answer either.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) connected: AtomicBool,
    pub(crate) secured: AtomicBool,
    pub(crate) authenticated: AtomicBool,
}

/// A cloneable handle to an LDAP session.
///
/// All operations are `async fn`s taking `&mut self`; the mutability is a
/// red herring left over from the single-connection era of the API and
/// enforces nothing on the wire, but every operation does need a session to
/// have a bind-in-progress check and message id counter, which this handle
/// carries.
pub struct Ldap {
    pub(crate) tx: mpsc::UnboundedSender<ConnCommand>,
    msgid: Arc<AtomicI32>,
    bind_in_progress: Arc<Mutex<bool>>,
    pub(crate) state: Arc<SessionState>,
    /// Per-operation timeout override. `None` means wait indefinitely.
    pub timeout: Option<Duration>,
    /// Default Search parameters used by [`search()`](#method.search) and
    /// [`streaming_search()`](#method.streaming_search).
    pub search_opts: SearchOptions,
    /// Request controls attached to the next operation issued through this
    /// handle.
    pub controls: Option<Vec<RawControl>>,
}

impl Clone for Ldap {
    fn clone(&self) -> Self {
        Ldap {
            tx: self.tx.clone(),
            msgid: self.msgid.clone(),
            bind_in_progress: self.bind_in_progress.clone(),
            state: self.state.clone(),
            timeout: self.timeout,
            search_opts: self.search_opts.clone(),
            controls: self.controls.clone(),
        }
    }
}

impl Ldap {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ConnCommand>) -> Self {
        Ldap {
            tx,
            msgid: Arc::new(AtomicI32::new(1)),
            bind_in_progress: Arc::new(Mutex::new(false)),
            state: Arc::new(SessionState {
                connected: AtomicBool::new(true),
                secured: AtomicBool::new(false),
                authenticated: AtomicBool::new(false),
            }),
            timeout: None,
            search_opts: SearchOptions::new(),
            controls: None,
        }
    }

    /// The `Arc` backing this handle's connection state, shared with the
    /// driver task so it can flip `connected`/`secured` as the socket's
    /// lifecycle progresses.
    pub(crate) fn state_handle(&self) -> Arc<SessionState> {
        self.state.clone()
    }

    /// `true` until the driver task observes the peer close the socket, a
    /// decode error, a NoticeOfDisconnect, or a local Unbind.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Relaxed)
    }

    /// `true` once a TLS layer has been installed over the socket, whether
    /// by implicit TLS at connect time or a successful StartTLS.
    pub fn is_secured(&self) -> bool {
        self.state.secured.load(Ordering::Relaxed)
    }

    /// `true` iff the most recent Bind on this session returned Success.
    /// Cleared the moment a new Bind attempt begins, so it never reports a
    /// stale credential while a replacement Bind is in flight.
    pub fn is_authenticated(&self) -> bool {
        self.state.authenticated.load(Ordering::Relaxed)
    }

    pub(crate) fn set_authenticated(&self, success: bool) {
        self.state.authenticated.store(success, Ordering::Relaxed);
    }

    /// Override the per-operation timeout for this handle (and every clone
    /// derived from it from this point on).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach request controls to the next operation issued through this
    /// handle.
    pub fn with_controls<V: Into<Vec<RawControl>>>(mut self, ctrls: V) -> Self {
        self.controls = Some(ctrls.into());
        self
    }

    fn next_msgid(&self) -> i32 {
        self.msgid.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn enter_bind(&self) -> Result<()> {
        let mut guard = self.bind_in_progress.lock().expect("bind lock");
        if *guard {
            return Err(LdapError::BindInProgress);
        }
        *guard = true;
        // isAuthenticated() must not report a stale credential once a new
        // Bind attempt is underway, whatever the eventual outcome.
        self.state.authenticated.store(false, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn leave_bind(&self) {
        let mut guard = self.bind_in_progress.lock().expect("bind lock");
        *guard = false;
    }

    /// Abandon the operation identified by `msgid`
    /// ([RFC 4511 §4.11](https://tools.ietf.org/html/rfc4511#section-4.11)):
    /// send an `AbandonRequest` for it and drop its entry from the pending-
    /// request registry, so no further response for it is delivered to
    /// whatever `send()`/`do_search()` caller is waiting on it. Best-effort
    /// and fire-and-forget, as the protocol defines no response; if the
    /// connection driver has already gone away there is nothing to abandon.
    pub async fn abandon(&self, msgid: i32) -> Result<()> {
        let id = self.next_msgid();
        let op = Tag::Integer(Integer {
            id: 16,
            class: TagClass::Application,
            inner: msgid as i64,
        });
        let _ = self.tx.send(ConnCommand::Abandon {
            target: msgid,
            id,
            op,
        });
        Ok(())
    }

    /// Send `op` with this handle's controls and wait for a single terminal
    /// response, honoring [`timeout`](#structfield.timeout). On timeout, the
    /// operation is abandoned before `LdapError::Timeout` is returned.
    pub(crate) async fn send(&mut self, op: Tag) -> Result<(Tag, Option<StructureTag>)> {
        let id = self.next_msgid();
        let (tx, rx) = oneshot::channel();
        let ctrls = self.controls.take();
        self.tx
            .send(ConnCommand::Send {
                id,
                op,
                ctrls,
                reply: ReplySink::Single(tx),
            })
            .map_err(|_| LdapError::NotConnected)?;
        let recv = rx;
        let result = match self.timeout {
            Some(d) => match tokio::time::timeout(d, recv).await {
                Ok(r) => r,
                Err(_) => {
                    let _ = self.abandon(id).await;
                    return Err(LdapError::Timeout);
                }
            },
            None => recv.await,
        };
        result.map_err(|_| LdapError::NotConnected)
    }

    /// Like [`send()`](#method.send), converting the response straight into
    /// an [`LdapResult`](../result/struct.LdapResult.html). Used by every
    /// operation whose response PDU is just `[0] rc, matchedDN, message`
    /// plus optional controls -- i.e. everything except Bind (server SASL
    /// credentials), Extended (response name/value) and Search.
    pub(crate) async fn op(&mut self, op: Tag) -> Result<LdapResult> {
        let (tag, ctrls) = self.send(op).await?;
        match tag {
            Tag::StructureTag(t) => Ok(parse_ldap_result(t, ctrls)),
            _ => Err(LdapError::ProtocolError("unexpected response PDU".into())),
        }
    }

    /// Issue a Search and return the message id, the channel onto which
    /// every item (entries, references, intermediate responses, and
    /// finally SearchResultDone) will be delivered, and the effective
    /// deadline (per [`effective_search_deadline()`](../search/fn.effective_search_deadline.html))
    /// the caller's receive loop must enforce.
    pub(crate) async fn do_search<S, A>(
        mut self,
        base: &str,
        scope: crate::search::Scope,
        filter: &str,
        attrs: A,
    ) -> Result<(
        i32,
        mpsc::UnboundedReceiver<(Tag, Option<StructureTag>)>,
        Option<Duration>,
    )>
    where
        S: AsRef<str>,
        A: AsRef<[S]>,
    {
        let opts = self.search_opts.clone();
        let deadline = crate::search::effective_search_deadline(self.timeout, opts.timelimit);
        let req = crate::search::construct_search_request(base, scope, filter, attrs, &opts)?;
        let id = self.next_msgid();
        let (tx, rx) = mpsc::unbounded_channel();
        let ctrls = self.controls.take();
        self.tx
            .send(ConnCommand::Send {
                id,
                op: req,
                ctrls,
                reply: ReplySink::Multi(tx),
            })
            .map_err(|_| LdapError::NotConnected)?;
        Ok((id, rx, deadline))
    }

    pub(crate) async fn request_starttls(&self, domain: String) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(ConnCommand::StartTls { domain, reply: tx })
            .map_err(|_| LdapError::NotConnected)?;
        rx.await.map_err(|_| LdapError::NotConnected)?
    }

    /// Terminate the session
    /// ([RFC 4511 §4.3](https://tools.ietf.org/html/rfc4511#section-4.3)):
    /// send an `UnbindRequest` and close the socket. No response is defined
    /// or waited for.
    pub async fn unbind(&mut self) -> Result<()> {
        let id = self.next_msgid();
        let op = Tag::Null(Null {
            id: 2,
            class: TagClass::Application,
            inner: (),
        });
        let _ = self.tx.send(ConnCommand::Unbind { id, op });
        Ok(())
    }
}

/// Parse the common `rc, matchedDN, message, [referral], [controls]` shape
/// shared by every non-Search, non-Bind, non-Extended response PDU.
pub(crate) fn parse_ldap_result(tag: StructureTag, ctrls: Option<StructureTag>) -> LdapResult {
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
    for t in tags {
        if let Some(uris) = t.match_class(TagClass::Context).and_then(|t| t.match_id(3)) {
            refs.push(crate::search::parse_refs(uris).into_iter().collect());
        }
    }
    let ctrls: Vec<Control> = ctrls.map(parse_controls).unwrap_or_default();
    LdapResult {
        rc,
        matched,
        text,
        refs,
        ctrls,
    }
}
