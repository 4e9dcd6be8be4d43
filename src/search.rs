//! Search operation types and the streaming cursor.

use std::collections::HashMap;
use std::time::Duration;

use lber::common::TagClass;
use lber::structure::StructureTag;
use lber::structures::{ASNTag, Boolean, Enumerated, Integer, OctetString, Sequence, Tag};
use lber::universal::Types;

use tokio::sync::mpsc;

use crate::controls_impl::parse_controls;
use crate::filter::parse as parse_filter;
use crate::ldap::Ldap;
use crate::result::{LdapError, LdapResult, Result, SearchResult};

/// Search scope, as used in the `scope` argument of a Search operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Base object only.
    Base = 0,
    /// Immediate children of the base object.
    OneLevel = 1,
    /// The base object and its entire subtree.
    Subtree = 2,
}

/// Policy for dereferencing aliases encountered during a Search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DerefAliases {
    Never = 0,
    InSearch = 1,
    FindingBaseObject = 2,
    Always = 3,
}

/// Additional, infrequently used, parameters of a Search operation.
#[derive(Clone, Debug)]
pub struct SearchOptions {
    pub(crate) deref: DerefAliases,
    pub(crate) typesonly: bool,
    pub(crate) timelimit: i32,
    pub(crate) sizelimit: i32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            deref: DerefAliases::Never,
            typesonly: false,
            timelimit: 0,
            sizelimit: 0,
        }
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the alias dereferencing policy.
    pub fn deref(mut self, d: DerefAliases) -> Self {
        self.deref = d;
        self
    }

    /// Request attribute names only, without values.
    pub fn typesonly(mut self, typesonly: bool) -> Self {
        self.typesonly = typesonly;
        self
    }

    /// Server-side time limit, in seconds; 0 means no limit.
    pub fn timelimit(mut self, timelimit: i32) -> Self {
        self.timelimit = timelimit;
        self
    }

    /// Server-side size limit, in entries; 0 means no limit.
    pub fn sizelimit(mut self, sizelimit: i32) -> Self {
        self.sizelimit = sizelimit;
        self
    }
}

/// A single, not-yet-parsed, item received in response to a Search request:
/// a SearchResultEntry, SearchResultReference, SearchResultDone, or an
/// IntermediateResponse.
#[derive(Clone, Debug)]
pub struct ResultEntry(pub StructureTag);

impl ResultEntry {
    pub fn new(tag: StructureTag) -> ResultEntry {
        ResultEntry(tag)
    }

    /// True if this item is a SearchResultReference.
    pub fn is_ref(&self) -> bool {
        self.0.id == 19
    }

    /// True if this item is an IntermediateResponse.
    pub fn is_intermediate(&self) -> bool {
        self.0.id == 25
    }
}

/// A parsed directory entry, constructed from a [`ResultEntry`](struct.ResultEntry.html)
/// known to carry a SearchResultEntry.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchEntry {
    /// Entry DN.
    pub dn: String,
    /// Attributes, recognized as holding UTF-8 values.
    pub attrs: HashMap<String, Vec<String>>,
    /// Attributes recognized (or assumed) to hold binary values.
    pub bin_attrs: HashMap<String, Vec<Vec<u8>>>,
}

impl SearchEntry {
    /// Parse a raw result entry into an owned, directly usable structure.
    ///
    /// Panics if `re` doesn't carry a SearchResultEntry PDU; callers are
    /// expected to have filtered references and intermediate responses
    /// out beforehand (see [`is_ref()`](struct.ResultEntry.html#method.is_ref)
    /// and [`is_intermediate()`](struct.ResultEntry.html#method.is_intermediate)).
    pub fn construct(re: ResultEntry) -> SearchEntry {
        let mut tags = re
            .0
            .expect_constructed()
            .expect("entry")
            .into_iter();
        let dn = String::from_utf8(
            tags.next()
                .expect("element")
                .expect_primitive()
                .expect("octet string"),
        )
        .expect("dn");
        let attr_vals = tags.next().expect("element").expect_constructed().unwrap_or_default();
        let mut attrs = HashMap::new();
        let mut bin_attrs = HashMap::new();
        for attr_val in attr_vals {
            let mut parts = attr_val.expect_constructed().expect("partial attribute").into_iter();
            let name = String::from_utf8(
                parts
                    .next()
                    .expect("element")
                    .expect_primitive()
                    .expect("attribute name"),
            )
            .expect("attribute name utf8");
            let values = parts
                .next()
                .expect("element")
                .expect_constructed()
                .unwrap_or_default();
            let is_binary = name.ends_with(";binary") || name == "jpegPhoto" || name == "userPassword";
            if is_binary {
                let vals: Vec<Vec<u8>> = values
                    .into_iter()
                    .map(|v| v.expect_primitive().expect("value"))
                    .collect();
                bin_attrs.insert(name, vals);
            } else {
                let vals: Vec<String> = values
                    .into_iter()
                    .map(|v| {
                        let raw = v.expect_primitive().expect("value");
                        String::from_utf8(raw).unwrap_or_default()
                    })
                    .collect();
                attrs.insert(name, vals);
            }
        }
        SearchEntry {
            dn,
            attrs,
            bin_attrs,
        }
    }
}

/// Extract referral URLs out of a raw SearchResultReference item.
pub fn parse_refs(t: StructureTag) -> Vec<String> {
    t.expect_constructed()
        .unwrap_or_default()
        .into_iter()
        .map(|t| String::from_utf8(t.expect_primitive().unwrap_or_default()).unwrap_or_default())
        .collect()
}

pub(crate) fn construct_search_request<S, A>(
    base: &str,
    scope: Scope,
    filter: &str,
    attrs: A,
    opts: &SearchOptions,
) -> Result<Tag>
where
    S: AsRef<str>,
    A: AsRef<[S]>,
{
    let filter_tag = parse_filter(filter)
        .map_err(|e| LdapError::InvalidArgument(format!("invalid filter: {}", e)))?;
    Ok(Tag::Sequence(Sequence {
        id: 3,
        class: TagClass::Application,
        inner: vec![
            Tag::OctetString(OctetString {
                inner: base.as_bytes().to_vec(),
                ..Default::default()
            }),
            Tag::Enumerated(Enumerated {
                inner: scope as i64,
                ..Default::default()
            }),
            Tag::Enumerated(Enumerated {
                inner: opts.deref as i64,
                ..Default::default()
            }),
            Tag::Integer(Integer {
                inner: opts.sizelimit as i64,
                ..Default::default()
            }),
            Tag::Integer(Integer {
                inner: opts.timelimit as i64,
                ..Default::default()
            }),
            Tag::Boolean(Boolean {
                inner: opts.typesonly,
                ..Default::default()
            }),
            filter_tag,
            Tag::Sequence(Sequence {
                inner: attrs
                    .as_ref()
                    .iter()
                    .map(|s| {
                        Tag::OctetString(OctetString {
                            inner: s.as_ref().as_bytes().to_vec(),
                            ..Default::default()
                        })
                    })
                    .collect(),
                ..Default::default()
            }),
        ],
    }))
}

/// Effective deadline computation per the timeLimit/connect-timeout precedence
/// rule (spec §4.7): a per-operation override (`Ldap::with_timeout()`) always
/// wins; failing that, a positive `timelimit` (the server-side Search time
/// limit, in seconds) also bounds how long the client waits locally; with
/// neither set, the wait is unbounded.
pub(crate) fn effective_search_deadline(op_timeout: Option<Duration>, timelimit: i32) -> Option<Duration> {
    if op_timeout.is_some() {
        return op_timeout;
    }
    if timelimit > 0 {
        Some(Duration::from_secs(timelimit as u64))
    } else {
        None
    }
}

/// Handle for obtaining a stream of search results one at a time.
///
/// A streaming search must either be driven to the end by repeatedly
/// calling [`next()`](#method.next) until it returns `Ok(None)` or an
/// error, or cancelled by abandoning the underlying `Ldap` handle's
/// message id. After termination, [`finish()`](#method.finish) must be
/// called to retrieve the overall result of the operation.
pub struct SearchStream<'a, S, A> {
    pub(crate) ldap: Ldap,
    pub(crate) rx: Option<mpsc::UnboundedReceiver<(Tag, Option<StructureTag>)>>,
    pub(crate) res: Option<LdapResult>,
    pub(crate) msgid: Option<i32>,
    pub(crate) deadline: Option<Duration>,
    _s: std::marker::PhantomData<S>,
    _a: std::marker::PhantomData<&'a A>,
}

impl<'a, S, A> SearchStream<'a, S, A>
where
    S: AsRef<str> + 'a,
    A: AsRef<[S]> + 'a,
{
    pub(crate) fn new(ldap: Ldap) -> Self {
        SearchStream {
            ldap,
            rx: None,
            res: None,
            msgid: None,
            deadline: None,
            _s: std::marker::PhantomData,
            _a: std::marker::PhantomData,
        }
    }

    /// A clone of the `Ldap` handle driving this stream, useful for adapters
    /// that need to issue further operations (e.g. paging) on the same
    /// connection.
    pub fn ldap_handle(&self) -> Ldap {
        self.ldap.clone()
    }

    /// Initiate the Search. Must be called exactly once, before any call to
    /// [`next()`](#method.next).
    pub async fn start(&mut self, base: &str, scope: Scope, filter: &str, attrs: A) -> Result<()> {
        let (msgid, rx, deadline) = self.ldap.clone().do_search(base, scope, filter, attrs).await?;
        self.msgid = Some(msgid);
        self.rx = Some(rx);
        self.deadline = deadline;
        Ok(())
    }

    /// Retrieve the next item from the stream. `Ok(None)` signals the end.
    ///
    /// If the effective deadline (spec §4.7) expires before the next item
    /// arrives, the Search is abandoned and `LdapError::Timeout` is
    /// returned.
    pub async fn next(&mut self) -> Result<Option<ResultEntry>> {
        let rx = match self.rx.as_mut() {
            Some(rx) => rx,
            None => return Err(LdapError::ProtocolError("stream not started".into())),
        };
        let item = match self.deadline {
            Some(d) => match tokio::time::timeout(d, rx.recv()).await {
                Ok(item) => item,
                Err(_) => {
                    if let Some(msgid) = self.msgid {
                        let _ = self.ldap.abandon(msgid).await;
                    }
                    return Err(LdapError::Timeout);
                }
            },
            None => rx.recv().await,
        };
        match item {
            None => Ok(None),
            Some((Tag::StructureTag(tag), ctrls)) if tag.id == 5 => {
                self.res = Some(tag_to_result(tag, ctrls));
                Ok(None)
            }
            Some((Tag::StructureTag(tag), _ctrls)) => Ok(Some(ResultEntry::new(tag))),
            Some(_) => Err(LdapError::ProtocolError("unexpected search PDU".into())),
        }
    }

    /// Retrieve the overall result of the search. Must be called after the
    /// stream has been driven to the end.
    pub async fn finish(&mut self) -> LdapResult {
        self.res.take().unwrap_or_default()
    }
}

fn tag_to_result(tag: StructureTag, ctrls: Option<StructureTag>) -> LdapResult {
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
    let ctrls = ctrls.map(parse_controls).unwrap_or_default();
    LdapResult {
        rc,
        matched,
        text,
        refs: vec![],
        ctrls,
    }
}

impl Ldap {
    /// Perform a Search, returning all result entries in a single vector.
    ///
    /// Honors the effective deadline (spec §4.7): if it expires before
    /// `SearchResultDone` arrives, the Search is abandoned and
    /// `LdapError::Timeout` is returned.
    pub async fn search<S, A>(&mut self, base: &str, scope: Scope, filter: &str, attrs: A) -> Result<SearchResult>
    where
        S: AsRef<str>,
        A: AsRef<[S]>,
    {
        let (msgid, mut rx, deadline) = self.clone().do_search(base, scope, filter, attrs).await?;
        let mut entries = Vec::new();
        let mut result = LdapResult::default();
        loop {
            let item = match deadline {
                Some(d) => match tokio::time::timeout(d, rx.recv()).await {
                    Ok(item) => item,
                    Err(_) => {
                        let _ = self.abandon(msgid).await;
                        return Err(LdapError::Timeout);
                    }
                },
                None => rx.recv().await,
            };
            match item {
                None => break,
                Some((Tag::StructureTag(t), ctrls)) if t.id == 5 => {
                    result = tag_to_result(t, ctrls);
                    break;
                }
                Some((Tag::StructureTag(t), _ctrls)) => entries.push(ResultEntry::new(t)),
                Some(_) => return Err(LdapError::ProtocolError("unexpected search PDU".into())),
            }
        }
        Ok(SearchResult(entries, result))
    }

    /// Perform a Search, returning a handle used to retrieve entries one at
    /// a time. See [`SearchStream`](struct.SearchStream.html).
    pub async fn streaming_search<S, A>(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: A,
    ) -> Result<SearchStream<'static, S, A>>
    where
        S: AsRef<str> + 'static,
        A: AsRef<[S]> + 'static,
    {
        let mut stream = SearchStream::new(self.clone());
        stream.start(base, scope, filter, attrs).await?;
        Ok(stream)
    }
}
