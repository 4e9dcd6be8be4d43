//! Connection establishment and the connection driver task.
//!
//! [`LdapConnAsync::new()`](struct.LdapConnAsync.html#method.new) dials the
//! server and returns a `(LdapConnAsync, Ldap)` pair: the former must be
//! driven to completion by spawning it (the [`drive!`](../macro.drive.html)
//! macro does this), the latter is the handle used to invoke operations.
//! The driver owns the framed byte stream and the pending-request registry;
//! it is the only task that ever touches the socket.

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tokio_util::codec::Framed;
use url::{Host, Url};

use lber::common::TagClass;
use lber::structure::StructureTag;
use lber::structures::Tag;

use crate::controls_impl::RawControl;
use crate::ldap::{Ldap, SessionState};
use crate::protocol::{LdapCodec, Msg};
use crate::result::{LdapError, Result};

#[cfg(feature = "tls-native")]
use native_tls::TlsConnector as NativeTlsConnector;

/// responseName of the Notice of Disconnection unsolicited notification
/// ([RFC 4511 §4.4.1](https://tools.ietf.org/html/rfc4511#section-4.4.1)).
const NOTICE_OF_DISCONNECTION_OID: &[u8] = b"1.3.6.1.4.1.1466.20036";

/// Configuration for a connection not covered by the URL passed to
/// [`LdapConnAsync::new()`](struct.LdapConnAsync.html#method.new): timeouts
/// and TLS material.
#[derive(Clone, Debug, Default)]
pub struct LdapConnSettings {
    conn_timeout: Option<Duration>,
    starttls: bool,
    no_tls_verify: bool,
}

impl LdapConnSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for the initial TCP connect and, if applicable, the
    /// TLS handshake.
    pub fn set_conn_timeout(mut self, timeout: Duration) -> Self {
        self.conn_timeout = Some(timeout);
        self
    }

    /// Request a StartTLS upgrade instead of implicit TLS. Only meaningful
    /// for the `ldap://` scheme; `ldaps://` is always implicit TLS.
    pub fn set_starttls(mut self, starttls: bool) -> Self {
        self.starttls = starttls;
        self
    }

    /// Disable server certificate verification. For testing against
    /// self-signed certificates only.
    pub fn set_no_tls_verify(mut self, no_verify: bool) -> Self {
        self.no_tls_verify = no_verify;
        self
    }

    pub fn starttls(&self) -> bool {
        self.starttls
    }
}

/// The live transport: a plain TCP socket, or one wrapped in a TLS session.
/// All variants are `Unpin`, so `AsyncRead`/`AsyncWrite` can be implemented
/// by simple delegation without pinning machinery.
pub(crate) enum Stream {
    Plain(TcpStream),
    #[cfg(feature = "tls-native")]
    Tls(tokio_native_tls::TlsStream<TcpStream>),
    #[cfg(all(feature = "tls-rustls", not(feature = "tls-native")))]
    Tls(tokio_rustls::client::TlsStream<TcpStream>),
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(any(feature = "tls-native", feature = "tls-rustls"))]
            Stream::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(any(feature = "tls-native", feature = "tls-rustls"))]
            Stream::Tls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_flush(cx),
            #[cfg(any(feature = "tls-native", feature = "tls-rustls"))]
            Stream::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(any(feature = "tls-native", feature = "tls-rustls"))]
            Stream::Tls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Polymorphic sink for a single pending request: either a one-shot reply
/// (most operations) or an unbounded channel fed until SearchResultDone
/// (Search, and Extended operations carrying intermediate responses).
pub(crate) enum ReplySink {
    Single(oneshot::Sender<(Tag, Option<StructureTag>)>),
    Multi(mpsc::UnboundedSender<(Tag, Option<StructureTag>)>),
}

/// Commands sent from `Ldap` handles to the driver task.
pub(crate) enum ConnCommand {
    Send {
        id: i32,
        op: Tag,
        ctrls: Option<Vec<RawControl>>,
        reply: ReplySink,
    },
    Abandon {
        target: i32,
        id: i32,
        op: Tag,
    },
    StartTls {
        domain: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Unbind {
        id: i32,
        op: Tag,
    },
}

/// Async connection driver. Must be spawned (see the [`drive!`](../macro.drive.html)
/// macro) to actually service the connection; dropping it without driving
/// it leaves every `Ldap` handle derived from it permanently stalled.
pub struct LdapConnAsync {
    framed: Option<Framed<Stream, LdapCodec>>,
    rx: mpsc::UnboundedReceiver<ConnCommand>,
    settings: LdapConnSettings,
    domain: String,
    state: Arc<SessionState>,
}

/// Parsed connection target: host, port, and whether the scheme implies
/// immediate TLS.
struct Target {
    host_port: String,
    domain: String,
    implicit_tls: bool,
}

fn parse_url(url: &str) -> Result<Target> {
    let url = Url::parse(url).map_err(|e| LdapError::InvalidArgument(format!("bad LDAP URL: {}", e)))?;
    let (default_port, implicit_tls) = match url.scheme() {
        "ldap" => (389u16, false),
        "ldaps" => (636u16, true),
        s => {
            return Err(LdapError::InvalidArgument(format!(
                "unsupported LDAP URL scheme: {}",
                s
            )))
        }
    };
    let port = url.port().unwrap_or(default_port);
    let domain = match url.host() {
        Some(Host::Domain(d)) => d.to_owned(),
        Some(Host::Ipv4(v4)) => v4.to_string(),
        Some(Host::Ipv6(v6)) => v6.to_string(),
        None => "localhost".to_owned(),
    };
    Ok(Target {
        host_port: format!("{}:{}", domain, port),
        domain,
        implicit_tls,
    })
}

impl LdapConnAsync {
    /// Connect to the server specified by `url` (an `ldap://` or `ldaps://`
    /// URL), using default settings. Returns a `(driver, handle)` pair; the
    /// driver must be spawned with the [`drive!`](../macro.drive.html) macro.
    pub async fn new(url: &str) -> Result<(Self, Ldap)> {
        Self::with_settings(LdapConnSettings::new(), url).await
    }

    /// Like [`new()`](#method.new), with explicit connection settings.
    pub async fn with_settings(settings: LdapConnSettings, url: &str) -> Result<(Self, Ldap)> {
        let target = parse_url(url)?;
        let connect_fut = TcpStream::connect(&target.host_port);
        let tcp = match settings.conn_timeout {
            Some(d) => tokio::time::timeout(d, connect_fut)
                .await
                .map_err(|_| LdapError::Timeout)??,
            None => connect_fut.await?,
        };
        debug!("TCP connected to {}", target.host_port);

        let stream = if target.implicit_tls {
            secure(tcp, &target.domain, &settings).await?
        } else {
            Stream::Plain(tcp)
        };

        let framed = Framed::new(stream, LdapCodec);
        let (tx, rx) = mpsc::unbounded_channel();
        let ldap = Ldap::new(tx);
        let state = ldap.state_handle();
        if target.implicit_tls {
            state.secured.store(true, Ordering::Relaxed);
        }
        Ok((
            LdapConnAsync {
                framed: Some(framed),
                rx,
                domain: target.domain,
                settings,
                state,
            },
            ldap,
        ))
    }

    /// Run the connection's event loop to completion: dispatch inbound
    /// PDUs to the pending-request registry, and service outbound commands
    /// from `Ldap` handles, until the socket closes or an Unbind is sent.
    pub async fn drive(mut self) -> Result<()> {
        let mut registry: HashMap<i32, ReplySink> = HashMap::new();
        loop {
            tokio::select! {
                inbound = self.framed.as_mut().expect("connection live").next() => {
                    match inbound {
                        Some(Ok((id, op, ctrls))) => {
                            if self.dispatch(&mut registry, id, op, ctrls) {
                                self.state.connected.store(false, Ordering::Relaxed);
                                registry.clear();
                                return Ok(());
                            }
                        }
                        Some(Err(e)) => {
                            warn!("decode error, closing session: {}", e);
                            self.state.connected.store(false, Ordering::Relaxed);
                            registry.clear();
                            return Err(LdapError::TransportFailed(e));
                        }
                        None => {
                            debug!("peer closed the connection");
                            self.state.connected.store(false, Ordering::Relaxed);
                            registry.clear();
                            return Ok(());
                        }
                    }
                }
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(ConnCommand::Send { id, op, ctrls, reply }) => {
                            registry.insert(id, reply);
                            if let Err(e) = self.framed.as_mut().expect("connection live").send(Msg { id, op, ctrls }).await {
                                warn!("write failed, closing session: {}", e);
                                registry.remove(&id);
                                self.state.connected.store(false, Ordering::Relaxed);
                                registry.clear();
                                return Err(LdapError::TransportFailed(e));
                            }
                        }
                        Some(ConnCommand::Abandon { target, id, op }) => {
                            registry.remove(&target);
                            if let Err(e) = self.framed.as_mut().expect("connection live").send(Msg { id, op, ctrls: None }).await {
                                warn!("write failed while abandoning, closing session: {}", e);
                                self.state.connected.store(false, Ordering::Relaxed);
                                registry.clear();
                                return Err(LdapError::TransportFailed(e));
                            }
                            trace!("abandoned message id {}", target);
                        }
                        Some(ConnCommand::StartTls { domain, reply }) => {
                            let res = self.upgrade(domain).await;
                            let _ = reply.send(res);
                        }
                        Some(ConnCommand::Unbind { id, op }) => {
                            debug!("closing session");
                            let _ = self.framed.as_mut().expect("connection live").send(Msg { id, op, ctrls: None }).await;
                            self.state.connected.store(false, Ordering::Relaxed);
                            registry.clear();
                            return Ok(());
                        }
                        None => {
                            debug!("closing session");
                            self.state.connected.store(false, Ordering::Relaxed);
                            registry.clear();
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Route a decoded response to its pending sink. Returns `true` if the
    /// driver must stop servicing the connection -- currently only on an
    /// unsolicited NoticeOfDisconnection with no sink to deliver to (it is
    /// never a response to anything, so it never has one).
    fn dispatch(&mut self, registry: &mut HashMap<i32, ReplySink>, id: i32, op: Tag, ctrls: Option<StructureTag>) -> bool {
        let tag_id = match &op {
            Tag::StructureTag(t) => t.id,
            _ => {
                warn!("non-structure-tag response for id {}", id);
                return false;
            }
        };
        match registry.remove(&id) {
            Some(ReplySink::Single(tx)) => {
                let _ = tx.send((op, ctrls));
            }
            Some(ReplySink::Multi(tx)) => {
                let done = tag_id == 5;
                let _ = tx.send((op, ctrls));
                if !done {
                    registry.insert(id, ReplySink::Multi(tx));
                }
            }
            None => {
                if let Tag::StructureTag(t) = &op {
                    if is_notice_of_disconnection(t) {
                        warn!("received NoticeOfDisconnection, closing session");
                        return true;
                    }
                }
                trace!("no pending sink for message id {} (already abandoned?)", id);
            }
        }
        false
    }

    /// Upgrade the plain connection in place to TLS, preserving any bytes
    /// already buffered by the framed codec. Only valid once, before any
    /// other traffic depends on the old transport identity.
    async fn upgrade(&mut self, domain: String) -> Result<()> {
        let old_parts = self.framed.take().expect("connection live").into_parts();
        let plain = match old_parts.io {
            Stream::Plain(tcp) => tcp,
            _ => return Err(LdapError::ProtocolError("StartTLS on an already-secured connection".into())),
        };
        let tls = secure(plain, &domain, &self.settings).await?;
        let mut new_parts = Framed::new(tls, LdapCodec).into_parts();
        new_parts.read_buf = old_parts.read_buf;
        new_parts.write_buf = old_parts.write_buf;
        self.framed = Some(Framed::from_parts(new_parts));
        self.state.secured.store(true, Ordering::Relaxed);
        debug!("StartTLS upgrade to {} complete", domain);
        Ok(())
    }
}

/// `true` if `tag` is an ExtendedResponse (application tag 24) whose
/// responseName (context tag `[10]`) is the NoticeOfDisconnection OID.
fn is_notice_of_disconnection(tag: &StructureTag) -> bool {
    if tag.id != 24 {
        return false;
    }
    let children = match tag.clone().expect_constructed() {
        Some(c) => c,
        None => return false,
    };
    children.into_iter().any(|t| {
        t.match_class(TagClass::Context)
            .and_then(|t| t.match_id(10))
            .and_then(|t| t.expect_primitive())
            .map(|v| v == NOTICE_OF_DISCONNECTION_OID)
            .unwrap_or(false)
    })
}

#[cfg(feature = "tls-native")]
async fn secure(tcp: TcpStream, domain: &str, settings: &LdapConnSettings) -> Result<Stream> {
    let mut builder = NativeTlsConnector::builder();
    if settings.no_tls_verify {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    }
    let connector: tokio_native_tls::TlsConnector = builder
        .build()
        .map_err(|e| LdapError::TlsHandshakeFailed(e.to_string()))?
        .into();
    let tls = connector
        .connect(domain, tcp)
        .await
        .map_err(|e| LdapError::TlsHandshakeFailed(e.to_string()))?;
    debug!("TLS handshake with {} complete", domain);
    Ok(Stream::Tls(tls))
}

#[cfg(all(feature = "tls-rustls", not(feature = "tls-native")))]
async fn secure(tcp: TcpStream, domain: &str, settings: &LdapConnSettings) -> Result<Stream> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs()
        .map_err(|e| LdapError::TlsHandshakeFailed(e.to_string()))?
    {
        let _ = roots.add(&rustls::Certificate(cert.0));
    }
    let mut config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();
    if settings.no_tls_verify {
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(danger::NoVerify));
    }
    let connector = tokio_rustls::TlsConnector::from(Arc::new(config));
    let server_name = rustls::ServerName::try_from(domain)
        .map_err(|e| LdapError::TlsHandshakeFailed(e.to_string()))?;
    let tls = connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| LdapError::TlsHandshakeFailed(e.to_string()))?;
    let protocol = tls
        .get_ref()
        .1
        .protocol_version()
        .map(|v| format!("{:?}", v))
        .unwrap_or_else(|| "unknown".into());
    debug!("TLS handshake with {} complete, protocol {}", domain, protocol);
    Ok(Stream::Tls(tokio_rustls::client::TlsStream::from(tls)))
}

#[cfg(all(feature = "tls-rustls", not(feature = "tls-native")))]
mod danger {
    use rustls::client::{ServerCertVerified, ServerCertVerifier};

    pub(super) struct NoVerify;

    impl ServerCertVerifier for NoVerify {
        fn verify_server_cert(
            &self,
            _end_entity: &rustls::Certificate,
            _intermediates: &[rustls::Certificate],
            _server_name: &rustls::ServerName,
            _scts: &mut dyn Iterator<Item = &[u8]>,
            _ocsp_response: &[u8],
            _now: std::time::SystemTime,
        ) -> std::result::Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }
    }
}

#[cfg(not(any(feature = "tls-native", feature = "tls-rustls")))]
async fn secure(_tcp: TcpStream, _domain: &str, _settings: &LdapConnSettings) -> Result<Stream> {
    Err(LdapError::NotSupported(
        "this build was compiled without TLS support".into(),
    ))
}

/// Spawn a connection driver on the current Tokio runtime, logging (but not
/// panicking on) a driver error. Used by both the blocking and async entry
/// points after obtaining a `(driver, Ldap)` pair.
#[macro_export]
macro_rules! drive {
    ($conn:expr) => {
        tokio::spawn(async move {
            if let Err(e) = $conn.drive().await {
                log::warn!("connection driver exited with an error: {}", e);
            }
        })
    };
}
