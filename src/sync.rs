//! A blocking façade over [`Ldap`], for callers that don't want to pull in
//! an async runtime of their own. Each instance owns a single-threaded
//! Tokio runtime that drives the connection task and every operation.

use std::collections::HashSet;
use std::hash::Hash;

use tokio::runtime::{self, Runtime};

use crate::conn::{LdapConnAsync, LdapConnSettings};
use crate::ldap::{Ldap, Mod};
use crate::result::{CompareResult, ExopResult, LdapResult, Result, SearchResult};
use crate::rootdse::RootDSE;
use crate::search::{Scope, SearchOptions};

pub struct LdapConn {
    ldap: Ldap,
    rt: Runtime,
}

impl LdapConn {
    /// Connect to `url` with default settings.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_settings(LdapConnSettings::new(), url)
    }

    /// Connect to `url` with explicit connection settings.
    pub fn with_settings(settings: LdapConnSettings, url: &str) -> Result<Self> {
        let rt = runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let ldap = rt.block_on(async move {
            let (conn, ldap) = LdapConnAsync::with_settings(settings, url).await?;
            super::drive!(conn);
            Ok(ldap)
        })?;
        Ok(LdapConn { ldap, rt })
    }

    /// Override the per-operation timeout for every call made through this
    /// handle from this point on.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.ldap = self.ldap.with_timeout(timeout);
        self
    }

    /// Default Search parameters used by [`search()`](#method.search).
    pub fn with_search_options(mut self, opts: SearchOptions) -> Self {
        self.ldap.search_opts = opts;
        self
    }

    pub fn simple_bind(&mut self, bind_dn: &str, bind_pw: &str) -> Result<LdapResult> {
        let ldap = &mut self.ldap;
        self.rt
            .block_on(async move { ldap.simple_bind(bind_dn, bind_pw).await })
    }

    pub fn anonymous_bind(&mut self) -> Result<LdapResult> {
        let ldap = &mut self.ldap;
        self.rt.block_on(async move { ldap.anonymous_bind().await })
    }

    pub fn sasl_external_bind(&mut self) -> Result<LdapResult> {
        let ldap = &mut self.ldap;
        self.rt
            .block_on(async move { ldap.sasl_external_bind().await })
    }

    pub fn sasl_plain_bind(&mut self, authzid: &str, authcid: &str, password: &str) -> Result<LdapResult> {
        let ldap = &mut self.ldap;
        self.rt
            .block_on(async move { ldap.sasl_plain_bind(authzid, authcid, password).await })
    }

    pub fn sasl_cram_md5_bind(&mut self, authcid: &str, password: &str) -> Result<LdapResult> {
        let ldap = &mut self.ldap;
        self.rt
            .block_on(async move { ldap.sasl_cram_md5_bind(authcid, password).await })
    }

    pub fn sasl_digest_md5_bind(&mut self, authcid: &str, password: &str) -> Result<LdapResult> {
        let ldap = &mut self.ldap;
        self.rt
            .block_on(async move { ldap.sasl_digest_md5_bind(authcid, password).await })
    }

    pub fn search<S, A>(&mut self, base: &str, scope: Scope, filter: &str, attrs: A) -> Result<SearchResult>
    where
        S: AsRef<str>,
        A: AsRef<[S]>,
    {
        let ldap = &mut self.ldap;
        self.rt
            .block_on(async move { ldap.search(base, scope, filter, attrs).await })
    }

    pub fn add<S: AsRef<str> + Eq + Hash>(&mut self, dn: S, attrs: Vec<(S, HashSet<S>)>) -> Result<LdapResult> {
        let ldap = &mut self.ldap;
        self.rt.block_on(async move { ldap.add(dn, attrs).await })
    }

    pub fn delete(&mut self, dn: &str) -> Result<LdapResult> {
        let ldap = &mut self.ldap;
        self.rt.block_on(async move { ldap.delete(dn).await })
    }

    pub fn delete_subtree(&mut self, dn: &str, root_dse: &RootDSE) -> Result<LdapResult> {
        let ldap = &mut self.ldap;
        self.rt
            .block_on(async move { ldap.delete_subtree(dn, root_dse).await })
    }

    pub fn modify<S: AsRef<str> + Eq + Hash>(&mut self, dn: &str, mods: Vec<Mod<S>>) -> Result<LdapResult> {
        let ldap = &mut self.ldap;
        self.rt.block_on(async move { ldap.modify(dn, mods).await })
    }

    pub fn modifydn(&mut self, dn: &str, rdn: &str, delete_old: bool, new_sup: Option<&str>) -> Result<LdapResult> {
        let ldap = &mut self.ldap;
        self.rt
            .block_on(async move { ldap.modifydn(dn, rdn, delete_old, new_sup).await })
    }

    pub fn compare<B: AsRef<[u8]>>(&mut self, dn: &str, attr: &str, val: B) -> Result<CompareResult> {
        let ldap = &mut self.ldap;
        self.rt
            .block_on(async move { ldap.compare(dn, attr, val).await })
    }

    pub fn extended<E>(&mut self, exop: E) -> Result<ExopResult>
    where
        Vec<lber::structures::Tag>: From<E>,
    {
        let ldap = &mut self.ldap;
        self.rt.block_on(async move { ldap.extended(exop).await })
    }

    pub fn get_root_dse(&mut self) -> Result<RootDSE> {
        let ldap = &mut self.ldap;
        self.rt.block_on(async move { ldap.get_root_dse().await })
    }

    pub fn abandon(&mut self, msgid: i32) -> Result<()> {
        let ldap = &mut self.ldap;
        self.rt.block_on(async move { ldap.abandon(msgid).await })
    }

    pub fn unbind(&mut self) -> Result<()> {
        let ldap = &mut self.ldap;
        self.rt.block_on(async move { ldap.unbind().await })
    }

    pub fn lookup<S, A>(&mut self, dn: &str, attrs: A) -> Result<Option<crate::search::SearchEntry>>
    where
        S: AsRef<str>,
        A: AsRef<[S]>,
    {
        let ldap = &mut self.ldap;
        self.rt.block_on(async move { ldap.lookup(dn, attrs).await })
    }

    /// `true` until the connection is closed (peer disconnect, decode
    /// error, NoticeOfDisconnect, or local Unbind).
    pub fn is_connected(&self) -> bool {
        self.ldap.is_connected()
    }

    /// `true` once a TLS layer has been installed, implicitly at connect
    /// time or via StartTLS.
    pub fn is_secured(&self) -> bool {
        self.ldap.is_secured()
    }

    /// `true` iff the most recent Bind on this connection returned Success.
    pub fn is_authenticated(&self) -> bool {
        self.ldap.is_authenticated()
    }
}
