//! SASL-GSSAPI Bind ([RFC 4752](https://tools.ietf.org/html/rfc4752)), with
//! an optional Kerberos realm/KDC pre-login step (spec §4.4's precondition).
//!
//! Only available with the `gssapi` feature, which pulls in `cross-krb5`.
//! The security-layer negotiation at the end of the exchange always
//! selects `NO_SECURITY_LAYER` (RFC 4752 §3.3): this crate does not wrap
//! post-Bind traffic in a SASL integrity/confidentiality layer, so
//! advertising support for one would be a contract the rest of the crate
//! can't honor. See `DESIGN.md` for the tradeoff.

use std::env;
use std::fs;

use log::debug;

use cross_krb5::{ClientCtx, InitiateFlags, K5Ctx, Step};

use crate::bind::{bind_request, sasl_auth};
use crate::ldap::Ldap;
use crate::result::{LdapError, LdapResult, Result};

const MECHANISM: &str = "GSSAPI";

/// Kerberos realm/KDC configuration to apply before the login step that
/// precedes the SASL-GSSAPI exchange.
pub enum KrbConfig {
    /// Use an existing MIT-format `krb5.conf` at this path.
    ConfigFile(String),
    /// Write a minimal MIT-format config naming a single realm/KDC to a
    /// temporary file for the duration of the bind.
    Realm {
        realm: String,
        kdc_host: String,
        kdc_port: u16,
    },
    /// Use whatever `krb5.conf` the system already has configured.
    SystemDefault,
}

struct Krb5ConfigGuard {
    prev: Option<String>,
    temp_path: Option<String>,
}

impl Krb5ConfigGuard {
    fn apply(config: &KrbConfig) -> Result<Self> {
        let prev = env::var("KRB5_CONFIG").ok();
        match config {
            KrbConfig::SystemDefault => Ok(Krb5ConfigGuard {
                prev,
                temp_path: None,
            }),
            KrbConfig::ConfigFile(path) => {
                env::set_var("KRB5_CONFIG", path);
                Ok(Krb5ConfigGuard {
                    prev,
                    temp_path: None,
                })
            }
            KrbConfig::Realm {
                realm,
                kdc_host,
                kdc_port,
            } => {
                let path = env::temp_dir().join(format!("ldap3-krb5-{}.conf", std::process::id()));
                let contents = format!(
                    "[libdefaults]\n\tdefault_realm = {realm}\n\n[realms]\n\t{realm} = {{\n\t\tkdc = {kdc_host}:{kdc_port}\n\t}}\n",
                    realm = realm,
                    kdc_host = kdc_host,
                    kdc_port = kdc_port,
                );
                fs::write(&path, contents)
                    .map_err(|e| LdapError::AuthenticationFailed(format!("writing krb5 config: {}", e)))?;
                let path = path.to_string_lossy().into_owned();
                env::set_var("KRB5_CONFIG", &path);
                Ok(Krb5ConfigGuard {
                    prev,
                    temp_path: Some(path),
                })
            }
        }
    }
}

impl Drop for Krb5ConfigGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => env::set_var("KRB5_CONFIG", v),
            None => env::remove_var("KRB5_CONFIG"),
        }
        if let Some(path) = &self.temp_path {
            let _ = fs::remove_file(path);
        }
    }
}

impl Ldap {
    /// SASL-GSSAPI Bind against `service_principal` (e.g.
    /// `ldap/directory.example.com@EXAMPLE.COM`), with system-default
    /// Kerberos configuration.
    pub async fn sasl_gssapi_bind(&mut self, service_principal: &str) -> Result<LdapResult> {
        self.sasl_gssapi_bind_with_config(service_principal, KrbConfig::SystemDefault)
            .await
    }

    /// Like [`sasl_gssapi_bind()`](#method.sasl_gssapi_bind), with explicit
    /// Kerberos realm/KDC configuration applied for the duration of the
    /// login step and the SASL exchange.
    pub async fn sasl_gssapi_bind_with_config(
        &mut self,
        service_principal: &str,
        krb_config: KrbConfig,
    ) -> Result<LdapResult> {
        self.enter_bind()?;
        let result = self
            .sasl_gssapi_bind_inner(service_principal, krb_config)
            .await;
        if let Ok(result) = &result {
            self.set_authenticated(result.rc == 0);
        }
        self.leave_bind();
        result
    }

    async fn sasl_gssapi_bind_inner(
        &mut self,
        service_principal: &str,
        krb_config: KrbConfig,
    ) -> Result<LdapResult> {
        let _guard = Krb5ConfigGuard::apply(&krb_config)?;

        let pending = ClientCtx::new(InitiateFlags::empty(), None, service_principal, None)
            .map_err(|e| LdapError::AuthenticationFailed(format!("Kerberos login failed: {}", e)))?;

        let mut round = 0u32;
        debug!("SASL {} round {}: sending initial token", MECHANISM, round);
        let (mut ctx, token, mut finished) = match pending
            .step(None)
            .map_err(|e| LdapError::AuthenticationFailed(e.to_string()))?
        {
            Step::Finished((ctx, token)) => (ctx, token, true),
            Step::Continue((ctx, token)) => (ctx, Some(token), false),
        };
        let (mut result, mut server_token) = self
            .bind_round(bind_request("", sasl_auth(MECHANISM, token.as_deref())))
            .await?;

        while !finished && matches!(result.rc, 0 | 14) {
            if result.rc == 0 {
                break;
            }
            round += 1;
            debug!("SASL {} round {}: processing server token", MECHANISM, round);
            let challenge = server_token.take().unwrap_or_default();
            let (next_ctx, token, done) = match ctx
                .step(Some(&challenge))
                .map_err(|e| LdapError::AuthenticationFailed(e.to_string()))?
            {
                Step::Finished((ctx, token)) => (ctx, token, true),
                Step::Continue((ctx, token)) => (ctx, Some(token), false),
            };
            ctx = next_ctx;
            finished = done;
            let (next_result, next_token) = self
                .bind_round(bind_request("", sasl_auth(MECHANISM, token.as_deref())))
                .await?;
            result = next_result;
            server_token = next_token;
        }

        if result.rc != 0 {
            return Ok(result);
        }

        // RFC 4752 §3.3: the server's final wrapped message names the
        // security layers and max buffer size it supports; we always
        // reply choosing "no security layer".
        if let Some(wrapped) = server_token {
            let unwrapped = ctx
                .unwrap(&wrapped)
                .map_err(|e| LdapError::AuthenticationFailed(e.to_string()))?;
            if unwrapped.len() < 4 {
                return Err(LdapError::ProtocolError(
                    "malformed GSSAPI security layer negotiation message".into(),
                ));
            }
            let reply = [1u8, 0, 0, 0];
            let wrapped_reply = ctx
                .wrap(false, &reply)
                .map_err(|e| LdapError::AuthenticationFailed(e.to_string()))?;
            let (final_result, _) = self
                .bind_round(bind_request("", sasl_auth(MECHANISM, Some(&wrapped_reply))))
                .await?;
            return Ok(final_result);
        }

        Ok(result)
    }
}
