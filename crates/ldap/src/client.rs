//! Thin read-only LDAP client.

use std::collections::HashMap;

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use mobsync_core::config::LdapConfig;
use mobsync_core::error::{MobSyncError, Result};
use tracing::{debug, info};

/// A search result: DN plus multi-valued text attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl From<SearchEntry> for DirectoryEntry {
    fn from(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attrs: entry.attrs,
        }
    }
}

pub struct LdapClient {
    server: String,
    bind_dn: String,
    bind_password: String,
    tls_verify: bool,
}

impl LdapClient {
    pub fn new(config: &LdapConfig) -> Self {
        Self {
            server: config.server.clone(),
            bind_dn: config.bind_dn.clone(),
            bind_password: config.bind_password.clone(),
            tls_verify: config.tls_verify,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    async fn connect(&self) -> Result<Ldap> {
        let settings = LdapConnSettings::new().set_no_tls_verify(!self.tls_verify);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.server)
            .await
            .map_err(|e| MobSyncError::Ldap(format!("LDAP connect failed: {e}")))?;

        ldap3::drive!(conn);

        // An empty bind DN means an anonymous session.
        if !self.bind_dn.is_empty() {
            ldap.simple_bind(&self.bind_dn, &self.bind_password)
                .await
                .map_err(|e| MobSyncError::Ldap(format!("LDAP bind failed: {e}")))?
                .success()
                .map_err(|e| MobSyncError::Ldap(format!("LDAP bind rejected: {e}")))?;
        }

        debug!(server = %self.server, "LDAP connection ready");
        Ok(ldap)
    }

    /// Bind and unbind once.
    pub async fn test_connection(&self) -> Result<()> {
        let mut ldap = self.connect().await?;
        ldap.unbind()
            .await
            .map_err(|e| MobSyncError::Ldap(format!("LDAP unbind failed: {e}")))?;
        info!(server = %self.server, "LDAP connection test successful");
        Ok(())
    }

    /// Subtree search of every base with the same filter, all attributes.
    pub async fn search(&self, bases: &[String], filter: &str) -> Result<Vec<DirectoryEntry>> {
        let mut ldap = self.connect().await?;
        let mut entries = Vec::new();

        for base in bases {
            let (results, _) = ldap
                .search(base, Scope::Subtree, filter, vec!["*"])
                .await
                .map_err(|e| MobSyncError::Ldap(format!("LDAP search failed: {e}")))?
                .success()
                .map_err(|e| MobSyncError::Ldap(format!("LDAP search error in {base}: {e}")))?;
            debug!(base = %base, filter, count = results.len(), "LDAP search complete");
            entries.extend(
                results
                    .into_iter()
                    .map(|entry| DirectoryEntry::from(SearchEntry::construct(entry))),
            );
        }

        let unbound = ldap.unbind().await;
        log_unbind(&self.server, unbound);
        Ok(entries)
    }
}

/// A failed unbind after a finished search loses nothing; note it and go on.
fn log_unbind(server: &str, result: ldap3::result::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!(server, error = %e, "LDAP unbind failed");
            false
        }
    }
}
