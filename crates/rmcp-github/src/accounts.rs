//! Multi-account credential resolution.
//!
//! The registry is immutable after construction. Which account an owner-less call uses is
//! held in a [`Session`] that callers thread through every lookup.

use crate::api::GitHubApi;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Case-folded owner name used for every registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerKey(String);

impl OwnerKey {
    pub fn new(owner: &str) -> Self {
        Self(owner.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct Account {
    pub owner: String,
    pub client: Arc<dyn GitHubApi>,
}

impl Account {
    pub fn new(owner: impl Into<String>, client: Arc<dyn GitHubApi>) -> Self {
        Self {
            owner: owner.into(),
            client,
        }
    }
}

/// Per-connection selection state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    selected: Option<OwnerKey>,
}

impl Session {
    pub fn selected(&self) -> Option<&OwnerKey> {
        self.selected.as_ref()
    }
}

#[derive(Debug)]
pub struct AccountRegistry {
    /// Display names in configuration order.
    owners: Vec<String>,
    clients: HashMap<OwnerKey, Arc<dyn GitHubApi>>,
    default_owner: Option<OwnerKey>,
}

impl AccountRegistry {
    /// Fails with [`Error::NoAccounts`] for an empty list and [`Error::DuplicateOwner`]
    /// when two owners differ only in case. A default owner that matches no account is
    /// dropped with a warning.
    pub fn new(accounts: Vec<Account>, default_owner: Option<&str>) -> Result<Self> {
        if accounts.is_empty() {
            return Err(Error::NoAccounts);
        }

        let mut owners = Vec::with_capacity(accounts.len());
        let mut clients = HashMap::with_capacity(accounts.len());
        for account in accounts {
            let key = OwnerKey::new(&account.owner);
            if clients.insert(key, account.client).is_some() {
                return Err(Error::DuplicateOwner(account.owner));
            }
            owners.push(account.owner);
        }

        let default_owner = default_owner.map(OwnerKey::new).and_then(|key| {
            if clients.contains_key(&key) {
                Some(key)
            } else {
                tracing::warn!(
                    default_owner = %key,
                    "Default owner does not match any configured account; no account selected"
                );
                None
            }
        });

        Ok(Self {
            owners,
            clients,
            default_owner,
        })
    }

    /// A fresh session, preselecting the configured default owner if there is one.
    pub fn new_session(&self) -> Session {
        Session {
            selected: self.default_owner.clone(),
        }
    }

    pub fn list_accounts(&self) -> &[String] {
        &self.owners
    }

    /// Leaves `session` untouched on failure.
    pub fn select(&self, session: &mut Session, owner: &str) -> Result<OwnerKey> {
        let key = OwnerKey::new(owner);
        if !self.clients.contains_key(&key) {
            return Err(Error::InvalidOwner {
                owner: owner.to_string(),
                valid: self.owners.clone(),
            });
        }
        tracing::info!(owner = %key, "Selected account");
        session.selected = Some(key.clone());
        Ok(key)
    }

    pub fn resolve_owner(&self, session: &Session, explicit: Option<&str>) -> Result<OwnerKey> {
        match explicit.map(str::trim).filter(|o| !o.is_empty()) {
            Some(owner) => Ok(OwnerKey::new(owner)),
            None => session.selected.clone().ok_or_else(|| Error::NoOwnerSelected {
                valid: self.owners.clone(),
            }),
        }
    }

    pub fn client_for(
        &self,
        session: &Session,
        explicit: Option<&str>,
    ) -> Result<(OwnerKey, Arc<dyn GitHubApi>)> {
        let owner = self.resolve_owner(session, explicit)?;
        let client = self
            .clients
            .get(&owner)
            .cloned()
            .ok_or_else(|| Error::UnknownOwner {
                owner: owner.to_string(),
                valid: self.owners.clone(),
            })?;
        Ok((owner, client))
    }
}
