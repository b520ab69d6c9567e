use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use super::credentials::{Password, PasswordProvider};
use crate::error::Result;

/// Keychain service name for stored hub passwords
const SERVICE_NAME: &str = "hubfetch";

/// Backing store for remembered hub passwords.
pub trait SecretStore: Send + Sync {
    fn get(&self, account: &str) -> Option<String>;
    fn set(&self, account: &str, secret: &str) -> std::result::Result<(), String>;
    fn delete(&self, account: &str) -> std::result::Result<(), String>;
}

/// Passwords kept in the OS keychain.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringStore;

impl SecretStore for KeyringStore {
    fn get(&self, account: &str) -> Option<String> {
        Entry::new(SERVICE_NAME, account)
            .and_then(|entry| entry.get_password())
            .ok()
    }

    fn set(&self, account: &str, secret: &str) -> std::result::Result<(), String> {
        let entry = Entry::new(SERVICE_NAME, account)
            .map_err(|e| format!("Failed to create keyring entry: {}", e))?;
        entry
            .set_password(secret)
            .map_err(|e| format!("Failed to store password in keychain: {}", e))
    }

    fn delete(&self, account: &str) -> std::result::Result<(), String> {
        let entry = Entry::new(SERVICE_NAME, account)
            .map_err(|e| format!("Failed to create keyring entry: {}", e))?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(format!("Failed to delete credential from keychain: {}", e)),
        }
    }
}

/// Wraps a prompting provider with a secret store.
///
/// A stored password is returned without prompting. A prompted password is
/// stored only once the hub has accepted it, and a stored password the hub
/// rejects is deleted so the next attempt prompts again.
pub struct StoredPasswordProvider<P, S> {
    inner: P,
    store: S,
    /// Account prefix, usually the hub address, so one user on two hubs
    /// keeps two entries.
    scope: String,
}

impl<P, S> StoredPasswordProvider<P, S> {
    pub fn new(inner: P, store: S, scope: impl Into<String>) -> Self {
        Self {
            inner,
            store,
            scope: scope.into(),
        }
    }

    fn account(&self, username: &str) -> String {
        format!("{}@{}", username, self.scope)
    }
}

#[async_trait]
impl<P, S> PasswordProvider for StoredPasswordProvider<P, S>
where
    P: PasswordProvider,
    S: SecretStore,
{
    async fn password(&self, username: &str) -> Result<Password> {
        if let Some(stored) = self.store.get(&self.account(username)) {
            debug!(username, "Using stored password");
            return Ok(Password::new(stored));
        }
        self.inner.password(username).await
    }

    async fn accepted(&self, username: &str, password: &Password) {
        if let Err(e) = self.store.set(&self.account(username), password.expose()) {
            warn!(error = %e, "Failed to store credentials");
        }
        self.inner.accepted(username, password).await;
    }

    async fn rejected(&self, username: &str) {
        if let Err(e) = self.store.delete(&self.account(username)) {
            warn!(error = %e, "Failed to forget rejected credentials");
        }
        self.inner.rejected(username).await;
    }
}
