use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};

const SERVICE_NAME: &str = "stockroom";

/// Keychain account under which the saved login lives. A single admin login
/// per machine; the email travels inside the entry payload.
const ACCOUNT: &str = "default";

/// A remembered login, stored as one JSON payload in the OS keychain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedLogin {
    pub email: String,
    pub password: String,
}

/// Optional "remember me" storage in the OS keychain. Never consulted by the
/// request pipeline; only the CLI login flow reads it.
pub struct CredentialStore;

impl CredentialStore {
    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, ACCOUNT).context("Failed to create keyring entry")
    }

    /// Remember a login in the OS keychain
    pub fn store(login: &SavedLogin) -> Result<()> {
        let payload = serde_json::to_string(login)?;
        Self::entry()?
            .set_password(&payload)
            .context("Failed to store login in keychain")?;
        Ok(())
    }

    /// Retrieve the remembered login, if any
    pub fn load() -> Result<Option<SavedLogin>> {
        match Self::entry()?.get_password() {
            Ok(payload) => {
                let login = serde_json::from_str(&payload)
                    .context("Failed to parse saved login from keychain")?;
                Ok(Some(login))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(error).context("Failed to read login from keychain"),
        }
    }

    /// Forget the remembered login; idempotent
    pub fn clear() -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(error).context("Failed to delete login from keychain"),
        }
    }
}
