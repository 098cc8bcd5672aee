use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::User;

use super::token::AuthToken;

/// Persisted entry holding the token pair
const TOKEN_FILE: &str = "token.json";

/// Persisted entry holding the authenticated user record
const USER_FILE: &str = "user.json";

/// On-disk persistence for the session: the token pair and the user record,
/// stored as two JSON entries in the application state directory. Both are
/// written on login/refresh and removed together on logout.
pub struct TokenStore {
    state_dir: PathBuf,
}

impl TokenStore {
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    /// Persist the token pair and user record. The token entry is written
    /// first so a crash between the two writes leaves a loadable session.
    pub fn save(&self, token: &AuthToken, user: &User) -> Result<()> {
        self.save_entry(TOKEN_FILE, token)?;
        self.save_entry(USER_FILE, user)?;
        Ok(())
    }

    /// Replace only the token entry, used when a refresh rotates the
    /// credential but the user record is unchanged.
    pub fn save_token(&self, token: &AuthToken) -> Result<()> {
        self.save_entry(TOKEN_FILE, token)
    }

    pub fn load_token(&self) -> Result<Option<AuthToken>> {
        self.load_entry(TOKEN_FILE)
    }

    pub fn load_user(&self) -> Result<Option<User>> {
        self.load_entry(USER_FILE)
    }

    /// Remove both entries; idempotent.
    pub fn clear(&self) -> Result<()> {
        for name in [TOKEN_FILE, USER_FILE] {
            let path = self.state_dir.join(name);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", name))?;
            }
        }
        Ok(())
    }

    fn load_entry<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.state_dir.join(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", name))?;
        let value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", name))?;
        Ok(Some(value))
    }

    fn save_entry<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir)?;
        let contents = serde_json::to_string_pretty(value)?;
        std::fs::write(self.state_dir.join(name), contents)
            .with_context(|| format!("Failed to write {}", name))?;
        Ok(())
    }
}
