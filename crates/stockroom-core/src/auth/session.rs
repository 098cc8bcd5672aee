use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::models::User;

use super::error::AuthError;
use super::store::TokenStore;
use super::token::AuthToken;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
    /// Present only when the server rotates the refresh token
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Error body shape used by the catalog server for auth failures
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Default)]
struct AuthState {
    token: Option<AuthToken>,
    user: Option<User>,
}

/// Owns the session lifecycle against the catalog server: login, logout and
/// token refresh. State lives in memory, hydrated from the [`TokenStore`] at
/// construction and written back through it on every transition, so a
/// session survives process restarts.
///
/// The synchronous readers (`access_token`, `current_user`,
/// `is_authenticated`) never touch the network.
pub struct SessionManager {
    http: Client,
    base_url: String,
    store: TokenStore,
    state: RwLock<AuthState>,
}

impl SessionManager {
    pub fn new(http: Client, base_url: String, store: TokenStore) -> Self {
        let token = store.load_token().unwrap_or_else(|error| {
            warn!(%error, "Failed to load persisted token, starting signed out");
            None
        });
        let user = store.load_user().unwrap_or_else(|error| {
            warn!(%error, "Failed to load persisted user, starting signed out");
            None
        });

        Self {
            http,
            base_url,
            store,
            state: RwLock::new(AuthState { token, user }),
        }
    }

    /// Authenticate against the catalog server.
    ///
    /// An auth-failure response surfaces as [`AuthError::InvalidCredentials`]
    /// and leaves the session untouched; it is never retried here.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let url = format!("{}/auth/login", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await
            .context("Failed to send login request")?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| "Incorrect email or password".to_string());
            return Err(AuthError::InvalidCredentials(message).into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body).into());
        }

        let payload: LoginResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;

        let token = AuthToken::new(
            payload.access_token,
            payload.refresh_token,
            payload.expires_in,
        );
        self.install(token, payload.user.clone())?;
        info!(email = %payload.user.email, "Login succeeded");
        Ok(payload.user)
    }

    /// Clear the session locally; idempotent. Remote-side revocation is out
    /// of scope, so this never fails on network conditions.
    pub fn logout(&self) -> Result<()> {
        {
            let mut state = self.state_write();
            state.token = None;
            state.user = None;
        }
        self.store.clear()?;
        info!("Session cleared");
        Ok(())
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// With no stored credential this fails immediately with
    /// [`AuthError::NoSession`] and no network call. Any failure of the
    /// exchange itself - rejection, transport error, malformed body -
    /// invalidates the whole session: local state is cleared and the caller
    /// sees [`AuthError::SessionExpired`]. There is no retry.
    pub async fn refresh(&self) -> Result<String> {
        let refresh_token = {
            let state = self.state_read();
            match state.token.as_ref() {
                Some(token) => token.refresh_token.clone(),
                None => return Err(AuthError::NoSession.into()),
            }
        };

        let payload = match self.request_refresh(&refresh_token).await {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%error, "Token refresh failed, clearing session");
                if let Err(clear_error) = self.logout() {
                    warn!(error = %clear_error, "Failed to clear session state");
                }
                return Err(AuthError::SessionExpired.into());
            }
        };

        let current = match self.state_read().token.clone() {
            Some(token) => token,
            // Logged out while the exchange was in flight
            None => return Err(AuthError::NoSession.into()),
        };

        let token = current.refreshed(
            payload.access_token,
            payload.refresh_token,
            payload.expires_in,
        );
        let access_token = token.access_token.clone();
        self.store.save_token(&token)?;
        self.state_write().token = Some(token);
        debug!("Access token refreshed");
        Ok(access_token)
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let url = format!("{}/auth/refresh", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .context("Failed to send refresh request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body).into());
        }

        response
            .json()
            .await
            .context("Failed to parse refresh response")
    }

    /// Current access token, if signed in. Local read only.
    pub fn access_token(&self) -> Option<String> {
        self.state_read()
            .token
            .as_ref()
            .map(|token| token.access_token.clone())
    }

    /// Current token pair, for expiry display. Local read only.
    pub fn token(&self) -> Option<AuthToken> {
        self.state_read().token.clone()
    }

    /// The authenticated user record, if signed in. Local read only.
    pub fn current_user(&self) -> Option<User> {
        self.state_read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state_read().token.is_some()
    }

    /// Persist then publish a new session state.
    fn install(&self, token: AuthToken, user: User) -> Result<()> {
        self.store.save(&token, &user)?;
        let mut state = self.state_write();
        state.token = Some(token);
        state.user = Some(user);
        Ok(())
    }

    fn state_read(&self) -> RwLockReadGuard<'_, AuthState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state_write(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
