//! HTTP client for the product catalog API.
//!
//! Every outbound request is stamped with the current bearer token. When a
//! response comes back 401 the client refreshes the session exactly once and
//! replays the request; concurrent requests that fail while a refresh is
//! already in flight queue behind it instead of issuing their own, so the
//! remote authority sees at most one refresh call per expired-session
//! episode.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::auth::{AuthError, SessionManager, TokenStore};
use crate::config::Config;
use crate::events::{SessionEvent, SessionEvents};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound on how long a request queued behind an in-flight refresh
/// waits before failing instead of hanging. Matches the request timeout:
/// the refresh itself cannot legitimately take longer.
const REFRESH_WAIT_TIMEOUT_SECS: u64 = 30;

/// Refresh coordination state, owned by the client and shared by every
/// in-flight request. `refreshing` is the single-flight flag; `waiters`
/// holds the deferred handles of requests that hit 401 while a refresh was
/// already running. Drained in FIFO order when the refresh settles, so no
/// waiter outlives the cycle that parked it.
#[derive(Default)]
struct RefreshGate {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<Result<String, AuthError>>>,
}

enum RefreshRole {
    /// This request runs the refresh and settles the queue
    Leader,
    /// This request parks until the in-flight refresh settles
    Waiter(oneshot::Receiver<Result<String, AuthError>>),
}

/// Settles the gate on every leader exit path. A leader whose future is
/// dropped mid-refresh must not leave the flag set, or every later 401
/// would park behind a refresh that no longer exists; dropping the waiter
/// handles rejects the queue instead.
struct LeaderGuard {
    gate: Arc<Mutex<RefreshGate>>,
    outcome: Option<Result<String, AuthError>>,
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        let waiters = {
            let mut gate = self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            gate.refreshing = false;
            std::mem::take(&mut gate.waiters)
        };

        if !waiters.is_empty() {
            debug!(
                waiters = waiters.len(),
                settled = self.outcome.is_some(),
                "Draining requests queued behind refresh"
            );
        }

        match self.outcome.take() {
            Some(outcome) => {
                for waiter in waiters {
                    // A waiter that gave up (timed out) is gone; that's fine
                    let _ = waiter.send(outcome.clone());
                }
            }
            // Leader cancelled before the refresh settled
            None => drop(waiters),
        }
    }
}

/// API client for the product catalog.
/// Clone is cheap - reqwest::Client uses Arc internally for connection
/// pooling, and clones share the session and refresh gate.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<SessionManager>,
    gate: Arc<Mutex<RefreshGate>>,
    events: SessionEvents,
}

impl ApiClient {
    /// Create a client from the application configuration
    pub fn new(config: &Config) -> Result<Self> {
        let store = TokenStore::new(config.state_dir()?);
        Self::with_base_url(config.base_url(), store)
    }

    /// Create a client against an explicit base URL and token store
    pub fn with_base_url(base_url: impl Into<String>, store: TokenStore) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let session = Arc::new(SessionManager::new(http.clone(), base_url.clone(), store));

        Ok(Self {
            http,
            base_url,
            session,
            gate: Arc::new(Mutex::new(RefreshGate::default())),
            events: SessionEvents::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session manager behind this client
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Lifecycle events (forced logout notifications) for the embedder
    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// Send a request, attaching the current bearer token and transparently
    /// renewing the session on a 401.
    ///
    /// The builder closure is invoked once per attempt so the replay carries
    /// the original method, URL and body with a fresh Authorization header.
    /// A request is retried at most once; a 401 on the replay is surfaced.
    pub(crate) async fn send_with_refresh<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut retried = false;
        loop {
            let mut request = build(&self.http);
            if let Some(token) = self.session.access_token() {
                request = request.bearer_auth(token);
            }

            let response = request.send().await.map_err(ApiError::NetworkError)?;

            if response.status() == StatusCode::UNAUTHORIZED && !retried {
                retried = true;
                debug!("Request unauthorized, renewing session before retry");
                self.refresh_access_token().await?;
                continue;
            }

            return Ok(response);
        }
    }

    /// Check if response is successful, returning a taxonomy'd error with
    /// the body if not.
    pub(crate) async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Single-flight session renewal.
    ///
    /// The first request through becomes the leader: it runs the refresh,
    /// then drains the waiter queue with the outcome. Requests arriving
    /// while the flag is set park on a oneshot handle instead. Waiters are
    /// released strictly after the refresh settles and never see a stale
    /// token.
    async fn refresh_access_token(&self) -> Result<String> {
        let role = {
            let mut gate = self.lock_gate();
            if gate.refreshing {
                let (tx, rx) = oneshot::channel();
                gate.waiters.push(tx);
                RefreshRole::Waiter(rx)
            } else {
                gate.refreshing = true;
                RefreshRole::Leader
            }
        };

        match role {
            RefreshRole::Waiter(rx) => {
                match tokio::time::timeout(Duration::from_secs(REFRESH_WAIT_TIMEOUT_SECS), rx).await
                {
                    Ok(Ok(outcome)) => outcome.map_err(Into::into),
                    // Leader dropped before settling the queue
                    Ok(Err(_)) => Err(AuthError::SessionExpired.into()),
                    Err(_) => {
                        warn!("Timed out waiting for in-flight session refresh");
                        Err(AuthError::RefreshTimedOut.into())
                    }
                }
            }
            RefreshRole::Leader => {
                let mut guard = LeaderGuard {
                    gate: Arc::clone(&self.gate),
                    outcome: None,
                };

                let result = self.session.refresh().await;

                // Waiters need a clonable outcome; anything that is not a
                // typed auth error collapses to SessionExpired, which is
                // what a failed renewal means for them.
                guard.outcome = Some(match &result {
                    Ok(token) => Ok(token.clone()),
                    Err(error) => Err(error
                        .downcast_ref::<AuthError>()
                        .cloned()
                        .unwrap_or(AuthError::SessionExpired)),
                });
                drop(guard);

                if result.is_err() {
                    self.events.emit(SessionEvent::Invalidated);
                }

                result
            }
        }
    }

    fn lock_gate(&self) -> std::sync::MutexGuard<'_, RefreshGate> {
        self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
