//! Advisory access-token payload decoding.
//!
//! Decodes the JSON payload of a JWT-shaped token without verifying its
//! signature, so the client can display who a token claims to belong to and
//! when it expires. A successful decode is never proof of authenticity and
//! must not gate any access decision - the server is the sole validator.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

/// Claims carried by the catalog server's access tokens.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Issued-at, seconds since the epoch
    #[serde(default)]
    pub iat: Option<i64>,
    /// Expiry, seconds since the epoch
    #[serde(default)]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

/// Decode a token's payload segment into `T`.
///
/// Returns `None` (with a diagnostic log) unless the token has exactly three
/// dot-separated segments and the middle segment is base64url-encoded JSON.
/// Padded and unpadded encodings are both accepted.
pub fn decode<T: DeserializeOwned>(token: &str) -> Option<T> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        warn!(segments = segments.len(), "Token does not have 3 segments");
        return None;
    }

    let payload = segments[1].trim_end_matches('=');
    let bytes = match URL_SAFE_NO_PAD.decode(payload) {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(%error, "Token payload is not valid base64url");
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(%error, "Token payload is not valid JSON");
            None
        }
    }
}

/// Decode the standard claim set.
pub fn decode_claims(token: &str) -> Option<Claims> {
    decode(token)
}
