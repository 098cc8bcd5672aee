use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The bearer credential pair issued by the catalog server.
///
/// Replaced wholesale on login and refresh; never partially updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until expiry, as reported by the server at issuance
    pub expires_in: i64,
    /// Local timestamp of issuance
    pub obtained_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
            obtained_at: Utc::now(),
        }
    }

    /// Build the successor credential after a refresh. The refresh token is
    /// preserved unless the server rotated it.
    pub fn refreshed(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token: refresh_token.unwrap_or_else(|| self.refresh_token.clone()),
            expires_in,
            obtained_at: Utc::now(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.obtained_at + Duration::seconds(self.expires_in)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at() - Utc::now()).num_minutes().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_is_not_expired() {
        let token = AuthToken::new("a1".into(), "r1".into(), 3600);
        assert!(!token.is_expired());
        assert!(token.minutes_until_expiry() > 50);
    }

    #[test]
    fn test_refreshed_preserves_refresh_token() {
        let token = AuthToken::new("a1".into(), "r1".into(), 3600);
        let next = token.refreshed("a2".into(), None, 3600);
        assert_eq!(next.access_token, "a2");
        assert_eq!(next.refresh_token, "r1");
    }

    #[test]
    fn test_refreshed_adopts_rotated_refresh_token() {
        let token = AuthToken::new("a1".into(), "r1".into(), 3600);
        let next = token.refreshed("a2".into(), Some("r2".into()), 3600);
        assert_eq!(next.refresh_token, "r2");
    }

    #[test]
    fn test_expired_token() {
        let mut token = AuthToken::new("a1".into(), "r1".into(), 3600);
        token.obtained_at = Utc::now() - Duration::hours(2);
        assert!(token.is_expired());
        assert_eq!(token.minutes_until_expiry(), 0);
    }
}
