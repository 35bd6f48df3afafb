//! # Provider Session
//!
//! The provider issues an access token on login. Tokens are reused until
//! they approach expiry; the refresh margin keeps us from sending a
//! request with a token that dies in flight.

use std::time::{Duration, Instant};

/// Margin before token expiration to trigger re-authentication (1 minute).
const REFRESH_MARGIN_SECS: u64 = 60;

/// An authenticated provider session.
#[derive(Debug, Clone)]
pub struct Session {
    /// The bearer access token.
    pub access_token: String,
    /// When the token expires (local monotonic time).
    pub expires_at: Instant,
}

impl Session {
    /// Creates a session expiring `ttl` from now.
    pub fn new(access_token: String, ttl: Duration) -> Self {
        Session {
            access_token,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Check if the token is expired or about to expire.
    pub fn needs_refresh(&self) -> bool {
        Instant::now() + Duration::from_secs(REFRESH_MARGIN_SECS) >= self.expires_at
    }

    /// Get remaining valid time.
    pub fn remaining_secs(&self) -> u64 {
        let now = Instant::now();
        if now >= self.expires_at {
            0
        } else {
            (self.expires_at - now).as_secs()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session_does_not_need_refresh() {
        let session = Session::new("tok".to_string(), Duration::from_secs(3600));
        assert!(!session.needs_refresh());
        assert!(session.remaining_secs() > 3500);
    }

    #[test]
    fn test_session_inside_margin_needs_refresh() {
        // 30s left, 60s margin
        let session = Session::new("tok".to_string(), Duration::from_secs(30));
        assert!(session.needs_refresh());
    }

    #[test]
    fn test_expired_session_has_no_remaining_time() {
        let session = Session::new("tok".to_string(), Duration::from_secs(0));
        assert_eq!(session.remaining_secs(), 0);
        assert!(session.needs_refresh());
    }
}
