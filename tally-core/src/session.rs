//! Sign-in session for the remote spreadsheet provider.
//!
//! The session is an explicit value handed to storage calls:
//! `Init -> SignedIn { expires_at } -> Expired | SignedOut`.

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Init,
    SignedIn {
        token: String,
        expires_at: DateTime<Utc>,
    },
    Expired {
        expired_at: DateTime<Utc>,
    },
    SignedOut,
}

/// Tokens this close to expiry are treated as expired
const EXPIRY_MARGIN_SECS: i64 = 60;

impl Session {
    pub fn sign_in(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Session::SignedIn {
            token: token.into(),
            expires_at,
        }
    }

    /// Advance to `Expired` if the token has lapsed as of `now`
    pub fn refresh_state(&mut self, now: DateTime<Utc>) {
        let expired_at = match self {
            Session::SignedIn { expires_at, .. }
                if now + Duration::seconds(EXPIRY_MARGIN_SECS) >= *expires_at =>
            {
                *expires_at
            }
            _ => return,
        };
        *self = Session::Expired { expired_at };
    }

    pub fn sign_out(&mut self) {
        *self = Session::SignedOut;
    }

    pub fn is_signed_in(&self, now: DateTime<Utc>) -> bool {
        self.token(now).is_ok()
    }

    /// Bearer token valid at `now`
    pub fn token(&self, now: DateTime<Utc>) -> Result<&str> {
        match self {
            Session::SignedIn { token, expires_at }
                if now + Duration::seconds(EXPIRY_MARGIN_SECS) < *expires_at =>
            {
                Ok(token.as_str())
            }
            Session::SignedIn { expires_at, .. } => Err(CoreError::SessionExpired(*expires_at)),
            Session::Expired { expired_at } => Err(CoreError::SessionExpired(*expired_at)),
            Session::Init | Session::SignedOut => Err(CoreError::SignedOut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_lifecycle() {
        let mut s = Session::default();
        assert!(matches!(s.token(t0()), Err(CoreError::SignedOut)));

        s = Session::sign_in("tok", t0() + Duration::hours(1));
        assert_eq!(s.token(t0()).unwrap(), "tok");

        let later = t0() + Duration::minutes(59) + Duration::seconds(30);
        assert!(!s.is_signed_in(later));
        s.refresh_state(later);
        assert!(matches!(s, Session::Expired { .. }));

        s.sign_out();
        assert_eq!(s, Session::SignedOut);
    }
}
