//! OAuth2 client-credentials token cache.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::{Mutex, PoisonError};

/// Tokens are treated as expired this long before PayPal says they are
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// Body of `POST /v1/oauth2/token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            token: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in - EXPIRY_BUFFER_SECS),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Per-gateway token slot
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    /// Cached token if it is still valid at `now`
    pub fn current(&self, now: DateTime<Utc>) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|token| token.is_valid_at(now))
            .map(|token| token.token.clone())
    }

    pub fn store(&self, token: AccessToken) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
