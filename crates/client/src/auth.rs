//! Authentication state.
//!
//! A single cell holding the token lifecycle: `missing` → `valid` →
//! `expired` → `valid`, with a `silent` detour armed by remote failures
//! when silent mode is configured. The silent state is a typed variant,
//! not a sentinel token string.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;

/// Current authentication state.
#[derive(Debug, Clone)]
pub(crate) enum Token {
    /// No token has been obtained yet.
    Missing,
    /// A token obtained from `/criteria/auth`.
    Valid {
        /// Bearer token.
        token: String,
        /// Expiry as unix seconds.
        exp: i64,
    },
    /// Remote calls are suspended until the window elapses.
    Silent {
        /// End of the silent window.
        until: Instant,
    },
}

/// Process-wide authentication cell.
pub(crate) struct Auth {
    state: Mutex<Token>,
    silent_window: Option<Duration>,
}

impl Auth {
    pub(crate) fn new(silent_window: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(Token::Missing),
            silent_window,
        }
    }

    /// Whether silent mode was configured on the context.
    pub(crate) fn silent_mode_configured(&self) -> bool {
        self.silent_window.is_some()
    }

    pub(crate) fn state(&self) -> Token {
        self.state.lock().expect("auth lock poisoned").clone()
    }

    /// Store a freshly obtained token.
    pub(crate) fn set_token(&self, token: String, exp: i64) {
        *self.state.lock().expect("auth lock poisoned") = Token::Valid { token, exp };
    }

    /// Arm (or renew) the silent window. No-op when silent mode is not
    /// configured.
    pub(crate) fn arm_silent(&self) {
        if let Some(window) = self.silent_window {
            *self.state.lock().expect("auth lock poisoned") = Token::Silent {
                until: Instant::now() + window,
            };
        }
    }

    /// Reset to the missing state.
    pub(crate) fn init(&self) {
        *self.state.lock().expect("auth lock poisoned") = Token::Missing;
    }

    /// A valid, unexpired bearer token, if one is held.
    pub(crate) fn bearer_token(&self) -> Option<String> {
        match &*self.state.lock().expect("auth lock poisoned") {
            Token::Valid { token, exp } if *exp >= Utc::now().timestamp() => Some(token.clone()),
            _ => None,
        }
    }
}

/// Expiry rule: a token with no expiry or an expiry in the past is
/// expired.
pub(crate) fn is_expired(exp: i64) -> bool {
    exp < Utc::now().timestamp()
}
