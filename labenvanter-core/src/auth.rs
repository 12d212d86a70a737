//! Password-gated admin authorization.
//!
//! A single shared secret guards edits and archiving. This mirrors the
//! deployed behavior and is deliberately not a security boundary: the
//! secret is stored in plain text and recovery needs only a fixed answer.
//! The gate is a decision function; collecting the credential is the
//! caller's concern.

use crate::store::{StateStore, StoreKey};
use crate::Result;
use tracing::{info, warn};

/// Secret in effect until an admin changes it, and the value recovery
/// resets to.
pub const DEFAULT_PASSWORD: &str = "admin123";

/// Answer to the fixed recovery question, compared case-insensitively.
pub const RECOVERY_ANSWER: &str = "laboratuvar";

/// Holds the current secret and the per-session authorized flag.
///
/// The flag always starts false and is never persisted; only the secret
/// itself is written through the store.
pub struct AuthGate<S: StateStore> {
    store: S,
    secret: String,
    authenticated: bool,
}

impl<S: StateStore> AuthGate<S> {
    /// Load the persisted secret, falling back to the default.
    pub fn load(store: S) -> Result<Self> {
        let secret = store
            .get::<String>(StoreKey::AdminPassword)?
            .unwrap_or_else(|| DEFAULT_PASSWORD.to_string());
        Ok(Self {
            store,
            secret,
            authenticated: false,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Check a candidate against the current secret. A match authorizes
    /// the rest of the session; a miss changes nothing.
    pub fn validate(&mut self, candidate: &str) -> bool {
        if candidate == self.secret {
            self.authenticated = true;
            info!("admin credential accepted");
            true
        } else {
            warn!("admin credential rejected");
            false
        }
    }

    /// Replace the secret. Requires the current secret, not a prior
    /// authorized session.
    pub fn change_secret(&mut self, current: &str, new_secret: &str) -> Result<bool> {
        if current != self.secret {
            warn!("secret change rejected");
            return Ok(false);
        }
        self.store
            .put(StoreKey::AdminPassword, &new_secret.to_string())?;
        self.secret = new_secret.to_string();
        info!("admin secret changed");
        Ok(true)
    }

    /// Reset the secret to the default when the recovery answer matches
    /// (case-insensitive).
    pub fn recover(&mut self, answer: &str) -> Result<bool> {
        if answer.to_lowercase() != RECOVERY_ANSWER.to_lowercase() {
            warn!("secret recovery rejected");
            return Ok(false);
        }
        self.store
            .put(StoreKey::AdminPassword, &DEFAULT_PASSWORD.to_string())?;
        self.secret = DEFAULT_PASSWORD.to_string();
        info!("admin secret reset to default");
        Ok(true)
    }

    /// First phase of gating a privileged action: either the session is
    /// already authorized and the action comes straight back, or the
    /// caller receives a challenge holding the action until a credential
    /// is presented.
    pub fn authorize<A>(&self, action: A) -> Authorization<A> {
        if self.authenticated {
            Authorization::Granted(action)
        } else {
            Authorization::ChallengeRequired(Challenge { action })
        }
    }

    /// Second phase: present a credential for a pending challenge. On a
    /// miss the challenge comes back so the caller can retry; there is no
    /// attempt limit.
    pub fn resolve<A>(&mut self, challenge: Challenge<A>, credential: &str) -> Resolution<A> {
        if self.validate(credential) {
            Resolution::Approved(challenge.action)
        } else {
            Resolution::Denied(challenge)
        }
    }
}

/// A privileged action waiting for a credential.
#[derive(Debug)]
pub struct Challenge<A> {
    action: A,
}

/// Outcome of the first gating phase.
#[derive(Debug)]
pub enum Authorization<A> {
    Granted(A),
    ChallengeRequired(Challenge<A>),
}

/// Outcome of presenting a credential for a challenge.
#[derive(Debug)]
pub enum Resolution<A> {
    Approved(A),
    Denied(Challenge<A>),
}
