//! Upgrade gate: bearer-token authorization for device connections and
//! fulfillment calls.
//!
//! Token issuance (the OAuth2 flow) lives elsewhere; this module only
//! decides pass/fail for a presented token. [`UpgradeGate`] is the seam and
//! [`StaticTokenGate`] checks tokens against a configured table.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use crate::error::BridgeError;

/// Caller identity established by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Scopes granted to the presented token.
    pub scopes: Vec<String>,
    /// `false` when the gate runs open and no token was checked.
    pub authenticated: bool,
}

/// Why a caller was turned away.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateRejection {
    /// No `Authorization: Bearer` header.
    #[error("missing bearer token")]
    MissingToken,
    /// Token not recognised.
    #[error("unknown bearer token")]
    UnknownToken,
    /// Token lacks the required scope.
    #[error("token lacks scope {0}")]
    MissingScope(String),
}

impl From<GateRejection> for BridgeError {
    fn from(rejection: GateRejection) -> Self {
        match rejection {
            GateRejection::MissingToken | GateRejection::UnknownToken => Self::Unauthorized,
            GateRejection::MissingScope(scope) => Self::Forbidden(scope),
        }
    }
}

/// Decides whether a request may open a device connection or call
/// fulfillment.
#[async_trait]
pub trait UpgradeGate: Debug + Send + Sync {
    /// Authorizes the request carrying `headers`.
    ///
    /// # Errors
    ///
    /// Returns a [`GateRejection`] when the caller must be turned away.
    async fn authorize(&self, headers: &HeaderMap) -> Result<Principal, GateRejection>;
}

/// Extracts the bearer token from the `Authorization` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Gate backed by a fixed token → scopes table.
///
/// An empty table lets every caller through (development mode).
#[derive(Debug, Clone)]
pub struct StaticTokenGate {
    tokens: HashMap<String, Vec<String>>,
    required_scope: String,
}

impl StaticTokenGate {
    /// Creates a gate accepting `tokens` that carry `required_scope`.
    #[must_use]
    pub fn new(tokens: HashMap<String, Vec<String>>, required_scope: impl Into<String>) -> Self {
        Self {
            tokens,
            required_scope: required_scope.into(),
        }
    }

    /// Returns `true` when no tokens are configured.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl UpgradeGate for StaticTokenGate {
    async fn authorize(&self, headers: &HeaderMap) -> Result<Principal, GateRejection> {
        if self.is_open() {
            tracing::debug!("no access tokens configured; allowing unauthenticated caller");
            return Ok(Principal {
                scopes: Vec::new(),
                authenticated: false,
            });
        }

        let token = bearer_token(headers).ok_or(GateRejection::MissingToken)?;
        let scopes = self.tokens.get(token).ok_or(GateRejection::UnknownToken)?;
        if !scopes.iter().any(|s| *s == self.required_scope) {
            return Err(GateRejection::MissingScope(self.required_scope.clone()));
        }

        Ok(Principal {
            scopes: scopes.clone(),
            authenticated: true,
        })
    }
}
