//! Bearer token validation capability.

use std::collections::HashMap;

use futures_util::future::BoxFuture;
use thiserror::Error;

/// Identity established from a validated token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claims {
    pub subject: Option<String>,
    pub scopes: Vec<String>,
    pub audience: Vec<String>,
    /// Expiry as seconds since the Unix epoch.
    pub expires_at: Option<u64>,
}

impl Claims {
    pub fn for_subject(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            ..Self::default()
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// True when every scope in `required` was granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }
}

/// Why a token was not accepted. Never shown to clients.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is not recognised")]
    Unknown,

    #[error("token is not active")]
    Inactive,

    #[error("token expired")]
    Expired,

    #[error("token audience does not include `{0}`")]
    AudienceMismatch(String),

    #[error("identity provider returned status {0}")]
    ProviderStatus(u16),

    #[error("identity provider request failed: {0}")]
    Provider(#[from] reqwest::Error),
}

impl AuthError {
    /// Failures caused by the provider rather than the token.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, AuthError::ProviderStatus(_) | AuthError::Provider(_))
    }
}

/// `validate(token) → claims | invalid`, shared across concurrent requests.
pub trait TokenValidator: Send + Sync {
    fn validate<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Claims, AuthError>>;
}

/// Fixed token → claims table, for local runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, Claims>,
}

impl StaticTokenValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, claims: Claims) -> Self {
        self.tokens.insert(token.into(), claims);
        self
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Claims, AuthError>> {
        let result = self.tokens.get(token).cloned().ok_or(AuthError::Unknown);
        Box::pin(std::future::ready(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_check_requires_all() {
        let claims = Claims::for_subject("alice").with_scopes(["read:sales", "read:stock"]);

        assert!(claims.has_scopes(&[]));
        assert!(claims.has_scopes(&["read:sales".to_string()]));
        assert!(!claims.has_scopes(&["read:sales".to_string(), "write:sales".to_string()]));
    }

    #[tokio::test]
    async fn static_validator_looks_up_tokens() {
        let validator = StaticTokenValidator::new().with_token("good", Claims::for_subject("bob"));

        let claims = validator.validate("good").await.unwrap();
        assert_eq!(claims.subject.as_deref(), Some("bob"));
        assert!(matches!(validator.validate("bad").await, Err(AuthError::Unknown)));
    }
}
