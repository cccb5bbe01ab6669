//! OAuth2 token introspection (RFC 7662) against the identity provider.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::future::BoxFuture;
use serde::Deserialize;

use crate::config::IdentityConfig;
use crate::security::validator::{AuthError, Claims, TokenValidator};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    active: bool,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    #[serde(default)]
    exp: Option<u64>,
}

/// Validates bearer tokens by asking the identity provider.
#[derive(Debug, Clone)]
pub struct IntrospectionValidator {
    client: reqwest::Client,
    endpoint: String,
    audience: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl IntrospectionValidator {
    pub fn new(config: &IdentityConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}{}",
                config.domain.trim_end_matches('/'),
                config.introspection_path
            ),
            audience: config.audience.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn introspect(&self, token: &str) -> Result<Claims, AuthError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .form(&[("token", token), ("token_type_hint", "access_token")]);
        if let Some(client_id) = &self.client_id {
            request = request.basic_auth(client_id, self.client_secret.as_ref());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AuthError::ProviderStatus(response.status().as_u16()));
        }
        let body: IntrospectionResponse = response.json().await?;

        claims_from(body, self.audience.as_deref(), unix_now())
    }
}

impl TokenValidator for IntrospectionValidator {
    fn validate<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Claims, AuthError>> {
        Box::pin(self.introspect(token))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn claims_from(
    response: IntrospectionResponse,
    expected_audience: Option<&str>,
    now: u64,
) -> Result<Claims, AuthError> {
    if !response.active {
        return Err(AuthError::Inactive);
    }
    if matches!(response.exp, Some(exp) if exp <= now) {
        return Err(AuthError::Expired);
    }

    let audience = match response.aud {
        Some(Audience::One(aud)) => vec![aud],
        Some(Audience::Many(auds)) => auds,
        None => Vec::new(),
    };
    if let Some(expected) = expected_audience {
        if !audience.iter().any(|aud| aud == expected) {
            return Err(AuthError::AudienceMismatch(expected.to_string()));
        }
    }

    Ok(Claims {
        subject: response.sub,
        scopes: response
            .scope
            .map(|scope| scope.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        audience,
        expires_at: response.exp,
    })
}
