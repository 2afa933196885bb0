use async_trait::async_trait;
use std::sync::Arc;

use crate::error::AccessError;

// 1. IdentityClient Contract
/// IdentityClient
///
/// The calls this service makes back to the hosted identity provider. Kept
/// behind a trait so handler tests run without network access.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Revokes the session behind `access_token` at the provider.
    async fn sign_out(&self, access_token: &str) -> Result<(), AccessError>;
}

// 2. The Real Implementation (Supabase Auth REST API)
/// SupabaseIdentityClient
///
/// Talks to the provider's `/auth/v1` endpoints with the project API key.
#[derive(Clone)]
pub struct SupabaseIdentityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseIdentityClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl IdentityClient for SupabaseIdentityClient {
    async fn sign_out(&self, access_token: &str) -> Result<(), AccessError> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AccessError::IdentityProvider(e.to_string()))?;

        // An already-revoked token is still a signed-out session.
        if response.status().is_success() || response.status() == reqwest::StatusCode::UNAUTHORIZED
        {
            Ok(())
        } else {
            Err(AccessError::IdentityProvider(format!(
                "logout returned {}",
                response.status()
            )))
        }
    }
}

// 3. The Mock Implementation (For Tests)
/// MockIdentityClient
///
/// Records revoked tokens; `new_failing` simulates an unreachable provider.
#[derive(Default)]
pub struct MockIdentityClient {
    pub should_fail: bool,
    pub revoked: std::sync::Mutex<Vec<String>>,
}

impl MockIdentityClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn revoked_tokens(&self) -> Vec<String> {
        self.revoked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl IdentityClient for MockIdentityClient {
    async fn sign_out(&self, access_token: &str) -> Result<(), AccessError> {
        if self.should_fail {
            return Err(AccessError::IdentityProvider(
                "Mock identity provider: simulated failure".to_string(),
            ));
        }
        self.revoked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(access_token.to_string());
        Ok(())
    }
}

/// IdentityState
///
/// Shared handle to the identity provider client held in `AppState`.
pub type IdentityState = Arc<dyn IdentityClient>;
