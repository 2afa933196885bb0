use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// AccessError
///
/// Failure taxonomy of the access layer. None of these are retried; each one
/// collapses into deny-by-default behaviour at the guard or redirector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The identity provider could not establish a session at all.
    /// While this is the current state no guard can resolve to `Allowed`.
    #[error("session source failed to initialise: {0}")]
    SessionInit(String),

    /// The profile store could not produce a role. Treated as "no role".
    #[error("role lookup failed: {0}")]
    RoleFetch(String),

    /// A role lookup finished after the session it was issued for had been replaced.
    #[error("stale role result for epoch {epoch} (current epoch {current})")]
    NavigationRace { epoch: u64, current: u64 },

    #[error("identity provider error: {0}")]
    IdentityProvider(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for AccessError {
    fn from(e: sqlx::Error) -> Self {
        AccessError::Store(e.to_string())
    }
}

impl AccessError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccessError::SessionInit(_) => StatusCode::SERVICE_UNAVAILABLE,
            // An unresolved role is a denial, not a server fault.
            AccessError::RoleFetch(_) => StatusCode::FORBIDDEN,
            AccessError::NavigationRace { .. } => StatusCode::CONFLICT,
            AccessError::IdentityProvider(_) => StatusCode::BAD_GATEWAY,
            AccessError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Lets handlers that answer bare status codes propagate with `?`.
impl From<AccessError> for StatusCode {
    fn from(e: AccessError) -> Self {
        let status = e.status();
        tracing::error!(error = %e, status = %status, "request failed");
        status
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(error = %self, status = %status, "access error surfaced to client");
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
