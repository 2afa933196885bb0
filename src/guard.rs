use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    auth::AuthContext,
    models::Role,
    policy::{self, Feature},
    redirector::{NavigateOptions, Navigator},
    routing,
    session::{AuthSnapshot, Session},
};

/// GuardState
///
/// Outcome of the Route Guard for one protected surface. `evaluate` decides it
/// purely; `RouteGuard` and the `require_*` middleware act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Pending,
    DeniedUnauthenticated,
    DeniedUnverified,
    DeniedWrongRole,
    Allowed,
    /// The session source failed to initialise. Blocking, never navigates.
    Failed,
}

impl GuardState {
    /// Where a denial sends the visitor. `None` for non-denial states.
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            GuardState::DeniedUnauthenticated | GuardState::DeniedWrongRole => Some(routing::ROOT),
            GuardState::DeniedUnverified => Some(routing::VERIFICATION),
            GuardState::Pending | GuardState::Allowed | GuardState::Failed => None,
        }
    }
}

/// evaluate
///
/// Verification is checked before the role, so an unverified account is sent
/// to the verification surface even when it holds the required role.
pub fn evaluate(session: &Session, role: Option<Role>, required: Option<Role>) -> GuardState {
    if session.loading {
        return GuardState::Pending;
    }
    if session.identity.is_none() {
        return GuardState::DeniedUnauthenticated;
    }
    if !session.email_verified {
        return GuardState::DeniedUnverified;
    }
    match required {
        Some(required) if !policy::is_allowed(role, required) => GuardState::DeniedWrongRole,
        _ => GuardState::Allowed,
    }
}

/// Guard decision for a published snapshot: a pending role counts as loading.
pub fn check(snapshot: &AuthSnapshot, required: Option<Role>) -> GuardState {
    if snapshot.error.is_some() {
        return GuardState::Failed;
    }
    evaluate(&snapshot.effective_session(), snapshot.role, required)
}

/// What a guarded view shows for one snapshot.
#[derive(Debug, PartialEq, Eq)]
pub enum Rendered<T> {
    Placeholder,
    Error,
    Redirected(&'static str),
    Content(T),
}

/// RouteGuard
///
/// Reactive guard around one protected view. Content is only built when the
/// state is `Allowed`; each denial navigates once per snapshot epoch.
pub struct RouteGuard<N: Navigator> {
    required: Option<Role>,
    navigator: N,
    last_redirect: Option<(u64, GuardState)>,
}

impl<N: Navigator> RouteGuard<N> {
    pub fn new(required: Option<Role>, navigator: N) -> Self {
        Self {
            required,
            navigator,
            last_redirect: None,
        }
    }

    pub fn render<T>(&mut self, snapshot: &AuthSnapshot, content: impl FnOnce() -> T) -> Rendered<T> {
        let state = check(snapshot, self.required);
        match state {
            GuardState::Allowed => Rendered::Content(content()),
            GuardState::Pending => Rendered::Placeholder,
            GuardState::Failed => Rendered::Error,
            denied => {
                let to = denied.redirect().unwrap_or(routing::ROOT);
                if self.last_redirect != Some((snapshot.epoch, denied)) {
                    self.last_redirect = Some((snapshot.epoch, denied));
                    self.navigator.navigate(
                        to,
                        NavigateOptions {
                            replace: true,
                            state: None,
                        },
                    );
                }
                Rendered::Redirected(to)
            }
        }
    }
}

// --- HTTP binding ---

/// enforce
///
/// Middleware body shared by the `require_*` layers. Denials answer
/// `303 See Other` to the denial's redirect target; the protected handler is
/// never invoked unless the state is `Allowed`.
pub async fn enforce(
    auth: AuthContext,
    required: Option<Role>,
    request: Request,
    next: Next,
) -> Response {
    let state = check(&auth.snapshot(), required);
    match state {
        GuardState::Allowed => next.run(request).await,
        GuardState::Pending | GuardState::Failed => {
            tracing::warn!(path = %request.uri().path(), ?state, "session unresolved at guard");
            (StatusCode::SERVICE_UNAVAILABLE, "session unresolved").into_response()
        }
        denied => {
            let to = denied.redirect().unwrap_or(routing::ROOT);
            tracing::info!(
                path = %request.uri().path(),
                state = ?denied,
                role = ?auth.role,
                to,
                "guard denied request"
            );
            Redirect::to(to).into_response()
        }
    }
}

/// Signed in and verified, any role or none. Used for the account home, the
/// landing target of a session whose role did not resolve.
pub async fn require_signed_in(auth: AuthContext, request: Request, next: Next) -> Response {
    enforce(auth, None, request, next).await
}

pub async fn require_user(auth: AuthContext, request: Request, next: Next) -> Response {
    enforce(auth, Some(Role::User), request, next).await
}

pub async fn require_baker(auth: AuthContext, request: Request, next: Next) -> Response {
    enforce(auth, Some(Role::Baker), request, next).await
}

pub async fn require_admin(auth: AuthContext, request: Request, next: Next) -> Response {
    enforce(auth, Some(Role::Admin), request, next).await
}

/// Handler-level feature gate on top of the route guard.
pub fn require_feature(role: Option<Role>, feature: Feature) -> Result<(), StatusCode> {
    if policy::has_access(role, feature) {
        Ok(())
    } else {
        tracing::info!(?role, %feature, "feature denied");
        Err(StatusCode::FORBIDDEN)
    }
}
