use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    models::Role,
    routing::{self, RouteClass, RouteTable},
    session::{AuthSnapshot, Session},
};

/// NavState
///
/// State carried along with a navigation. `from_public_link` is set by links in
/// public content (a product page linking into a portal, for example) and
/// opts that navigation out of automatic redirection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NavState {
    #[serde(default)]
    pub from_public_link: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub path: String,
    pub state: NavState,
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: NavState::default(),
        }
    }

    pub fn from_public_link(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: NavState {
                from_public_link: true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    pub replace: bool,
    pub state: Option<NavState>,
}

/// Navigator
///
/// Fire-and-forget navigation sink (the router of whatever front end embeds this).
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str, options: NavigateOptions);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    /// Leave the visitor where they are.
    Stay,
    /// Session still loading on a watched path: show a placeholder, do not navigate yet.
    Hold,
    Navigate { to: String, replace: bool },
}

impl RedirectDecision {
    pub fn target(&self) -> Option<&str> {
        match self {
            RedirectDecision::Navigate { to, .. } => Some(to.as_str()),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RedirectDecision::Stay => "stay",
            RedirectDecision::Hold => "hold",
            RedirectDecision::Navigate { .. } => "navigate",
        }
    }
}

fn navigate_to(path: &str) -> RedirectDecision {
    RedirectDecision::Navigate {
        to: path.to_string(),
        replace: true,
    }
}

/// compute_redirect
///
/// Decides where a visitor at `location` should be sent given their session
/// and resolved role. Anonymous visitors are never moved here; protecting
/// portal pages is the route guard's job.
pub fn compute_redirect(
    session: &Session,
    role: Option<Role>,
    location: &Location,
    routes: &RouteTable,
) -> RedirectDecision {
    let path = location.path.as_str();

    if session.loading {
        return if routing::is_watched_while_loading(path) {
            RedirectDecision::Hold
        } else {
            RedirectDecision::Stay
        };
    }

    if session.identity.is_none() {
        return RedirectDecision::Stay;
    }

    if !session.email_verified {
        return if path == routing::VERIFICATION {
            RedirectDecision::Stay
        } else {
            navigate_to(routing::VERIFICATION)
        };
    }

    let target = routing::landing_path(role);
    let on_public = routes.classify(path, role) == RouteClass::Public;
    let outside_target = !routing::is_within(path, target);

    if (on_public || outside_target)
        && !location.state.from_public_link
        && !routes.is_redirect_exempt(path)
    {
        navigate_to(target)
    } else {
        RedirectDecision::Stay
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ChangeKey {
    epoch: u64,
    role: Option<Role>,
    role_pending: bool,
    location: Location,
}

/// LandingRedirector
///
/// Thin reactive wrapper around `compute_redirect`. Repeated notifications for
/// the same (snapshot, location) pair are ignored so a change is enacted once.
pub struct LandingRedirector<N: Navigator> {
    navigator: N,
    routes: Arc<RouteTable>,
    last: Option<ChangeKey>,
}

impl<N: Navigator> LandingRedirector<N> {
    pub fn new(navigator: N, routes: Arc<RouteTable>) -> Self {
        Self {
            navigator,
            routes,
            last: None,
        }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn on_change(&mut self, snapshot: &AuthSnapshot, location: &Location) -> RedirectDecision {
        let key = ChangeKey {
            epoch: snapshot.epoch,
            role: snapshot.role,
            role_pending: snapshot.role_pending,
            location: location.clone(),
        };
        if self.last.as_ref() == Some(&key) {
            return RedirectDecision::Stay;
        }
        self.last = Some(key);

        // A failed session source is a blocking error, not a reason to move anyone.
        if snapshot.error.is_some() {
            return RedirectDecision::Stay;
        }

        let decision = compute_redirect(
            &snapshot.effective_session(),
            snapshot.role,
            location,
            &self.routes,
        );
        if let RedirectDecision::Navigate { to, replace } = &decision {
            tracing::info!(from = %location.path, to = %to, role = ?snapshot.role, "landing redirect");
            self.navigator.navigate(
                to,
                NavigateOptions {
                    replace: *replace,
                    state: None,
                },
            );
        }
        decision
    }

    /// Reacts to snapshot and location changes until either channel closes.
    pub async fn run(
        mut self,
        mut snapshots: watch::Receiver<AuthSnapshot>,
        mut locations: watch::Receiver<Location>,
    ) -> Self {
        loop {
            let snapshot = snapshots.borrow_and_update().clone();
            let location = locations.borrow_and_update().clone();
            self.on_change(&snapshot, &location);

            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = locations.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        self
    }
}
