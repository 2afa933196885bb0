use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::Role;

// --- Well-known storefront paths ---

pub const ROOT: &str = "/";
pub const AUTH: &str = "/auth";
pub const VERIFICATION: &str = "/email-verification-required";
pub const ADMIN_PORTAL: &str = "/admin-portal";
pub const BAKER_PORTAL: &str = "/baker-portal";
pub const ACCOUNT: &str = "/account";

/// landing_path
///
/// The home surface for a role. Anything that is not admin or baker,
/// including an unresolved role, lands on the customer account.
pub fn landing_path(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Admin) => ADMIN_PORTAL,
        Some(Role::Baker) => BAKER_PORTAL,
        _ => ACCOUNT,
    }
}

/// True when `path` is `base` itself or sits below it.
pub fn is_within(path: &str, base: &str) -> bool {
    match path.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || base.ends_with('/'),
        None => false,
    }
}

/// Paths on which a still-loading session shows a placeholder instead of content.
pub fn is_watched_while_loading(path: &str) -> bool {
    path == ROOT || path == AUTH || is_within(path, ADMIN_PORTAL) || is_within(path, BAKER_PORTAL)
}

/// RouteClass
///
/// Classification of a path relative to a role, evaluated on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum RouteClass {
    Public,
    Verification,
    CheckoutExempt,
    OrderDetailExempt,
    RedirectExempt,
    RoleTarget,
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    /// Plain string prefix: `/checkout` also covers `/checkout-success`.
    Prefix(String),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => path == p,
            PathPattern::Prefix(p) => path.starts_with(p.as_str()),
        }
    }
}

/// RouteRule
///
/// One declared route. `redirect_exempt` marks flows that must stay reachable
/// whatever the caller's role, so the Landing Redirector leaves them alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub pattern: PathPattern,
    pub class: RouteClass,
    pub redirect_exempt: bool,
}

/// RouteTable
///
/// Declarative route attributes consulted by the classifier. Rules are checked
/// in order; the role's own landing subtree is checked after all declared rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl Default for RouteTable {
    fn default() -> Self {
        let rule = |pattern, class, redirect_exempt| RouteRule {
            pattern,
            class,
            redirect_exempt,
        };
        Self {
            rules: vec![
                rule(PathPattern::Exact(ROOT.into()), RouteClass::Public, false),
                rule(PathPattern::Exact(AUTH.into()), RouteClass::Public, false),
                rule(
                    PathPattern::Exact(VERIFICATION.into()),
                    RouteClass::Verification,
                    false,
                ),
                rule(
                    PathPattern::Prefix("/checkout".into()),
                    RouteClass::CheckoutExempt,
                    true,
                ),
                rule(
                    PathPattern::Prefix("/cart".into()),
                    RouteClass::CheckoutExempt,
                    true,
                ),
                rule(
                    PathPattern::Prefix("/orders/".into()),
                    RouteClass::OrderDetailExempt,
                    true,
                ),
            ],
        }
    }
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Default table plus operator-declared exempt prefixes. Blank entries are skipped.
    pub fn with_exempt_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::default();
        for prefix in prefixes {
            let prefix = prefix.as_ref().trim();
            if prefix.is_empty() {
                continue;
            }
            table.rules.push(RouteRule {
                pattern: PathPattern::Prefix(prefix.to_string()),
                class: RouteClass::RedirectExempt,
                redirect_exempt: true,
            });
        }
        table
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn classify(&self, path: &str, role: Option<Role>) -> RouteClass {
        if let Some(rule) = self.rules.iter().find(|r| r.pattern.matches(path)) {
            return rule.class;
        }
        if role.is_some() && is_within(path, landing_path(role)) {
            return RouteClass::RoleTarget;
        }
        RouteClass::Unclassified
    }

    pub fn is_redirect_exempt(&self, path: &str) -> bool {
        self.rules
            .iter()
            .any(|r| r.redirect_exempt && r.pattern.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_paths_per_role() {
        assert_eq!(landing_path(Some(Role::Admin)), "/admin-portal");
        assert_eq!(landing_path(Some(Role::Baker)), "/baker-portal");
        assert_eq!(landing_path(Some(Role::User)), "/account");
        assert_eq!(landing_path(None), "/account");
    }

    #[test]
    fn is_within_respects_segment_boundaries() {
        assert!(is_within("/account", "/account"));
        assert!(is_within("/account/orders", "/account"));
        assert!(!is_within("/accounting", "/account"));
        assert!(!is_within("/", "/account"));
    }

    #[test]
    fn classifies_default_table() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/", None), RouteClass::Public);
        assert_eq!(table.classify("/auth", None), RouteClass::Public);
        assert_eq!(
            table.classify("/email-verification-required", Some(Role::User)),
            RouteClass::Verification
        );
        assert_eq!(
            table.classify("/checkout/customize", Some(Role::Baker)),
            RouteClass::CheckoutExempt
        );
        assert_eq!(table.classify("/cart", None), RouteClass::CheckoutExempt);
        assert_eq!(
            table.classify("/orders/42", Some(Role::User)),
            RouteClass::OrderDetailExempt
        );
        assert_eq!(
            table.classify("/baker-portal/available-orders", Some(Role::Baker)),
            RouteClass::RoleTarget
        );
        assert_eq!(
            table.classify("/baker-portal/available-orders", Some(Role::User)),
            RouteClass::Unclassified
        );
        assert_eq!(table.classify("/account", None), RouteClass::Unclassified);
    }

    #[test]
    fn orders_index_is_not_order_detail() {
        let table = RouteTable::default();
        assert!(!table.is_redirect_exempt("/orders"));
        assert!(table.is_redirect_exempt("/orders/7f1c"));
    }

    #[test]
    fn declared_prefixes_become_exempt() {
        let table = RouteTable::with_exempt_prefixes(["/gift-cards", " ", "/track"]);
        assert_eq!(table.rules().len(), RouteTable::default().rules().len() + 2);
        assert!(table.is_redirect_exempt("/gift-cards/redeem"));
        assert_eq!(
            table.classify("/track/abc", Some(Role::User)),
            RouteClass::RedirectExempt
        );
        assert!(!table.is_redirect_exempt("/products"));
    }

    #[test]
    fn loading_watch_list() {
        assert!(is_watched_while_loading("/"));
        assert!(is_watched_while_loading("/auth"));
        assert!(is_watched_while_loading("/admin-portal/users"));
        assert!(is_watched_while_loading("/baker-portal"));
        assert!(!is_watched_while_loading("/account"));
        assert!(!is_watched_while_loading("/checkout"));
    }
}
