use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::models::Role;

/// is_allowed
///
/// Tiered capability check. Admin holds every baker capability and every
/// signed-in role holds the user capability; the relation is not symmetric.
/// Total over every pair and denies whenever the role is absent.
pub fn is_allowed(role: Option<Role>, required: Role) -> bool {
    let Some(role) = role else {
        return false;
    };
    match required {
        Role::Admin => role == Role::Admin,
        Role::Baker => matches!(role, Role::Baker | Role::Admin),
        Role::User => true,
    }
}

/// Feature
///
/// Named capabilities checked by portal handlers and reported to the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Feature {
    UserManagement,
    OrderManagement,
    ProfileEdit,
    OrderHistory,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::UserManagement,
        Feature::OrderManagement,
        Feature::ProfileEdit,
        Feature::OrderHistory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Feature::UserManagement => "user-management",
            Feature::OrderManagement => "order-management",
            Feature::ProfileEdit => "profile-edit",
            Feature::OrderHistory => "order-history",
        }
    }

    /// Looks a feature up by its wire name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// permitted_roles
///
/// The static feature table. Adding a `Feature` variant without a row here is a
/// compile error.
pub fn permitted_roles(feature: Feature) -> &'static [Role] {
    match feature {
        Feature::UserManagement => &[Role::Admin],
        Feature::OrderManagement => &[Role::Admin, Role::Baker],
        Feature::ProfileEdit => &[Role::User, Role::Baker, Role::Admin],
        Feature::OrderHistory => &[Role::User, Role::Baker, Role::Admin],
    }
}

pub fn has_access(role: Option<Role>, feature: Feature) -> bool {
    role.is_some_and(|r| permitted_roles(feature).contains(&r))
}

/// has_access_named
///
/// String entry point used at the HTTP edge. An unknown feature name has an
/// empty permitted set, so it denies every role.
pub fn has_access_named(role: Option<Role>, name: &str) -> bool {
    Feature::parse(name).is_some_and(|f| has_access(role, f))
}

/// Every feature the role holds, in table order.
pub fn features_for(role: Option<Role>) -> Vec<Feature> {
    Feature::ALL
        .into_iter()
        .filter(|f| has_access(role, *f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_allowed_is_total_and_tiered() {
        let roles = [None, Some(Role::User), Some(Role::Baker), Some(Role::Admin)];
        let expected = [
            // required: admin, baker, user
            [false, false, false],
            [false, false, true],
            [false, true, true],
            [true, true, true],
        ];

        for (role, row) in roles.iter().zip(expected) {
            for (required, want) in [Role::Admin, Role::Baker, Role::User].into_iter().zip(row) {
                assert_eq!(
                    is_allowed(*role, required),
                    want,
                    "is_allowed({role:?}, {required:?})"
                );
            }
        }
    }

    #[test]
    fn admin_is_superset_of_baker_but_not_the_reverse() {
        assert!(is_allowed(Some(Role::Admin), Role::Baker));
        assert!(!is_allowed(Some(Role::Baker), Role::Admin));
    }

    #[test]
    fn feature_table_matches_portal_tiers() {
        assert!(has_access(Some(Role::Admin), Feature::UserManagement));
        assert!(!has_access(Some(Role::Baker), Feature::UserManagement));
        assert!(has_access(Some(Role::Baker), Feature::OrderManagement));
        assert!(!has_access(Some(Role::User), Feature::OrderManagement));
        assert!(has_access(Some(Role::User), Feature::ProfileEdit));
        assert!(!has_access(None, Feature::ProfileEdit));
    }

    #[test]
    fn unknown_feature_names_deny() {
        assert!(has_access_named(Some(Role::Admin), "user-management"));
        assert!(!has_access_named(Some(Role::Admin), "recipe-secrets"));
        assert!(!has_access_named(Some(Role::Admin), ""));
    }

    #[test]
    fn features_for_lists_in_table_order() {
        assert_eq!(
            features_for(Some(Role::Baker)),
            vec![
                Feature::OrderManagement,
                Feature::ProfileEdit,
                Feature::OrderHistory
            ]
        );
        assert!(features_for(None).is_empty());
    }
}
