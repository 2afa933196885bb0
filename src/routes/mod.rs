/// Router Module Index
///
/// One module per access tier. Each tier's router is wrapped in the matching
/// route guard layer in `create_router`, so a handler is never reached by a
/// caller the tier does not admit.

/// Routes open to anonymous callers: health, session view, landing decisions.
pub mod public;

/// Customer tier (`user`, which every signed-in role satisfies), plus the
/// account home that only needs a verified session.
pub mod account;

/// Baker portal. Admins pass as well.
pub mod baker;

/// Admin portal.
pub mod admin;
