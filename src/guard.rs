//! Route access decisions.
//!
//! Recomputed on every request from the current session snapshot; nothing
//! is cached between navigations.

use crate::backend::Identity;
use crate::models::Profile;
use crate::session::SessionSnapshot;

/// Where signed-out visitors are sent.
pub const SIGN_IN_PAGE: &str = "/auth";

/// Default page for signed-in users.
pub const LANDING_PAGE: &str = "/dashboard";

/// Access requirement of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Only for visitors who are not signed in
    PublicOnly,
    AuthRequired,
    /// Signed in with an authority profile
    AdminRequired,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GuardInput<'a> {
    pub loading: bool,
    pub identity: Option<&'a Identity>,
    pub profile: Option<&'a Profile>,
}

impl<'a> From<&'a SessionSnapshot> for GuardInput<'a> {
    fn from(snapshot: &'a SessionSnapshot) -> Self {
        Self {
            loading: snapshot.is_loading(),
            identity: snapshot.identity(),
            profile: snapshot.profile.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving: show a placeholder, never redirect
    Loading,
    Redirect(&'static str),
    Render,
}

/// Decide what to do with a navigation to a page requiring `access`.
///
/// Loading is checked first so nobody is redirected before the session
/// resolves.
pub fn decide(input: GuardInput<'_>, access: Access) -> GuardDecision {
    if input.loading {
        return GuardDecision::Loading;
    }

    let signed_in = input.identity.is_some();
    let authority = input.profile.is_some_and(Profile::is_authority);

    match access {
        Access::AuthRequired if !signed_in => GuardDecision::Redirect(SIGN_IN_PAGE),
        Access::AdminRequired if !signed_in || !authority => GuardDecision::Redirect(LANDING_PAGE),
        Access::PublicOnly if signed_in => GuardDecision::Redirect(LANDING_PAGE),
        _ => GuardDecision::Render,
    }
}
