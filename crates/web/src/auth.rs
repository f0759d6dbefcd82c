//! Session-backed authentication.
//!
//! There is no process-global session here: a [`Session`] is an explicit
//! value owned by the [`SessionAuth`] collaborator, which is constructed
//! per application run and shared with the controllers that need it.
//! Controllers consult the [`Authenticator`] trait read-only before their
//! dispatch decisions; only the sign-in/sign-out endpoints mutate it.

use crate::entities::User;
use crate::repository::{Store, StoreError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::info;

/// The scopes a principal can hold. A scope names a capability level, not
/// a permission list — controllers check against the scopes they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Normal,
    Realtor,
    Admin,
    Superadmin,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Normal => "normal",
            Scope::Realtor => "realtor",
            Scope::Admin => "admin",
            Scope::Superadmin => "superadmin",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in identity: an id (the user's email) and the scopes it
/// holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub scopes: Vec<Scope>,
}

/// Explicit per-run session state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    principal: Option<Principal>,
}

impl Session {
    pub fn establish(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    pub fn clear(&mut self) {
        self.principal = None;
    }

    pub fn is_verified(&self) -> bool {
        self.principal.is_some()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

/// What controllers ask before privileged actions.
#[cfg_attr(test, mockall::automock)]
pub trait Authenticator {
    fn is_signed_in(&self) -> bool;

    /// Whether the signed-in principal holds at least one of the given
    /// scopes. Always false when nobody is signed in.
    fn has_capability(&self, scopes: &[Scope]) -> bool;

    fn current_principal(&self) -> Option<Principal>;

    /// Whether the signed-in principal is exactly this id — used to let a
    /// user at their own record without a privileged scope.
    fn is_principal(&self, id: &str) -> bool;

    /// Verifies credentials against the user store and establishes the
    /// session on success.
    fn sign_in(&mut self, email: &str, password: &str) -> Result<bool, StoreError>;

    fn sign_out(&mut self);
}

/// The concrete authenticator: a session plus the user store the
/// credentials live in.
pub struct SessionAuth {
    session: Session,
    users: Rc<RefCell<dyn Store<User>>>,
}

impl SessionAuth {
    pub fn new(users: Rc<RefCell<dyn Store<User>>>) -> Self {
        Self { session: Session::default(), users }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl Authenticator for SessionAuth {
    fn is_signed_in(&self) -> bool {
        self.session.is_verified()
    }

    fn has_capability(&self, scopes: &[Scope]) -> bool {
        let Some(principal) = self.session.principal() else {
            return false;
        };

        scopes.iter().any(|scope| principal.scopes.contains(scope))
    }

    fn current_principal(&self) -> Option<Principal> {
        self.session.principal().cloned()
    }

    fn is_principal(&self, id: &str) -> bool {
        self.session.principal().is_some_and(|principal| principal.id == id)
    }

    fn sign_in(&mut self, email: &str, password: &str) -> Result<bool, StoreError> {
        let Some(user) = self.users.borrow().get(email)? else {
            return Ok(false);
        };

        // Emails compare case-insensitively; passwords verbatim.
        if !email.eq_ignore_ascii_case(&user.email) || password != user.password {
            return Ok(false);
        }

        let id = user.email.to_ascii_lowercase();
        info!(user = %id, "sign in");
        self.session.establish(Principal { id, scopes: vec![user.role] });
        Ok(true)
    }

    fn sign_out(&mut self) {
        if let Some(principal) = self.session.principal() {
            info!(user = %principal.id, "sign out");
        }
        self.session.clear();
    }
}
