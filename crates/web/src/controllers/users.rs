//! User accounts: CRUD plus the sign-in/sign-out endpoints.

use crate::auth::{Authenticator, Scope};
use crate::controller::{Context, Controller, ControllerError, Dispatch};
use crate::controllers::body_str;
use crate::entities::User;
use crate::repository::{Created, Deleted, Store, Updated};
use realtor_http::protocol::{Response, ServerRequest};
use serde_json::{Map, Value, json};
use std::cell::RefCell;
use std::rc::Rc;

/// Scopes allowed to administer other users' records.
const ADMIN_SCOPES: &[Scope] = &[Scope::Admin, Scope::Superadmin];

pub struct UsersController {
    ctx: Context,
    users: Rc<RefCell<dyn Store<User>>>,
    auth: Rc<RefCell<dyn Authenticator>>,
}

impl UsersController {
    pub fn new(
        request: ServerRequest,
        response: Response,
        users: Rc<RefCell<dyn Store<User>>>,
        auth: Rc<RefCell<dyn Authenticator>>,
    ) -> Self {
        Self { ctx: Context::new(request, response), users, auth }
    }

    /// Admins can fetch anyone; everyone can fetch their own record.
    /// Passwords never leave the store.
    fn get_user(&mut self) -> Result<Response, ControllerError> {
        let Some(id) = self.ctx.param("id") else {
            return Ok(self.ctx.status(400));
        };

        let allowed = {
            let auth = self.auth.borrow();
            auth.has_capability(ADMIN_SCOPES) || auth.is_principal(&id)
        };
        if !allowed {
            return Ok(self.ctx.status(403));
        }

        match self.users.borrow().get(&id)? {
            Some(user) => self.ctx.json(public_view(&user), 200),
            None => Ok(self.ctx.status(404)),
        }
    }

    fn get_users(&mut self) -> Result<Response, ControllerError> {
        if !self.auth.borrow().has_capability(ADMIN_SCOPES) {
            return Ok(self.ctx.status(403));
        }

        let mut listing = Map::new();
        for (id, user) in self.users.borrow().list(usize::MAX, 0)? {
            listing.insert(id, public_view(&user));
        }

        self.ctx.json(Value::Object(listing), 200)
    }

    /// Open registration. The role is always forced to `normal` — scope
    /// escalation happens elsewhere or not at all.
    fn create_user(&mut self) -> Result<Response, ControllerError> {
        let Some(body) = self.ctx.body_value() else {
            return Ok(self.ctx.status(400));
        };

        let (Some(name), Some(email), Some(password)) =
            (body_str(&body, "name"), body_str(&body, "email"), body_str(&body, "password"))
        else {
            return Ok(self.ctx.status(400));
        };

        let user = User { name, email: email.clone(), password, role: Scope::Normal };

        match self.users.borrow_mut().create(Some(&email), user)? {
            Created::Created(_) => Ok(self.ctx.status(201)),
            Created::Conflict => Ok(self.ctx.status(409)),
            Created::Invalid(violations) => self.ctx.json(json!({ "violations": violations }), 400),
        }
    }

    fn update_user(&mut self) -> Result<Response, ControllerError> {
        if !self.auth.borrow().has_capability(ADMIN_SCOPES) {
            return Ok(self.ctx.status(403));
        }

        let Some(id) = self.ctx.param("id") else {
            return Ok(self.ctx.status(400));
        };
        let Some(body) = self.ctx.body_value() else {
            return Ok(self.ctx.status(400));
        };
        let Ok(user) = serde_json::from_value::<User>(body) else {
            return Ok(self.ctx.status(400));
        };

        match self.users.borrow_mut().update(&id, user)? {
            Updated::Updated => Ok(self.ctx.status(204)),
            Updated::NotFound => Ok(self.ctx.status(404)),
        }
    }

    /// Deleting your own account also ends your session.
    fn delete_user(&mut self) -> Result<Response, ControllerError> {
        if !self.auth.borrow().has_capability(ADMIN_SCOPES) {
            return Ok(self.ctx.status(403));
        }

        let Some(id) = self.ctx.param("id") else {
            return Ok(self.ctx.status(400));
        };

        match self.users.borrow_mut().delete(&id)? {
            Deleted::Deleted => {
                let mut auth = self.auth.borrow_mut();
                if auth.is_principal(&id) {
                    auth.sign_out();
                }
                drop(auth);

                Ok(self.ctx.status(204))
            }
            Deleted::NotFound => Ok(self.ctx.status(404)),
        }
    }

    fn sign_in(&mut self) -> Result<Response, ControllerError> {
        let body = self.ctx.body_value().unwrap_or(Value::Null);

        let (Some(email), Some(password)) = (body_str(&body, "email"), body_str(&body, "password")) else {
            return self.ctx.json(json!({ "error": "failed to sign in" }), 400);
        };

        if !self.auth.borrow_mut().sign_in(&email, &password)? {
            return self.ctx.json(json!({ "error": "failed to sign in" }), 401);
        }

        let principal = self.auth.borrow().current_principal();
        match principal {
            Some(principal) => {
                let roles: Vec<_> = principal.scopes.iter().map(Scope::as_str).collect();
                self.ctx.json(json!({ "user": principal.id, "roles": roles }), 200)
            }
            None => Ok(self.ctx.status(500)),
        }
    }

    fn sign_out(&mut self) -> Result<Response, ControllerError> {
        self.auth.borrow_mut().sign_out();
        self.ctx.json(json!({ "message": "signed out" }), 200)
    }
}

/// The storable user minus its password.
fn public_view(user: &User) -> Value {
    json!({
        "name": user.name,
        "email": user.email,
        "role": user.role,
    })
}

impl Controller for UsersController {
    fn bind(&mut self, request: ServerRequest, response: Response) {
        self.ctx.bind(request, response);
    }

    fn dispatch(&mut self, action: &str) -> Dispatch {
        match action {
            "get_user" => self.get_user().into(),
            "get_users" => self.get_users().into(),
            "create_user" => self.create_user().into(),
            "update_user" => self.update_user().into(),
            "delete_user" => self.delete_user().into(),
            "sign_in" => self.sign_in().into(),
            "sign_out" => self.sign_out().into(),
            _ => Dispatch::UnknownAction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockAuthenticator;
    use crate::controllers::testing::{MemoryStore, rendered, request_with};
    use realtor_http::protocol::Method;

    fn users_with(emails: &[&str]) -> Rc<RefCell<MemoryStore<User>>> {
        let mut store = MemoryStore::default();
        for email in emails {
            store.items.insert(
                email.to_string(),
                User {
                    name: "Agent".to_string(),
                    email: email.to_string(),
                    password: "secret1".to_string(),
                    role: Scope::Normal,
                },
            );
        }
        Rc::new(RefCell::new(store))
    }

    fn admin_auth() -> MockAuthenticator {
        let mut auth = MockAuthenticator::new();
        auth.expect_has_capability().returning(|scopes| scopes.contains(&Scope::Admin));
        auth.expect_is_principal().return_const(false);
        auth
    }

    fn controller(
        users: Rc<RefCell<MemoryStore<User>>>,
        auth: MockAuthenticator,
        request: ServerRequest,
    ) -> UsersController {
        UsersController::new(request, Response::new(), users, Rc::new(RefCell::new(auth)))
    }

    #[test]
    fn get_user_hides_the_password() {
        let users = users_with(&["a@b.com"]);
        let request = request_with(Method::Get, "/app/users/a@b.com/", json!({"id": "a@b.com"}), None);
        let mut controller = controller(users, admin_auth(), request);

        let (status, body) = rendered(controller.get_user().unwrap());
        assert_eq!(status, 200);
        assert!(body.contains(r#""email":"a@b.com""#));
        assert!(!body.contains("password"));
        assert!(!body.contains("secret1"));
    }

    #[test]
    fn get_user_is_404_when_the_store_says_not_found() {
        let users = users_with(&[]);
        let request = request_with(Method::Get, "/app/users/ghost@x.com/", json!({"id": "ghost@x.com"}), None);
        let mut controller = controller(users, admin_auth(), request);

        let (status, _) = rendered(controller.get_user().unwrap());
        assert_eq!(status, 404);
    }

    #[test]
    fn get_user_allows_fetching_your_own_record() {
        let users = users_with(&["me@x.com"]);

        let mut auth = MockAuthenticator::new();
        auth.expect_has_capability().return_const(false);
        auth.expect_is_principal().returning(|id| id == "me@x.com");

        let request = request_with(Method::Get, "/app/users/me@x.com/", json!({"id": "me@x.com"}), None);
        let mut controller = controller(users, auth, request);

        let (status, _) = rendered(controller.get_user().unwrap());
        assert_eq!(status, 200);
    }

    #[test]
    fn get_user_denies_everyone_else() {
        let users = users_with(&["a@b.com"]);

        let mut auth = MockAuthenticator::new();
        auth.expect_has_capability().return_const(false);
        auth.expect_is_principal().return_const(false);

        let request = request_with(Method::Get, "/app/users/a@b.com/", json!({"id": "a@b.com"}), None);
        let mut controller = controller(users, auth, request);

        let (status, _) = rendered(controller.get_user().unwrap());
        assert_eq!(status, 403);
    }

    #[test]
    fn create_user_forces_the_normal_role() {
        let users = users_with(&[]);
        let request = request_with(
            Method::Post,
            "/app/users/",
            json!({}),
            Some(json!({
                "name": "Newcomer",
                "email": "new@x.com",
                "password": "secret1",
                "role": "superadmin"
            })),
        );
        let mut controller = controller(users.clone(), admin_auth(), request);

        let (status, _) = rendered(controller.create_user().unwrap());
        assert_eq!(status, 201);
        assert_eq!(users.borrow().items["new@x.com"].role, Scope::Normal);
    }

    #[test]
    fn create_user_conflicts_on_a_taken_email() {
        let users = users_with(&["a@b.com"]);
        let request = request_with(
            Method::Post,
            "/app/users/",
            json!({}),
            Some(json!({"name": "Dup", "email": "a@b.com", "password": "secret1"})),
        );
        let mut controller = controller(users, admin_auth(), request);

        let (status, _) = rendered(controller.create_user().unwrap());
        assert_eq!(status, 409);
    }

    #[test]
    fn create_user_reports_violations() {
        let users = users_with(&[]);
        let request = request_with(
            Method::Post,
            "/app/users/",
            json!({}),
            Some(json!({"name": "N", "email": "not-an-email", "password": "x"})),
        );
        let mut controller = controller(users, admin_auth(), request);

        let (status, body) = rendered(controller.create_user().unwrap());
        assert_eq!(status, 400);
        assert!(body.contains("violations"));
        assert!(body.contains("email"));
        assert!(body.contains("password"));
    }

    #[test]
    fn delete_user_signs_out_when_deleting_yourself() {
        let users = users_with(&["me@x.com"]);

        let mut auth = MockAuthenticator::new();
        auth.expect_has_capability().return_const(true);
        auth.expect_is_principal().returning(|id| id == "me@x.com");
        auth.expect_sign_out().times(1).return_const(());

        let request = request_with(Method::Post, "/app/users/delete/me@x.com/", json!({"id": "me@x.com"}), None);
        let mut controller = controller(users.clone(), auth, request);

        let (status, _) = rendered(controller.delete_user().unwrap());
        assert_eq!(status, 204);
        assert!(users.borrow().items.is_empty());
    }

    #[test]
    fn sign_in_round_trip_through_dispatch() {
        let users = users_with(&[]);

        let mut auth = MockAuthenticator::new();
        auth.expect_sign_in().returning(|email, password| Ok(email == "a@b.com" && password == "secret1"));
        auth.expect_current_principal()
            .returning(|| Some(crate::auth::Principal { id: "a@b.com".to_string(), scopes: vec![Scope::Normal] }));

        let request = request_with(
            Method::Post,
            "/app/signin/",
            json!({}),
            Some(json!({"email": "a@b.com", "password": "secret1"})),
        );
        let mut controller = controller(users, auth, request);

        match controller.dispatch("sign_in") {
            Dispatch::Response(response) => {
                let (status, body) = rendered(response);
                assert_eq!(status, 200);
                assert!(body.contains(r#""user":"a@b.com""#));
            }
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[test]
    fn sign_in_rejects_bad_credentials_with_401() {
        let users = users_with(&[]);

        let mut auth = MockAuthenticator::new();
        auth.expect_sign_in().return_once(|_, _| Ok(false));

        let request = request_with(
            Method::Post,
            "/app/signin/",
            json!({}),
            Some(json!({"email": "a@b.com", "password": "wrong"})),
        );
        let mut controller = controller(users, auth, request);

        let (status, body) = rendered(controller.sign_in().unwrap());
        assert_eq!(status, 401);
        assert!(body.contains("error"));
    }

    #[test]
    fn unknown_actions_fall_through() {
        let users = users_with(&[]);
        let request = request_with(Method::Get, "/app/users/", json!({}), None);
        let mut controller = controller(users, admin_auth(), request);

        assert!(matches!(controller.dispatch("not_an_action"), Dispatch::UnknownAction));
    }
}
