//! Property listings: public reads, privileged writes, image uploads.

use crate::auth::{Authenticator, Scope};
use crate::config::Config;
use crate::controller::{Context, Controller, ControllerError, Dispatch};
use crate::entities::{Property, map_embed_url};
use crate::repository::{Created, Deleted, Store, Updated, unique_id};
use realtor_http::protocol::{Response, ServerRequest};
use serde_json::{Map, Value, json};
use std::cell::RefCell;
use std::rc::Rc;

/// Scopes allowed to change listings.
const WRITE_SCOPES: &[Scope] = &[Scope::Admin, Scope::Superadmin];

/// Client media types accepted for listing images, with the extension the
/// stored file gets. The reported type is untrusted; this is a
/// first-line whitelist, not a content check.
const IMAGE_TYPES: &[(&str, &str)] = &[("image/jpeg", ".jpg"), ("image/png", ".png"), ("image/gif", ".gif")];

pub struct PropertiesController {
    ctx: Context,
    properties: Rc<RefCell<dyn Store<Property>>>,
    auth: Rc<RefCell<dyn Authenticator>>,
    config: Config,
}

impl PropertiesController {
    pub fn new(
        request: ServerRequest,
        response: Response,
        properties: Rc<RefCell<dyn Store<Property>>>,
        auth: Rc<RefCell<dyn Authenticator>>,
        config: Config,
    ) -> Self {
        Self { ctx: Context::new(request, response), properties, auth, config }
    }

    fn get_property(&mut self) -> Result<Response, ControllerError> {
        let Some(id) = self.ctx.param("id") else {
            return Ok(self.ctx.status(400));
        };

        match self.properties.borrow().get(&id)? {
            Some(property) => self.ctx.json(serde_json::to_value(property)?, 200),
            None => Ok(self.ctx.status(404)),
        }
    }

    /// Public paginated listing: `?page=N`, page size from the config.
    fn get_properties(&mut self) -> Result<Response, ControllerError> {
        let page: usize = self
            .ctx
            .request()
            .query_params()
            .get("page")
            .and_then(Value::as_str)
            .and_then(|page| page.parse().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1);

        let limit = self.config.page_limit;
        let offset = (page - 1) * limit;

        let (total, page_items) = {
            let store = self.properties.borrow();
            (store.count(), store.list(limit, offset)?)
        };

        let mut items = Map::new();
        for (id, property) in page_items {
            items.insert(id, serde_json::to_value(property)?);
        }

        self.ctx.json(json!({ "total": total, "page": page, "items": items }), 200)
    }

    /// Creates a listing from the body fields and the uploaded images.
    /// Image files are placed on disk only after the store accepts the
    /// entity, matching the order of the original flow.
    fn create_property(&mut self) -> Result<Response, ControllerError> {
        if !self.auth.borrow().has_capability(WRITE_SCOPES) {
            return Ok(self.ctx.status(403));
        }

        let Some(body) = self.ctx.body_value() else {
            return Ok(self.ctx.status(400));
        };

        if self.ctx.request().uploaded_files().is_empty() {
            return Ok(self.ctx.status(400));
        }

        // Whitelist every upload before touching anything.
        let media_types: Vec<String> =
            self.ctx.request().uploaded_files().iter().map(|file| file.client_media_type().to_string()).collect();

        let mut stored_names = Vec::new();
        for media_type in media_types {
            match IMAGE_TYPES.iter().find(|(accepted, _)| *accepted == media_type) {
                Some((_, extension)) => stored_names.push(format!("{}{}", unique_id(), extension)),
                None => return self.ctx.text(&media_type, 415),
            }
        }

        let Ok(mut property) = serde_json::from_value::<Property>(body) else {
            return Ok(self.ctx.status(400));
        };

        property.images =
            stored_names.iter().map(|name| format!("{}/{}", self.config.image_web_root, name)).collect();
        property.map = map_embed_url(&property, &self.config.maps_key);

        let created = self.properties.borrow_mut().create(None, property)?;
        match created {
            Created::Created(id) => {
                for (file, name) in self.ctx.request_mut().uploaded_files_mut().iter_mut().zip(&stored_names) {
                    file.move_to(self.config.image_dir.join(name)).map_err(ControllerError::upstream)?;
                }

                self.ctx.json(json!({ "id": id }), 201)
            }
            Created::Conflict => Ok(self.ctx.status(409)),
            Created::Invalid(violations) => self.ctx.json(json!({ "violations": violations }), 400),
        }
    }

    fn update_property(&mut self) -> Result<Response, ControllerError> {
        if !self.auth.borrow().has_capability(WRITE_SCOPES) {
            return Ok(self.ctx.status(403));
        }

        let Some(id) = self.ctx.param("id") else {
            return Ok(self.ctx.status(400));
        };
        let Some(body) = self.ctx.body_value() else {
            return Ok(self.ctx.status(400));
        };
        let Ok(property) = serde_json::from_value::<Property>(body) else {
            return Ok(self.ctx.status(400));
        };

        match self.properties.borrow_mut().update(&id, property)? {
            Updated::Updated => Ok(self.ctx.status(204)),
            Updated::NotFound => Ok(self.ctx.status(404)),
        }
    }

    fn delete_property(&mut self) -> Result<Response, ControllerError> {
        if !self.auth.borrow().has_capability(WRITE_SCOPES) {
            return Ok(self.ctx.status(403));
        }

        let Some(id) = self.ctx.param("id") else {
            return Ok(self.ctx.status(400));
        };

        match self.properties.borrow_mut().delete(&id)? {
            Deleted::Deleted => Ok(self.ctx.status(204)),
            Deleted::NotFound => Ok(self.ctx.status(404)),
        }
    }
}

impl Controller for PropertiesController {
    fn bind(&mut self, request: ServerRequest, response: Response) {
        self.ctx.bind(request, response);
    }

    fn dispatch(&mut self, action: &str) -> Dispatch {
        match action {
            "get_property" => self.get_property().into(),
            "get_properties" => self.get_properties().into(),
            "create_property" => self.create_property().into(),
            "update_property" => self.update_property().into(),
            "delete_property" => self.delete_property().into(),
            _ => Dispatch::UnknownAction,
        }
    }
}
