//! Persistence: the store contract and its flat-JSON-file implementation.
//!
//! The contract returns typed outcomes rather than booleans — a create is
//! [`Created`], a [`Conflict`] or [`Invalid`](Created::Invalid) with the
//! field violations; updates and deletes distinguish `NotFound` from
//! success. Store-level failures (I/O, corrupt file) surface as
//! [`StoreError`] and end up as a 500 at the dispatch boundary.
//!
//! [`JsonFileStore`] keeps the whole collection in one pretty-printed
//! JSON file keyed by id, loaded at construction and rewritten after
//! every mutation. It reads and writes through the `realtor-http`
//! [`Stream`], opened `c+`-style so a missing file starts as an empty
//! collection.

use crate::controller::ControllerError;
use crate::entities::{Entity, Violation};
use rand::Rng;
use realtor_http::protocol::{Mode, Stream, StreamError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stream error: {source}")]
    Stream {
        #[from]
        source: StreamError,
    },

    #[error("corrupt store file: {source}")]
    Corrupt {
        #[from]
        source: serde_json::Error,
    },
}

impl From<StoreError> for ControllerError {
    fn from(cause: StoreError) -> Self {
        ControllerError::upstream(cause)
    }
}

/// Outcome of a create.
#[derive(Debug, PartialEq, Eq)]
pub enum Created {
    /// Stored under this id.
    Created(String),
    /// The id is already taken.
    Conflict,
    /// The entity failed validation.
    Invalid(Vec<Violation>),
}

/// Outcome of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Updated {
    Updated,
    NotFound,
}

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deleted {
    Deleted,
    NotFound,
}

/// The per-entity persistence contract consumed by controllers.
pub trait Store<E: Entity> {
    fn get(&self, id: &str) -> Result<Option<E>, StoreError>;

    /// A page of entities with their ids, in stable id order.
    fn list(&self, limit: usize, offset: usize) -> Result<Vec<(String, E)>, StoreError>;

    fn count(&self) -> usize;

    /// Validates and stores. `id` is the natural key when the entity has
    /// one; `None` asks the store to generate an id.
    fn create(&mut self, id: Option<&str>, entity: E) -> Result<Created, StoreError>;

    fn update(&mut self, id: &str, entity: E) -> Result<Updated, StoreError>;

    fn delete(&mut self, id: &str) -> Result<Deleted, StoreError>;
}

/// One JSON file holding a `{id: entity}` collection.
#[derive(Debug)]
pub struct JsonFileStore<E> {
    path: PathBuf,
    items: BTreeMap<String, E>,
}

impl<E: Entity> JsonFileStore<E> {
    /// Loads the collection, creating an empty file when none exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let mut file = Stream::open(&path, Mode::CreatePlus)?;
        let contents = file.full_string();
        file.close();

        let items = if contents.is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&contents)?
        };

        debug!(path = %path.display(), "opened json store");
        Ok(Self { path, items })
    }

    fn save(&self) -> Result<(), StoreError> {
        let encoded = serde_json::to_string_pretty(&self.items)?;

        let mut file = Stream::open(&self.path, Mode::WritePlus)?;
        file.write(encoded.as_bytes())?;
        file.close();

        Ok(())
    }
}

impl<E: Entity> Store<E> for JsonFileStore<E> {
    fn get(&self, id: &str) -> Result<Option<E>, StoreError> {
        Ok(self.items.get(id).cloned())
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<(String, E)>, StoreError> {
        Ok(self
            .items
            .iter()
            .skip(offset)
            .take(limit)
            .map(|(id, entity)| (id.clone(), entity.clone()))
            .collect())
    }

    fn count(&self) -> usize {
        self.items.len()
    }

    fn create(&mut self, id: Option<&str>, entity: E) -> Result<Created, StoreError> {
        let violations = entity.validate();
        if !violations.is_empty() {
            return Ok(Created::Invalid(violations));
        }

        let id = match id {
            Some(id) => {
                if self.items.contains_key(id) {
                    return Ok(Created::Conflict);
                }
                id.to_string()
            }
            None => unique_id(),
        };

        self.items.insert(id.clone(), entity);
        self.save()?;
        Ok(Created::Created(id))
    }

    fn update(&mut self, id: &str, entity: E) -> Result<Updated, StoreError> {
        if !self.items.contains_key(id) {
            return Ok(Updated::NotFound);
        }

        self.items.insert(id.to_string(), entity);
        self.save()?;
        Ok(Updated::Updated)
    }

    fn delete(&mut self, id: &str) -> Result<Deleted, StoreError> {
        if self.items.remove(id).is_none() {
            return Ok(Deleted::NotFound);
        }

        self.save()?;
        Ok(Deleted::Deleted)
    }
}

/// A 32-character hex id for entities without a natural key.
pub fn unique_id() -> String {
    format!("{:032x}", rand::thread_rng().r#gen::<u128>())
}
