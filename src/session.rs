//! The session entity and its serialized record form.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use http::Extensions;
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};

use crate::{
    error::{AttributeMissingError, EntropyError, SerializationError},
    path,
};

/// Reserved data key under which one generation of flash entries is stored.
pub(crate) const FLASH_KEY: &str = "_flashes";

/// Entropy carried by a session identifier, before hex encoding.
const ID_ENTROPY_BYTES: usize = 16;

/// The serialized form of a session as it is written to a backend or packed
/// into a cookie, before any encryption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(with = "time::serde::timestamp")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub last_modified: OffsetDateTime,
    pub data: Map<String, Value>,
}

#[derive(Debug)]
struct Inner {
    id: String,
    data: Map<String, Value>,
    started_at: OffsetDateTime,
    last_modified: OffsetDateTime,
    destroyed: bool,
    /// Flashes loaded from the previous request cycle; consumed on read.
    current_flashes: Map<String, Value>,
    /// Flashes staged during this request; visible starting next cycle.
    next_flashes: Map<String, Value>,
    modified: bool,
}

/// One client's session state for the duration of a request.
///
/// `Session` is a cheap handle: clones share the same state, which is how the
/// middleware exposes it through request extensions while still observing
/// handler mutations afterwards. An empty id means the session has never been
/// persisted; an id is minted lazily on first store.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

impl Session {
    /// A fresh, unsaved session: empty id, empty data, timestamps of now.
    pub fn create() -> Self {
        let now = OffsetDateTime::now_utc();
        Self::from_parts(String::new(), Map::new(), now, now, false)
    }

    /// A fresh session with a newly minted random id.
    pub fn generate() -> Result<Self, EntropyError> {
        let now = OffsetDateTime::now_utc();
        Ok(Self::from_parts(random_id()?, Map::new(), now, now, false))
    }

    /// Rehydrates a session from its stored record.
    ///
    /// Any flash generation stored under [`FLASH_KEY`] is lifted out of the
    /// data map into the consumable set. A non-empty set marks the session
    /// modified so the sweep gets persisted even on a read-only request.
    pub fn from_record(record: Record) -> Self {
        let Record {
            id,
            started_at,
            last_modified,
            mut data,
        } = record;
        // Uphold lastModified >= startedAt even for records mutated out of band.
        let last_modified = last_modified.max(started_at);
        let session = Self::from_parts(id, Map::new(), started_at, last_modified, false);
        {
            let mut inner = session.lock();
            if let Some(Value::Object(flashes)) = data.remove(FLASH_KEY)
                && !flashes.is_empty()
            {
                inner.current_flashes = flashes;
                inner.modified = true;
            }
            inner.data = data;
        }
        session
    }

    fn from_parts(
        id: String,
        data: Map<String, Value>,
        started_at: OffsetDateTime,
        last_modified: OffsetDateTime,
        destroyed: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                id,
                data,
                started_at,
                last_modified,
                destroyed,
                current_flashes: Map::new(),
                next_flashes: Map::new(),
                modified: false,
            })),
        }
    }

    /// The session found in `extensions`, or [`AttributeMissingError`] if the
    /// middleware was never run for this request.
    pub fn from_extensions(extensions: &Extensions) -> Result<Self, AttributeMissingError> {
        extensions
            .get::<Session>()
            .cloned()
            .ok_or(AttributeMissingError)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The session identifier; empty until the session is first persisted.
    pub fn id(&self) -> String {
        self.lock().id.clone()
    }

    /// True while no id has been assigned.
    pub fn is_new(&self) -> bool {
        self.lock().id.is_empty()
    }

    pub(crate) fn set_id(&self, id: String) {
        self.lock().id = id;
    }

    /// Dotted-path lookup. A miss in permanent data falls back to an unread
    /// flash entry under the same path, consuming it.
    pub fn get(&self, path: &str) -> Option<Value> {
        let mut inner = self.lock();
        if let Some(value) = path::get_path(&inner.data, path) {
            return Some(value.clone());
        }
        let flashed = path::unset_path(&mut inner.current_flashes, path);
        if flashed.is_some() {
            inner.touch();
        }
        flashed
    }

    /// Like [`Session::get`], returning `default` when the path is absent.
    pub fn get_or(&self, path: &str, default: Value) -> Value {
        self.get(path).unwrap_or(default)
    }

    /// Typed lookup through serde.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, SerializationError> {
        match self.get(path) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Dotted-path assignment, creating intermediate containers as needed.
    pub fn set(&self, path: &str, value: impl Serialize) -> Result<(), SerializationError> {
        let value = serde_json::to_value(value)?;
        let mut inner = self.lock();
        path::set_path(&mut inner.data, path, value);
        inner.touch();
        Ok(())
    }

    /// Removes the value at `path`, returning it. Removing a missing path is
    /// a no-op, not an error.
    pub fn remove(&self, path: &str) -> Option<Value> {
        let mut inner = self.lock();
        let removed = path::unset_path(&mut inner.data, path);
        if removed.is_some() {
            inner.touch();
        }
        removed
    }

    /// True if `path` is present in permanent data or in unread flash data.
    pub fn has(&self, path: &str) -> bool {
        let inner = self.lock();
        path::get_path(&inner.data, path).is_some()
            || path::get_path(&inner.current_flashes, path).is_some()
    }

    /// Stages a one-shot value, visible starting the next request cycle.
    pub fn flash(&self, key: &str, value: impl Serialize) -> Result<(), SerializationError> {
        let value = serde_json::to_value(value)?;
        let mut inner = self.lock();
        inner.next_flashes.insert(key.to_owned(), value);
        inner.touch();
        Ok(())
    }

    /// A snapshot of the permanent data, flash generations excluded.
    pub fn all(&self) -> Map<String, Value> {
        self.lock().data.clone()
    }

    /// Assigns a brand-new random id, preserving all data.
    ///
    /// Must be called on every authentication-state transition (login and
    /// logout) to defeat session fixation.
    pub fn regenerate(&self) -> Result<(), EntropyError> {
        let id = random_id()?;
        let mut inner = self.lock();
        inner.id = id;
        inner.touch();
        Ok(())
    }

    /// Marks the session destroyed. Terminal: the session is never again
    /// persisted as live data.
    pub fn destroy(&self) {
        let mut inner = self.lock();
        inner.destroyed = true;
        inner.touch();
    }

    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    pub fn started_at(&self) -> OffsetDateTime {
        self.lock().started_at
    }

    pub fn last_modified(&self) -> OffsetDateTime {
        self.lock().last_modified
    }

    /// True iff `last_modified + ttl` is in the past. Written as a
    /// subtraction so an out-of-band record with an extreme timestamp cannot
    /// overflow the datetime range.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        OffsetDateTime::now_utc() - self.lock().last_modified > ttl
    }

    /// True if any observable mutation happened since construction, including
    /// flash consumption and the sweep of a loaded flash generation.
    pub fn is_modified(&self) -> bool {
        self.lock().modified
    }

    /// The record to persist. Staged flashes become the stored generation;
    /// the consumable generation is dropped, read or not.
    pub fn to_record(&self) -> Record {
        let inner = self.lock();
        let mut data = inner.data.clone();
        if !inner.next_flashes.is_empty() {
            data.insert(FLASH_KEY.to_owned(), Value::Object(inner.next_flashes.clone()));
        }
        Record {
            id: inner.id.clone(),
            started_at: inner.started_at,
            last_modified: inner.last_modified,
            data,
        }
    }
}

impl Inner {
    fn touch(&mut self) {
        self.last_modified = OffsetDateTime::now_utc().max(self.started_at);
        self.modified = true;
    }
}

/// 16 bytes from the OS random source, hex encoded.
pub(crate) fn random_id() -> Result<String, EntropyError> {
    let mut bytes = [0u8; ID_ENTROPY_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(EntropyError)?;
    Ok(hex::encode(bytes))
}
