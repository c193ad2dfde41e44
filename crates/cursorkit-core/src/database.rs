//! Handles over a [`StoreEngine`]: databases, object stores and indexes.
//!
//! Every data operation returns a [`Request`] right away and does its work in
//! a task on the engine's event loop, the way IndexedDB requests behave.

use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::cursor::{CursorSource, StoreCursor, StoreCursorWithValue};
use crate::direction::Direction;
use crate::engine::{ObjectStoreParams, StoreEngine};
use crate::error::{StoreError, StoreResult};
use crate::event_loop::EventLoop;
use crate::key::{Key, KeyRange};
use crate::request::Request;

/// Queue `work` on the engine's event loop and return the request it settles.
///
/// `Ok(None)` from `work` is the null result. If the connection is closed by
/// the time the task runs, the request fails with `AbortError`.
pub(crate) fn queue_request<T, F>(engine: &Arc<StoreEngine>, op: &'static str, work: F) -> StoreResult<Request<T>>
where
    T: Send + 'static,
    F: FnOnce(&StoreEngine) -> StoreResult<Option<T>> + Send + 'static,
{
    engine.ensure_open()?;
    let request = Request::new();
    let live = request.clone();
    let task_engine = Arc::clone(engine);
    engine.event_loop().queue_task(move || {
        if task_engine.is_closed() {
            live.fail(StoreError::Aborted { reason: format!("{} aborted: database connection was closed", op) });
            return;
        }
        match work(&task_engine) {
            Ok(result) => live.succeed(result),
            Err(error) => live.fail(error),
        }
    });
    tracing::trace!(request = request.id(), op, "queued request");
    Ok(request)
}

/// An open database connection.
#[derive(Debug, Clone)]
pub struct Database {
    engine: Arc<StoreEngine>,
}

impl Database {
    pub fn open(name: &str, config: Config) -> StoreResult<Self> {
        let engine = StoreEngine::new(name, config)?;
        tracing::debug!(db = name, "opened database");
        Ok(Self { engine: Arc::new(engine) })
    }

    pub fn name(&self) -> &str {
        self.engine.name()
    }

    /// Loop every request of this database settles on.
    pub fn event_loop(&self) -> &EventLoop {
        self.engine.event_loop()
    }

    pub fn engine(&self) -> &Arc<StoreEngine> {
        &self.engine
    }

    pub fn create_object_store(&self, name: &str, params: ObjectStoreParams) -> StoreResult<ObjectStore> {
        self.engine.create_object_store(name, params)?;
        Ok(ObjectStore { engine: Arc::clone(&self.engine), name: name.to_string() })
    }

    /// Handle to an existing object store.
    pub fn object_store(&self, name: &str) -> StoreResult<ObjectStore> {
        self.engine.check_source(name, None)?;
        Ok(ObjectStore { engine: Arc::clone(&self.engine), name: name.to_string() })
    }

    pub fn delete_object_store(&self, name: &str) -> StoreResult<()> {
        self.engine.delete_object_store(name)
    }

    pub fn object_store_names(&self) -> Vec<String> {
        self.engine.object_store_names()
    }

    /// Close the connection. Queued work fails with `AbortError`; new work
    /// is refused with `InvalidStateError`.
    pub fn close(&self) {
        self.engine.close();
    }
}

/// Handle to one object store.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    engine: Arc<StoreEngine>,
    name: String,
}

impl ObjectStore {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_path(&self) -> StoreResult<Option<String>> {
        self.engine.key_path(&self.name)
    }

    /// Create an index over existing and future records.
    pub fn create_index(&self, name: &str, key_path: &str, unique: bool) -> StoreResult<Index> {
        self.engine.create_index(&self.name, name, key_path, unique)?;
        Ok(self.index_handle(name))
    }

    pub fn index(&self, name: &str) -> StoreResult<Index> {
        self.engine.check_source(&self.name, Some(name))?;
        Ok(self.index_handle(name))
    }

    fn index_handle(&self, name: &str) -> Index {
        Index { engine: Arc::clone(&self.engine), store: self.name.clone(), name: name.to_string() }
    }

    /// Insert or replace a record. Resolves with its key.
    pub fn put(&self, value: Value, key: Option<Key>) -> StoreResult<Request<Key>> {
        self.write(value, key, true, "put")
    }

    /// Insert a record; fails with `ConstraintError` if the key is taken.
    pub fn add(&self, value: Value, key: Option<Key>) -> StoreResult<Request<Key>> {
        self.write(value, key, false, "add")
    }

    fn write(&self, value: Value, key: Option<Key>, overwrite: bool, op: &'static str) -> StoreResult<Request<Key>> {
        let store = self.name.clone();
        queue_request(&self.engine, op, move |engine| engine.put(&store, value, key, overwrite).map(Some))
    }

    /// Resolves with the record, or the null result if there is none.
    pub fn get(&self, key: Key) -> StoreResult<Request<Value>> {
        let store = self.name.clone();
        queue_request(&self.engine, "get", move |engine| engine.get(&store, &key))
    }

    pub fn delete(&self, range: impl Into<KeyRange>) -> StoreResult<Request<()>> {
        let store = self.name.clone();
        let range = range.into();
        queue_request(&self.engine, "delete", move |engine| {
            engine.delete(&store, &range)?;
            Ok(Some(()))
        })
    }

    /// Number of records in `range`, or in the whole store.
    pub fn count(&self, range: Option<KeyRange>) -> StoreResult<Request<u64>> {
        let store = self.name.clone();
        let range = range.unwrap_or_else(KeyRange::unbounded);
        queue_request(&self.engine, "count", move |engine| {
            let count = engine.count(&store, &range)?;
            Ok(Some(count as u64))
        })
    }

    pub fn open_cursor(&self, range: Option<KeyRange>, direction: Direction) -> StoreResult<Request<StoreCursorWithValue>> {
        StoreCursor::open_values(Arc::clone(&self.engine), self.source(), range.unwrap_or_else(KeyRange::unbounded), direction)
    }

    pub fn open_key_cursor(&self, range: Option<KeyRange>, direction: Direction) -> StoreResult<Request<StoreCursor>> {
        StoreCursor::open_keys(Arc::clone(&self.engine), self.source(), range.unwrap_or_else(KeyRange::unbounded), direction)
    }

    fn source(&self) -> CursorSource {
        CursorSource::ObjectStore { name: self.name.clone() }
    }
}

/// Handle to one index of an object store.
#[derive(Debug, Clone)]
pub struct Index {
    engine: Arc<StoreEngine>,
    store: String,
    name: String,
}

impl Index {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store_name(&self) -> &str {
        &self.store
    }

    /// Cursor over records in index order. Keys are index keys; primary
    /// keys identify the records.
    pub fn open_cursor(&self, range: Option<KeyRange>, direction: Direction) -> StoreResult<Request<StoreCursorWithValue>> {
        StoreCursor::open_values(Arc::clone(&self.engine), self.source(), range.unwrap_or_else(KeyRange::unbounded), direction)
    }

    pub fn open_key_cursor(&self, range: Option<KeyRange>, direction: Direction) -> StoreResult<Request<StoreCursor>> {
        StoreCursor::open_keys(Arc::clone(&self.engine), self.source(), range.unwrap_or_else(KeyRange::unbounded), direction)
    }

    fn source(&self) -> CursorSource {
        CursorSource::Index { store: self.store.clone(), name: self.name.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn db() -> Database {
        Database::open("db-tests", Config::default()).unwrap()
    }

    #[test]
    fn test_requests_settle_on_the_loop() {
        let db = db();
        let store = db.create_object_store("s", ObjectStoreParams::default()).unwrap();
        let put = store.put(json!("a"), Some(Key::from(1))).unwrap();
        assert!(put.result().is_none());
        assert_eq!(db.event_loop().pending(), 1);

        db.event_loop().run_until_idle();
        assert_eq!(put.result(), Some(Key::from(1)));

        let get = store.get(Key::from(1)).unwrap();
        let missing = store.get(Key::from(2)).unwrap();
        db.event_loop().run_until_idle();
        assert_eq!(get.result(), Some(json!("a")));
        assert_eq!(missing.result(), None);
        assert!(missing.error().is_none());
    }

    #[test]
    fn test_add_reports_constraint_through_request() {
        let db = db();
        let store = db.create_object_store("s", ObjectStoreParams::default()).unwrap();
        store.add(json!(1), Some(Key::from(1))).unwrap();
        let second = store.add(json!(2), Some(Key::from(1))).unwrap();
        db.event_loop().run_until_idle();
        assert_eq!(second.error().map(|e| e.name()), Some("ConstraintError"));
    }

    #[test]
    fn test_unknown_store_and_index() {
        let db = db();
        let store = db.create_object_store("s", ObjectStoreParams::default()).unwrap();
        assert_eq!(db.object_store("nope").unwrap_err().name(), "NotFoundError");
        assert_eq!(store.index("nope").unwrap_err().name(), "NotFoundError");
    }

    #[test]
    fn test_close_aborts_queued_and_refuses_new() {
        let db = db();
        let store = db.create_object_store("s", ObjectStoreParams::default()).unwrap();
        let put = store.put(json!(1), Some(Key::from(1))).unwrap();
        db.close();
        db.event_loop().run_until_idle();
        assert_eq!(put.error().map(|e| e.name()), Some("AbortError"));
        assert_eq!(store.get(Key::from(1)).unwrap_err().name(), "InvalidStateError");
    }

    #[test]
    fn test_delete_range_and_count() {
        let db = db();
        let store = db.create_object_store("s", ObjectStoreParams::default()).unwrap();
        for i in 0..5 {
            store.put(json!(i), Some(Key::from(i))).unwrap();
        }
        store.delete(KeyRange::bound(Key::from(1), Key::from(3), false, false).unwrap()).unwrap();
        let count = store.count(None).unwrap();
        db.event_loop().run_until_idle();
        assert_eq!(count.result(), Some(2));
    }
}
