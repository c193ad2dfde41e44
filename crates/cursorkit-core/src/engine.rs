//! Core record engine: the ordered store behind every request.
//!
//! StoreEngine keeps each object store as a sorted map from primary key to
//! record, plus one sorted set of `(index key, primary key)` pairs per index.
//!
//! **All methods are synchronous.** `Database`, `ObjectStore` and the store
//! cursors wrap them in requests that run on the event loop; nothing here
//! fires callbacks.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};

use hashbrown::HashMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::config::Config;
use crate::cursor::CursorSource;
use crate::direction::Direction;
use crate::error::{StoreError, StoreResult};
use crate::event_loop::EventLoop;
use crate::key::{evaluate_key_path, inject_key, Key, KeyRange};

/// Options for a new object store.
#[derive(Debug, Clone, Default)]
pub struct ObjectStoreParams {
    /// In-line key path. `None` means keys are supplied out of line.
    pub key_path: Option<String>,
    /// Generate numeric keys when none is supplied
    pub auto_increment: bool,
}

/// One index: where its key lives in a record, and its entries.
struct IndexData {
    key_path: String,
    unique: bool,
    entries: BTreeSet<(Key, Key)>,
}

impl IndexData {
    /// Whether `index_key` is already used by a record other than `primary_key`.
    fn is_taken(&self, index_key: &Key, primary_key: &Key) -> bool {
        self.entries
            .range((Bound::Included((index_key.clone(), Key::MIN)), Bound::Unbounded))
            .take_while(|(k, _)| k == index_key)
            .any(|(_, pk)| pk != primary_key)
    }
}

/// Records of one object store.
struct StoreData {
    key_path: Option<String>,
    auto_increment: bool,
    /// Next generated key
    next_key: u64,
    records: BTreeMap<Key, Value>,
    indexes: HashMap<String, IndexData>,
}

/// Index key of `value`, or `None` when the record is not indexed.
fn index_key(value: &Value, key_path: &str) -> Option<Key> {
    evaluate_key_path(value, key_path).and_then(|v| Key::from_json(v).ok())
}

impl StoreData {
    fn resolve_key(&self, value: &mut Value, key: Option<Key>) -> StoreResult<Key> {
        match (&self.key_path, key) {
            (Some(_), Some(_)) => Err(StoreError::data("store uses in-line keys; a separate key must not be given")),
            (Some(path), None) => match evaluate_key_path(value, path) {
                Some(found) => Key::from_json(found),
                None if self.auto_increment => {
                    let key = Key::from(self.next_key);
                    inject_key(value, path, &key)?;
                    Ok(key)
                }
                None => Err(StoreError::data(format!("record has no value at key path '{}'", path))),
            },
            (None, Some(key)) => Ok(key),
            (None, None) if self.auto_increment => Ok(Key::from(self.next_key)),
            (None, None) => Err(StoreError::data("store uses out-of-line keys and no key was given")),
        }
    }

    /// Insert or replace a record, keeping every index in step.
    ///
    /// Unique indexes are checked before anything is modified, so a
    /// constraint failure leaves the store untouched.
    fn write_record(&mut self, store: &str, key: Key, value: Value) -> StoreResult<()> {
        let mut new_entries = Vec::with_capacity(self.indexes.len());
        for (name, index) in &self.indexes {
            if let Some(ik) = index_key(&value, &index.key_path) {
                if index.unique && index.is_taken(&ik, &key) {
                    return Err(StoreError::Constraint {
                        store: store.to_string(),
                        reason: format!("unique index '{}' already contains key {}", name, ik),
                    });
                }
                new_entries.push((name.clone(), ik));
            }
        }

        if let Some(old) = self.records.remove(&key) {
            self.unindex(&key, &old);
        }
        for (name, ik) in new_entries {
            if let Some(index) = self.indexes.get_mut(&name) {
                index.entries.insert((ik, key.clone()));
            }
        }
        self.bump_generator(&key);
        self.records.insert(key, value);
        Ok(())
    }

    fn unindex(&mut self, key: &Key, value: &Value) {
        for index in self.indexes.values_mut() {
            if let Some(ik) = index_key(value, &index.key_path) {
                index.entries.remove(&(ik, key.clone()));
            }
        }
    }

    /// Explicit numeric keys push the generator past themselves.
    fn bump_generator(&mut self, key: &Key) {
        if !self.auto_increment {
            return;
        }
        if let Some(n) = key.as_number() {
            if n >= self.next_key as f64 {
                self.next_key = (n.floor() as u64).saturating_add(1);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Cursor stepping
// ---------------------------------------------------------------------------

/// One cursor step: where the cursor is, which way it moves and where it
/// was asked to land.
pub(crate) struct StepQuery<'a> {
    pub direction: Direction,
    pub range: &'a KeyRange,
    /// Current (key, primary key); `None` before the first step
    pub position: Option<(&'a Key, &'a Key)>,
    pub target_key: Option<&'a Key>,
    pub target_primary_key: Option<&'a Key>,
}

impl StepQuery<'_> {
    /// Whether a record at (`key`, `primary_key`) is a valid landing spot.
    fn accepts(&self, key: &Key, primary_key: &Key) -> bool {
        if !self.range.contains(key) {
            return false;
        }
        let forward = self.direction.is_forward();

        if let Some(target) = self.target_key {
            let ord = match self.target_primary_key {
                Some(target_pk) => (key, primary_key).cmp(&(target, target_pk)),
                None => key.cmp(target),
            };
            if (forward && ord == CmpOrdering::Less) || (!forward && ord == CmpOrdering::Greater) {
                return false;
            }
        }

        match self.position {
            Some((pos_key, pos_pk)) => {
                let ord = if self.direction.is_unique() {
                    key.cmp(pos_key)
                } else {
                    (key, primary_key).cmp(&(pos_key, pos_pk))
                };
                if forward { ord == CmpOrdering::Greater } else { ord == CmpOrdering::Less }
            }
            None => true,
        }
    }
}

fn tighter_lower<T: Ord>(a: Bound<T>, b: Bound<T>) -> Bound<T> {
    match (a, b) {
        (Bound::Unbounded, x) | (x, Bound::Unbounded) => x,
        (Bound::Included(x), Bound::Included(y)) => Bound::Included(x.max(y)),
        (Bound::Excluded(x), Bound::Excluded(y)) => Bound::Excluded(x.max(y)),
        (Bound::Included(i), Bound::Excluded(e)) | (Bound::Excluded(e), Bound::Included(i)) => {
            if i > e { Bound::Included(i) } else { Bound::Excluded(e) }
        }
    }
}

fn tighter_upper<T: Ord>(a: Bound<T>, b: Bound<T>) -> Bound<T> {
    match (a, b) {
        (Bound::Unbounded, x) | (x, Bound::Unbounded) => x,
        (Bound::Included(x), Bound::Included(y)) => Bound::Included(x.min(y)),
        (Bound::Excluded(x), Bound::Excluded(y)) => Bound::Excluded(x.min(y)),
        (Bound::Included(i), Bound::Excluded(e)) | (Bound::Excluded(e), Bound::Included(i)) => {
            if i < e { Bound::Included(i) } else { Bound::Excluded(e) }
        }
    }
}

fn store_step(records: &BTreeMap<Key, Value>, q: &StepQuery<'_>) -> Option<(Key, Key)> {
    let found = if q.direction.is_forward() {
        let start = tighter_lower(
            tighter_lower(q.range.lower_bound_ref(), q.target_key.map_or(Bound::Unbounded, Bound::Included)),
            q.position.map_or(Bound::Unbounded, |(k, _)| Bound::Excluded(k)),
        );
        records
            .range::<Key, _>((start, Bound::Unbounded))
            .map(|(k, _)| k)
            .take_while(|k| q.range.satisfies_upper(k))
            .find(|k| q.accepts(k, k))
    } else {
        let end = tighter_upper(
            tighter_upper(q.range.upper_bound_ref(), q.target_key.map_or(Bound::Unbounded, Bound::Included)),
            q.position.map_or(Bound::Unbounded, |(k, _)| Bound::Excluded(k)),
        );
        records
            .range::<Key, _>((Bound::Unbounded, end))
            .rev()
            .map(|(k, _)| k)
            .take_while(|k| q.range.satisfies_lower(k))
            .find(|k| q.accepts(k, k))
    };
    found.map(|k| (k.clone(), k.clone()))
}

fn index_step(entries: &BTreeSet<(Key, Key)>, q: &StepQuery<'_>) -> Option<(Key, Key)> {
    let unique = q.direction.is_unique();

    if q.direction.is_forward() {
        let from_range = q.range.lower().map_or(Bound::Unbounded, |k| Bound::Included((k.clone(), Key::MIN)));
        let from_target = q.target_key.map_or(Bound::Unbounded, |k| {
            let pk = q.target_primary_key.cloned().unwrap_or(Key::MIN);
            Bound::Included((k.clone(), pk))
        });
        let from_position = match q.position {
            Some((k, _)) if unique => Bound::Included((k.clone(), Key::MIN)),
            Some((k, pk)) => Bound::Excluded((k.clone(), pk.clone())),
            None => Bound::Unbounded,
        };
        let start = tighter_lower(tighter_lower(from_range, from_target), from_position);
        entries
            .range((start, Bound::Unbounded))
            .take_while(|(k, _)| q.range.satisfies_upper(k))
            .find(|(k, pk)| q.accepts(k, pk))
            .cloned()
    } else {
        let to_range = match q.range.upper() {
            Some(k) if q.range.upper_open() => Bound::Excluded((k.clone(), Key::MIN)),
            _ => Bound::Unbounded,
        };
        let to_target = match (q.target_key, q.target_primary_key) {
            (Some(k), Some(pk)) => Bound::Included((k.clone(), pk.clone())),
            _ => Bound::Unbounded,
        };
        let to_position = match q.position {
            Some((k, _)) if unique => Bound::Excluded((k.clone(), Key::MIN)),
            Some((k, pk)) => Bound::Excluded((k.clone(), pk.clone())),
            None => Bound::Unbounded,
        };
        let end = tighter_upper(tighter_upper(to_range, to_target), to_position);
        let (key, primary_key) = entries
            .range((Bound::Unbounded, end))
            .rev()
            .take_while(|(k, _)| q.range.satisfies_lower(k))
            .find(|(k, pk)| q.accepts(k, pk))
            .cloned()?;

        if unique {
            // prevunique lands on the lowest primary key of the run
            return entries
                .range((Bound::Included((key.clone(), Key::MIN)), Bound::Unbounded))
                .next()
                .cloned();
        }
        Some((key, primary_key))
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// In-memory ordered record store.
///
/// All public methods take `&self`. Readers share the store map through a
/// RwLock; every write holds the write lock for the whole record update so
/// index entries never disagree with records.
pub struct StoreEngine {
    /// Database name, used in log output
    name: String,
    stores: RwLock<HashMap<String, StoreData>>,
    closed: AtomicBool,
    event_loop: EventLoop,
    config: Config,
}

fn store_not_found(name: &str) -> StoreError {
    StoreError::NotFound { kind: "object store", name: name.to_string() }
}

fn index_not_found(store: &str, name: &str) -> StoreError {
    StoreError::NotFound { kind: "index", name: format!("{}.{}", store, name) }
}

impl StoreEngine {
    /// Create an empty engine with its own event loop.
    pub fn new(name: &str, config: Config) -> StoreResult<Self> {
        config.validate().map_err(|reason| StoreError::InvalidConfig { reason })?;
        Ok(Self {
            name: name.to_string(),
            stores: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
            event_loop: EventLoop::new(&config),
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Refuse further requests. Queued requests fail with `AbortError` when
    /// they reach the front of the loop.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(db = %self.name, pending = self.event_loop.pending(), "closing database");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::closed());
        }
        Ok(())
    }

    /// Create an object store. Fails with `ConstraintError` if the name is taken.
    pub fn create_object_store(&self, name: &str, params: ObjectStoreParams) -> StoreResult<()> {
        self.ensure_open()?;
        if params.auto_increment && params.key_path.as_deref() == Some("") {
            return Err(StoreError::invalid_access("auto-increment stores need a non-empty key path"));
        }
        let mut stores = self.stores.write();
        if stores.contains_key(name) {
            return Err(StoreError::Constraint {
                store: name.to_string(),
                reason: "object store already exists".into(),
            });
        }
        tracing::debug!(db = %self.name, store = name, key_path = ?params.key_path, auto_increment = params.auto_increment, "creating object store");
        stores.insert(
            name.to_string(),
            StoreData {
                key_path: params.key_path,
                auto_increment: params.auto_increment,
                next_key: 1,
                records: BTreeMap::new(),
                indexes: HashMap::new(),
            },
        );
        Ok(())
    }

    /// Drop an object store with its records and indexes. Cursors over it
    /// fail with `NotFoundError` on their next step.
    pub fn delete_object_store(&self, name: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let removed = self.stores.write().remove(name).ok_or_else(|| store_not_found(name))?;
        tracing::debug!(db = %self.name, store = name, records = removed.records.len(), "deleted object store");
        Ok(())
    }

    /// Names of all object stores, sorted.
    pub fn object_store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Create an index over existing and future records of `store`.
    pub fn create_index(&self, store: &str, name: &str, key_path: &str, unique: bool) -> StoreResult<()> {
        self.ensure_open()?;
        let mut stores = self.stores.write();
        let data = stores.get_mut(store).ok_or_else(|| store_not_found(store))?;
        if data.indexes.contains_key(name) {
            return Err(StoreError::Constraint {
                store: store.to_string(),
                reason: format!("index '{}' already exists", name),
            });
        }

        let mut index = IndexData { key_path: key_path.to_string(), unique, entries: BTreeSet::new() };
        for (pk, value) in &data.records {
            if let Some(ik) = index_key(value, key_path) {
                if unique && index.is_taken(&ik, pk) {
                    return Err(StoreError::Constraint {
                        store: store.to_string(),
                        reason: format!("existing records share key {} in unique index '{}'", ik, name),
                    });
                }
                index.entries.insert((ik, pk.clone()));
            }
        }

        tracing::debug!(db = %self.name, store, index = name, key_path, unique, entries = index.entries.len(), "creating index");
        data.indexes.insert(name.to_string(), index);
        Ok(())
    }

    /// Fails with `NotFoundError` unless `store` (and `index`, if given) exist.
    pub(crate) fn check_source(&self, store: &str, index: Option<&str>) -> StoreResult<()> {
        let stores = self.stores.read();
        let data = stores.get(store).ok_or_else(|| store_not_found(store))?;
        if let Some(index) = index {
            if !data.indexes.contains_key(index) {
                return Err(index_not_found(store, index));
            }
        }
        Ok(())
    }

    /// In-line key path of `store`.
    pub fn key_path(&self, store: &str) -> StoreResult<Option<String>> {
        let stores = self.stores.read();
        let data = stores.get(store).ok_or_else(|| store_not_found(store))?;
        Ok(data.key_path.clone())
    }

    /// Write a record, returning its primary key.
    ///
    /// With `overwrite` false an existing record under the same key is a
    /// `ConstraintError` (add semantics).
    pub fn put(&self, store: &str, mut value: Value, key: Option<Key>, overwrite: bool) -> StoreResult<Key> {
        self.ensure_open()?;
        let mut stores = self.stores.write();
        let data = stores.get_mut(store).ok_or_else(|| store_not_found(store))?;

        let key = data.resolve_key(&mut value, key)?;
        if key.depth() > self.config.max_key_depth {
            return Err(StoreError::data(format!(
                "key nesting depth {} exceeds limit of {}",
                key.depth(),
                self.config.max_key_depth
            )));
        }
        let entry_size = serde_json::to_vec(&value)
            .map_err(|e| StoreError::data(format!("record cannot be serialized: {}", e)))?
            .len();
        if entry_size > self.config.max_value_size {
            return Err(StoreError::OversizedEntry {
                store: store.to_string(),
                entry_size,
                max_size: self.config.max_value_size,
            });
        }
        if !overwrite && data.records.contains_key(&key) {
            return Err(StoreError::Constraint {
                store: store.to_string(),
                reason: format!("key {} already exists", key),
            });
        }

        data.write_record(store, key.clone(), value)?;
        Ok(key)
    }

    /// Record stored under `key`.
    pub fn get(&self, store: &str, key: &Key) -> StoreResult<Option<Value>> {
        let stores = self.stores.read();
        let data = stores.get(store).ok_or_else(|| store_not_found(store))?;
        Ok(data.records.get(key).cloned())
    }

    /// Delete every record whose key is in `range`. Returns how many went.
    pub fn delete(&self, store: &str, range: &KeyRange) -> StoreResult<usize> {
        self.ensure_open()?;
        let mut stores = self.stores.write();
        let data = stores.get_mut(store).ok_or_else(|| store_not_found(store))?;

        let doomed: Vec<Key> = data.records.keys().filter(|k| range.contains(k)).cloned().collect();
        for key in &doomed {
            if let Some(old) = data.records.remove(key) {
                data.unindex(key, &old);
            }
        }
        Ok(doomed.len())
    }

    /// Number of records whose key is in `range`.
    pub fn count(&self, store: &str, range: &KeyRange) -> StoreResult<usize> {
        let stores = self.stores.read();
        let data = stores.get(store).ok_or_else(|| store_not_found(store))?;
        Ok(data.records.keys().filter(|k| range.contains(k)).count())
    }

    /// Find where a cursor over `source` lands next.
    pub(crate) fn step(&self, source: &CursorSource, query: &StepQuery<'_>) -> StoreResult<Option<(Key, Key)>> {
        let stores = self.stores.read();
        let data = stores.get(source.store_name()).ok_or_else(|| store_not_found(source.store_name()))?;
        match source {
            CursorSource::ObjectStore { .. } => Ok(store_step(&data.records, query)),
            CursorSource::Index { store, name } => {
                let index = data.indexes.get(name).ok_or_else(|| index_not_found(store, name))?;
                Ok(index_step(&index.entries, query))
            }
        }
    }
}

impl std::fmt::Debug for StoreEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreEngine")
            .field("name", &self.name)
            .field("stores", &self.object_store_names())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_engine() -> StoreEngine {
        let engine = StoreEngine::new("test", Config::default()).unwrap();
        engine.create_object_store("books", ObjectStoreParams::default()).unwrap();
        engine
    }

    fn step(engine: &StoreEngine, source: &CursorSource, direction: Direction, position: Option<(&Key, &Key)>) -> Option<(Key, Key)> {
        let range = KeyRange::unbounded();
        let query = StepQuery { direction, range: &range, position, target_key: None, target_primary_key: None };
        engine.step(source, &query).unwrap()
    }

    /// Index "by_author" over pk 1..=5 with authors a, b, b, b, c.
    fn author_index() -> (StoreEngine, CursorSource) {
        let engine = test_engine();
        for (pk, author) in [(1, "a"), (2, "b"), (3, "b"), (4, "b"), (5, "c")] {
            engine.put("books", json!({ "author": author }), Some(Key::from(pk)), true).unwrap();
        }
        engine.create_index("books", "by_author", "author", false).unwrap();
        (engine, CursorSource::Index { store: "books".into(), name: "by_author".into() })
    }

    #[test]
    fn test_put_get() {
        let engine = test_engine();
        let key = engine.put("books", json!({"title": "Dune"}), Some(Key::from(1)), true).unwrap();
        assert_eq!(key, Key::from(1));
        assert_eq!(engine.get("books", &key).unwrap(), Some(json!({"title": "Dune"})));
        assert_eq!(engine.get("books", &Key::from(2)).unwrap(), None);
    }

    #[test]
    fn test_add_rejects_existing_key() {
        let engine = test_engine();
        engine.put("books", json!(1), Some(Key::from(1)), false).unwrap();
        let err = engine.put("books", json!(2), Some(Key::from(1)), false).unwrap_err();
        assert_eq!(err.name(), "ConstraintError");
        assert_eq!(engine.get("books", &Key::from(1)).unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_out_of_line_store_needs_key() {
        let engine = test_engine();
        let err = engine.put("books", json!({}), None, true).unwrap_err();
        assert_eq!(err.name(), "DataError");
    }

    #[test]
    fn test_auto_increment_inline_key() {
        let engine = test_engine();
        engine
            .create_object_store("notes", ObjectStoreParams { key_path: Some("id".into()), auto_increment: true })
            .unwrap();

        let first = engine.put("notes", json!({"text": "a"}), None, true).unwrap();
        let explicit = engine.put("notes", json!({"id": 10, "text": "b"}), None, true).unwrap();
        let next = engine.put("notes", json!({"text": "c"}), None, true).unwrap();

        assert_eq!(first, Key::from(1));
        assert_eq!(explicit, Key::from(10));
        assert_eq!(next, Key::from(11));
        assert_eq!(engine.get("notes", &first).unwrap(), Some(json!({"id": 1, "text": "a"})));
    }

    #[test]
    fn test_unique_index_constraint() {
        let engine = test_engine();
        engine.create_index("books", "by_isbn", "isbn", true).unwrap();
        engine.put("books", json!({"isbn": "x"}), Some(Key::from(1)), true).unwrap();

        let err = engine.put("books", json!({"isbn": "x"}), Some(Key::from(2)), true).unwrap_err();
        assert_eq!(err.name(), "ConstraintError");
        assert_eq!(engine.get("books", &Key::from(2)).unwrap(), None);

        // Rewriting the same record keeps its own index key
        engine.put("books", json!({"isbn": "x", "v": 2}), Some(Key::from(1)), true).unwrap();
    }

    #[test]
    fn test_delete_and_count() {
        let engine = test_engine();
        for i in 1..=5 {
            engine.put("books", json!(i), Some(Key::from(i)), true).unwrap();
        }
        let range = KeyRange::bound(Key::from(2), Key::from(3), false, false).unwrap();
        assert_eq!(engine.count("books", &range).unwrap(), 2);
        assert_eq!(engine.delete("books", &range).unwrap(), 2);
        assert_eq!(engine.count("books", &KeyRange::unbounded()).unwrap(), 3);
    }

    #[test]
    fn test_missing_store() {
        let engine = test_engine();
        let err = engine.get("nope", &Key::from(1)).unwrap_err();
        assert_eq!(err.name(), "NotFoundError");
    }

    #[test]
    fn test_closed_engine_refuses_writes() {
        let engine = test_engine();
        engine.close();
        let err = engine.put("books", json!(1), Some(Key::from(1)), true).unwrap_err();
        assert_eq!(err.name(), "InvalidStateError");
    }

    #[test]
    fn test_store_step_both_directions() {
        let engine = test_engine();
        for i in [1, 2, 3] {
            engine.put("books", json!(i), Some(Key::from(i)), true).unwrap();
        }
        let source = CursorSource::ObjectStore { name: "books".into() };

        let first = step(&engine, &source, Direction::Next, None).unwrap();
        assert_eq!(first.0, Key::from(1));
        let second = step(&engine, &source, Direction::Next, Some((&first.0, &first.1))).unwrap();
        assert_eq!(second.0, Key::from(2));

        let last = step(&engine, &source, Direction::Prev, None).unwrap();
        assert_eq!(last.0, Key::from(3));
        let three = Key::from(3);
        let one = Key::from(1);
        assert_eq!(step(&engine, &source, Direction::Prev, Some((&three, &three))).unwrap().0, Key::from(2));
        assert_eq!(step(&engine, &source, Direction::Prev, Some((&one, &one))), None);
    }

    #[test]
    fn test_index_unique_directions() {
        let (engine, source) = author_index();
        let b = Key::from("b");

        // next walks every duplicate
        let pk2 = Key::from(2);
        assert_eq!(
            step(&engine, &source, Direction::Next, Some((&b, &pk2))),
            Some((Key::from("b"), Key::from(3)))
        );

        // nextunique skips the rest of the run
        assert_eq!(
            step(&engine, &source, Direction::NextUnique, Some((&b, &pk2))),
            Some((Key::from("c"), Key::from(5)))
        );

        // prevunique from "c" lands on the first "b" record
        let c = Key::from("c");
        let pk5 = Key::from(5);
        assert_eq!(
            step(&engine, &source, Direction::PrevUnique, Some((&c, &pk5))),
            Some((Key::from("b"), Key::from(2)))
        );

        // prev from "c" lands on the last "b" record
        assert_eq!(
            step(&engine, &source, Direction::Prev, Some((&c, &pk5))),
            Some((Key::from("b"), Key::from(4)))
        );
    }

    #[test]
    fn test_index_step_with_targets() {
        let (engine, source) = author_index();
        let range = KeyRange::unbounded();
        let a = Key::from("a");
        let pk1 = Key::from(1);
        let b = Key::from("b");
        let pk3 = Key::from(3);

        let query = StepQuery {
            direction: Direction::Next,
            range: &range,
            position: Some((&a, &pk1)),
            target_key: Some(&b),
            target_primary_key: Some(&pk3),
        };
        assert_eq!(engine.step(&source, &query).unwrap(), Some((Key::from("b"), Key::from(3))));

        let bb = Key::from("bb");
        let query = StepQuery {
            direction: Direction::Next,
            range: &range,
            position: Some((&a, &pk1)),
            target_key: Some(&bb),
            target_primary_key: None,
        };
        assert_eq!(engine.step(&source, &query).unwrap(), Some((Key::from("c"), Key::from(5))));
    }

    #[test]
    fn test_range_limits_steps() {
        let (engine, source) = author_index();
        let range = KeyRange::only(Key::from("b"));
        let query = StepQuery { direction: Direction::Prev, range: &range, position: None, target_key: None, target_primary_key: None };
        assert_eq!(engine.step(&source, &query).unwrap(), Some((Key::from("b"), Key::from(4))));

        let b = Key::from("b");
        let pk2 = Key::from(2);
        let query = StepQuery { direction: Direction::Prev, range: &range, position: Some((&b, &pk2)), target_key: None, target_primary_key: None };
        assert_eq!(engine.step(&source, &query).unwrap(), None);
    }
}
