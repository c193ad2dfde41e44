//! Store cursors: the callback-driven iterators handed out by open requests.
//!
//! A cursor is a shared handle. The open request's result, the cursor an
//! adapter wraps, and the task stepping it all point at the same state, so a
//! step completed on the event loop is visible through every handle.
//!
//! Each navigation primitive validates synchronously, then queues one step on
//! the event loop. The step reports back through the request the cursor was
//! opened with: a non-null result when it lands on a record, a null result
//! when it runs off the end.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::database::queue_request;
use crate::direction::Direction;
use crate::engine::{StepQuery, StoreEngine};
use crate::error::{StoreError, StoreResult};
use crate::key::{evaluate_key_path, Key, KeyRange};
use crate::protocol::{RawCursor, RawValueCursor};
use crate::request::{Request, WeakRequest};

/// What a cursor traverses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CursorSource {
    ObjectStore { name: String },
    Index { store: String, name: String },
}

impl CursorSource {
    /// Object store holding the records, for both variants.
    pub fn store_name(&self) -> &str {
        match self {
            CursorSource::ObjectStore { name } => name,
            CursorSource::Index { store, .. } => store,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, CursorSource::Index { .. })
    }
}

impl fmt::Display for CursorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorSource::ObjectStore { name } => write!(f, "store '{}'", name),
            CursorSource::Index { store, name } => write!(f, "index '{}.{}'", store, name),
        }
    }
}

// ---------------------------------------------------------------------------
// Request plumbing
// ---------------------------------------------------------------------------

/// The request a cursor reports through. Held weakly: the request's result
/// holds the cursor, so a strong link back would leak both.
enum CursorRequest {
    Keys(WeakRequest<StoreCursor>),
    Values(WeakRequest<StoreCursorWithValue>),
}

impl CursorRequest {
    fn upgrade(&self) -> Option<LiveRequest> {
        match self {
            CursorRequest::Keys(weak) => weak.upgrade().map(LiveRequest::Keys),
            CursorRequest::Values(weak) => weak.upgrade().map(LiveRequest::Values),
        }
    }
}

/// Strong handle kept by a queued step until it settles.
enum LiveRequest {
    Keys(Request<StoreCursor>),
    Values(Request<StoreCursorWithValue>),
}

impl LiveRequest {
    fn id(&self) -> u64 {
        match self {
            LiveRequest::Keys(r) => r.id(),
            LiveRequest::Values(r) => r.id(),
        }
    }

    fn reset(&self) {
        match self {
            LiveRequest::Keys(r) => r.reset(),
            LiveRequest::Values(r) => r.reset(),
        }
    }

    fn found(&self, cursor: StoreCursor) {
        match self {
            LiveRequest::Keys(r) => r.succeed(Some(cursor)),
            LiveRequest::Values(r) => r.succeed(Some(StoreCursorWithValue(cursor))),
        }
    }

    fn exhausted(&self) {
        match self {
            LiveRequest::Keys(r) => r.succeed(None),
            LiveRequest::Values(r) => r.succeed(None),
        }
    }

    fn fail(&self, error: StoreError) {
        match self {
            LiveRequest::Keys(r) => r.fail(error),
            LiveRequest::Values(r) => r.fail(error),
        }
    }
}

enum StepTarget {
    Advance(u32),
    Continue(Option<Key>),
    ContinuePrimaryKey(Key, Key),
}

struct CursorState {
    direction: Direction,
    range: KeyRange,
    key: Option<Key>,
    primary_key: Option<Key>,
    value: Option<Value>,
    /// Parked on a record, ready for the next primitive
    got_value: bool,
    request: CursorRequest,
}

// ---------------------------------------------------------------------------
// Key cursor
// ---------------------------------------------------------------------------

/// Cursor over keys. Cheap to clone; clones share position.
#[derive(Clone)]
pub struct StoreCursor {
    engine: Arc<StoreEngine>,
    source: CursorSource,
    key_only: bool,
    state: Arc<Mutex<CursorState>>,
}

impl StoreCursor {
    fn new(engine: Arc<StoreEngine>, source: CursorSource, range: KeyRange, direction: Direction, request: CursorRequest) -> Self {
        let key_only = matches!(request, CursorRequest::Keys(_));
        Self {
            engine,
            source,
            key_only,
            state: Arc::new(Mutex::new(CursorState {
                direction,
                range,
                key: None,
                primary_key: None,
                value: None,
                got_value: false,
                request,
            })),
        }
    }

    /// Open a key cursor; the request fires once the first step lands.
    pub(crate) fn open_keys(
        engine: Arc<StoreEngine>,
        source: CursorSource,
        range: KeyRange,
        direction: Direction,
    ) -> StoreResult<Request<StoreCursor>> {
        engine.ensure_open()?;
        engine.check_source(source.store_name(), index_name(&source))?;
        let request = Request::new();
        let cursor = Self::new(engine, source, range, direction, CursorRequest::Keys(request.downgrade()));
        tracing::trace!(request = request.id(), source = %cursor.source, %direction, "opening key cursor");
        cursor.schedule(LiveRequest::Keys(request.clone()), StepTarget::Continue(None));
        Ok(request)
    }

    /// Open a value cursor; the request fires once the first step lands.
    pub(crate) fn open_values(
        engine: Arc<StoreEngine>,
        source: CursorSource,
        range: KeyRange,
        direction: Direction,
    ) -> StoreResult<Request<StoreCursorWithValue>> {
        engine.ensure_open()?;
        engine.check_source(source.store_name(), index_name(&source))?;
        let request = Request::new();
        let cursor = Self::new(engine, source, range, direction, CursorRequest::Values(request.downgrade()));
        tracing::trace!(request = request.id(), source = %cursor.source, %direction, "opening value cursor");
        cursor.schedule(LiveRequest::Values(request.clone()), StepTarget::Continue(None));
        Ok(request)
    }

    pub fn direction(&self) -> Direction {
        self.state.lock().direction
    }

    pub fn key(&self) -> Option<Key> {
        self.state.lock().key.clone()
    }

    pub fn primary_key(&self) -> Option<Key> {
        self.state.lock().primary_key.clone()
    }

    pub fn source(&self) -> &CursorSource {
        &self.source
    }

    /// Step `count` records. `count` must be positive.
    ///
    /// Counts above [`Config::max_advance_count`](crate::Config) are refused
    /// with `TypeError`. The desktop preset accepts every `u32`.
    pub fn advance(&self, count: u32) -> StoreResult<()> {
        if count == 0 {
            return Err(StoreError::Type { reason: "advance count must be greater than zero".into() });
        }
        let limit = self.engine.config().max_advance_count;
        if count > limit {
            return Err(StoreError::Type { reason: format!("advance count {} exceeds limit of {}", count, limit) });
        }
        let live = self.begin_step(|_| Ok(()))?;
        self.schedule(live, StepTarget::Advance(count));
        Ok(())
    }

    /// Step one record, or jump to the first record at or past `key`.
    ///
    /// `key` must lie strictly past the current key in the cursor's direction.
    pub fn continue_cursor(&self, key: Option<Key>) -> StoreResult<()> {
        let live = self.begin_step(|state| {
            let (Some(target), Some(current)) = (key.as_ref(), state.key.as_ref()) else {
                return Ok(());
            };
            let past = if state.direction.is_forward() { target > current } else { target < current };
            if !past {
                return Err(StoreError::data(format!(
                    "continue key {} is not past the current key {} in direction {}",
                    target, current, state.direction
                )));
            }
            Ok(())
        })?;
        self.schedule(live, StepTarget::Continue(key));
        Ok(())
    }

    /// Jump to the first record at or past (`key`, `primary_key`).
    ///
    /// Index cursors with a non-unique direction only.
    pub fn continue_primary_key(&self, key: Key, primary_key: Key) -> StoreResult<()> {
        if !self.source.is_index() {
            return Err(StoreError::invalid_access("continue_primary_key needs an index cursor"));
        }
        let live = self.begin_step(|state| {
            if state.direction.is_unique() {
                return Err(StoreError::invalid_access(format!(
                    "continue_primary_key is not allowed in direction {}",
                    state.direction
                )));
            }
            let (Some(current), Some(current_pk)) = (state.key.as_ref(), state.primary_key.as_ref()) else {
                return Ok(());
            };
            let target = (&key, &primary_key);
            let behind = if state.direction.is_forward() {
                target <= (current, current_pk)
            } else {
                target >= (current, current_pk)
            };
            if behind {
                return Err(StoreError::data(format!(
                    "({}, {}) is not past the current position ({}, {})",
                    key, primary_key, current, current_pk
                )));
            }
            Ok(())
        })?;
        self.schedule(live, StepTarget::ContinuePrimaryKey(key, primary_key));
        Ok(())
    }

    /// Check that the cursor may move, run `validate`, then mark it as
    /// iterating. Nothing changes if any check fails.
    fn begin_step<F>(&self, validate: F) -> StoreResult<LiveRequest>
    where
        F: FnOnce(&CursorState) -> StoreResult<()>,
    {
        self.engine.ensure_open()?;
        let mut state = self.state.lock();
        if !state.got_value {
            return Err(StoreError::invalid_state("cursor is being iterated or has moved past its last record"));
        }
        validate(&state)?;
        let live = state
            .request
            .upgrade()
            .ok_or_else(|| StoreError::invalid_state("the request this cursor reports through was dropped"))?;
        state.got_value = false;
        Ok(live)
    }

    fn schedule(&self, live: LiveRequest, target: StepTarget) {
        live.reset();
        let cursor = self.clone();
        self.engine.event_loop().queue_task(move || cursor.run_step(live, target));
    }

    fn run_step(&self, live: LiveRequest, target: StepTarget) {
        if self.engine.is_closed() {
            live.fail(StoreError::Aborted { reason: "database connection was closed".into() });
            return;
        }

        match self.locate(target) {
            Ok(Some((key, primary_key))) => {
                let value = if self.key_only {
                    None
                } else {
                    match self.engine.get(self.source.store_name(), &primary_key) {
                        Ok(value) => value,
                        Err(error) => {
                            live.fail(error);
                            return;
                        }
                    }
                };
                tracing::trace!(request = live.id(), source = %self.source, %key, %primary_key, "cursor step landed");
                {
                    let mut state = self.state.lock();
                    state.key = Some(key);
                    state.primary_key = Some(primary_key);
                    state.value = value;
                    state.got_value = true;
                }
                live.found(self.clone());
            }
            Ok(None) => {
                tracing::trace!(request = live.id(), source = %self.source, "cursor exhausted");
                {
                    let mut state = self.state.lock();
                    state.key = None;
                    state.primary_key = None;
                    state.value = None;
                }
                live.exhausted();
            }
            Err(error) => live.fail(error),
        }
    }

    fn locate(&self, target: StepTarget) -> StoreResult<Option<(Key, Key)>> {
        let (direction, range, mut position) = {
            let state = self.state.lock();
            (state.direction, state.range.clone(), state.key.clone().zip(state.primary_key.clone()))
        };
        let query = |position: &Option<(Key, Key)>, target_key: Option<&Key>, target_pk: Option<&Key>| {
            let query = StepQuery {
                direction,
                range: &range,
                position: position.as_ref().map(|(k, pk)| (k, pk)),
                target_key,
                target_primary_key: target_pk,
            };
            self.engine.step(&self.source, &query)
        };

        match target {
            StepTarget::Continue(key) => query(&position, key.as_ref(), None),
            StepTarget::ContinuePrimaryKey(key, primary_key) => query(&position, Some(&key), Some(&primary_key)),
            StepTarget::Advance(count) => {
                for _ in 0..count {
                    match query(&position, None, None)? {
                        Some(found) => position = Some(found),
                        None => return Ok(None),
                    }
                }
                Ok(position)
            }
        }
    }

    /// Primary key of the record a mutation should act on.
    fn begin_write(&self) -> StoreResult<Key> {
        self.engine.ensure_open()?;
        if self.key_only {
            return Err(StoreError::invalid_state("key cursors cannot modify records"));
        }
        let state = self.state.lock();
        match (&state.primary_key, state.got_value) {
            (Some(primary_key), true) => Ok(primary_key.clone()),
            _ => Err(StoreError::invalid_state("cursor is not positioned on a record")),
        }
    }
}

fn index_name(source: &CursorSource) -> Option<&str> {
    match source {
        CursorSource::Index { name, .. } => Some(name),
        CursorSource::ObjectStore { .. } => None,
    }
}

impl fmt::Debug for StoreCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StoreCursor")
            .field("source", &self.source)
            .field("direction", &state.direction)
            .field("key", &state.key)
            .field("primary_key", &state.primary_key)
            .finish()
    }
}

impl RawCursor for StoreCursor {
    type Key = Key;
    type Source = CursorSource;
    type Error = StoreError;
    type Request = Request<StoreCursor>;

    fn direction(&self) -> Direction {
        StoreCursor::direction(self)
    }

    fn key(&self) -> Option<Key> {
        StoreCursor::key(self)
    }

    fn primary_key(&self) -> Option<Key> {
        StoreCursor::primary_key(self)
    }

    fn source(&self) -> CursorSource {
        self.source.clone()
    }

    fn advance(&self, count: u32) -> StoreResult<()> {
        StoreCursor::advance(self, count)
    }

    fn continue_cursor(&self, key: Option<Key>) -> StoreResult<()> {
        StoreCursor::continue_cursor(self, key)
    }

    fn continue_primary_key(&self, key: Key, primary_key: Key) -> StoreResult<()> {
        StoreCursor::continue_primary_key(self, key, primary_key)
    }
}

// ---------------------------------------------------------------------------
// Value cursor
// ---------------------------------------------------------------------------

/// Cursor over records: a key cursor that also loads values and can
/// delete or replace the record it is parked on.
#[derive(Clone)]
pub struct StoreCursorWithValue(StoreCursor);

impl StoreCursorWithValue {
    /// The same cursor, seen as a key cursor.
    pub fn as_key_cursor(&self) -> &StoreCursor {
        &self.0
    }

    /// Record at the current position. `Null` once exhausted.
    pub fn value(&self) -> Value {
        self.0.state.lock().value.clone().unwrap_or(Value::Null)
    }

    /// Delete the record at the current position.
    ///
    /// The cursor keeps its position; the next step moves past the gap.
    pub fn delete(&self) -> StoreResult<Request<()>> {
        let primary_key = self.0.begin_write()?;
        let store = self.0.source.store_name().to_string();
        queue_request(&self.0.engine, "cursor.delete", move |engine| {
            engine.delete(&store, &KeyRange::only(primary_key))?;
            Ok(Some(()))
        })
    }

    /// Replace the record at the current position. Resolves with its key.
    ///
    /// For stores with an in-line key the new value must carry the same key.
    pub fn update(&self, value: Value) -> StoreResult<Request<Key>> {
        let primary_key = self.0.begin_write()?;
        let store = self.0.source.store_name().to_string();

        let inline = self.0.engine.key_path(&store)?;
        if let Some(path) = &inline {
            let key = evaluate_key_path(&value, path)
                .ok_or_else(|| StoreError::data(format!("updated record has no value at key path '{}'", path)))
                .and_then(Key::from_json)?;
            if key != primary_key {
                return Err(StoreError::data(format!(
                    "update would change the record's key from {} to {}",
                    primary_key, key
                )));
            }
        }

        let state = Arc::clone(&self.0.state);
        queue_request(&self.0.engine, "cursor.update", move |engine| {
            let explicit = if inline.is_some() { None } else { Some(primary_key) };
            let key = engine.put(&store, value.clone(), explicit, true)?;
            let mut state = state.lock();
            if state.primary_key.as_ref() == Some(&key) {
                state.value = Some(value);
            }
            Ok(Some(key))
        })
    }
}

impl fmt::Debug for StoreCursorWithValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreCursorWithValue").field(&self.0).finish()
    }
}

impl RawCursor for StoreCursorWithValue {
    type Key = Key;
    type Source = CursorSource;
    type Error = StoreError;
    type Request = Request<StoreCursorWithValue>;

    fn direction(&self) -> Direction {
        self.0.direction()
    }

    fn key(&self) -> Option<Key> {
        self.0.key()
    }

    fn primary_key(&self) -> Option<Key> {
        self.0.primary_key()
    }

    fn source(&self) -> CursorSource {
        self.0.source.clone()
    }

    fn advance(&self, count: u32) -> StoreResult<()> {
        self.0.advance(count)
    }

    fn continue_cursor(&self, key: Option<Key>) -> StoreResult<()> {
        self.0.continue_cursor(key)
    }

    fn continue_primary_key(&self, key: Key, primary_key: Key) -> StoreResult<()> {
        self.0.continue_primary_key(key, primary_key)
    }
}

impl RawValueCursor for StoreCursorWithValue {
    type Value = Value;
    type DeleteRequest = Request<()>;
    type UpdateRequest = Request<Key>;

    fn value(&self) -> Value {
        StoreCursorWithValue::value(self)
    }

    fn delete(&self) -> StoreResult<Request<()>> {
        StoreCursorWithValue::delete(self)
    }

    fn update(&self, value: Value) -> StoreResult<Request<Key>> {
        StoreCursorWithValue::update(self, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::database::Database;
    use crate::engine::ObjectStoreParams;
    use crate::protocol::EventRequest;
    use serde_json::json;

    /// Store "books" with keys 1..=3 and an index "by_genre" (x, x, y).
    fn seeded() -> Database {
        let db = Database::open("cursor-tests", Config::default()).unwrap();
        let store = db.create_object_store("books", ObjectStoreParams::default()).unwrap();
        store.create_index("by_genre", "genre", false).unwrap();
        for (pk, genre) in [(1, "x"), (2, "x"), (3, "y")] {
            store.put(json!({ "genre": genre, "n": pk }), Some(Key::from(pk))).unwrap();
        }
        db.event_loop().run_until_idle();
        db
    }

    fn open(db: &Database, direction: Direction) -> StoreCursorWithValue {
        let request = db.object_store("books").unwrap().open_cursor(None, direction).unwrap();
        db.event_loop().run_until_idle();
        request.result().expect("cursor should land on a record")
    }

    #[test]
    fn test_open_lands_on_first_record() {
        let db = seeded();
        let cursor = open(&db, Direction::Next);
        assert_eq!(cursor.key(), Some(Key::from(1)));
        assert_eq!(cursor.primary_key(), Some(Key::from(1)));
        assert_eq!(cursor.value(), json!({"genre": "x", "n": 1}));
    }

    #[test]
    fn test_open_on_empty_range_is_null() {
        let db = seeded();
        let range = KeyRange::lower_bound(Key::from(10), false);
        let request = db.object_store("books").unwrap().open_cursor(Some(range), Direction::Next).unwrap();
        db.event_loop().run_until_idle();
        assert!(!request.is_pending());
        assert!(request.result().is_none());
        assert!(request.error().is_none());
    }

    #[test]
    fn test_steps_report_through_open_request() {
        let db = seeded();
        let request = db.object_store("books").unwrap().open_cursor(None, Direction::Prev).unwrap();
        db.event_loop().run_until_idle();
        let cursor = request.result().unwrap();
        assert_eq!(cursor.key(), Some(Key::from(3)));

        cursor.advance(2).unwrap();
        assert!(request.is_pending());
        db.event_loop().run_until_idle();
        assert_eq!(cursor.key(), Some(Key::from(1)));

        cursor.continue_cursor(None).unwrap();
        db.event_loop().run_until_idle();
        assert!(request.result().is_none());
        assert_eq!(cursor.key(), None);
        assert_eq!(cursor.value(), Value::Null);
    }

    #[test]
    fn test_second_step_while_iterating_is_refused() {
        let db = seeded();
        let cursor = open(&db, Direction::Next);
        cursor.continue_cursor(None).unwrap();
        let err = cursor.continue_cursor(None).unwrap_err();
        assert_eq!(err.name(), "InvalidStateError");
    }

    #[test]
    fn test_argument_validation() {
        let db = seeded();
        let cursor = open(&db, Direction::Next);
        assert_eq!(cursor.advance(0).unwrap_err().name(), "TypeError");
        assert_eq!(cursor.continue_cursor(Some(Key::from(1))).unwrap_err().name(), "DataError");
        assert_eq!(
            cursor.continue_primary_key(Key::from(2), Key::from(2)).unwrap_err().name(),
            "InvalidAccessError"
        );
        // Refused primitives leave the cursor usable
        cursor.continue_cursor(Some(Key::from(3))).unwrap();
        db.event_loop().run_until_idle();
        assert_eq!(cursor.key(), Some(Key::from(3)));
    }

    #[test]
    fn test_index_continue_primary_key() {
        let db = seeded();
        let index = db.object_store("books").unwrap().index("by_genre").unwrap();
        let request = index.open_cursor(None, Direction::Next).unwrap();
        db.event_loop().run_until_idle();
        let cursor = request.result().unwrap();
        assert_eq!(cursor.key(), Some(Key::from("x")));
        assert_eq!(cursor.primary_key(), Some(Key::from(1)));

        cursor.continue_primary_key(Key::from("x"), Key::from(2)).unwrap();
        db.event_loop().run_until_idle();
        assert_eq!(cursor.primary_key(), Some(Key::from(2)));

        let err = cursor.continue_primary_key(Key::from("x"), Key::from(1)).unwrap_err();
        assert_eq!(err.name(), "DataError");
    }

    #[test]
    fn test_update_and_delete() {
        let db = seeded();
        let cursor = open(&db, Direction::Next);

        let update = cursor.update(json!({"genre": "z", "n": 10})).unwrap();
        db.event_loop().run_until_idle();
        assert_eq!(update.result(), Some(Key::from(1)));
        assert_eq!(cursor.value(), json!({"genre": "z", "n": 10}));

        let delete = cursor.delete().unwrap();
        db.event_loop().run_until_idle();
        assert_eq!(delete.result(), Some(()));

        cursor.continue_cursor(None).unwrap();
        db.event_loop().run_until_idle();
        assert_eq!(cursor.key(), Some(Key::from(2)));

        let count = db.object_store("books").unwrap().count(None).unwrap();
        db.event_loop().run_until_idle();
        assert_eq!(count.result(), Some(2));
    }

    #[test]
    fn test_key_cursor_cannot_write() {
        let db = seeded();
        let request = db.object_store("books").unwrap().open_key_cursor(None, Direction::Next).unwrap();
        db.event_loop().run_until_idle();
        let cursor = request.result().unwrap();
        assert_eq!(cursor.key(), Some(Key::from(1)));
        assert!(cursor.begin_write().is_err());
    }

    #[test]
    fn test_advance_limit_follows_config() {
        let db = Database::open("limits", Config::embedded()).unwrap();
        let store = db.create_object_store("s", ObjectStoreParams::default()).unwrap();
        store.put(json!(1), Some(Key::from(1))).unwrap();
        let request = store.open_cursor(None, Direction::Next).unwrap();
        db.event_loop().run_until_idle();
        let cursor = request.result().unwrap();

        let limit = Config::embedded().max_advance_count;
        assert_eq!(cursor.advance(limit + 1).unwrap_err().name(), "TypeError");
        cursor.advance(limit).unwrap();
        db.event_loop().run_until_idle();
        assert!(request.result().is_none());
        assert!(request.error().is_none());
    }

    #[test]
    fn test_unlimited_advance_on_desktop() {
        let db = seeded();
        let cursor = open(&db, Direction::Next);
        cursor.advance(u32::MAX).unwrap();
        db.event_loop().run_until_idle();
        assert_eq!(cursor.key(), None);
    }

    #[test]
    fn test_step_over_deleted_store_fails() {
        let db = seeded();
        let request = db.object_store("books").unwrap().open_cursor(None, Direction::Next).unwrap();
        db.event_loop().run_until_idle();
        let cursor = request.result().unwrap();

        cursor.continue_cursor(None).unwrap();
        db.delete_object_store("books").unwrap();
        db.event_loop().run_until_idle();
        assert!(request.result().is_none());
        assert_eq!(request.error().map(|e| e.name()), Some("NotFoundError"));
        assert_eq!(cursor.value(), json!({"genre": "x", "n": 1}));
    }

    #[test]
    fn test_close_aborts_queued_step() {
        let db = seeded();
        let request = db.object_store("books").unwrap().open_cursor(None, Direction::Next).unwrap();
        db.event_loop().run_until_idle();
        let cursor = request.result().unwrap();

        cursor.continue_cursor(None).unwrap();
        db.close();
        db.event_loop().run_until_idle();
        assert_eq!(request.error().map(|e| e.name()), Some("AbortError"));
    }
}
