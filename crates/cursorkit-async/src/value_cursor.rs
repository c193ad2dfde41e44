//! Cursor positioned over record values, with in-place delete and update.

use std::future::Future;
use std::ops::{Deref, DerefMut};

use cursorkit_core::protocol::{EventRequest, RawValueCursor};
use futures::Stream;

use crate::cursor::Cursor;
use crate::settle::{settle, Settlement};

/// One record produced by [`ValueCursor::into_stream`].
#[derive(Debug, Clone, PartialEq)]
pub struct CursorRecord<K, V> {
    pub key: K,
    pub primary_key: K,
    pub value: V,
}

/// A [`Cursor`] that also reads and mutates the record it is parked on.
///
/// Navigation and position accessors come from the wrapped cursor through
/// `Deref`.
pub struct ValueCursor<C: RawValueCursor> {
    cursor: Cursor<C>,
}

impl<C: RawValueCursor> ValueCursor<C> {
    /// Wrap `raw`, which reports navigation outcomes through `request`.
    pub fn new(raw: C, request: C::Request) -> Self {
        Self { cursor: Cursor::new(raw, request) }
    }

    /// Record at the current position, read from the underlying cursor on
    /// every call.
    pub fn value(&self) -> C::Value {
        self.cursor.raw().value()
    }

    /// Drop value access, keeping navigation.
    pub fn into_cursor(self) -> Cursor<C> {
        self.cursor
    }
}

impl<C> ValueCursor<C>
where
    C: RawValueCursor,
    C::Error: Send + 'static,
    C::DeleteRequest: 'static,
    C::UpdateRequest: 'static,
    C::Key: Send + 'static,
{
    /// Delete the record at the current position.
    pub fn delete(&mut self) -> impl Future<Output = Result<(), C::Error>> + '_ {
        tracing::trace!("cursor delete");
        match self.cursor.raw().delete() {
            Ok(request) => settle(&request, |_: &C::DeleteRequest| Some(())),
            Err(error) => Settlement::rejected(error),
        }
    }

    /// Replace the record at the current position. Resolves with the key the
    /// store reports for it.
    pub fn update(&mut self, value: C::Value) -> impl Future<Output = Result<C::Key, C::Error>> + '_ {
        tracing::trace!("cursor update");
        match self.cursor.raw().update(value) {
            Ok(request) => settle(&request, |req: &C::UpdateRequest| req.result()),
            Err(error) => Settlement::rejected(error),
        }
    }
}

impl<C> ValueCursor<C>
where
    C: RawValueCursor,
    C::Request: 'static,
    C::Error: Send + 'static,
{
    /// Walk forward from the current record until the cursor is exhausted.
    ///
    /// The first item is the record the cursor is parked on. A failed step
    /// is yielded as an error and ends the stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<CursorRecord<C::Key, C::Value>, C::Error>> {
        futures::stream::unfold(Some((self, true)), |state| async move {
            let (mut cursor, first) = state?;
            if !first {
                match cursor.continue_cursor(None).await {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(error) => return Some((Err(error), None)),
                }
            }
            let record = CursorRecord {
                key: cursor.key()?,
                primary_key: cursor.primary_key()?,
                value: cursor.value(),
            };
            Some((Ok(record), Some((cursor, false))))
        })
    }
}

impl<C: RawValueCursor> Deref for ValueCursor<C> {
    type Target = Cursor<C>;

    fn deref(&self) -> &Cursor<C> {
        &self.cursor
    }
}

impl<C: RawValueCursor> DerefMut for ValueCursor<C> {
    fn deref_mut(&mut self) -> &mut Cursor<C> {
        &mut self.cursor
    }
}

impl<C> std::fmt::Debug for ValueCursor<C>
where
    C: RawValueCursor + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueCursor").field("raw", self.cursor.raw()).finish()
    }
}
