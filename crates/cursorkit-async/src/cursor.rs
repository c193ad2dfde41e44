//! Future-returning cursor over a callback-driven [`RawCursor`].
//!
//! Each navigation call issues the underlying primitive right away, then
//! returns a future that settles when the cursor's request fires. The future
//! resolves `true` when the step lands on a record and `false` when it runs
//! past the end. Failures are returned as the underlying error, untouched.
//!
//! Navigation borrows the cursor mutably for as long as its future lives, so
//! a second operation cannot be issued before the first has been awaited or
//! dropped.

use std::future::Future;

use cursorkit_core::protocol::{EventRequest, RawCursor};
use cursorkit_core::Direction;

use crate::settle::{settle, Settlement};

/// A raw cursor bound to the request it reports through.
pub struct Cursor<C: RawCursor> {
    raw: C,
    request: C::Request,
}

impl<C: RawCursor> Cursor<C> {
    /// Wrap `raw`, which reports navigation outcomes through `request`.
    ///
    /// Only one wrapper should exist per underlying cursor.
    pub fn new(raw: C, request: C::Request) -> Self {
        Self { raw, request }
    }

    /// Traversal direction, fixed when the cursor was opened.
    pub fn direction(&self) -> Direction {
        self.raw.direction()
    }

    /// Key at the current position, `None` once exhausted.
    pub fn key(&self) -> Option<C::Key> {
        self.raw.key()
    }

    /// Primary key at the current position, `None` once exhausted.
    pub fn primary_key(&self) -> Option<C::Key> {
        self.raw.primary_key()
    }

    /// The object store or index being traversed.
    pub fn source(&self) -> C::Source {
        self.raw.source()
    }

    /// The underlying callback-driven cursor.
    pub fn raw(&self) -> &C {
        &self.raw
    }

    /// Request the underlying cursor reports through.
    pub fn request(&self) -> &C::Request {
        &self.request
    }

    /// Unwrap into the underlying cursor and its request.
    pub fn into_raw(self) -> (C, C::Request) {
        (self.raw, self.request)
    }
}

impl<C> Cursor<C>
where
    C: RawCursor,
    C::Request: 'static,
    C::Error: Send + 'static,
{
    /// Step `count` records in the cursor's direction.
    pub fn advance(&mut self, count: u32) -> impl Future<Output = Result<bool, C::Error>> + '_ {
        tracing::trace!(count, direction = %self.direction(), "cursor advance");
        self.navigate(|raw| raw.advance(count))
    }

    /// Step one record, or skip to the first record at or past `key` in the
    /// cursor's direction.
    pub fn continue_cursor(&mut self, key: Option<C::Key>) -> impl Future<Output = Result<bool, C::Error>> + '_ {
        tracing::trace!(with_key = key.is_some(), direction = %self.direction(), "cursor continue");
        self.navigate(move |raw| raw.continue_cursor(key))
    }

    /// Skip to the first record at or past (`key`, `primary_key`).
    ///
    /// Index cursors only; the underlying cursor decides what happens
    /// otherwise.
    pub fn continue_primary_key(
        &mut self,
        key: C::Key,
        primary_key: C::Key,
    ) -> impl Future<Output = Result<bool, C::Error>> + '_ {
        tracing::trace!(direction = %self.direction(), "cursor continue_primary_key");
        self.navigate(move |raw| raw.continue_primary_key(key, primary_key))
    }

    fn navigate<F>(&mut self, issue: F) -> Settlement<bool, C::Error>
    where
        F: FnOnce(&C) -> Result<(), C::Error>,
    {
        // Handlers go on first: a primitive may signal while being issued.
        let settlement = settle(&self.request, |req: &C::Request| Some(req.result().is_some()));
        match issue(&self.raw) {
            Ok(()) => settlement,
            Err(error) => {
                tracing::trace!("cursor primitive refused");
                self.request.set_onsuccess(None);
                self.request.set_onerror(None);
                Settlement::rejected(error)
            }
        }
    }
}

impl<C> std::fmt::Debug for Cursor<C>
where
    C: RawCursor + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor").field("raw", &self.raw).finish()
    }
}
