//! Awaiting an open-cursor request.

use std::future::Future;

use cursorkit_core::protocol::{EventRequest, RawCursor, RawValueCursor};

use crate::cursor::Cursor;
use crate::settle::{settle, Settlement};
use crate::value_cursor::ValueCursor;

/// Settlement for the first outcome of an open request. A request that has
/// already completed settles immediately from its current result or error.
fn first_outcome<R>(request: &R) -> Settlement<Option<R::Output>, R::Error>
where
    R: EventRequest + 'static,
    R::Output: Send + 'static,
    R::Error: Send + 'static,
{
    if request.is_pending() {
        return settle(request, |req: &R| Some(req.result()));
    }
    match request.error() {
        Some(error) => Settlement::rejected(error),
        None => Settlement::resolved(request.result()),
    }
}

/// Wait for an open request to land and wrap the cursor it produced.
///
/// Resolves `None` when the range is empty. Handlers are registered before
/// this returns, so the request may be dispatched before the future is
/// first polled.
pub fn open_cursor<R>(request: R) -> impl Future<Output = Result<Option<Cursor<R::Output>>, R::Error>>
where
    R: EventRequest + 'static,
    R::Output: RawCursor<Request = R> + Send + 'static,
    R::Error: Send + 'static,
{
    let outcome = first_outcome(&request);
    async move {
        let raw = outcome.await?;
        tracing::trace!(found = raw.is_some(), "cursor opened");
        Ok(raw.map(|raw| Cursor::new(raw, request)))
    }
}

/// Like [`open_cursor`], for cursors that carry record values.
pub fn open_value_cursor<R>(request: R) -> impl Future<Output = Result<Option<ValueCursor<R::Output>>, R::Error>>
where
    R: EventRequest + 'static,
    R::Output: RawValueCursor<Request = R> + Send + 'static,
    R::Error: Send + 'static,
{
    let outcome = first_outcome(&request);
    async move {
        let raw = outcome.await?;
        tracing::trace!(found = raw.is_some(), "value cursor opened");
        Ok(raw.map(|raw| ValueCursor::new(raw, request)))
    }
}
