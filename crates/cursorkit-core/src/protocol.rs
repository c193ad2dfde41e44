//! The callback protocol consumed by cursor adapters.
//!
//! These traits describe an IndexedDB-shaped API: primitives are issued
//! synchronously, and their outcome arrives later through a request object
//! that fires exactly one of its success or error callbacks. The in-memory
//! store in this crate implements them; adapters are written against the
//! traits only.

use crate::direction::Direction;

/// Callback registered on a request. Receives the request that fired it.
pub type Handler<R> = Box<dyn FnMut(&R) + Send>;

/// A request whose outcome is delivered through success/error callbacks.
///
/// The request is a single-slot mailbox: each new operation routed through it
/// overwrites `result` and `error`.
pub trait EventRequest: Sized {
    /// Value stored in `result` on success
    type Output;
    /// Value stored in `error` on failure
    type Error;

    /// True until the current operation has completed.
    fn is_pending(&self) -> bool;

    /// Latest successful result. `None` is the null result.
    fn result(&self) -> Option<Self::Output>;

    /// Latest failure, if the last operation failed.
    fn error(&self) -> Option<Self::Error>;

    /// Replace the success callback. `None` unregisters it.
    fn set_onsuccess(&self, handler: Option<Handler<Self>>);

    /// Replace the error callback. `None` unregisters it.
    fn set_onerror(&self, handler: Option<Handler<Self>>);
}

/// A positionable iterator over keys.
///
/// Navigation primitives return immediately. `Err` means the primitive was
/// refused outright; otherwise the cursor's request later reports the new
/// position (non-null result), exhaustion (null result) or a failure.
pub trait RawCursor {
    type Key;
    /// Identity of the traversed object store or index
    type Source;
    type Error;
    /// Request this cursor reports navigation outcomes through
    type Request: EventRequest<Error = Self::Error>;

    fn direction(&self) -> Direction;

    /// Key at the current position, `None` once exhausted.
    fn key(&self) -> Option<Self::Key>;

    /// Primary key at the current position, `None` once exhausted.
    fn primary_key(&self) -> Option<Self::Key>;

    fn source(&self) -> Self::Source;

    /// Step `count` records in the cursor's direction.
    fn advance(&self, count: u32) -> Result<(), Self::Error>;

    /// Step one record, or jump to the first record at or past `key`.
    fn continue_cursor(&self, key: Option<Self::Key>) -> Result<(), Self::Error>;

    /// Jump to the first record at or past (`key`, `primary_key`).
    fn continue_primary_key(&self, key: Self::Key, primary_key: Self::Key) -> Result<(), Self::Error>;
}

/// A cursor that also carries the record value and can mutate it.
pub trait RawValueCursor: RawCursor {
    type Value;
    type DeleteRequest: EventRequest<Output = (), Error = Self::Error>;
    type UpdateRequest: EventRequest<Output = Self::Key, Error = Self::Error>;

    /// Record at the current position.
    fn value(&self) -> Self::Value;

    /// Delete the record at the current position.
    fn delete(&self) -> Result<Self::DeleteRequest, Self::Error>;

    /// Replace the record at the current position.
    fn update(&self, value: Self::Value) -> Result<Self::UpdateRequest, Self::Error>;
}
