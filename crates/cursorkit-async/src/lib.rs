//! Future-returning cursors over callback-driven cursor APIs
//!
//! Wraps any [`RawCursor`](cursorkit_core::RawCursor) /
//! [`RawValueCursor`](cursorkit_core::RawValueCursor) in a [`Cursor`] or
//! [`ValueCursor`] whose operations return futures.
//!
//! # Architecture
//!
//! The raw protocol runs one operation at a time and reports back through a
//! request object's success/error callbacks. The bridge works as follows:
//! - Each operation issues its primitive synchronously, before returning
//! - One oneshot channel per operation; both callbacks hold the sender and
//!   unregister themselves when either fires
//! - Navigation resolves `true`/`false` from whether the request's result is
//!   null; errors are passed through unchanged
//! - Operations borrow the cursor mutably, so they cannot overlap

pub mod cursor;
pub mod open;
pub mod settle;
pub mod value_cursor;

pub use cursor::Cursor;
pub use open::{open_cursor, open_value_cursor};
pub use settle::Settlement;
pub use value_cursor::{CursorRecord, ValueCursor};
