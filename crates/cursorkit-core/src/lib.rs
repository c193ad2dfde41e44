//! CursorKit Core — Event-Driven Record Store
//!
//! An in-memory, IndexedDB-shaped record store whose operations complete
//! through callbacks on a cooperative event loop, plus the protocol traits
//! that cursor adapters are written against.
//!
//! # Architecture
//!
//! - **Protocol**: [`EventRequest`], [`RawCursor`] and [`RawValueCursor`]
//!   describe callback-driven requests and cursors
//! - **Requests**: every primitive returns a [`Request`] immediately and
//!   settles it later from a task on the [`EventLoop`]
//! - **Engine**: ordered records and indexes behind a single RwLock
//!
//! # No Async Runtime
//!
//! This crate never blocks and never spawns threads. Whoever owns the
//! [`EventLoop`] decides when queued work runs. Future-based adapters live in
//! separate crates (e.g. cursorkit-async).

pub mod config;
pub mod cursor;
pub mod database;
pub mod direction;
pub mod engine;
pub mod error;
pub mod event_loop;
pub mod key;
pub mod protocol;
pub mod request;

// Re-export key types for convenience
pub use config::Config;
pub use cursor::{CursorSource, StoreCursor, StoreCursorWithValue};
pub use database::{Database, Index, ObjectStore};
pub use direction::Direction;
pub use engine::{ObjectStoreParams, StoreEngine};
pub use error::{StoreError, StoreResult};
pub use event_loop::EventLoop;
pub use key::{Key, KeyRange};
pub use protocol::{EventRequest, Handler, RawCursor, RawValueCursor};
pub use request::{ReadyState, Request};
pub use serde_json::Value;
