//! Requests: the mailbox through which every store primitive reports back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::StoreError;
use crate::protocol::{EventRequest, Handler};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Whether the current operation on a request has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Pending,
    Done,
}

#[derive(Clone, Copy)]
enum Event {
    Success,
    Error,
}

/// A callback slot. The generation changes on every replacement so a firing
/// handler that replaces or clears itself is not put back afterwards.
struct HandlerSlot<T> {
    handler: Option<Handler<Request<T>>>,
    generation: u64,
}

impl<T> HandlerSlot<T> {
    fn empty() -> Self {
        Self { handler: None, generation: 0 }
    }

    fn replace(&mut self, handler: Option<Handler<Request<T>>>) {
        self.generation += 1;
        self.handler = handler;
    }
}

struct RequestState<T> {
    ready_state: ReadyState,
    result: Option<T>,
    error: Option<StoreError>,
    onsuccess: HandlerSlot<T>,
    onerror: HandlerSlot<T>,
}

impl<T> RequestState<T> {
    fn slot_mut(&mut self, event: Event) -> &mut HandlerSlot<T> {
        match event {
            Event::Success => &mut self.onsuccess,
            Event::Error => &mut self.onerror,
        }
    }
}

/// Shared handle to a request. Clones observe the same state.
pub struct Request<T> {
    id: u64,
    state: Arc<Mutex<RequestState<T>>>,
}

/// Non-owning handle, held by cursors so a request and the cursor in its
/// result do not keep each other alive.
pub(crate) struct WeakRequest<T> {
    id: u64,
    state: Weak<Mutex<RequestState<T>>>,
}

impl<T> Request<T> {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            state: Arc::new(Mutex::new(RequestState {
                ready_state: ReadyState::Pending,
                result: None,
                error: None,
                onsuccess: HandlerSlot::empty(),
                onerror: HandlerSlot::empty(),
            })),
        }
    }

    /// Process-unique id, used in log output.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn ready_state(&self) -> ReadyState {
        self.state.lock().ready_state
    }

    pub fn error(&self) -> Option<StoreError> {
        self.state.lock().error.clone()
    }

    pub fn set_onsuccess(&self, handler: Option<Handler<Self>>) {
        self.state.lock().onsuccess.replace(handler);
    }

    pub fn set_onerror(&self, handler: Option<Handler<Self>>) {
        self.state.lock().onerror.replace(handler);
    }

    pub(crate) fn downgrade(&self) -> WeakRequest<T> {
        WeakRequest { id: self.id, state: Arc::downgrade(&self.state) }
    }

    /// Start a new operation on this request.
    pub(crate) fn reset(&self) {
        let mut state = self.state.lock();
        state.ready_state = ReadyState::Pending;
        state.result = None;
        state.error = None;
    }

    /// Complete with `result` (`None` is the null result) and fire `onsuccess`.
    pub(crate) fn succeed(&self, result: Option<T>) {
        {
            let mut state = self.state.lock();
            state.ready_state = ReadyState::Done;
            state.result = result;
            state.error = None;
        }
        self.fire(Event::Success);
    }

    /// Complete with `error` and fire `onerror`.
    pub(crate) fn fail(&self, error: StoreError) {
        tracing::trace!(request = self.id, error = %error, "request failed");
        {
            let mut state = self.state.lock();
            state.ready_state = ReadyState::Done;
            state.result = None;
            state.error = Some(error);
        }
        self.fire(Event::Error);
    }

    /// Invoke a callback without holding the state lock, so the callback may
    /// read the request and re-register handlers.
    fn fire(&self, event: Event) {
        let (handler, generation) = {
            let mut state = self.state.lock();
            let slot = state.slot_mut(event);
            (slot.handler.take(), slot.generation)
        };
        let Some(mut handler) = handler else {
            return;
        };

        handler(self);

        let mut state = self.state.lock();
        let slot = state.slot_mut(event);
        if slot.generation == generation && slot.handler.is_none() {
            slot.handler = Some(handler);
        }
    }
}

impl<T: Clone> Request<T> {
    /// Latest result. `None` while pending, after a failure, or for a null result.
    pub fn result(&self) -> Option<T> {
        self.state.lock().result.clone()
    }
}

impl<T> Clone for Request<T> {
    fn clone(&self) -> Self {
        Self { id: self.id, state: Arc::clone(&self.state) }
    }
}

impl<T> std::fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("ready_state", &self.ready_state())
            .finish()
    }
}

impl<T> WeakRequest<T> {
    pub(crate) fn upgrade(&self) -> Option<Request<T>> {
        self.state.upgrade().map(|state| Request { id: self.id, state })
    }
}

impl<T> Clone for WeakRequest<T> {
    fn clone(&self) -> Self {
        Self { id: self.id, state: Weak::clone(&self.state) }
    }
}

impl<T: Clone> EventRequest for Request<T> {
    type Output = T;
    type Error = StoreError;

    fn is_pending(&self) -> bool {
        self.ready_state() == ReadyState::Pending
    }

    fn result(&self) -> Option<T> {
        Request::result(self)
    }

    fn error(&self) -> Option<StoreError> {
        Request::error(self)
    }

    fn set_onsuccess(&self, handler: Option<Handler<Self>>) {
        Request::set_onsuccess(self, handler)
    }

    fn set_onerror(&self, handler: Option<Handler<Self>>) {
        Request::set_onerror(self, handler)
    }
}
