//! Turning one request callback pair into one future.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use cursorkit_core::protocol::EventRequest;
use futures::channel::oneshot;
use parking_lot::Mutex;

type Outcome<T, E> = Result<T, E>;

enum State<T, E> {
    Waiting(oneshot::Receiver<Outcome<T, E>>),
    Ready(Option<Outcome<T, E>>),
    /// The request can no longer signal; stays pending for good
    Stalled,
}

/// Future settled by a request's success or error callback.
///
/// Never resolves if the request never signals.
#[must_use = "futures do nothing unless awaited"]
pub struct Settlement<T, E> {
    state: State<T, E>,
}

// No field is ever pinned in place.
impl<T, E> Unpin for Settlement<T, E> {}

impl<T, E> Settlement<T, E> {
    /// Already failed, for primitives refused while being issued.
    pub fn rejected(error: E) -> Self {
        Self { state: State::Ready(Some(Err(error))) }
    }

    /// Already succeeded.
    pub fn resolved(value: T) -> Self {
        Self { state: State::Ready(Some(Ok(value))) }
    }
}

impl<T, E> Future for Settlement<T, E> {
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            State::Waiting(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(outcome)) => {
                    self.state = State::Ready(None);
                    Poll::Ready(outcome)
                }
                Poll::Ready(Err(oneshot::Canceled)) => {
                    tracing::trace!("request dropped its callbacks without signalling");
                    self.state = State::Stalled;
                    Poll::Pending
                }
                Poll::Pending => Poll::Pending,
            },
            State::Ready(outcome) => match outcome.take() {
                Some(outcome) => Poll::Ready(outcome),
                None => Poll::Pending,
            },
            State::Stalled => Poll::Pending,
        }
    }
}

impl<T, E> std::fmt::Debug for Settlement<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Waiting(_) => "waiting",
            State::Ready(Some(_)) => "ready",
            State::Ready(None) => "taken",
            State::Stalled => "stalled",
        };
        f.debug_struct("Settlement").field("state", &state).finish()
    }
}

/// Register success and error handlers on `request` and return the future
/// they settle.
///
/// On success, `on_success` reads the outcome off the request. On error the
/// future fails with `request.error()`, passed through unchanged. Whichever
/// handler fires first unregisters both, so the request is left clean for the
/// next operation routed through it.
pub fn settle<R, T, F>(request: &R, on_success: F) -> Settlement<T, R::Error>
where
    R: EventRequest + 'static,
    R::Error: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&R) -> Option<T> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let sender = Arc::new(Mutex::new(Some(tx)));

    let success_sender = Arc::clone(&sender);
    let mut on_success = Some(on_success);
    request.set_onsuccess(Some(Box::new(move |req: &R| {
        req.set_onsuccess(None);
        req.set_onerror(None);
        let (Some(tx), Some(read)) = (success_sender.lock().take(), on_success.take()) else {
            return;
        };
        match read(req) {
            Some(value) => {
                let _ = tx.send(Ok(value));
            }
            None => tracing::warn!("request signalled success without a result; leaving it unsettled"),
        }
    })));

    let error_sender = sender;
    request.set_onerror(Some(Box::new(move |req: &R| {
        req.set_onsuccess(None);
        req.set_onerror(None);
        let Some(tx) = error_sender.lock().take() else {
            return;
        };
        match req.error() {
            Some(error) => {
                let _ = tx.send(Err(error));
            }
            None => tracing::warn!("request signalled an error without one; leaving it unsettled"),
        }
    })));

    Settlement { state: State::Waiting(rx) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cursorkit_core::{Config, Database, Key, ObjectStoreParams, Value};

    fn store() -> (Database, cursorkit_core::ObjectStore) {
        let db = Database::open("settle-tests", Config::default()).unwrap();
        let store = db.create_object_store("s", ObjectStoreParams::default()).unwrap();
        (db, store)
    }

    #[test]
    fn test_success_resolves_with_read_value() {
        let (db, store) = store();
        let request = store.put(Value::from(1), Some(Key::from(7))).unwrap();
        let settlement = settle(&request, |req| req.result());
        assert_eq!(db.event_loop().run(settlement), Some(Ok(Key::from(7))));
    }

    #[test]
    fn test_error_passes_through_unchanged() {
        let (db, store) = store();
        store.add(Value::from(1), Some(Key::from(1))).unwrap();
        let request = store.add(Value::from(2), Some(Key::from(1))).unwrap();
        let settlement = settle(&request, |req| req.result());
        let err = db.event_loop().run(settlement).unwrap().unwrap_err();
        assert_eq!(Some(err), request.error());
    }

    #[test]
    fn test_missing_result_never_settles() {
        let (db, store) = store();
        let request = store.get(Key::from(99)).unwrap();
        let settlement = settle(&request, |req| req.result());
        assert_eq!(db.event_loop().run(settlement), None);
    }

    #[test]
    fn test_ready_settlements() {
        let (db, _store) = store();
        let ok: Settlement<u8, ()> = Settlement::resolved(3);
        assert_eq!(db.event_loop().run(ok), Some(Ok(3)));
        let err: Settlement<u8, &str> = Settlement::rejected("boom");
        assert_eq!(db.event_loop().run(err), Some(Err("boom")));
    }
}
