//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! A single in-flight request.

use crate::codec::{Context, MessageInfo};
use crate::error::NanomessageError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Outcome delivered to the caller of a request.
pub type RequestOutcome<T> = Result<T, NanomessageError>;

/// Receiving half of a request's completion.
pub type Completion<T> = oneshot::Receiver<RequestOutcome<T>>;

/// Called once on the terminal transition with the request id and, for a
/// rejection, the error.
pub type FinishHook = Box<dyn FnOnce(u64, Option<&NanomessageError>) + Send>;

/// Called with the request id when the request is cancelled.
pub type CancelHook = Arc<dyn Fn(u64) + Send + Sync>;

/// Lifecycle of a [`Request`]. Transitions out of `Pending` happen once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Waiting for a response.
    Pending,
    /// Completed with a response payload.
    Resolved,
    /// Completed with an error.
    Rejected,
}

/// An outstanding request awaiting its response.
///
/// The handle is cheap to clone; all clones share one state machine. The
/// first of [`resolve`](Self::resolve), [`reject`](Self::reject), the
/// timeout or a cancellation wins, and later attempts are ignored.
///
/// # Example
///
/// ```rust
/// use nanomessage::correlation::Request;
///
/// # async fn example() {
/// let (request, completion) = Request::<String>::new(1, None, None);
/// request.start();
///
/// assert!(request.resolve("pong".to_string()));
/// assert!(!request.resolve("late".to_string()));
///
/// assert_eq!(completion.await.unwrap(), Ok("pong".to_string()));
/// # }
/// ```
pub struct Request<T> {
    inner: Arc<RequestInner<T>>,
}

struct RequestInner<T> {
    id: u64,
    timeout: Option<Duration>,
    context: Option<Context>,
    slot: Mutex<Slot<T>>,
    settled: watch::Sender<bool>,
}

struct Slot<T> {
    state: RequestState,
    completion: Option<oneshot::Sender<RequestOutcome<T>>>,
    timer: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
    on_finish: Option<FinishHook>,
    on_cancel: Option<CancelHook>,
    error: Option<NanomessageError>,
}

impl<T> Clone for Request<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.inner.id)
            .field("timeout", &self.inner.timeout)
            .field("state", &self.inner.slot.lock().state)
            .finish()
    }
}

impl<T: Send + 'static> Request<T> {
    /// Creates a pending request and the receiver of its outcome.
    pub fn new(
        id: u64,
        timeout: Option<Duration>,
        context: Option<Context>,
    ) -> (Self, Completion<T>) {
        let (tx, rx) = oneshot::channel();
        let (settled, _) = watch::channel(false);
        let request = Self {
            inner: Arc::new(RequestInner {
                id,
                timeout,
                context,
                slot: Mutex::new(Slot {
                    state: RequestState::Pending,
                    completion: Some(tx),
                    timer: None,
                    watcher: None,
                    on_finish: None,
                    on_cancel: None,
                    error: None,
                }),
                settled,
            }),
        };
        (request, rx)
    }

    /// Correlation id.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Configured timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    /// Current state.
    pub fn state(&self) -> RequestState {
        self.inner.slot.lock().state
    }

    /// Returns `true` once the request left [`RequestState::Pending`].
    pub fn is_finished(&self) -> bool {
        self.state() != RequestState::Pending
    }

    /// The rejection error, once rejected.
    pub fn error(&self) -> Option<NanomessageError> {
        self.inner.slot.lock().error.clone()
    }

    /// Metadata describing this request as an outgoing frame.
    pub fn info(&self) -> MessageInfo {
        MessageInfo {
            id: self.inner.id,
            response: false,
            error: false,
            context: self.inner.context.clone(),
        }
    }

    /// Registers the hook run on the terminal transition.
    ///
    /// Runs immediately if the request already finished.
    pub fn on_finish(&self, hook: impl FnOnce(u64, Option<&NanomessageError>) + Send + 'static) {
        let mut slot = self.inner.slot.lock();
        if slot.state == RequestState::Pending {
            slot.on_finish = Some(Box::new(hook));
            return;
        }
        let error = slot.error.clone();
        drop(slot);
        hook(self.inner.id, error.as_ref());
    }

    /// Registers the notification run when the request is cancelled.
    pub fn on_cancel(&self, hook: CancelHook) {
        self.inner.slot.lock().on_cancel = Some(hook);
    }

    /// Arms the timeout timer. Does nothing without a timeout.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let Some(timeout) = self.inner.timeout else {
            return;
        };

        let weak = Arc::downgrade(&self.inner);
        let id = self.inner.id;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(request) = upgrade(&weak) {
                tracing::debug!(request_id = id, ?timeout, "Request timed out");
                request.reject(NanomessageError::Timeout { id });
            }
        });

        let mut slot = self.inner.slot.lock();
        if slot.state == RequestState::Pending {
            slot.timer = Some(timer);
        } else {
            timer.abort();
        }
    }

    /// Cancels the request when `token` is cancelled.
    ///
    /// A token that is already cancelled cancels the request right away.
    pub fn watch(&self, token: CancellationToken) {
        if token.is_cancelled() {
            self.cancel(None);
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let watcher = tokio::spawn(async move {
            token.cancelled().await;
            if let Some(request) = upgrade(&weak) {
                request.cancel(None);
            }
        });

        let mut slot = self.inner.slot.lock();
        if slot.state == RequestState::Pending {
            if let Some(previous) = slot.watcher.replace(watcher) {
                previous.abort();
            }
        } else {
            watcher.abort();
        }
    }

    /// Completes the request with `data`. Returns `false` if it had already
    /// finished.
    pub fn resolve(&self, data: T) -> bool {
        self.finish(RequestState::Resolved, Ok(data))
    }

    /// Completes the request with `error`. Returns `false` if it had already
    /// finished.
    pub fn reject(&self, error: NanomessageError) -> bool {
        self.finish(RequestState::Rejected, Err(error))
    }

    /// Rejects the request with [`NanomessageError::Cancel`].
    pub fn cancel(&self, reason: Option<String>) -> bool {
        let id = self.inner.id;
        let on_cancel = self.inner.slot.lock().on_cancel.clone();
        if !self.reject(NanomessageError::Cancel { id, reason }) {
            return false;
        }
        tracing::debug!(request_id = id, "Request cancelled");
        if let Some(hook) = on_cancel {
            hook(id);
        }
        true
    }

    /// Waits until the request is no longer pending and its finish hook ran.
    pub async fn settled(&self) {
        let mut rx = self.inner.settled.subscribe();
        let _ = rx.wait_for(|settled| *settled).await;
    }

    fn finish(&self, state: RequestState, outcome: RequestOutcome<T>) -> bool {
        let (completion, timer, watcher, on_finish) = {
            let mut slot = self.inner.slot.lock();
            if slot.state != RequestState::Pending {
                return false;
            }
            slot.state = state;
            slot.on_cancel = None;
            if let Err(error) = &outcome {
                slot.error = Some(error.clone());
            }
            (
                slot.completion.take(),
                slot.timer.take(),
                slot.watcher.take(),
                slot.on_finish.take(),
            )
        };

        if let Some(timer) = timer {
            timer.abort();
        }
        if let Some(watcher) = watcher {
            watcher.abort();
        }
        if let Some(hook) = on_finish {
            hook(self.inner.id, outcome.as_ref().err());
        }
        if let Some(tx) = completion {
            // The caller may have stopped listening.
            let _ = tx.send(outcome);
        }
        self.inner.settled.send_replace(true);
        true
    }
}

fn upgrade<T>(weak: &Weak<RequestInner<T>>) -> Option<Request<T>> {
    weak.upgrade().map(|inner| Request { inner })
}
