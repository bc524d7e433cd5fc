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

//! Engine events.
//!
//! Callbacks registered with [`EventObserver::on_event`] see every
//! [`Event`] an engine emits. Delivery is synchronous on the task that
//! produced the event, so callbacks should be quick. There is no
//! back-pressure: a slow callback slows the engine down.
//!
//! # Examples
//!
//! ```rust
//! use nanomessage::events::{Event, EventObserver};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! let observer = EventObserver::new();
//! let ended = Arc::new(AtomicU64::new(0));
//! let ended_clone = ended.clone();
//!
//! observer.on_event(move |event| {
//!     if matches!(event, Event::RequestEnded { .. }) {
//!         ended_clone.fetch_add(1, Ordering::Relaxed);
//!     }
//! });
//!
//! observer.notify(&Event::Closed);
//! assert_eq!(ended.load(Ordering::Relaxed), 0);
//! ```

use crate::codec::MessageInfo;
use crate::error::NanomessageError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Something that happened inside an engine.
#[derive(Debug, Clone)]
pub enum Event {
    /// A request was registered.
    RequestCreated {
        /// The outgoing request.
        info: MessageInfo,
    },
    /// A request frame was handed to the transport.
    RequestSent {
        /// The outgoing request.
        info: MessageInfo,
    },
    /// A request finished, successfully or not.
    RequestEnded {
        /// The outgoing request.
        info: MessageInfo,
        /// Why it failed, if it did.
        error: Option<NanomessageError>,
    },
    /// A request from the remote side was accepted for handling.
    RequestReceived {
        /// The incoming request.
        info: MessageInfo,
    },
    /// An ephemeral message was handled successfully.
    ///
    /// Emitted only after the handler returned `Ok`, and never for
    /// requests, which report [`RequestReceived`](Self::RequestReceived)
    /// instead. A failing handler emits [`MessageError`](Self::MessageError).
    Message {
        /// The incoming message.
        info: MessageInfo,
    },
    /// Handling an ephemeral message or answering a request failed.
    MessageError {
        /// The incoming message.
        info: MessageInfo,
        /// The handler failure.
        error: NanomessageError,
    },
    /// Incoming bytes could not be decoded into a frame.
    DecodeError(NanomessageError),
    /// The engine detached from the transport.
    Unsubscribe,
    /// The engine finished closing.
    Closed,
}

impl Event {
    /// Short name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestCreated { .. } => "request-created",
            Self::RequestSent { .. } => "request-sent",
            Self::RequestEnded { .. } => "request-ended",
            Self::RequestReceived { .. } => "request-received",
            Self::Message { .. } => "message",
            Self::MessageError { .. } => "message-error",
            Self::DecodeError(_) => "decode-error",
            Self::Unsubscribe => "unsubscribe",
            Self::Closed => "closed",
        }
    }
}

/// Type alias for event callback functions.
pub type EventCallback = dyn Fn(&Event) + Send + Sync;

/// A list of event callbacks.
#[derive(Clone, Default)]
pub struct EventObserver {
    callbacks: Arc<Mutex<Vec<Arc<EventCallback>>>>,
}

impl EventObserver {
    /// Creates an observer with no callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for every subsequent event.
    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.callbacks.lock().push(Arc::new(callback));
    }

    /// Delivers `event` to every registered callback.
    ///
    /// Callbacks may register further callbacks; those see the next event.
    pub fn notify(&self, event: &Event) {
        let callbacks: Vec<_> = self.callbacks.lock().clone();
        for callback in callbacks {
            callback(event);
        }
    }

    /// Returns `true` if any callback is registered.
    pub fn has_callbacks(&self) -> bool {
        !self.callbacks.lock().is_empty()
    }

    /// Removes every callback.
    pub fn clear(&self) {
        self.callbacks.lock().clear();
    }
}

impl std::fmt::Debug for EventObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventObserver")
            .field("callback_count", &self.callbacks.lock().len())
            .finish()
    }
}
