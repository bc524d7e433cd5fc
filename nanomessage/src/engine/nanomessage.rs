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

use super::handler::{MessageHandler, Payload, Reply};
use super::options::{IncomingOptions, PendingRequest, RequestOptions, SendOptions};
use super::{Concurrency, NanomessageBuilder, NanomessageConfig};
use crate::backpressure::{QueueMetrics, WorkQueue};
use crate::codec::{Codec, Frame, FrameBody, MessageInfo};
use crate::correlation::{Request, RequestRegistry};
use crate::encoding::{PostcardEncoding, ValueEncoding};
use crate::error::{BoxError, Metadata, NanomessageError};
use crate::events::{Event, EventObserver};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::transport::{IncomingSink, Transport, Unsubscribe};
use bytes::Bytes;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A request/response engine over one duplex [`Transport`].
///
/// `Nanomessage` turns a channel that only moves bytes into a messaging
/// primitive: [`request`](Self::request) sends a value and resolves with
/// the one response the remote side sends back, while incoming requests
/// are answered by the registered [`MessageHandler`]. Both ends of a
/// channel run an engine; either side may issue requests.
///
/// The handle is cheap to clone. Every clone drives the same engine.
///
/// # Examples
///
/// ```rust
/// use nanomessage::{handler_fn, BoxError, Nanomessage, Reply};
/// use nanomessage::codec::MessageInfo;
/// use nanomessage::transport::MemoryTransport;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (left, right) = MemoryTransport::pair();
///
/// let alice = Nanomessage::<String>::builder(left).build();
/// let bob = Nanomessage::<String>::builder(right)
///     .with_message_handler(handler_fn(|data: String, _info: MessageInfo| async move {
///         Ok::<_, BoxError>(Reply::Data(format!("{data} world")))
///     }))
///     .build();
///
/// alice.open().await?;
/// bob.open().await?;
///
/// assert_eq!(alice.request("hello".to_string()).await?, "hello world");
///
/// alice.close().await;
/// bob.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Nanomessage<T, S = PostcardEncoding> {
    inner: Arc<Inner<T, S>>,
}

struct Inner<T, S> {
    codec: Codec<S>,
    transport: Arc<dyn Transport>,
    handler: RwLock<Option<Arc<dyn MessageHandler<T>>>>,
    timeout: Mutex<Option<Duration>>,
    registry: Mutex<RequestRegistry<T>>,
    outgoing: WorkQueue,
    incoming: WorkQueue,
    lifecycle: Lifecycle,
    unsubscribe: Mutex<Option<Unsubscribe>>,
    events: EventObserver,
}

impl<T, S> Clone for Nanomessage<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Payload> Nanomessage<T, PostcardEncoding> {
    /// An engine over `transport` with the default configuration.
    pub fn new(transport: impl Transport) -> Self {
        Self::builder(transport).build()
    }

    /// Starts configuring an engine over `transport`.
    pub fn builder(transport: impl Transport) -> NanomessageBuilder<T, PostcardEncoding> {
        NanomessageBuilder::new(transport)
    }
}

impl<T: Payload, S: ValueEncoding> Nanomessage<T, S> {
    pub(crate) fn from_parts(
        transport: Arc<dyn Transport>,
        encoding: S,
        config: NanomessageConfig,
        handler: Option<Arc<dyn MessageHandler<T>>>,
    ) -> Self {
        let concurrency = config.concurrency;
        Self {
            inner: Arc::new(Inner {
                codec: Codec::new(encoding).with_max_frame_size(config.max_frame_size),
                transport,
                handler: RwLock::new(handler),
                timeout: Mutex::new(config.timeout),
                registry: Mutex::new(RequestRegistry::new()),
                outgoing: WorkQueue::new("outgoing", concurrency.outgoing),
                incoming: WorkQueue::new("incoming", concurrency.incoming),
                lifecycle: Lifecycle::new(),
                unsubscribe: Mutex::new(None),
                events: EventObserver::new(),
            }),
        }
    }

    /// Opens the transport and starts receiving.
    ///
    /// Calling `open` again after it succeeded does nothing. Concurrent
    /// callers wait for the same open.
    ///
    /// # Errors
    ///
    /// The transport's open or subscribe failure, in which case the engine
    /// is closed for good, or [`NanomessageError::Close`] after a close. A
    /// transport that opened but could not be subscribed to is closed again
    /// before the error is returned.
    pub async fn open(&self) -> Result<(), NanomessageError> {
        let inner = &self.inner;
        inner
            .lifecycle
            .open(|| async {
                inner.transport.open().await?;
                let unsubscribe = match inner.transport.subscribe(self.incoming_sink()) {
                    Ok(unsubscribe) => unsubscribe,
                    Err(error) => {
                        if let Err(close_error) = inner.transport.close().await {
                            warn!(error = %close_error, "Transport close failed");
                        }
                        return Err(NanomessageError::from(error));
                    }
                };
                *inner.unsubscribe.lock() = Some(unsubscribe);
                info!("Nanomessage opened");
                Ok::<_, NanomessageError>(())
            })
            .await
    }

    /// Shuts the engine down.
    ///
    /// Stops receiving, rejects every outstanding request with
    /// [`NanomessageError::Close`], drops queued work, closes the transport
    /// and returns once every rejected request has settled. Later calls
    /// return immediately. A close issued while opening waits for the open.
    pub async fn close(&self) {
        let inner = &self.inner;
        inner
            .lifecycle
            .close(|| async {
                let unsubscribe = inner.unsubscribe.lock().take();
                if let Some(unsubscribe) = unsubscribe {
                    unsubscribe();
                    self.emit(Event::Unsubscribe);
                }

                let drained = inner.registry.lock().drain();
                debug!(requests = drained.len(), "Rejecting outstanding requests");
                for request in &drained {
                    request.reject(NanomessageError::Close);
                }

                inner.outgoing.kill();
                inner.incoming.kill();

                if let Err(error) = inner.transport.close().await {
                    warn!(%error, "Transport close failed");
                }

                for request in &drained {
                    request.settled().await;
                }

                info!("Nanomessage closed");
                self.emit(Event::Closed);
            })
            .await;
    }

    /// Sends `data` and waits for the response.
    ///
    /// # Errors
    ///
    /// See [`request_with`](Self::request_with).
    pub async fn request(&self, data: T) -> Result<T, NanomessageError> {
        self.request_with(data, RequestOptions::default()).await
    }

    /// Sends `data` with per-request options and waits for the response.
    ///
    /// # Errors
    ///
    /// - [`NanomessageError::NotOpen`] before [`open`](Self::open)
    /// - [`NanomessageError::Close`] when closing or closed
    /// - [`NanomessageError::Timeout`] when no response arrived in time
    /// - [`NanomessageError::Cancel`] when cancelled through the options
    /// - [`NanomessageError::Encode`] or [`NanomessageError::Transport`] when
    ///   the request could not be sent
    /// - the error returned by the remote handler
    pub async fn request_with(
        &self,
        data: T,
        options: RequestOptions,
    ) -> Result<T, NanomessageError> {
        self.start_request(data, options)?.response().await
    }

    /// Registers a request and returns a handle to its response.
    ///
    /// The request is registered, and its timeout armed, before this
    /// returns; sending happens in the background once an outgoing slot is
    /// free. While the engine is still opening, sending waits for the open.
    ///
    /// # Errors
    ///
    /// [`NanomessageError::NotOpen`] before [`open`](Self::open), or
    /// [`NanomessageError::Close`] when closing or closed.
    pub fn start_request(
        &self,
        data: T,
        options: RequestOptions,
    ) -> Result<PendingRequest<T>, NanomessageError> {
        self.inner.lifecycle.check_usable()?;

        let timeout = options.timeout.or(*self.inner.timeout.lock());
        let (request, completion) = {
            let mut registry = self.inner.registry.lock();
            let id = registry.allocate()?;
            let (request, completion) = Request::new(id, timeout, options.context);
            registry.insert(request.clone())?;
            (request, completion)
        };

        let weak = Arc::downgrade(&self.inner);
        request.on_finish(move |id, error| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut registry = inner.registry.lock();
            // The remote side may still answer a request given up locally.
            if error.is_some_and(|error| error.is_timeout() || error.is_cancel()) {
                registry.retire(id);
            } else {
                registry.remove(id);
            }
        });
        if let Some(on_cancel) = options.on_cancel {
            request.on_cancel(on_cancel);
        }
        request.start();
        if let Some(signal) = options.signal {
            request.watch(signal);
        }

        debug!(request_id = request.id(), ?timeout, "Request created");
        self.emit(Event::RequestCreated {
            info: request.info(),
        });

        let engine = self.clone();
        let job = request.clone();
        if !self
            .inner
            .outgoing
            .push(async move { engine.run_outgoing(job, data).await })
        {
            request.reject(NanomessageError::Close);
        }

        Ok(PendingRequest::new(request, completion))
    }

    /// Sends an ephemeral message. No response is expected.
    ///
    /// # Errors
    ///
    /// See [`send_with`](Self::send_with).
    pub async fn send(&self, data: T) -> Result<(), NanomessageError> {
        self.send_with(data, SendOptions::default()).await
    }

    /// Sends an ephemeral message with options.
    ///
    /// # Errors
    ///
    /// [`NanomessageError::NotOpen`], [`NanomessageError::Close`], or an
    /// encode or transport failure.
    pub async fn send_with(&self, data: T, options: SendOptions) -> Result<(), NanomessageError> {
        self.inner.lifecycle.check_open().await?;

        let frame = Frame::ephemeral(data);
        let info = frame.info(options.context);
        let bytes = self.inner.codec.encode(&frame)?;
        self.inner.transport.send(bytes, &info).await?;
        Ok(())
    }

    /// Processes one frame read from the channel and waits for it to be
    /// handled.
    ///
    /// # Errors
    ///
    /// See [`process_incoming_message_with`](Self::process_incoming_message_with).
    pub async fn process_incoming_message(
        &self,
        bytes: &[u8],
    ) -> Result<MessageInfo, NanomessageError> {
        self.process_incoming_message_with(bytes, IncomingOptions::default())
            .await
    }

    /// Processes one frame read from the channel with options and waits for
    /// it to be handled.
    ///
    /// A response settles the matching request; responses nobody is
    /// waiting for are dropped. A request is queued for the message handler
    /// and answered with its result. An ephemeral message is handed to the
    /// handler directly.
    ///
    /// # Errors
    ///
    /// - [`NanomessageError::Decode`] or [`NanomessageError::InvalidRequest`]
    ///   for malformed frames
    /// - [`NanomessageError::Close`] when closing or closed
    /// - the handler failure, which for requests was also sent back
    pub async fn process_incoming_message_with(
        &self,
        bytes: &[u8],
        options: IncomingOptions<T>,
    ) -> Result<MessageInfo, NanomessageError> {
        self.dispatch(bytes, options, true).await
    }

    /// Replaces the message handler.
    pub fn set_message_handler(&self, handler: impl MessageHandler<T>) {
        *self.inner.handler.write() = Some(Arc::new(handler));
    }

    /// Sets the default timeout of requests created from now on.
    pub fn set_request_timeout(&self, timeout: Option<Duration>) {
        *self.inner.timeout.lock() = timeout;
    }

    /// Default timeout of new requests.
    pub fn request_timeout(&self) -> Option<Duration> {
        *self.inner.timeout.lock()
    }

    /// Changes the queue limits. A limit of 0 leaves that queue unchanged.
    pub fn set_concurrency(&self, concurrency: impl Into<Concurrency>) {
        let concurrency = concurrency.into();
        if concurrency.incoming > 0 {
            self.inner.incoming.set_concurrency(concurrency.incoming);
        }
        if concurrency.outgoing > 0 {
            self.inner.outgoing.set_concurrency(concurrency.outgoing);
        }
    }

    /// Current queue limits.
    pub fn concurrency(&self) -> Concurrency {
        Concurrency {
            incoming: self.inner.incoming.concurrency(),
            outgoing: self.inner.outgoing.concurrency(),
        }
    }

    /// Requests currently holding an outgoing slot.
    pub fn inflight_requests(&self) -> usize {
        self.inner.outgoing.running()
    }

    /// Requests waiting for their response.
    pub fn pending_requests(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// Outgoing queue counters.
    pub fn outgoing_metrics(&self) -> QueueMetrics {
        self.inner.outgoing.metrics()
    }

    /// Incoming queue counters.
    pub fn incoming_metrics(&self) -> QueueMetrics {
        self.inner.incoming.metrics()
    }

    /// Lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.inner.lifecycle.state()
    }

    /// Returns `true` once opened and until closing starts.
    pub fn is_open(&self) -> bool {
        self.state() == LifecycleState::Open
    }

    /// Returns `true` once closed.
    pub fn is_closed(&self) -> bool {
        self.state() == LifecycleState::Closed
    }

    /// The frame codec.
    pub fn codec(&self) -> &Codec<S> {
        &self.inner.codec
    }

    /// Registers an event callback.
    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.events.on_event(callback);
    }

    fn emit(&self, event: Event) {
        self.inner.events.notify(&event);
    }

    fn handler(&self) -> Option<Arc<dyn MessageHandler<T>>> {
        self.inner.handler.read().clone()
    }

    fn incoming_sink(&self) -> IncomingSink {
        let weak: Weak<Inner<T, S>> = Arc::downgrade(&self.inner);
        IncomingSink::new(move |bytes: Bytes| {
            let engine = weak.upgrade().map(|inner| Nanomessage { inner });
            async move {
                let Some(engine) = engine else {
                    return;
                };
                match engine.dispatch(&bytes, IncomingOptions::default(), false).await {
                    Ok(_) | Err(NanomessageError::Close) => {}
                    Err(error) if error.is_decode() => {
                        warn!(%error, "Dropping undecodable frame");
                        engine.emit(Event::DecodeError(error));
                    }
                    Err(error) => debug!(%error, "Incoming frame failed"),
                }
            }
        })
    }

    async fn dispatch(
        &self,
        bytes: &[u8],
        options: IncomingOptions<T>,
        wait: bool,
    ) -> Result<MessageInfo, NanomessageError> {
        if self.inner.lifecycle.is_closing() {
            return Err(NanomessageError::Close);
        }

        let frame: Frame<T> = self.inner.codec.decode(bytes)?;
        let info = frame.info(options.context);

        if frame.response {
            self.settle(frame);
            return Ok(info);
        }

        let FrameBody::Data(data) = frame.body else {
            return Err(NanomessageError::decode("error payload on a request frame"));
        };
        let handler = options.handler.or_else(|| self.handler());

        if info.ephemeral() {
            if wait {
                self.handle_message(handler, data, info.clone()).await?;
            } else {
                let engine = self.clone();
                let message_info = info.clone();
                tokio::spawn(async move {
                    let _ = engine.handle_message(handler, data, message_info).await;
                });
            }
            return Ok(info);
        }

        debug!(request_id = info.id, "Request received");
        self.emit(Event::RequestReceived { info: info.clone() });

        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let engine = self.clone();
        let request_info = info.clone();
        let pushed = self.inner.incoming.push(async move {
            let result = engine.handle_request(handler, data, request_info).await;
            let _ = done_tx.send(result);
        });
        if !pushed {
            return Err(NanomessageError::Close);
        }

        if wait {
            done_rx
                .await
                .unwrap_or(Err(NanomessageError::Close))?;
        }
        Ok(info)
    }

    fn settle(&self, frame: Frame<T>) {
        let request = {
            let mut registry = self.inner.registry.lock();
            let request = registry.get(frame.id);
            if request.is_none() && registry.reclaim(frame.id) {
                debug!(request_id = frame.id, "Dropping late response");
                return;
            }
            request
        };
        let Some(request) = request else {
            debug!(request_id = frame.id, "Dropping response to unknown request");
            return;
        };
        match frame.body {
            FrameBody::Data(data) => request.resolve(data),
            FrameBody::Error(error) => request.reject(error),
        };
    }

    async fn run_outgoing(&self, request: Request<T>, data: T) {
        let info = request.info();
        let sent = async {
            self.inner.lifecycle.check_open().await?;
            if request.is_finished() {
                return Ok(());
            }
            let bytes = self.inner.codec.encode(&Frame::request(request.id(), data))?;
            self.inner.transport.send(bytes, &info).await?;
            debug!(request_id = request.id(), "Request sent");
            self.emit(Event::RequestSent { info: info.clone() });
            Ok::<_, NanomessageError>(())
        }
        .await;

        if let Err(error) = sent {
            debug!(request_id = request.id(), %error, "Request failed before its response");
            request.reject(error);
        }

        request.settled().await;
        self.emit(Event::RequestEnded {
            info,
            error: request.error(),
        });
    }

    async fn handle_message(
        &self,
        handler: Option<Arc<dyn MessageHandler<T>>>,
        data: T,
        info: MessageInfo,
    ) -> Result<(), NanomessageError> {
        self.inner.lifecycle.check_open().await?;

        let Some(handler) = handler else {
            debug!("Dropping ephemeral message without a handler");
            return Ok(());
        };

        match call_handler(handler.as_ref(), data, info.clone()).await {
            Ok(_) => {
                self.emit(Event::Message { info });
                Ok(())
            }
            Err(failure) => {
                let error = NanomessageError::from_message_failure(failure);
                warn!(%error, "Message handler failed");
                self.emit(Event::MessageError {
                    info,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    async fn handle_request(
        &self,
        handler: Option<Arc<dyn MessageHandler<T>>>,
        data: T,
        info: MessageInfo,
    ) -> Result<(), NanomessageError> {
        self.inner.lifecycle.check_open().await?;

        let outcome = match handler {
            Some(handler) => call_handler(handler.as_ref(), data, info.clone())
                .await
                .map_err(NanomessageError::from_response_failure),
            None => Err(NanomessageError::Message {
                reason: "no message handler is set".to_string(),
                metadata: Metadata::new(),
            }),
        };

        let result = match self.respond(outcome, &info).await {
            Ok(()) => return Ok(()),
            Err(error) => error,
        };
        if !result.is_close() {
            warn!(request_id = info.id, error = %result, "Request handling failed");
            self.emit(Event::MessageError {
                info,
                error: result.clone(),
            });
        }
        Err(result)
    }

    async fn respond(
        &self,
        outcome: Result<Reply<T>, NanomessageError>,
        info: &MessageInfo,
    ) -> Result<(), NanomessageError> {
        let (frame, failure) = match outcome {
            Ok(Reply::NoResponse) => return Ok(()),
            Ok(Reply::Data(data)) => (Frame::response(info.id, data), None),
            Err(error) => (Frame::error_response(info.id, error.clone()), Some(error)),
        };
        if self.inner.lifecycle.is_closing() {
            return failure.map_or(Ok(()), Err);
        }

        let (bytes, failure) = match self.inner.codec.encode(&frame) {
            Ok(bytes) => (bytes, failure),
            Err(error) => {
                warn!(request_id = info.id, %error, "Response could not be encoded");
                let fallback = Frame::<T>::error_response(info.id, error.clone());
                (self.inner.codec.encode(&fallback)?, Some(error))
            }
        };

        let response_info = MessageInfo {
            id: info.id,
            response: true,
            error: failure.is_some(),
            context: info.context.clone(),
        };
        self.inner.transport.send(bytes, &response_info).await?;

        failure.map_or(Ok(()), Err)
    }
}

/// Runs a handler, turning a panic into an ordinary failure.
async fn call_handler<T: 'static>(
    handler: &dyn MessageHandler<T>,
    data: T,
    info: MessageInfo,
) -> Result<Reply<T>, BoxError> {
    let id = info.id;
    match AssertUnwindSafe(handler.on_message(data, info))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|reason| (*reason).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(request_id = id, %reason, "Message handler panicked");
            Err(format!("message handler panicked: {reason}").into())
        }
    }
}

impl<T, S> fmt::Debug for Nanomessage<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nanomessage")
            .field("state", &self.inner.lifecycle.state())
            .field("outgoing", &self.inner.outgoing)
            .field("incoming", &self.inner.incoming)
            .finish_non_exhaustive()
    }
}
