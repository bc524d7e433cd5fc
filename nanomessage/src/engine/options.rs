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

//! Per-call options and the pending request handle.

use super::handler::{MessageHandler, Payload};
use crate::codec::Context;
use crate::correlation::{CancelHook, Completion, Request};
use crate::error::NanomessageError;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Options for a single request.
///
/// # Examples
///
/// ```rust
/// use nanomessage::RequestOptions;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// let token = CancellationToken::new();
/// let options = RequestOptions::new()
///     .with_timeout(Duration::from_millis(500))
///     .with_signal(token.clone())
///     .with_on_cancel(|id| println!("request {id} cancelled"))
///     .with_context("tenant-a".to_string());
/// # let _ = options;
/// ```
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Overrides the engine's default timeout.
    pub timeout: Option<Duration>,
    /// Cancels the request when cancelled.
    pub signal: Option<CancellationToken>,
    /// Notified with the request id when the request is cancelled.
    pub on_cancel: Option<CancelHook>,
    /// Passed to the transport and events along with the request.
    pub context: Option<Context>,
}

impl RequestOptions {
    /// Options with every field unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Sets the cancel notification.
    #[must_use]
    pub fn with_on_cancel(mut self, on_cancel: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.on_cancel = Some(Arc::new(on_cancel));
        self
    }

    /// Sets the context.
    #[must_use]
    pub fn with_context(mut self, context: impl Any + Send + Sync) -> Self {
        self.context = Some(Arc::new(context));
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("timeout", &self.timeout)
            .field("signal", &self.signal)
            .field("on_cancel", &self.on_cancel.is_some())
            .field("context", &self.context.is_some())
            .finish()
    }
}

/// Options for an ephemeral message.
#[derive(Clone, Default)]
pub struct SendOptions {
    /// Passed to the transport along with the message.
    pub context: Option<Context>,
}

impl SendOptions {
    /// Sets the context.
    #[must_use]
    pub fn with_context(mut self, context: impl Any + Send + Sync) -> Self {
        self.context = Some(Arc::new(context));
        self
    }
}

impl fmt::Debug for SendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendOptions")
            .field("context", &self.context.is_some())
            .finish()
    }
}

/// Options for processing one incoming frame.
pub struct IncomingOptions<T> {
    /// Handles this frame instead of the engine's handler.
    pub handler: Option<Arc<dyn MessageHandler<T>>>,
    /// Visible to the handler through [`MessageInfo::context`](crate::codec::MessageInfo::context).
    pub context: Option<Context>,
}

impl<T: Payload> IncomingOptions<T> {
    /// Options with every field unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the handler override.
    #[must_use]
    pub fn with_handler(mut self, handler: impl MessageHandler<T>) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Sets the context.
    #[must_use]
    pub fn with_context(mut self, context: impl Any + Send + Sync) -> Self {
        self.context = Some(Arc::new(context));
        self
    }
}

impl<T> Default for IncomingOptions<T> {
    fn default() -> Self {
        Self {
            handler: None,
            context: None,
        }
    }
}

impl<T> Clone for IncomingOptions<T> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            context: self.context.clone(),
        }
    }
}

impl<T> fmt::Debug for IncomingOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingOptions")
            .field("handler", &self.handler.is_some())
            .field("context", &self.context.is_some())
            .finish()
    }
}

/// A registered request whose response has not been awaited yet.
///
/// Dropping the handle does not cancel the request; it still runs until it
/// is answered, times out or the engine closes.
#[derive(Debug)]
pub struct PendingRequest<T> {
    request: Request<T>,
    completion: Completion<T>,
}

impl<T: Send + 'static> PendingRequest<T> {
    pub(crate) fn new(request: Request<T>, completion: Completion<T>) -> Self {
        Self {
            request,
            completion,
        }
    }

    /// Correlation id of the request.
    pub fn id(&self) -> u64 {
        self.request.id()
    }

    /// Cancels the request. Returns `false` if it had already finished.
    pub fn cancel(&self) -> bool {
        self.request.cancel(None)
    }

    /// Cancels the request with a reason.
    pub fn cancel_with(&self, reason: impl Into<String>) -> bool {
        self.request.cancel(Some(reason.into()))
    }

    /// A handle that can cancel the request after
    /// [`response`](Self::response) took ownership of this one.
    pub fn canceller(&self) -> Canceller<T> {
        Canceller {
            request: self.request.clone(),
        }
    }

    /// Waits for the response.
    ///
    /// # Errors
    ///
    /// The rejection of the request: [`NanomessageError::Timeout`],
    /// [`NanomessageError::Cancel`], [`NanomessageError::Close`], an encode
    /// or transport failure, or the error sent by the remote handler.
    pub async fn response(self) -> Result<T, NanomessageError> {
        self.completion
            .await
            .unwrap_or_else(|_| Err(NanomessageError::Close))
    }
}

/// Cancels one request. Obtained from [`PendingRequest::canceller`].
#[derive(Debug, Clone)]
pub struct Canceller<T> {
    request: Request<T>,
}

impl<T: Send + 'static> Canceller<T> {
    /// Correlation id of the request.
    pub fn id(&self) -> u64 {
        self.request.id()
    }

    /// Cancels the request. Returns `false` if it had already finished.
    pub fn cancel(&self) -> bool {
        self.request.cancel(None)
    }

    /// Cancels the request with a reason.
    pub fn cancel_with(&self, reason: impl Into<String>) -> bool {
        self.request.cancel(Some(reason.into()))
    }
}
