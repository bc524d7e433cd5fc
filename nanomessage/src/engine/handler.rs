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

//! Message handlers.

use crate::codec::MessageInfo;
use crate::error::BoxError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;

/// Values an engine can carry.
///
/// Implemented for every serde type that can cross tasks.
pub trait Payload: Serialize + DeserializeOwned + Send + 'static {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Send + 'static {}

/// What a handler answers to an incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// Send `T` back as the response.
    Data(T),
    /// Send nothing. The remote request runs into its timeout or is
    /// cancelled on its side.
    NoResponse,
}

impl<T> From<T> for Reply<T> {
    fn from(data: T) -> Self {
        Reply::Data(data)
    }
}

/// Handles requests and ephemeral messages from the remote side.
///
/// Returning an error from a request handler sends an error response. A
/// [`NanomessageError`](crate::NanomessageError) or
/// [`RemoteError`](crate::RemoteError) is forwarded as is, so the remote
/// caller sees the same code; anything else is reported as
/// `NM_ERR_REMOTE_RESPONSE` carrying the error's display text.
///
/// The reply of an ephemeral message is discarded.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use nanomessage::codec::MessageInfo;
/// use nanomessage::{BoxError, MessageHandler, RemoteError, Reply};
///
/// struct Doubler;
///
/// #[async_trait]
/// impl MessageHandler<i64> for Doubler {
///     async fn on_message(&self, data: i64, _info: MessageInfo) -> Result<Reply<i64>, BoxError> {
///         let doubled = data.checked_mul(2).ok_or_else(|| {
///             RemoteError::new("APP_ERR_OVERFLOW", "cannot double %s").with_arg(data.to_string())
///         })?;
///         Ok(Reply::Data(doubled))
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler<T>: Send + Sync + 'static {
    /// Handles one incoming message.
    async fn on_message(&self, data: T, info: MessageInfo) -> Result<Reply<T>, BoxError>;
}

/// A [`MessageHandler`] backed by an async closure. See [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Wraps an async closure as a [`MessageHandler`].
///
/// ```rust
/// use nanomessage::{handler_fn, BoxError, Reply};
/// use nanomessage::codec::MessageInfo;
///
/// let echo = handler_fn(|data: String, _info: MessageInfo| async move {
///     Ok::<_, BoxError>(Reply::Data(data))
/// });
/// # let _ = echo;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn { f }
}

#[async_trait]
impl<T, F, Fut> MessageHandler<T> for HandlerFn<F>
where
    T: Payload,
    F: Fn(T, MessageInfo) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply<T>, BoxError>> + Send + 'static,
{
    async fn on_message(&self, data: T, info: MessageInfo) -> Result<Reply<T>, BoxError> {
        (self.f)(data, info).await
    }
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}
