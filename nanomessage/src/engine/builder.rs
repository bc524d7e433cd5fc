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

//! Builder pattern for engine configuration.

use super::handler::{handler_fn, MessageHandler, Payload, Reply};
use super::{Concurrency, Nanomessage, NanomessageConfig};
use crate::codec::MessageInfo;
use crate::encoding::{PostcardEncoding, ValueEncoding};
use crate::error::BoxError;
use crate::transport::Transport;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating and configuring engines.
///
/// # Examples
///
/// ## Defaults
///
/// ```rust
/// use nanomessage::Nanomessage;
/// use nanomessage::transport::MemoryTransport;
///
/// let (transport, _peer) = MemoryTransport::pair();
/// let engine = Nanomessage::<u64>::builder(transport).build();
/// assert_eq!(engine.request_timeout(), None);
/// ```
///
/// ## Custom configuration
///
/// ```rust
/// use nanomessage::{BoxError, Nanomessage, Reply};
/// use nanomessage::codec::MessageInfo;
/// use nanomessage::encoding::{JsonEncoding, ValueEncoding};
/// use nanomessage::transport::MemoryTransport;
/// use std::time::Duration;
///
/// let (transport, _peer) = MemoryTransport::pair();
/// let engine = Nanomessage::<String>::builder(transport)
///     .with_encoding(JsonEncoding::default())
///     .with_timeout(Duration::from_secs(1))
///     .with_concurrency(16)
///     .on_message(|data: String, _info: MessageInfo| async move {
///         Ok::<_, BoxError>(Reply::Data(data.to_uppercase()))
///     })
///     .build();
///
/// assert_eq!(engine.concurrency().outgoing, 16);
/// assert_eq!(engine.codec().encoding().name(), "json");
/// ```
pub struct NanomessageBuilder<T, S = PostcardEncoding> {
    transport: Arc<dyn Transport>,
    encoding: S,
    config: NanomessageConfig,
    handler: Option<Arc<dyn MessageHandler<T>>>,
}

impl<T: Payload> NanomessageBuilder<T, PostcardEncoding> {
    /// Starts a builder over `transport` with postcard payloads.
    pub fn new(transport: impl Transport) -> Self {
        Self {
            transport: Arc::new(transport),
            encoding: PostcardEncoding::default(),
            config: NanomessageConfig::default(),
            handler: None,
        }
    }
}

impl<T: Payload, S: ValueEncoding> NanomessageBuilder<T, S> {
    /// Uses `encoding` for payloads.
    pub fn with_encoding<S2: ValueEncoding>(self, encoding: S2) -> NanomessageBuilder<T, S2> {
        NanomessageBuilder {
            transport: self.transport,
            encoding,
            config: self.config,
            handler: self.handler,
        }
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn with_config(mut self, config: NanomessageConfig) -> Self {
        self.config = config;
        self
    }

    /// Adjusts the configuration in place.
    #[must_use]
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut NanomessageConfig),
    {
        f(&mut self.config);
        self
    }

    /// Sets the default request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Sets the queue limits.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: impl Into<Concurrency>) -> Self {
        self.config.concurrency = concurrency.into();
        self
    }

    /// Sets the maximum frame size.
    #[must_use]
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.config.max_frame_size = max_frame_size;
        self
    }

    /// Sets the message handler.
    #[must_use]
    pub fn with_message_handler(mut self, handler: impl MessageHandler<T>) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Sets an async closure as the message handler.
    #[must_use]
    pub fn on_message<F, Fut>(self, f: F) -> Self
    where
        F: Fn(T, MessageInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply<T>, BoxError>> + Send + 'static,
    {
        self.with_message_handler(handler_fn(f))
    }

    /// The configuration so far.
    pub fn config(&self) -> &NanomessageConfig {
        &self.config
    }

    /// Builds the engine. It still has to be [opened](Nanomessage::open).
    ///
    /// Zero concurrency limits are raised to 1 and frame limits smaller
    /// than a frame header are raised to the header size.
    pub fn build(self) -> Nanomessage<T, S> {
        if let Err(reason) = self.config.validate() {
            tracing::warn!(%reason, "Adjusting invalid configuration");
        }
        Nanomessage::from_parts(self.transport, self.encoding, self.config, self.handler)
    }
}

impl<T, S: fmt::Debug> fmt::Debug for NanomessageBuilder<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NanomessageBuilder")
            .field("encoding", &self.encoding)
            .field("config", &self.config)
            .field("handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}
