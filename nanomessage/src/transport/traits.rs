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

use crate::codec::MessageInfo;
use crate::transport::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Detaches a subscriber from its transport. Called at most once.
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

/// Receiver of the byte frames a transport reads off its channel.
///
/// Transports call [`push`](Self::push) once per frame and await it before
/// pushing the next one.
#[derive(Clone)]
pub struct IncomingSink {
    push: Arc<dyn Fn(Bytes) -> BoxFuture<'static, ()> + Send + Sync>,
}

impl IncomingSink {
    /// Wraps a frame handler.
    pub fn new<F, Fut>(push: F) -> Self
    where
        F: Fn(Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            push: Arc::new(move |bytes| push(bytes).boxed()),
        }
    }

    /// Delivers one frame.
    pub async fn push(&self, bytes: Bytes) {
        (self.push)(bytes).await;
    }
}

impl fmt::Debug for IncomingSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingSink").finish_non_exhaustive()
    }
}

/// A duplex channel carrying whole frames.
///
/// The engine never looks inside the channel: it hands encoded frames to
/// [`send`](Self::send) and expects every frame read from the remote side
/// to be delivered, one at a time, to the sink registered with
/// [`subscribe`](Self::subscribe). A transport that runs over a byte stream
/// must preserve frame boundaries itself.
///
/// # Examples
///
/// ## Implementing a custom transport
///
/// ```rust
/// use async_trait::async_trait;
/// use bytes::Bytes;
/// use nanomessage::codec::MessageInfo;
/// use nanomessage::transport::{IncomingSink, Transport, TransportError, Unsubscribe};
///
/// /// Drops everything it is asked to send.
/// struct BlackHole;
///
/// #[async_trait]
/// impl Transport for BlackHole {
///     async fn send(&self, _bytes: Bytes, _info: &MessageInfo) -> Result<(), TransportError> {
///         Ok(())
///     }
///
///     fn subscribe(&self, _sink: IncomingSink) -> Result<Unsubscribe, TransportError> {
///         Ok(Box::new(|| {}))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Writes one encoded frame to the channel.
    ///
    /// `info` describes the frame being sent.
    async fn send(&self, bytes: Bytes, info: &MessageInfo) -> Result<(), TransportError>;

    /// Starts delivering incoming frames to `sink`.
    ///
    /// The returned callback stops delivery.
    fn subscribe(&self, sink: IncomingSink) -> Result<Unsubscribe, TransportError>;

    /// Prepares the channel. Called once when the engine opens.
    async fn open(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Releases the channel. Called once when the engine closes.
    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait]
impl<Tr: Transport + ?Sized> Transport for Arc<Tr> {
    async fn send(&self, bytes: Bytes, info: &MessageInfo) -> Result<(), TransportError> {
        (**self).send(bytes, info).await
    }

    fn subscribe(&self, sink: IncomingSink) -> Result<Unsubscribe, TransportError> {
        (**self).subscribe(sink)
    }

    async fn open(&self) -> Result<(), TransportError> {
        (**self).open().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        (**self).close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<Bytes>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, bytes: Bytes, _info: &MessageInfo) -> Result<(), TransportError> {
            self.sent.lock().push(bytes);
            Ok(())
        }

        fn subscribe(&self, _sink: IncomingSink) -> Result<Unsubscribe, TransportError> {
            Ok(Box::new(|| {}))
        }
    }

    #[tokio::test]
    async fn test_arc_forwards_to_inner() {
        let recorder = Arc::new(Recorder::default());
        let transport: Arc<dyn Transport> = recorder.clone();

        transport
            .send(Bytes::from_static(b"frame"), &MessageInfo::default())
            .await
            .unwrap();
        transport.open().await.unwrap();
        transport.close().await.unwrap();

        assert_eq!(recorder.sent.lock().as_slice(), &[Bytes::from_static(b"frame")]);
    }

    #[tokio::test]
    async fn test_sink_push() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let received = received.clone();
            IncomingSink::new(move |bytes| {
                let received = received.clone();
                async move { received.lock().push(bytes) }
            })
        };

        sink.push(Bytes::from_static(b"one")).await;
        sink.clone().push(Bytes::from_static(b"two")).await;
        assert_eq!(received.lock().len(), 2);
    }
}
