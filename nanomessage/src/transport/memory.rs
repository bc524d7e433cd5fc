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

//! In-memory transport implementation for testing.
//!
//! `MemoryTransport` connects two engines in the same process over tokio
//! channels. It is used by the tests and benchmarks, and is handy for
//! wiring components together without a network.

use crate::codec::MessageInfo;
use crate::transport::{IncomingSink, Transport, TransportError, Unsubscribe};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Global counter for generating unique transport IDs.
static NEXT_MEMORY_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// One end of an in-process duplex channel.
///
/// Frames keep their boundaries and arrive in the order they were sent.
///
/// # Examples
///
/// ```rust
/// use bytes::Bytes;
/// use nanomessage::transport::{IncomingSink, MemoryTransport, Transport};
/// use nanomessage::codec::MessageInfo;
/// use tokio::sync::mpsc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (left, right) = MemoryTransport::pair();
///
/// let (tx, mut rx) = mpsc::unbounded_channel();
/// let _unsubscribe = right.subscribe(IncomingSink::new(move |bytes| {
///     let tx = tx.clone();
///     async move {
///         let _ = tx.send(bytes);
///     }
/// }))?;
///
/// left.send(Bytes::from_static(b"hello"), &MessageInfo::default()).await?;
/// assert_eq!(rx.recv().await, Some(Bytes::from_static(b"hello")));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryTransport {
    id: u64,
    outgoing: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    incoming: Mutex<Option<mpsc::UnboundedReceiver<Bytes>>>,
    stats: Arc<MemoryStats>,
}

#[derive(Debug, Default)]
struct MemoryStats {
    sent: AtomicU64,
    received: AtomicU64,
}

impl MemoryTransport {
    /// Creates two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (Self::new(a_tx, b_rx), Self::new(b_tx, a_rx))
    }

    fn new(
        outgoing: mpsc::UnboundedSender<Bytes>,
        incoming: mpsc::UnboundedReceiver<Bytes>,
    ) -> Self {
        Self {
            id: NEXT_MEMORY_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed),
            outgoing: Mutex::new(Some(outgoing)),
            incoming: Mutex::new(Some(incoming)),
            stats: Arc::new(MemoryStats::default()),
        }
    }

    /// Unique id of this end.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Writes raw bytes to the peer, bypassing any framing.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] after [`close`](Transport::close)
    /// or once the peer is gone.
    pub fn write(&self, bytes: impl Into<Bytes>) -> Result<(), TransportError> {
        let outgoing = self.outgoing.lock();
        let tx = outgoing.as_ref().ok_or(TransportError::Closed)?;
        tx.send(bytes.into()).map_err(|_| TransportError::Closed)?;
        self.stats.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of frames written.
    pub fn frames_sent(&self) -> u64 {
        self.stats.sent.load(Ordering::Relaxed)
    }

    /// Number of frames delivered to the subscriber.
    pub fn frames_received(&self) -> u64 {
        self.stats.received.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, bytes: Bytes, _info: &MessageInfo) -> Result<(), TransportError> {
        self.write(bytes)
    }

    fn subscribe(&self, sink: IncomingSink) -> Result<Unsubscribe, TransportError> {
        let mut incoming = self
            .incoming
            .lock()
            .take()
            .ok_or(TransportError::AlreadySubscribed)?;

        let id = self.id;
        let stats = Arc::clone(&self.stats);
        let reader = tokio::spawn(async move {
            while let Some(bytes) = incoming.recv().await {
                stats.received.fetch_add(1, Ordering::Relaxed);
                sink.push(bytes).await;
            }
            debug!(transport_id = id, "Memory transport peer closed");
        });

        Ok(Box::new(move || reader.abort()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.outgoing.lock().take().is_some() {
            debug!(transport_id = self.id, "Memory transport closed");
        }
        Ok(())
    }
}
