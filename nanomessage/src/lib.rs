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

#![doc = include_str!("../../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! Nanomessage is organized bottom-up:
//!
//! 1. **Codec** ([`codec`], [`encoding`]): frame layout and pluggable payload
//!    encodings
//! 2. **Correlation** ([`correlation`]): ids, per-request state machines and
//!    the id-to-request registry
//! 3. **Scheduling** ([`backpressure`], [`lifecycle`]): bounded work queues
//!    and the open/close state machine
//! 4. **Engine** ([`Nanomessage`]): request, send and incoming dispatch over a
//!    [`Transport`]
//!
//! ## Error handling
//!
//! Every failure is a [`NanomessageError`] with a stable code such as
//! `NM_ERR_TIMEOUT`. Errors raised by a remote message handler travel back
//! to the caller as error responses and are rebuilt on the caller's side,
//! so application errors created with [`RemoteError`] keep their code,
//! arguments and metadata across the wire.
//!
//! ## Logging
//!
//! The crate logs through [`tracing`] and never installs a subscriber.

pub mod backpressure;
pub mod codec;
pub mod correlation;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod transport;

pub use engine::{
    handler_fn, Canceller, Concurrency, HandlerFn, IncomingOptions, MessageHandler, Nanomessage,
    NanomessageBuilder, NanomessageConfig, Payload, PendingRequest, Reply, RequestOptions,
    SendOptions,
};
pub use error::{BoxError, ErrorDescriptor, Metadata, NanomessageError, RemoteError};
pub use events::Event;
pub use lifecycle::LifecycleState;
pub use transport::{MemoryTransport, Transport, TransportError};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_request_over_memory_pair() {
        let (left, right) = MemoryTransport::pair();
        let alice = Nanomessage::<u32>::new(left);
        let bob = Nanomessage::<u32>::builder(right)
            .on_message(|n, _info| async move { Ok::<_, BoxError>(Reply::Data(n * 10)) })
            .build();

        alice.open().await.unwrap();
        bob.open().await.unwrap();

        let response = tokio::time::timeout(Duration::from_secs(5), alice.request(4))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response, 40);
        assert_eq!(alice.pending_requests(), 0);

        alice.close().await;
        bob.close().await;
        assert!(alice.is_closed());
    }
}
