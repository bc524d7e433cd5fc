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

//! The request/response engine.
//!
//! A [`Nanomessage`] owns one transport and runs both sides of the
//! protocol over it:
//!
//! 1. **Outgoing**: [`Nanomessage::request`] registers the request, queues
//!    it on the outgoing queue and resolves with the matching response
//! 2. **Incoming**: frames from the transport either settle a local
//!    request or are queued for the [`MessageHandler`], whose result is
//!    sent back as the response
//! 3. **Ephemeral**: [`Nanomessage::send`] and incoming id-0 frames skip
//!    correlation entirely
//!
//! Engines are created with a [`NanomessageBuilder`] and must be opened
//! before use.

mod builder;
mod config;
mod handler;
mod nanomessage;
mod options;

pub use builder::NanomessageBuilder;
pub use config::{Concurrency, NanomessageConfig};
pub use handler::{handler_fn, HandlerFn, MessageHandler, Payload, Reply};
pub use nanomessage::Nanomessage;
pub use options::{Canceller, IncomingOptions, PendingRequest, RequestOptions, SendOptions};
