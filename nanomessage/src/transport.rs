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

//! Transport layer abstractions.
//!
//! An engine talks to its peer through a [`Transport`]: something that can
//! send a frame and deliver incoming frames to an [`IncomingSink`]. The
//! engine supplies framing, correlation and timeouts; the transport only
//! moves bytes.
//!
//! - [`MemoryTransport`]: in-process channel pair for tests and benchmarks
//!
//! # Examples
//!
//! ```rust
//! use nanomessage::transport::{MemoryTransport, Transport};
//! use std::sync::Arc;
//!
//! let (alice, bob) = MemoryTransport::pair();
//!
//! // Any transport can be shared behind an Arc.
//! let shared: Arc<dyn Transport> = Arc::new(alice);
//! # let _ = (shared, bob);
//! ```

mod error;
mod memory;
mod traits;

pub use error::TransportError;
pub use memory::MemoryTransport;
pub use traits::{IncomingSink, Transport, Unsubscribe};
