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

//! Bounded-concurrency scheduling.
//!
//! The engine runs two [`WorkQueue`]s, one for outgoing requests and one for
//! incoming requests, each with its own concurrency limit. A queue never
//! runs more than its limit at once; excess work waits its turn in
//! submission order.
//!
//! # Examples
//!
//! ```rust
//! use nanomessage::backpressure::{WorkQueue, DEFAULT_CONCURRENCY};
//!
//! # async fn example() {
//! let queue = WorkQueue::new("inbound", DEFAULT_CONCURRENCY);
//! queue.push(async {
//!     // handle one message
//! });
//!
//! let metrics = queue.metrics();
//! println!("Running: {}/{}", metrics.running, metrics.concurrency);
//! # }
//! ```

mod work_queue;

pub use work_queue::{QueueMetrics, WorkQueue, DEFAULT_CONCURRENCY};
