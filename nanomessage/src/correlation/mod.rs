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

//! Request correlation.
//!
//! Outgoing requests are tracked by correlation id until their response
//! arrives, they time out, or they are cancelled.
//!
//! - [`IdAllocator`] hands out and reclaims ids
//! - [`Request`] is the per-request state machine
//! - [`RequestRegistry`] maps ids to live requests and holds back ids
//!   whose requests were given up locally

mod id;
mod registry;
mod request;

pub use id::IdAllocator;
pub use registry::{RequestRegistry, DEFAULT_RETIRE_GRACE};
pub use request::{CancelHook, Completion, FinishHook, Request, RequestOutcome, RequestState};
