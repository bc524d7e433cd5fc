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

//! Transport layer error types.
//!
//! Transport errors describe failures of the channel underneath an engine.
//! They surface to callers as [`NanomessageError::Transport`], which keeps
//! the error's display text.

use crate::error::NanomessageError;
use std::io;
use thiserror::Error;

/// Errors that can occur in the transport layer.
///
/// # Examples
///
/// ```rust
/// use nanomessage::transport::TransportError;
/// use nanomessage::NanomessageError;
///
/// let error = TransportError::other("peer hung up");
/// assert_eq!(error.to_string(), "peer hung up");
///
/// let error: NanomessageError = error.into();
/// assert_eq!(error.code(), "NM_ERR_TRANSPORT");
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// Transport is already closed.
    #[error("transport is closed")]
    Closed,

    /// Transport is not connected.
    #[error("transport is not connected")]
    NotConnected,

    /// The transport only supports a single subscriber.
    #[error("transport already has a subscriber")]
    AlreadySubscribed,

    /// An I/O error from the underlying channel.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A transport-specific failure.
    #[error("{reason}")]
    Other {
        /// Description of the failure
        reason: String,
    },
}

impl TransportError {
    /// Creates a transport-specific failure.
    pub fn other(reason: impl Into<String>) -> Self {
        TransportError::Other {
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        TransportError::Io { source: error }
    }
}

impl From<TransportError> for NanomessageError {
    fn from(error: TransportError) -> Self {
        NanomessageError::Transport {
            reason: error.to_string(),
        }
    }
}
