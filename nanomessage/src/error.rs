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

//! Error types for nanomessage.
//!
//! Every failure surfaced by the engine is a [`NanomessageError`]. Each variant
//! carries a stable wire code (`NM_ERR_*`) and converts to and from an
//! [`ErrorDescriptor`], which is what travels inside an error-flagged frame.
//! The receiving side rebuilds the original variant when it knows the code,
//! and falls back to [`NanomessageError::Remote`] otherwise.
//!
//! # Error Kinds
//!
//! - **Local bugs**: [`Encode`](NanomessageError::Encode)
//! - **Peer or channel corruption**: [`Decode`](NanomessageError::Decode),
//!   [`InvalidRequest`](NanomessageError::InvalidRequest)
//! - **Request outcome**: [`Timeout`](NanomessageError::Timeout),
//!   [`Cancel`](NanomessageError::Cancel), [`Close`](NanomessageError::Close),
//!   [`NotOpen`](NanomessageError::NotOpen)
//! - **Handler failures**: [`Message`](NanomessageError::Message),
//!   [`RemoteResponse`](NanomessageError::RemoteResponse),
//!   [`Remote`](NanomessageError::Remote)
//!
//! # Examples
//!
//! ```rust
//! use nanomessage::NanomessageError;
//!
//! let error = NanomessageError::Timeout { id: 7 };
//! let descriptor = error.to_descriptor();
//! assert_eq!(descriptor.code, "NM_ERR_TIMEOUT");
//!
//! let rebuilt = NanomessageError::from_descriptor(descriptor);
//! assert_eq!(rebuilt, error);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Boxed error returned by message handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Free-form string metadata attached to an error.
pub type Metadata = BTreeMap<String, String>;

/// Wire code for [`NanomessageError::Encode`].
pub const CODE_ENCODE: &str = "NM_ERR_ENCODE";
/// Wire code for [`NanomessageError::Decode`].
pub const CODE_DECODE: &str = "NM_ERR_DECODE";
/// Wire code for [`NanomessageError::InvalidRequest`].
pub const CODE_INVALID_REQUEST: &str = "NM_ERR_INVALID_REQUEST";
/// Wire code for [`NanomessageError::Timeout`].
pub const CODE_TIMEOUT: &str = "NM_ERR_TIMEOUT";
/// Wire code for [`NanomessageError::Cancel`].
pub const CODE_CANCEL: &str = "NM_ERR_CANCEL";
/// Wire code for [`NanomessageError::Close`].
pub const CODE_CLOSE: &str = "NM_ERR_CLOSE";
/// Wire code for [`NanomessageError::NotOpen`].
pub const CODE_NOT_OPEN: &str = "NM_ERR_NOT_OPEN";
/// Wire code for [`NanomessageError::Message`].
pub const CODE_MESSAGE: &str = "NM_ERR_MESSAGE";
/// Wire code for [`NanomessageError::RemoteResponse`].
pub const CODE_REMOTE_RESPONSE: &str = "NM_ERR_REMOTE_RESPONSE";
/// Wire code for [`NanomessageError::Transport`].
pub const CODE_TRANSPORT: &str = "NM_ERR_TRANSPORT";

const CANCEL_DEFAULT_REASON: &str = "cancelled by caller";

/// Structured, serializable form of an error.
///
/// The message is kept as a template with `%s` placeholders plus positional
/// arguments so the receiving side can rebuild a typed error instead of a
/// flattened string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    /// Stable error code, e.g. `NM_ERR_TIMEOUT`.
    pub code: String,
    /// Message with `%s` placeholders.
    pub message_template: String,
    /// Positional arguments substituted into the template.
    pub args: Vec<String>,
    /// Additional metadata.
    pub metadata: Metadata,
}

impl ErrorDescriptor {
    /// Creates a descriptor with no arguments and no metadata.
    pub fn new(code: impl Into<String>, message_template: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message_template: message_template.into(),
            args: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Renders the template with its arguments.
    ///
    /// ```rust
    /// use nanomessage::ErrorDescriptor;
    ///
    /// let descriptor = ErrorDescriptor::new("APP_ERR", "user %s not found in %s")
    ///     .with_arg("alice")
    ///     .with_arg("accounts");
    /// assert_eq!(descriptor.message(), "user alice not found in accounts");
    /// ```
    pub fn message(&self) -> String {
        format_template(&self.message_template, &self.args)
    }
}

/// Substitutes `%s`, `%o` and `%d` placeholders in order. `%%` is a literal
/// percent sign. Placeholders without a matching argument are kept verbatim.
fn format_template(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some(spec @ ('s' | 'o' | 'd')) => {
                chars.next();
                match args.next() {
                    Some(arg) => out.push_str(arg),
                    None => {
                        out.push('%');
                        out.push(spec);
                    }
                }
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }

    out
}

/// An application-defined error, or one whose code is unknown locally.
///
/// Handlers return a `RemoteError` to send a domain error with its own code
/// back to the requester.
///
/// ```rust
/// use nanomessage::RemoteError;
///
/// let error = RemoteError::new("APP_ERR_QUOTA", "quota exceeded for %s")
///     .with_arg("bob")
///     .with_metadata("limit", "10");
/// assert_eq!(error.to_string(), "quota exceeded for bob");
/// assert_eq!(error.code(), "APP_ERR_QUOTA");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    descriptor: ErrorDescriptor,
}

impl RemoteError {
    /// Creates a new application error.
    pub fn new(code: impl Into<String>, message_template: impl Into<String>) -> Self {
        Self {
            descriptor: ErrorDescriptor::new(code, message_template),
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.descriptor.args.push(arg.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.descriptor.metadata.insert(key.into(), value.into());
        self
    }

    /// The error code.
    pub fn code(&self) -> &str {
        &self.descriptor.code
    }

    /// The positional arguments.
    pub fn args(&self) -> &[String] {
        &self.descriptor.args
    }

    /// The metadata map.
    pub fn metadata(&self) -> &Metadata {
        &self.descriptor.metadata
    }

    /// The underlying descriptor.
    pub fn descriptor(&self) -> &ErrorDescriptor {
        &self.descriptor
    }
}

impl From<ErrorDescriptor> for RemoteError {
    fn from(descriptor: ErrorDescriptor) -> Self {
        Self { descriptor }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor.message())
    }
}

impl std::error::Error for RemoteError {}

/// Errors produced by the nanomessage engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NanomessageError {
    /// A frame or payload could not be serialized.
    #[error("error encoding the request: {reason}")]
    Encode {
        /// Why encoding failed.
        reason: String,
    },

    /// Incoming bytes could not be parsed as a frame or payload.
    #[error("error decoding the request: {reason}")]
    Decode {
        /// Why decoding failed.
        reason: String,
    },

    /// An incoming frame did not carry a correlation id.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// What was wrong with the frame.
        reason: String,
    },

    /// No response arrived within the configured duration.
    #[error("timeout on request: {id}")]
    Timeout {
        /// The correlation id of the request.
        id: u64,
    },

    /// The request was aborted by the caller or a cancellation token.
    #[error("request {id} cancelled: {}", .reason.as_deref().unwrap_or(CANCEL_DEFAULT_REASON))]
    Cancel {
        /// The correlation id of the request.
        id: u64,
        /// Optional caller-supplied reason.
        reason: Option<String>,
    },

    /// The engine is closing or closed.
    #[error("nanomessage was closed")]
    Close,

    /// The engine has not been opened yet.
    #[error("nanomessage is not open")]
    NotOpen,

    /// A local message handler failed.
    #[error("on message error: {reason}")]
    Message {
        /// The handler's error text.
        reason: String,
        /// Metadata carried along with the failure.
        metadata: Metadata,
    },

    /// The remote handler failed while producing a response.
    #[error("remote response error: {reason}")]
    RemoteResponse {
        /// The remote handler's error text.
        reason: String,
        /// Metadata carried along with the failure.
        metadata: Metadata,
    },

    /// The transport failed to deliver or set up the channel.
    #[error("transport error: {reason}")]
    Transport {
        /// The transport's error text.
        reason: String,
    },

    /// An application error, or an error with a code unknown locally.
    #[error(transparent)]
    Remote(RemoteError),
}

impl NanomessageError {
    /// Builds an [`Encode`](Self::Encode) error from any displayable cause.
    pub fn encode(reason: impl fmt::Display) -> Self {
        Self::Encode {
            reason: reason.to_string(),
        }
    }

    /// Builds a [`Decode`](Self::Decode) error from any displayable cause.
    pub fn decode(reason: impl fmt::Display) -> Self {
        Self::Decode {
            reason: reason.to_string(),
        }
    }

    /// Returns the stable wire code of this error.
    pub fn code(&self) -> &str {
        match self {
            Self::Encode { .. } => CODE_ENCODE,
            Self::Decode { .. } => CODE_DECODE,
            Self::InvalidRequest { .. } => CODE_INVALID_REQUEST,
            Self::Timeout { .. } => CODE_TIMEOUT,
            Self::Cancel { .. } => CODE_CANCEL,
            Self::Close => CODE_CLOSE,
            Self::NotOpen => CODE_NOT_OPEN,
            Self::Message { .. } => CODE_MESSAGE,
            Self::RemoteResponse { .. } => CODE_REMOTE_RESPONSE,
            Self::Transport { .. } => CODE_TRANSPORT,
            Self::Remote(remote) => remote.code(),
        }
    }

    /// Returns `true` for [`Timeout`](Self::Timeout).
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` for [`Cancel`](Self::Cancel).
    #[must_use]
    pub const fn is_cancel(&self) -> bool {
        matches!(self, Self::Cancel { .. })
    }

    /// Returns `true` for [`Close`](Self::Close).
    #[must_use]
    pub const fn is_close(&self) -> bool {
        matches!(self, Self::Close)
    }

    /// Returns `true` for [`NotOpen`](Self::NotOpen).
    #[must_use]
    pub const fn is_not_open(&self) -> bool {
        matches!(self, Self::NotOpen)
    }

    /// Returns `true` for frame-level decode failures, including frames
    /// without a correlation id.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::InvalidRequest { .. })
    }

    /// Returns the metadata attached to this error, if the kind carries any.
    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            Self::Message { metadata, .. } | Self::RemoteResponse { metadata, .. } => {
                Some(metadata)
            }
            Self::Remote(remote) => Some(remote.metadata()),
            _ => None,
        }
    }

    /// Converts this error into its wire descriptor.
    pub fn to_descriptor(&self) -> ErrorDescriptor {
        match self {
            Self::Encode { reason } => {
                ErrorDescriptor::new(CODE_ENCODE, "error encoding the request: %s").with_arg(reason)
            }
            Self::Decode { reason } => {
                ErrorDescriptor::new(CODE_DECODE, "error decoding the request: %s").with_arg(reason)
            }
            Self::InvalidRequest { reason } => {
                ErrorDescriptor::new(CODE_INVALID_REQUEST, "invalid request: %s").with_arg(reason)
            }
            Self::Timeout { id } => ErrorDescriptor::new(CODE_TIMEOUT, "timeout on request: %s")
                .with_arg(id.to_string()),
            Self::Cancel { id, reason } => {
                ErrorDescriptor::new(CODE_CANCEL, "request %s cancelled: %s")
                    .with_arg(id.to_string())
                    .with_arg(reason.as_deref().unwrap_or(CANCEL_DEFAULT_REASON))
            }
            Self::Close => ErrorDescriptor::new(CODE_CLOSE, "nanomessage was closed"),
            Self::NotOpen => ErrorDescriptor::new(CODE_NOT_OPEN, "nanomessage is not open"),
            Self::Message { reason, metadata } => ErrorDescriptor {
                metadata: metadata.clone(),
                ..ErrorDescriptor::new(CODE_MESSAGE, "on message error: %s").with_arg(reason)
            },
            Self::RemoteResponse { reason, metadata } => ErrorDescriptor {
                metadata: metadata.clone(),
                ..ErrorDescriptor::new(CODE_REMOTE_RESPONSE, "remote response error: %s")
                    .with_arg(reason)
            },
            Self::Transport { reason } => {
                ErrorDescriptor::new(CODE_TRANSPORT, "transport error: %s").with_arg(reason)
            }
            Self::Remote(remote) => remote.descriptor().clone(),
        }
    }

    /// Rebuilds an error from its wire descriptor.
    ///
    /// Known codes with well-formed arguments become their typed variant.
    /// Anything else becomes [`Remote`](Self::Remote) so no information is
    /// lost.
    pub fn from_descriptor(descriptor: ErrorDescriptor) -> Self {
        match Self::from_known_descriptor(&descriptor) {
            Some(error) => error,
            None => Self::Remote(RemoteError::from(descriptor)),
        }
    }

    fn from_known_descriptor(descriptor: &ErrorDescriptor) -> Option<Self> {
        let arg = |index: usize| descriptor.args.get(index).cloned();
        let id = || arg(0).and_then(|id| id.parse::<u64>().ok());

        let error = match descriptor.code.as_str() {
            CODE_ENCODE => Self::Encode { reason: arg(0)? },
            CODE_DECODE => Self::Decode { reason: arg(0)? },
            CODE_INVALID_REQUEST => Self::InvalidRequest { reason: arg(0)? },
            CODE_TIMEOUT => Self::Timeout { id: id()? },
            CODE_CANCEL => Self::Cancel {
                id: id()?,
                reason: arg(1).filter(|reason| reason != CANCEL_DEFAULT_REASON),
            },
            CODE_CLOSE => Self::Close,
            CODE_NOT_OPEN => Self::NotOpen,
            CODE_MESSAGE => Self::Message {
                reason: arg(0)?,
                metadata: descriptor.metadata.clone(),
            },
            CODE_REMOTE_RESPONSE => Self::RemoteResponse {
                reason: arg(0)?,
                metadata: descriptor.metadata.clone(),
            },
            CODE_TRANSPORT => Self::Transport { reason: arg(0)? },
            _ => return None,
        };

        Some(error)
    }

    /// Classifies an error returned by a handler that was answering a
    /// remote request. Engine and application errors pass through; anything
    /// else becomes [`RemoteResponse`](Self::RemoteResponse).
    pub(crate) fn from_response_failure(error: BoxError) -> Self {
        Self::classify(error, |reason| Self::RemoteResponse {
            reason,
            metadata: Metadata::new(),
        })
    }

    /// Classifies an error returned by a handler for an ephemeral message.
    /// Anything that is not already a nanomessage error becomes
    /// [`Message`](Self::Message).
    pub(crate) fn from_message_failure(error: BoxError) -> Self {
        Self::classify(error, |reason| Self::Message {
            reason,
            metadata: Metadata::new(),
        })
    }

    fn classify(error: BoxError, fallback: impl FnOnce(String) -> Self) -> Self {
        let error = match error.downcast::<NanomessageError>() {
            Ok(error) => return *error,
            Err(error) => error,
        };
        match error.downcast::<RemoteError>() {
            Ok(remote) => Self::Remote(*remote),
            Err(other) => fallback(other.to_string()),
        }
    }
}

impl From<RemoteError> for NanomessageError {
    fn from(error: RemoteError) -> Self {
        Self::Remote(error)
    }
}

impl From<ErrorDescriptor> for NanomessageError {
    fn from(descriptor: ErrorDescriptor) -> Self {
        Self::from_descriptor(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            NanomessageError::Timeout { id: 3 }.to_string(),
            "timeout on request: 3"
        );
        assert_eq!(
            NanomessageError::Cancel { id: 3, reason: None }.to_string(),
            "request 3 cancelled: cancelled by caller"
        );
        assert_eq!(
            NanomessageError::Cancel {
                id: 3,
                reason: Some("user left".to_string())
            }
            .to_string(),
            "request 3 cancelled: user left"
        );
        assert_eq!(NanomessageError::Close.to_string(), "nanomessage was closed");
    }

    #[test]
    fn test_descriptor_rebuilds_known_kinds() {
        let errors = vec![
            NanomessageError::encode("bad value"),
            NanomessageError::decode("bad frame"),
            NanomessageError::InvalidRequest {
                reason: "missing id".to_string(),
            },
            NanomessageError::Timeout { id: 11 },
            NanomessageError::Cancel { id: 12, reason: None },
            NanomessageError::Cancel {
                id: 13,
                reason: Some("shutdown".to_string()),
            },
            NanomessageError::Close,
            NanomessageError::NotOpen,
            NanomessageError::RemoteResponse {
                reason: "boom".to_string(),
                metadata: Metadata::from([("attempt".to_string(), "2".to_string())]),
            },
        ];

        for error in errors {
            let rebuilt = NanomessageError::from_descriptor(error.to_descriptor());
            assert_eq!(rebuilt, error);
            assert_eq!(rebuilt.to_string(), error.to_string());
        }
    }

    #[test]
    fn test_unknown_code_becomes_remote() {
        let descriptor = ErrorDescriptor::new("APP_ERR_DENIED", "access denied for %s")
            .with_arg("carol")
            .with_metadata("role", "guest");

        let error = NanomessageError::from_descriptor(descriptor.clone());
        assert_eq!(error.code(), "APP_ERR_DENIED");
        assert_eq!(error.to_string(), "access denied for carol");
        assert_eq!(error.metadata().unwrap().get("role").unwrap(), "guest");
        assert_eq!(error.to_descriptor(), descriptor);
    }

    #[test]
    fn test_malformed_known_code_falls_back_to_remote() {
        let descriptor =
            ErrorDescriptor::new(CODE_TIMEOUT, "timeout on request: %s").with_arg("not-a-number");
        let error = NanomessageError::from_descriptor(descriptor);
        assert!(matches!(error, NanomessageError::Remote(_)));
        assert_eq!(error.code(), CODE_TIMEOUT);
    }

    #[test]
    fn test_format_template() {
        let args = vec!["a".to_string(), "b".to_string()];
        assert_eq!(format_template("%s-%o", &args), "a-b");
        assert_eq!(format_template("100%% of %s", &args), "100% of a");
        assert_eq!(format_template("%s %s %s", &args), "a b %s");
        assert_eq!(format_template("trailing %", &args), "trailing %");
    }

    #[test]
    fn test_handler_error_classification() {
        let passthrough: BoxError = Box::new(NanomessageError::Timeout { id: 1 });
        assert_eq!(
            NanomessageError::from_response_failure(passthrough),
            NanomessageError::Timeout { id: 1 }
        );

        let remote: BoxError = Box::new(RemoteError::new("APP", "app failure"));
        assert!(matches!(
            NanomessageError::from_response_failure(remote),
            NanomessageError::Remote(_)
        ));

        let io: BoxError = Box::new(std::io::Error::other("disk full"));
        match NanomessageError::from_response_failure(io) {
            NanomessageError::RemoteResponse { reason, .. } => assert_eq!(reason, "disk full"),
            other => panic!("unexpected error: {other:?}"),
        }

        let plain: BoxError = "handler exploded".into();
        match NanomessageError::from_message_failure(plain) {
            NanomessageError::Message { reason, .. } => assert_eq!(reason, "handler exploded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
