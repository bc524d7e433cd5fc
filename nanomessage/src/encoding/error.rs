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

//! Value encoding error types.

use std::fmt;

type Source = Box<dyn std::error::Error + Send + Sync>;

/// A payload could not be encoded.
///
/// ```rust
/// use nanomessage::encoding::EncodeError;
///
/// let error = EncodeError::new("maps with non-string keys are not supported");
/// assert!(error.to_string().starts_with("Encode error"));
/// ```
#[derive(Debug)]
pub struct EncodeError {
    message: String,
    source: Option<Source>,
}

impl EncodeError {
    /// Creates an error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error with a message and an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Encode error: {}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// A payload could not be decoded.
///
/// ```rust
/// use nanomessage::encoding::{DecodeError, PostcardEncoding, ValueEncoding};
///
/// let encoding = PostcardEncoding::default();
/// let result: Result<String, DecodeError> = encoding.decode(&[0xFF, 0xFF]);
/// assert!(result.is_err());
/// ```
#[derive(Debug)]
pub struct DecodeError {
    message: String,
    source: Option<Source>,
}

impl DecodeError {
    /// Creates an error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error with a message and an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decode error: {}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<EncodeError> for crate::NanomessageError {
    fn from(error: EncodeError) -> Self {
        Self::encode(error)
    }
}

impl From<DecodeError> for crate::NanomessageError {
    fn from(error: DecodeError) -> Self {
        Self::decode(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NanomessageError;
    use std::error::Error;

    #[test]
    fn test_encode_error_source() {
        let error = EncodeError::with_source("write failed", std::io::Error::other("full"));
        assert!(error.to_string().contains("write failed"));
        assert!(error.to_string().contains("full"));
        assert!(error.source().is_some());
        assert!(EncodeError::new("plain").source().is_none());
    }

    #[test]
    fn test_conversion_into_engine_error() {
        let error: NanomessageError = EncodeError::new("unsupported").into();
        assert_eq!(error.code(), "NM_ERR_ENCODE");

        let error: NanomessageError = DecodeError::new("truncated").into();
        assert_eq!(error.code(), "NM_ERR_DECODE");
        assert!(error.to_string().contains("truncated"));
    }
}
