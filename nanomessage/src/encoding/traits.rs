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

//! The [`ValueEncoding`] trait.

use crate::encoding::{DecodeError, EncodeError};

/// Serializes frame payloads to bytes and back.
///
/// A value encoding only deals with the application payload. Correlation ids,
/// flags and error descriptors are framed by [`Codec`](crate::codec::Codec)
/// independently of the encoding chosen here.
///
/// Implementations must be `Send + Sync + 'static` because a single encoding
/// instance is shared by the outbound and inbound workers of an engine.
pub trait ValueEncoding: Send + Sync + 'static {
    /// Encodes a value to bytes.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if the value cannot be represented in this
    /// encoding. The engine reports it as an `NM_ERR_ENCODE` error.
    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, EncodeError>
    where
        T: serde::Serialize + ?Sized;

    /// Decodes bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for truncated, corrupted or mistyped input.
    /// The engine reports it as an `NM_ERR_DECODE` error.
    fn decode<T>(&self, bytes: &[u8]) -> Result<T, DecodeError>
    where
        T: serde::de::DeserializeOwned;

    /// A stable name for this encoding, used in logs.
    fn name(&self) -> &'static str;
}
