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

//! Postcard value encoding.

use crate::encoding::{DecodeError, EncodeError, ValueEncoding};

/// Compact binary encoding based on postcard.
///
/// This is the default encoding of an engine. Output is deterministic, which
/// keeps frames byte-for-byte comparable in tests.
///
/// ```rust
/// use nanomessage::encoding::{PostcardEncoding, ValueEncoding};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Refuse payloads larger than 64 KiB on the receiving side.
/// let encoding = PostcardEncoding::new().with_max_size(64 * 1024);
/// let bytes = encoding.encode(&vec![1u32, 2, 3])?;
/// let decoded: Vec<u32> = encoding.decode(&bytes)?;
/// assert_eq!(decoded, vec![1, 2, 3]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct PostcardEncoding {
    max_size: Option<usize>,
}

impl PostcardEncoding {
    /// Creates an encoding without a size limit.
    pub fn new() -> Self {
        Self { max_size: None }
    }

    /// Rejects payloads larger than `max_size` bytes when decoding.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

impl ValueEncoding for PostcardEncoding {
    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, EncodeError>
    where
        T: serde::Serialize + ?Sized,
    {
        postcard::to_allocvec(value)
            .map_err(|e| EncodeError::with_source("postcard encoding failed", e))
    }

    fn decode<T>(&self, bytes: &[u8]) -> Result<T, DecodeError>
    where
        T: serde::de::DeserializeOwned,
    {
        if let Some(max_size) = self.max_size {
            if bytes.len() > max_size {
                return Err(DecodeError::new(format!(
                    "payload size {} exceeds maximum allowed size {}",
                    bytes.len(),
                    max_size
                )));
            }
        }

        postcard::from_bytes(bytes)
            .map_err(|e| DecodeError::with_source("postcard decoding failed", e))
    }

    fn name(&self) -> &'static str {
        "postcard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    enum Command {
        Ping { from: String },
        Put { key: String, value: Vec<u8> },
        Quit,
    }

    #[test]
    fn test_postcard_enum_payloads() {
        let encoding = PostcardEncoding::default();
        let commands = vec![
            Command::Ping {
                from: "alice".to_string(),
            },
            Command::Put {
                key: "k".to_string(),
                value: vec![0, 1, 2, 255],
            },
            Command::Quit,
        ];

        let bytes = encoding.encode(&commands).unwrap();
        let decoded: Vec<Command> = encoding.decode(&bytes).unwrap();
        assert_eq!(decoded, commands);
    }

    #[test]
    fn test_postcard_rejects_garbage() {
        let encoding = PostcardEncoding::default();
        let result: Result<Command, _> = encoding.decode(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(result.is_err());
    }

    #[test]
    fn test_postcard_max_size() {
        let bytes = PostcardEncoding::new().encode("x".repeat(32).as_str()).unwrap();

        let limited = PostcardEncoding::new().with_max_size(8);
        let result: Result<String, _> = limited.decode(&bytes);
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_postcard_name() {
        assert_eq!(PostcardEncoding::default().name(), "postcard");
    }
}
