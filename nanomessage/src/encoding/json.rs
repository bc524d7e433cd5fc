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

//! JSON value encoding.

use crate::encoding::{DecodeError, EncodeError, ValueEncoding};

/// Human-readable encoding based on `serde_json`.
///
/// Frames stay binary; only the payload inside them is JSON.
///
/// ```rust
/// use nanomessage::encoding::{JsonEncoding, ValueEncoding};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let encoding = JsonEncoding::default();
/// let bytes = encoding.encode(&("ping", 1))?;
/// assert_eq!(bytes, br#"["ping",1]"#);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct JsonEncoding {
    pretty: bool,
}

impl JsonEncoding {
    /// Creates an encoding producing compact JSON.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Produces indented JSON.
    pub fn with_pretty_print(mut self) -> Self {
        self.pretty = true;
        self
    }
}

impl ValueEncoding for JsonEncoding {
    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, EncodeError>
    where
        T: serde::Serialize + ?Sized,
    {
        let result = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        result.map_err(|e| EncodeError::with_source("JSON encoding failed", e))
    }

    fn decode<T>(&self, bytes: &[u8]) -> Result<T, DecodeError>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(bytes)
            .map_err(|e| DecodeError::with_source("JSON decoding failed", e))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
