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

//! Value encodings for frame payloads.
//!
//! The codec frames the correlation id and flags itself; what goes inside the
//! frame is produced by a pluggable [`ValueEncoding`]. Any serde-compatible
//! type can be carried.
//!
//! # Encodings
//!
//! - [`PostcardEncoding`] (default): compact binary, deterministic output
//! - [`JsonEncoding`] (`json` feature): human-readable, handy when debugging
//!   a channel with a packet capture
//!
//! # Examples
//!
//! ```rust
//! use nanomessage::encoding::{PostcardEncoding, ValueEncoding};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Ping {
//!     from: String,
//!     seq: u32,
//! }
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let encoding = PostcardEncoding::default();
//! let ping = Ping { from: "alice".to_string(), seq: 1 };
//!
//! let bytes = encoding.encode(&ping)?;
//! let decoded: Ping = encoding.decode(&bytes)?;
//! assert_eq!(ping, decoded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom encoding
//!
//! ```rust
//! use nanomessage::encoding::{DecodeError, EncodeError, ValueEncoding};
//!
//! struct LengthCheckedJson {
//!     limit: usize,
//! }
//!
//! impl ValueEncoding for LengthCheckedJson {
//!     fn encode<T>(&self, value: &T) -> Result<Vec<u8>, EncodeError>
//!     where
//!         T: serde::Serialize + ?Sized,
//!     {
//!         let bytes = serde_json::to_vec(value)
//!             .map_err(|e| EncodeError::with_source("json encode failed", e))?;
//!         if bytes.len() > self.limit {
//!             return Err(EncodeError::new("value too large"));
//!         }
//!         Ok(bytes)
//!     }
//!
//!     fn decode<T>(&self, bytes: &[u8]) -> Result<T, DecodeError>
//!     where
//!         T: serde::de::DeserializeOwned,
//!     {
//!         serde_json::from_slice(bytes)
//!             .map_err(|e| DecodeError::with_source("json decode failed", e))
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "length-checked-json"
//!     }
//! }
//! ```

mod error;
mod postcard;
mod traits;

#[cfg(feature = "json")]
mod json;

pub use self::postcard::PostcardEncoding;
pub use error::{DecodeError, EncodeError};
pub use traits::ValueEncoding;

#[cfg(feature = "json")]
pub use self::json::JsonEncoding;
