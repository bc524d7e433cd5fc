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

//! Frame codec.
//!
//! A frame is the unit placed on and read from the channel. The codec owns
//! the binary layout of frames and delegates the payload to a
//! [`ValueEncoding`].
//!
//! # Layout
//!
//! ```text
//! +-------------+-----------+-------------+-------------------+
//! | Version (1) | Flags (1) | Id (8, BE)  | Payload (N bytes) |
//! +-------------+-----------+-------------+-------------------+
//! ```
//!
//! - **Version**: [`FRAME_VERSION`]
//! - **Flags**: bit 0 response, bit 1 error. Other bits must be clear.
//! - **Id**: correlation id, [`EPHEMERAL_ID`] for fire-and-forget messages
//! - **Payload**: value-encoded data, or a postcard-encoded
//!   [`ErrorDescriptor`] when the error flag is set
//!
//! # Examples
//!
//! ```rust
//! use nanomessage::codec::{Codec, Frame, FrameBody};
//! use nanomessage::encoding::PostcardEncoding;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = Codec::new(PostcardEncoding::default());
//!
//! let bytes = codec.encode(&Frame::request(7, "ping from alice".to_string()))?;
//! let frame: Frame<String> = codec.decode(&bytes)?;
//!
//! assert_eq!(frame.id, 7);
//! assert!(!frame.response);
//! assert_eq!(frame.body, FrameBody::Data("ping from alice".to_string()));
//! # Ok(())
//! # }
//! ```

use crate::encoding::{PostcardEncoding, ValueEncoding};
use crate::error::{ErrorDescriptor, NanomessageError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Current frame layout version.
pub const FRAME_VERSION: u8 = 1;

/// Size of the version and flags bytes.
pub const FRAME_HEADER_SIZE: usize = 2;

/// Size of the correlation id.
pub const FRAME_ID_SIZE: usize = 8;

/// Smallest well-formed frame: header plus id, empty payload.
pub const MIN_FRAME_SIZE: usize = FRAME_HEADER_SIZE + FRAME_ID_SIZE;

/// Default upper bound for a whole frame (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Reserved id of ephemeral messages. No correlation is expected.
pub const EPHEMERAL_ID: u64 = 0;

/// Opaque caller-supplied value attached to a message.
pub type Context = Arc<dyn Any + Send + Sync>;

/// The flag set carried by every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFlags {
    /// The frame answers a request.
    pub response: bool,
    /// The payload is an error descriptor.
    pub error: bool,
}

impl FrameFlags {
    const RESPONSE: u8 = 1;
    const ERROR: u8 = 1 << 1;
    const ALL: u8 = Self::RESPONSE | Self::ERROR;

    /// Packs the flags into their wire byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        let mut bits = 0;
        if self.response {
            bits |= Self::RESPONSE;
        }
        if self.error {
            bits |= Self::ERROR;
        }
        bits
    }

    /// Unpacks a wire byte, returning `None` if unknown bits are set.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL != 0 {
            return None;
        }
        Some(Self {
            response: bits & Self::RESPONSE != 0,
            error: bits & Self::ERROR != 0,
        })
    }
}

/// What a frame carries.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameBody<T> {
    /// An application payload.
    Data(T),
    /// A failure reported by the remote side.
    Error(NanomessageError),
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<T> {
    /// Correlation id, [`EPHEMERAL_ID`] for ephemeral messages.
    pub id: u64,
    /// Whether this frame answers a request.
    pub response: bool,
    /// Payload or error.
    pub body: FrameBody<T>,
}

impl<T> Frame<T> {
    /// A request expecting a response.
    pub fn request(id: u64, data: T) -> Self {
        Self {
            id,
            response: false,
            body: FrameBody::Data(data),
        }
    }

    /// A fire-and-forget message.
    pub fn ephemeral(data: T) -> Self {
        Self::request(EPHEMERAL_ID, data)
    }

    /// A successful response to request `id`.
    pub fn response(id: u64, data: T) -> Self {
        Self {
            id,
            response: true,
            body: FrameBody::Data(data),
        }
    }

    /// A failed response to request `id`.
    pub fn error_response(id: u64, error: NanomessageError) -> Self {
        Self {
            id,
            response: true,
            body: FrameBody::Error(error),
        }
    }

    /// The flags this frame is encoded with.
    pub fn flags(&self) -> FrameFlags {
        FrameFlags {
            response: self.response,
            error: matches!(self.body, FrameBody::Error(_)),
        }
    }

    /// Returns `true` for ephemeral messages.
    pub fn is_ephemeral(&self) -> bool {
        self.id == EPHEMERAL_ID
    }

    /// Builds the metadata for this frame.
    pub fn info(&self, context: Option<Context>) -> MessageInfo {
        let flags = self.flags();
        MessageInfo {
            id: self.id,
            response: flags.response,
            error: flags.error,
            context,
        }
    }
}

/// Metadata about a frame, handed to handlers, transports and observers.
#[derive(Clone, Default)]
pub struct MessageInfo {
    /// Correlation id.
    pub id: u64,
    /// The frame answers a request.
    pub response: bool,
    /// The frame carries an error.
    pub error: bool,
    /// Caller-supplied context, if any.
    pub context: Option<Context>,
}

impl MessageInfo {
    /// Returns `true` when the frame is an ephemeral message.
    pub fn ephemeral(&self) -> bool {
        self.id == EPHEMERAL_ID
    }

    /// Returns the context downcast to `C`, if present and of that type.
    ///
    /// ```rust
    /// use nanomessage::codec::MessageInfo;
    /// use std::sync::Arc;
    ///
    /// let info = MessageInfo {
    ///     context: Some(Arc::new("peer-7".to_string())),
    ///     ..Default::default()
    /// };
    /// assert_eq!(info.context_ref::<String>().map(String::as_str), Some("peer-7"));
    /// assert!(info.context_ref::<u32>().is_none());
    /// ```
    pub fn context_ref<C: Any>(&self) -> Option<&C> {
        self.context.as_deref().and_then(|c| c.downcast_ref::<C>())
    }
}

impl fmt::Debug for MessageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageInfo")
            .field("id", &self.id)
            .field("response", &self.response)
            .field("error", &self.error)
            .field("ephemeral", &self.ephemeral())
            .field("context", &self.context.is_some())
            .finish()
    }
}

/// Encodes frames to bytes and decodes them back.
#[derive(Clone, Debug)]
pub struct Codec<S = PostcardEncoding> {
    encoding: S,
    max_frame_size: usize,
}

impl<S: ValueEncoding> Codec<S> {
    /// Creates a codec using `encoding` for payloads.
    pub fn new(encoding: S) -> Self {
        Self {
            encoding,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Sets the largest frame accepted in either direction.
    #[must_use]
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size.max(MIN_FRAME_SIZE);
        self
    }

    /// The payload encoding.
    pub fn encoding(&self) -> &S {
        &self.encoding
    }

    /// The largest frame accepted in either direction.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Encodes a frame.
    ///
    /// # Errors
    ///
    /// Returns [`NanomessageError::Encode`] if the payload cannot be encoded
    /// or the frame would exceed the maximum frame size.
    pub fn encode<T>(&self, frame: &Frame<T>) -> Result<Bytes, NanomessageError>
    where
        T: serde::Serialize,
    {
        let payload = match &frame.body {
            FrameBody::Data(data) => self.encoding.encode(data)?,
            FrameBody::Error(error) => {
                postcard::to_allocvec(&error.to_descriptor()).map_err(NanomessageError::encode)?
            }
        };

        let size = MIN_FRAME_SIZE + payload.len();
        if size > self.max_frame_size {
            return Err(NanomessageError::Encode {
                reason: format!(
                    "frame size {} exceeds maximum {}",
                    size, self.max_frame_size
                ),
            });
        }

        let mut buf = BytesMut::with_capacity(size);
        buf.put_u8(FRAME_VERSION);
        buf.put_u8(frame.flags().bits());
        buf.put_u64(frame.id);
        buf.put_slice(&payload);
        Ok(buf.freeze())
    }

    /// Decodes a frame.
    ///
    /// The header is validated before the payload is touched, so a frame
    /// without a correlation id is always reported as
    /// [`NanomessageError::InvalidRequest`].
    ///
    /// # Errors
    ///
    /// - [`NanomessageError::Decode`] for oversized input, an unknown version,
    ///   unknown flag bits or an undecodable payload
    /// - [`NanomessageError::InvalidRequest`] when the id is missing
    pub fn decode<T>(&self, bytes: &[u8]) -> Result<Frame<T>, NanomessageError>
    where
        T: serde::de::DeserializeOwned,
    {
        let (flags, id, payload) = self.decode_header(bytes)?;

        let body = if flags.error {
            let descriptor: ErrorDescriptor =
                postcard::from_bytes(payload).map_err(NanomessageError::decode)?;
            FrameBody::Error(NanomessageError::from_descriptor(descriptor))
        } else {
            FrameBody::Data(self.encoding.decode(payload)?)
        };

        Ok(Frame {
            id,
            response: flags.response,
            body,
        })
    }

    fn decode_header<'a>(
        &self,
        bytes: &'a [u8],
    ) -> Result<(FrameFlags, u64, &'a [u8]), NanomessageError> {
        if bytes.len() > self.max_frame_size {
            return Err(NanomessageError::Decode {
                reason: format!(
                    "frame size {} exceeds maximum {}",
                    bytes.len(),
                    self.max_frame_size
                ),
            });
        }
        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(NanomessageError::Decode {
                reason: format!("frame of {} bytes has no header", bytes.len()),
            });
        }

        let mut cursor = bytes;
        let version = cursor.get_u8();
        if version != FRAME_VERSION {
            return Err(NanomessageError::Decode {
                reason: format!("unsupported frame version {}", version),
            });
        }

        let bits = cursor.get_u8();
        let flags = FrameFlags::from_bits(bits).ok_or_else(|| NanomessageError::Decode {
            reason: format!("unknown frame flags {:#04x}", bits),
        })?;
        if flags.error && !flags.response {
            return Err(NanomessageError::Decode {
                reason: "error flag set on a non-response frame".to_string(),
            });
        }

        if cursor.remaining() < FRAME_ID_SIZE {
            return Err(NanomessageError::InvalidRequest {
                reason: "frame is missing its correlation id".to_string(),
            });
        }
        let id = cursor.get_u64();

        Ok((flags, id, cursor))
    }
}

impl Default for Codec<PostcardEncoding> {
    fn default() -> Self {
        Self::new(PostcardEncoding::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    struct Greeting {
        text: String,
        attempt: u8,
    }

    fn greeting(text: &str) -> Greeting {
        Greeting {
            text: text.to_string(),
            attempt: 1,
        }
    }

    #[test]
    fn test_flags_bits() {
        for (response, error) in [(false, false), (true, false), (true, true), (false, true)] {
            let flags = FrameFlags { response, error };
            assert_eq!(FrameFlags::from_bits(flags.bits()), Some(flags));
        }
        assert_eq!(FrameFlags::from_bits(0b100), None);
    }

    #[test]
    fn test_request_and_response_frames() {
        let codec = Codec::default();

        let request = Frame::request(42, greeting("ping from alice"));
        let decoded: Frame<Greeting> = codec.decode(&codec.encode(&request).unwrap()).unwrap();
        assert_eq!(decoded, request);
        assert!(!decoded.is_ephemeral());

        let response = Frame::response(42, greeting("pong from bob"));
        let decoded: Frame<Greeting> = codec.decode(&codec.encode(&response).unwrap()).unwrap();
        assert_eq!(decoded, response);
        assert_eq!(
            decoded.flags(),
            FrameFlags {
                response: true,
                error: false
            }
        );
    }

    #[test]
    fn test_ephemeral_frame_uses_reserved_id() {
        let codec = Codec::default();
        let bytes = codec.encode(&Frame::ephemeral(greeting("hi"))).unwrap();
        assert_eq!(&bytes[2..10], &[0u8; 8]);

        let frame: Frame<Greeting> = codec.decode(&bytes).unwrap();
        assert!(frame.is_ephemeral());
        assert!(frame.info(None).ephemeral());
    }

    #[test]
    fn test_header_layout() {
        let codec = Codec::default();
        let bytes = codec
            .encode(&Frame::<Greeting>::error_response(
                0x0102,
                NanomessageError::Close,
            ))
            .unwrap();

        assert_eq!(bytes[0], FRAME_VERSION);
        assert_eq!(bytes[1], 0b11);
        assert_eq!(&bytes[2..10], &0x0102u64.to_be_bytes());
    }

    #[test]
    fn test_error_frames_rebuild_the_error() {
        let codec = Codec::default();

        let timeout = Frame::<Greeting>::error_response(9, NanomessageError::Timeout { id: 9 });
        let decoded: Frame<Greeting> = codec.decode(&codec.encode(&timeout).unwrap()).unwrap();
        assert_eq!(decoded.body, FrameBody::Error(NanomessageError::Timeout { id: 9 }));

        let remote = RemoteError::new("APP_ERR_NOPE", "nope: %s")
            .with_arg("because")
            .with_metadata("retry", "false");
        let frame = Frame::<Greeting>::error_response(10, remote.clone().into());
        let decoded: Frame<Greeting> = codec.decode(&codec.encode(&frame).unwrap()).unwrap();
        match decoded.body {
            FrameBody::Error(NanomessageError::Remote(rebuilt)) => assert_eq!(rebuilt, remote),
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_non_frame_bytes_are_decode_errors() {
        let codec = Codec::default();

        let error = codec.decode::<Greeting>(b"not valid").unwrap_err();
        assert_eq!(error.code(), "NM_ERR_DECODE");

        let error = codec.decode::<Greeting>(&[]).unwrap_err();
        assert_eq!(error.code(), "NM_ERR_DECODE");

        let error = codec.decode::<Greeting>(&[FRAME_VERSION, 0b1000, 0, 0]).unwrap_err();
        assert_eq!(error.code(), "NM_ERR_DECODE");

        let error = codec
            .decode::<Greeting>(&[FRAME_VERSION, 0b10, 0, 0, 0, 0, 0, 0, 0, 1])
            .unwrap_err();
        assert_eq!(error.code(), "NM_ERR_DECODE");
    }

    #[test]
    fn test_missing_id_is_invalid_request() {
        let codec = Codec::default();
        let error = codec
            .decode::<Greeting>(&[FRAME_VERSION, 0, 0, 0, 1])
            .unwrap_err();
        assert_eq!(error.code(), "NM_ERR_INVALID_REQUEST");
        assert!(error.is_decode());
    }

    #[test]
    fn test_bad_payload_is_decode_error() {
        let codec = Codec::default();
        let mut bytes = codec.encode(&Frame::request(3, greeting("x"))).unwrap().to_vec();
        bytes.truncate(MIN_FRAME_SIZE + 1);

        let error = codec.decode::<Greeting>(&bytes).unwrap_err();
        assert_eq!(error.code(), "NM_ERR_DECODE");
    }

    #[test]
    fn test_max_frame_size() {
        let codec = Codec::default().with_max_frame_size(32);

        let error = codec
            .encode(&Frame::request(1, "y".repeat(64)))
            .unwrap_err();
        assert_eq!(error.code(), "NM_ERR_ENCODE");

        let large = Codec::default().encode(&Frame::request(1, "y".repeat(64))).unwrap();
        let error = codec.decode::<String>(&large).unwrap_err();
        assert_eq!(error.code(), "NM_ERR_DECODE");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_payloads() {
        let codec = Codec::new(crate::encoding::JsonEncoding::default());
        let bytes = codec.encode(&Frame::request(5, greeting("json"))).unwrap();
        assert_eq!(&bytes[MIN_FRAME_SIZE..], br#"{"text":"json","attempt":1}"#);

        let frame: Frame<Greeting> = codec.decode(&bytes).unwrap();
        assert_eq!(frame.body, FrameBody::Data(greeting("json")));
    }
}
