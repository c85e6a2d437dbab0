//! Length-prefixed framing on top of a raw byte stream.
//!
//! Wire format, repeated back to back:
//! ```text
//! [length:4 (little-endian u32)][payload:length]
//! ```
//!
//! # Why framing is needed (for beginners)
//!
//! TCP delivers a *stream* of bytes, not a sequence of messages.  A single
//! `read()` may return half a message, exactly one, or several glued
//! together.  The sender therefore prefixes every payload with its length,
//! and the receiver appends everything it reads to an accumulation buffer
//! and repeatedly cuts complete frames off the front:
//!
//! ```text
//! read #1: [05 00 00 00 h e l]            -> nothing yet (need 9 bytes)
//! read #2: [l o 02 00 00 00 h i]          -> "hello", then "hi"
//! ```
//!
//! [`FrameCodec::try_decode_one`] must be called in a loop until it returns
//! `Ok(None)`.
//!
//! # Maximum frame length
//!
//! A corrupted or hostile length header could declare gigabytes.  Every
//! codec carries a maximum; a larger declaration is a protocol error
//! ([`FrameError::TooLarge`]) that the transport treats as fatal to the
//! connection.  The check runs as soon as the 4 header bytes are available,
//! so the receiver never waits for (or buffers) an oversized body.

use thiserror::Error;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default upper bound on a single frame payload (1 MiB).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// Errors produced by the frame codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// A payload (outbound) or a length header (inbound) exceeds the maximum.
    #[error("frame of {length} bytes exceeds the maximum of {max} bytes")]
    TooLarge { length: usize, max: usize },
}

/// Encodes and decodes length-prefixed frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    max_frame_length: usize,
}

impl FrameCodec {
    /// Creates a codec that rejects payloads longer than `max_frame_length`.
    pub fn new(max_frame_length: usize) -> Self {
        Self { max_frame_length }
    }

    /// Returns the configured maximum payload length.
    pub fn max_frame_length(&self) -> usize {
        self.max_frame_length
    }

    /// Prepends the 4-byte little-endian length header to `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] if `payload` is longer than the
    /// configured maximum (or does not fit in a `u32`).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use gamenet_core::protocol::FrameCodec;
    ///
    /// let codec = FrameCodec::default();
    /// let frame = codec.encode(b"hi").unwrap();
    /// assert_eq!(frame, vec![2, 0, 0, 0, b'h', b'i']);
    /// ```
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
        self.check_length(payload.len())?;
        let length = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
            length: payload.len(),
            max: self.max_frame_length,
        })?;

        let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(payload);
        Ok(frame)
    }

    /// Removes one complete frame from the front of `buffer`, if present.
    ///
    /// Returns `Ok(Some(payload))` and shrinks `buffer` by `length + 4` when a
    /// whole frame is available, or `Ok(None)` (leaving `buffer` untouched)
    /// when more bytes are needed.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] if the header declares a length above
    /// the maximum.  The buffer is left untouched; the caller is expected to
    /// close the connection.
    pub fn try_decode_one(&self, buffer: &mut Vec<u8>) -> Result<Option<Vec<u8>>, FrameError> {
        if buffer.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let length = u32::from_le_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
        self.check_length(length)?;

        let total = LENGTH_PREFIX_SIZE + length;
        if buffer.len() < total {
            return Ok(None);
        }

        let payload = buffer[LENGTH_PREFIX_SIZE..total].to_vec();
        // `drain` shifts the remaining bytes to the front; fine for the
        // small frames a game protocol exchanges.
        buffer.drain(..total);
        Ok(Some(payload))
    }

    /// Removes every complete frame currently in `buffer`, in order.
    ///
    /// A trailing partial frame stays in `buffer`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] as soon as an oversized header is
    /// reached; frames before it have already been removed from `buffer` and
    /// are discarded along with the error.
    pub fn decode_all(&self, buffer: &mut Vec<u8>) -> Result<Vec<Vec<u8>>, FrameError> {
        let mut frames = Vec::new();
        while let Some(frame) = self.try_decode_one(buffer)? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn check_length(&self, length: usize) -> Result<(), FrameError> {
        if length > self.max_frame_length {
            return Err(FrameError::TooLarge {
                length,
                max: self.max_frame_length,
            });
        }
        Ok(())
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_prepends_little_endian_length() {
        // Arrange
        let codec = FrameCodec::default();

        // Act
        let frame = codec.encode(&[0xAA; 258]).unwrap();

        // Assert – 258 = 0x0102 little-endian is [02 01 00 00]
        assert_eq!(&frame[..4], &[0x02, 0x01, 0x00, 0x00]);
        assert_eq!(frame.len(), 262);
    }

    #[test]
    fn test_round_trip_leaves_accumulator_empty() {
        // Arrange
        let codec = FrameCodec::default();
        let payload = b"{\"uid\":\"x\"}".to_vec();
        let mut buffer = codec.encode(&payload).unwrap();

        // Act
        let decoded = codec.try_decode_one(&mut buffer).unwrap();

        // Assert
        assert_eq!(decoded, Some(payload));
        assert!(buffer.is_empty(), "accumulator must be empty after a whole frame");
    }

    #[test]
    fn test_empty_payload_round_trips() {
        let codec = FrameCodec::default();
        let mut buffer = codec.encode(&[]).unwrap();
        assert_eq!(codec.try_decode_one(&mut buffer).unwrap(), Some(Vec::new()));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_try_decode_one_returns_none_for_partial_header() {
        let codec = FrameCodec::default();
        let mut buffer = vec![0x05, 0x00];
        assert_eq!(codec.try_decode_one(&mut buffer).unwrap(), None);
        assert_eq!(buffer.len(), 2, "buffer must be untouched");
    }

    #[test]
    fn test_try_decode_one_returns_none_for_partial_body() {
        let codec = FrameCodec::default();
        let mut buffer = vec![0x05, 0x00, 0x00, 0x00, b'h', b'e'];
        assert_eq!(codec.try_decode_one(&mut buffer).unwrap(), None);
        assert_eq!(buffer.len(), 6, "buffer must be untouched");
    }

    #[test]
    fn test_split_at_every_boundary_yields_exactly_one_frame() {
        // Arrange
        let codec = FrameCodec::default();
        let payload = b"hello, frame".to_vec();
        let encoded = codec.encode(&payload).unwrap();

        for split in 0..=encoded.len() {
            // Act – feed the first part, drain, then the rest, drain
            let mut buffer = encoded[..split].to_vec();
            let mut frames = codec.decode_all(&mut buffer).unwrap();
            buffer.extend_from_slice(&encoded[split..]);
            frames.extend(codec.decode_all(&mut buffer).unwrap());

            // Assert
            assert_eq!(frames, vec![payload.clone()], "split at {split}");
            assert!(buffer.is_empty(), "split at {split}");
        }
    }

    #[test]
    fn test_multiple_frames_in_one_buffer_decode_in_order() {
        // Arrange
        let codec = FrameCodec::default();
        let mut buffer = codec.encode(b"one").unwrap();
        buffer.extend(codec.encode(b"two").unwrap());
        buffer.extend(codec.encode(b"three").unwrap());
        buffer.extend_from_slice(&[0x09, 0x00]); // start of a fourth frame

        // Act
        let frames = codec.decode_all(&mut buffer).unwrap();

        // Assert
        assert_eq!(frames, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
        assert_eq!(buffer, vec![0x09, 0x00], "partial frame must remain buffered");
    }

    #[test]
    fn test_encode_rejects_payload_above_maximum() {
        let codec = FrameCodec::new(8);
        assert_eq!(
            codec.encode(&[0u8; 9]),
            Err(FrameError::TooLarge { length: 9, max: 8 })
        );
    }

    #[test]
    fn test_encode_accepts_payload_at_maximum() {
        let codec = FrameCodec::new(8);
        assert!(codec.encode(&[0u8; 8]).is_ok());
    }

    #[test]
    fn test_decode_rejects_oversized_header_before_body_arrives() {
        // Arrange – header declares 1000 bytes, max is 16, no body yet
        let codec = FrameCodec::new(16);
        let mut buffer = 1000u32.to_le_bytes().to_vec();

        // Act
        let result = codec.try_decode_one(&mut buffer);

        // Assert
        assert_eq!(result, Err(FrameError::TooLarge { length: 1000, max: 16 }));
    }

    #[test]
    fn test_decode_all_stops_at_oversized_frame() {
        let codec = FrameCodec::new(4);
        let mut buffer = codec.encode(b"ok").unwrap();
        buffer.extend_from_slice(&100u32.to_le_bytes());
        assert!(codec.decode_all(&mut buffer).is_err());
    }
}
