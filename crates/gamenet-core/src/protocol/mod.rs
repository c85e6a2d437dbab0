//! Protocol module containing the message model, the JSON codec and the
//! length-prefixed frame codec.

pub mod clock;
pub mod codec;
pub mod frame;
pub mod message;

pub use clock::MessageClock;
pub use codec::{decode_message, decode_payload, encode_message, encode_payload, ProtocolError};
pub use frame::{FrameCodec, FrameError, DEFAULT_MAX_FRAME_LENGTH, LENGTH_PREFIX_SIZE};
pub use message::*;
