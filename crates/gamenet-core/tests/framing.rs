//! Integration tests for the gamenet-core wire pipeline.
//!
//! These tests drive the public API the same way the transport does: encode
//! a [`Message`] to JSON, wrap it in a frame, deliver the bytes in awkward
//! chunks, cut frames back out of an accumulation buffer, decode them, and
//! push them through the inbound relay.

use gamenet_core::{
    decode_message, encode_message,
    protocol::{FrameCodec, MessageClock},
    CommandCode, FrameError, InboundRelay, Message, OperationCode, PushOutcome,
};

/// Frames `messages` back to back into one byte vector.
fn wire_bytes(codec: &FrameCodec, messages: &[Message]) -> Vec<u8> {
    messages
        .iter()
        .flat_map(|m| codec.encode(&encode_message(m).expect("encode")).expect("frame"))
        .collect()
}

/// Feeds `bytes` into an accumulator `chunk` bytes at a time, decoding as it
/// goes, exactly like a receive loop would.
fn receive_in_chunks(codec: &FrameCodec, bytes: &[u8], chunk: usize) -> Vec<Message> {
    let mut accumulator = Vec::new();
    let mut messages = Vec::new();
    for piece in bytes.chunks(chunk) {
        accumulator.extend_from_slice(piece);
        while let Some(frame) = codec.try_decode_one(&mut accumulator).expect("frame") {
            messages.push(decode_message(&frame).expect("decode"));
        }
    }
    assert!(accumulator.is_empty(), "no bytes may be left over");
    messages
}

#[test]
fn test_messages_survive_any_chunking() {
    // Arrange
    let codec = FrameCodec::default();
    let sent = vec![
        Message::request(OperationCode::LOGIN, r#"{"uid":"x"}"#, 1),
        Message::event(OperationCode::AREA_OF_INTEREST, r#"{"enter":[1,2,3]}"#, 2),
        Message::broadcast(OperationCode::CHAT, "plain text is fine too", 3),
        Message::response(OperationCode(90000), "", 4),
    ];
    let bytes = wire_bytes(&codec, &sent);

    for chunk in [1, 2, 3, 5, 7, 64, bytes.len()] {
        // Act
        let received = receive_in_chunks(&codec, &bytes, chunk);

        // Assert
        assert_eq!(received, sent, "chunk size {chunk}");
    }
}

#[test]
fn test_relay_drops_redelivered_frames() {
    // Arrange – the same three frames are delivered twice
    let codec = FrameCodec::default();
    let clock = MessageClock::new();
    let sent: Vec<Message> = (0..3)
        .map(|i| Message::event(OperationCode::SYNC_POSITION, format!("{i}"), clock.next()))
        .collect();
    let mut bytes = wire_bytes(&codec, &sent);
    bytes.extend(wire_bytes(&codec, &sent));
    let relay = InboundRelay::new();

    // Act
    let outcomes: Vec<PushOutcome> = receive_in_chunks(&codec, &bytes, 11)
        .into_iter()
        .map(|m| relay.push(m))
        .collect();
    let mut drained = Vec::new();
    relay.drain_once(|m| drained.push(m));

    // Assert
    assert_eq!(drained, sent);
    assert_eq!(
        outcomes.iter().filter(|o| **o == PushOutcome::Accepted).count(),
        3
    );
}

#[test]
fn test_oversized_frame_is_a_protocol_error() {
    // Arrange – the receiver allows 64 bytes, the sender allowed more
    let sender = FrameCodec::new(1024);
    let receiver = FrameCodec::new(64);
    let msg = Message::new(OperationCode::CHAT, CommandCode::Event, "x".repeat(200), 1);
    let mut accumulator = sender.encode(&encode_message(&msg).unwrap()).unwrap();

    // Act
    let result = receiver.try_decode_one(&mut accumulator);

    // Assert
    assert!(matches!(result, Err(FrameError::TooLarge { max: 64, .. })));
}
