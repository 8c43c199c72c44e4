//! Integration tests for the scrmirror-core protocol codecs.
//!
//! These tests drive the public API the way the client threads do: bytes
//! arrive in arbitrary chunks, get appended to a buffer, and are decoded
//! until the codec reports that more input is needed.

use scrmirror_core::{
    decode_control_message, decode_device_message, encode_control_message, encode_device_message,
    protocol::{
        decode_device_info, decode_video_header, encode_device_info, encode_video_unit,
        messages::{
            buttons, KeyEventAction, MotionEventAction, Point, Position, Pressure,
            ScreenPowerMode, Size, CONTROL_MSG_CLIPBOARD_TEXT_MAX_LENGTH,
            DEVICE_MSG_TEXT_MAX_LENGTH, POINTER_ID_VIRTUAL_FINGER,
        },
        VIDEO_HEADER_SIZE,
    },
    ControlMessage, DeviceInfo, DeviceMessage, ProtocolError, RawVideoUnit,
};

fn roundtrip(msg: ControlMessage) -> ControlMessage {
    let bytes = encode_control_message(&msg);
    let (decoded, consumed) = decode_control_message(&bytes).expect("decode must succeed");
    assert_eq!(consumed, bytes.len(), "all bytes must be consumed");
    decoded
}

/// Feeds `stream` to the device decoder `chunk` bytes at a time, keeping
/// undecoded bytes between reads.
fn decode_device_stream(stream: &[u8], chunk: usize) -> Result<Vec<DeviceMessage>, ProtocolError> {
    let mut pending = Vec::new();
    let mut out = Vec::new();
    for piece in stream.chunks(chunk) {
        pending.extend_from_slice(piece);
        loop {
            match decode_device_message(&pending) {
                Ok((msg, consumed)) => {
                    out.push(msg);
                    pending.drain(..consumed);
                }
                Err(e) if e.is_incomplete() => break,
                Err(e) => return Err(e),
            }
        }
    }
    assert!(pending.is_empty(), "stream ended mid-message");
    Ok(out)
}

#[test]
fn test_roundtrip_every_control_message_type() {
    let position = Position {
        point: Point { x: 12, y: 34 },
        screen_size: Size {
            width: 720,
            height: 1280,
        },
    };
    let messages = vec![
        ControlMessage::InjectKeycode {
            action: KeyEventAction::Multiple,
            keycode: 4,
            repeat: 3,
            metastate: 0,
        },
        ControlMessage::InjectText {
            text: "héllo".to_string(),
        },
        ControlMessage::InjectTouchEvent {
            action: MotionEventAction::PointerDown,
            pointer_id: POINTER_ID_VIRTUAL_FINGER,
            position,
            pressure: Pressure::from_f32(0.5),
            buttons: buttons::TERTIARY,
        },
        ControlMessage::InjectScrollEvent {
            position,
            hscroll: -2,
            vscroll: 3,
        },
        ControlMessage::BackOrScreenOn,
        ControlMessage::ExpandNotificationPanel,
        ControlMessage::CollapseNotificationPanel,
        ControlMessage::GetClipboard,
        ControlMessage::SetClipboard {
            text: "clip".to_string(),
            paste: false,
        },
        ControlMessage::SetScreenPowerMode {
            mode: ScreenPowerMode::Normal,
        },
        ControlMessage::RotateDevice,
    ];

    for msg in messages {
        assert_eq!(roundtrip(msg.clone()), msg);
    }
}

#[test]
fn test_maximum_clipboard_text_fits_and_longer_is_truncated() {
    // Arrange
    let exact = "z".repeat(CONTROL_MSG_CLIPBOARD_TEXT_MAX_LENGTH);
    let longer = "z".repeat(CONTROL_MSG_CLIPBOARD_TEXT_MAX_LENGTH + 10);

    // Act
    let exact_bytes = encode_control_message(&ControlMessage::SetClipboard {
        text: exact,
        paste: false,
    });
    let longer_bytes = encode_control_message(&ControlMessage::SetClipboard {
        text: longer,
        paste: false,
    });

    // Assert: both serialize to the protocol maximum
    assert_eq!(exact_bytes.len(), CONTROL_MSG_CLIPBOARD_TEXT_MAX_LENGTH + 6);
    assert_eq!(exact_bytes, longer_bytes);
}

#[test]
fn test_device_stream_decodes_across_every_chunk_size() {
    // Arrange
    let messages = vec![
        DeviceMessage::Clipboard {
            text: "first".to_string(),
        },
        DeviceMessage::Clipboard {
            text: String::new(),
        },
        DeviceMessage::Clipboard {
            text: "dritte Nachricht ✓".to_string(),
        },
    ];
    let stream: Vec<u8> = messages.iter().flat_map(encode_device_message).collect();

    // Act / Assert
    for chunk in 1..=stream.len() {
        let decoded = decode_device_stream(&stream, chunk).expect("valid stream");
        assert_eq!(decoded, messages, "chunk size {chunk}");
    }
}

#[test]
fn test_device_stream_with_oversized_length_fails() {
    let mut stream = encode_device_message(&DeviceMessage::Clipboard {
        text: "ok".to_string(),
    });
    stream.push(0x00);
    stream.extend_from_slice(&((DEVICE_MSG_TEXT_MAX_LENGTH as u32) + 1).to_be_bytes());

    let result = decode_device_stream(&stream, 3);
    assert!(matches!(result, Err(ProtocolError::InvalidLength { .. })));
}

#[test]
fn test_video_units_and_device_info_parse_from_concatenated_stream() {
    // Arrange: device info preamble followed by a config unit and a media unit
    let info = DeviceInfo {
        name: "emulator-5554".to_string(),
        frame_size: Size {
            width: 480,
            height: 800,
        },
    };
    let config = RawVideoUnit::config(vec![0, 0, 0, 1, 0x67]);
    let media = RawVideoUnit::media(33_333, vec![0, 0, 0, 1, 0x65, 0xAA]);

    let mut stream = encode_device_info(&info).to_vec();
    stream.extend(encode_video_unit(&config));
    stream.extend(encode_video_unit(&media));

    // Act
    let parsed_info = decode_device_info(&stream).unwrap();
    let mut offset = 68;
    let mut units = Vec::new();
    while offset < stream.len() {
        let header: [u8; VIDEO_HEADER_SIZE] = stream[offset..offset + VIDEO_HEADER_SIZE]
            .try_into()
            .unwrap();
        let header = decode_video_header(&header).unwrap();
        let start = offset + VIDEO_HEADER_SIZE;
        let end = start + header.len as usize;
        units.push(RawVideoUnit {
            pts: header.pts,
            payload: stream[start..end].to_vec(),
        });
        offset = end;
    }

    // Assert
    assert_eq!(parsed_info, info);
    assert_eq!(units, vec![config, media]);
    assert!(units[0].is_config());
    assert!(!units[1].is_config());
}
