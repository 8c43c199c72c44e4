//! End-to-end tests: a fake device server on loopback sockets drives a full
//! `MirrorSession`, with recording to a real file.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use scrmirror_client::application::record::{
    ContainerMuxer, RecordFormat, FIXED_LAST_DURATION_US,
};
use scrmirror_client::infrastructure::clipboard::MemoryClipboard;
use scrmirror_client::infrastructure::decoding::mock::{LifecycleLog, MockDecoder};
use scrmirror_client::infrastructure::decoding::AnnexBParser;
use scrmirror_client::infrastructure::recording::mock::MockMuxer;
use scrmirror_client::infrastructure::recording::{open_muxer, Recorder};
use scrmirror_client::infrastructure::session::{MirrorSession, SessionDeps, SessionEvent};
use scrmirror_client::infrastructure::video::{read_device_info, StreamEnd, StreamRecorder};
use scrmirror_core::protocol::device_info::encode_device_info;
use scrmirror_core::protocol::messages::Size;
use scrmirror_core::protocol::video::encode_video_unit;
use scrmirror_core::{decode_control_message, ControlMessage, DeviceInfo, RawVideoUnit};

const SPS: [u8; 8] = [0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1f];
const IDR: [u8; 6] = [0, 0, 0, 1, 0x65, 0x88];
const SLICE: [u8; 6] = [0, 0, 0, 1, 0x41, 0x9a];

struct FakeDevice {
    video: TcpStream,
    control: TcpStream,
}

/// Connects client sockets to a loopback "device" and returns both ends.
fn connect_device() -> (TcpStream, TcpStream, FakeDevice) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let video = TcpStream::connect(addr).unwrap();
    let (device_video, _) = listener.accept().unwrap();
    let control = TcpStream::connect(addr).unwrap();
    let (device_control, _) = listener.accept().unwrap();
    (
        video,
        control,
        FakeDevice {
            video: device_video,
            control: device_control,
        },
    )
}

fn send_units(device: &mut FakeDevice, units: &[RawVideoUnit]) {
    for unit in units {
        device.video.write_all(&encode_video_unit(unit)).unwrap();
    }
}

fn wait_for_stop(events: &mut tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    loop {
        match events.blocking_recv() {
            Some(SessionEvent::NewFrame) => continue,
            Some(stopped) => return stopped,
            None => panic!("event channel closed without StreamStopped"),
        }
    }
}

#[test]
fn test_device_info_then_stream_is_recorded_to_annexb_file() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.h264");
    let format = RecordFormat::from_path(&path).unwrap();
    let recorder: StreamRecorder = Recorder::new(open_muxer(&path, format).unwrap(), 16);

    let (mut video, control, mut device) = connect_device();
    let info = DeviceInfo {
        name: "Pixel 7".to_string(),
        frame_size: Size {
            width: 1080,
            height: 2400,
        },
    };
    device.video.write_all(&encode_device_info(&info)).unwrap();

    // Act
    let received = read_device_info(&mut video).unwrap();
    let mut deps = SessionDeps::new(
        Box::new(AnnexBParser::new()),
        Arc::new(MemoryClipboard::new()),
    );
    deps.recorder = Some(recorder);
    let (_session, mut events) = MirrorSession::start(video, control, deps).unwrap();

    send_units(
        &mut device,
        &[
            RawVideoUnit::config(SPS.to_vec()),
            RawVideoUnit::media(0, IDR.to_vec()),
            RawVideoUnit::media(33_333, SLICE.to_vec()),
        ],
    );
    drop(device);
    let stopped = wait_for_stop(&mut events);

    // Assert
    assert_eq!(received, info);
    match stopped {
        SessionEvent::StreamStopped { reason, recording } => {
            assert_eq!(reason, StreamEnd::EndOfStream);
            let summary = recording.unwrap();
            assert_eq!(summary.packets_written, 2);
            assert!(summary.header_written);
            assert!(!summary.failed);
            assert_eq!(summary.packets_dropped, 0);
            assert!(summary.is_complete());
        }
        other => panic!("unexpected event {other:?}"),
    }

    let mut expected = SPS.to_vec();
    expected.extend_from_slice(&SPS);
    expected.extend_from_slice(&IDR);
    expected.extend_from_slice(&SLICE);
    assert_eq!(std::fs::read(&path).unwrap(), expected);
}

#[test]
fn test_recorded_durations_follow_stream_timestamps() {
    // Arrange
    let muxer = MockMuxer::new();
    let boxed: Box<dyn ContainerMuxer> = Box::new(muxer.clone());
    let recorder: StreamRecorder = Recorder::new(boxed, 16);
    let (video, control, mut device) = connect_device();
    let mut deps = SessionDeps::new(
        Box::new(AnnexBParser::new()),
        Arc::new(MemoryClipboard::new()),
    );
    deps.recorder = Some(recorder);
    let (_session, mut events) = MirrorSession::start(video, control, deps).unwrap();

    // Act
    send_units(
        &mut device,
        &[
            RawVideoUnit::config(SPS.to_vec()),
            RawVideoUnit::media(1000, IDR.to_vec()),
            RawVideoUnit::media(2500, SLICE.to_vec()),
            RawVideoUnit::media(4000, SLICE.to_vec()),
            RawVideoUnit::media(5500, SLICE.to_vec()),
        ],
    );
    drop(device);
    wait_for_stop(&mut events);

    // Assert
    assert_eq!(
        muxer.durations(),
        vec![1500, 1500, 1500, FIXED_LAST_DURATION_US]
    );
    assert_eq!(muxer.packet_timestamps(), vec![1000, 2500, 4000, 5500]);
}

#[test]
fn test_invalid_bitstream_ends_stream_with_parser_error() {
    let (video, control, mut device) = connect_device();
    let deps = SessionDeps::new(
        Box::new(AnnexBParser::new()),
        Arc::new(MemoryClipboard::new()),
    );
    let (_session, mut events) = MirrorSession::start(video, control, deps).unwrap();

    // no start code
    send_units(&mut device, &[RawVideoUnit::media(0, vec![0x65, 0x88])]);

    assert!(matches!(
        wait_for_stop(&mut events),
        SessionEvent::StreamStopped {
            reason: StreamEnd::Parser(_),
            ..
        }
    ));
}

#[test]
fn test_decoded_frames_and_control_share_one_session() {
    // Arrange
    let log = LifecycleLog::new();
    let (video, control, mut device) = connect_device();
    let mut deps = SessionDeps::new(
        Box::new(AnnexBParser::new()),
        Arc::new(MemoryClipboard::new()),
    );
    deps.decoder = Some(Box::new(MockDecoder::new(log.clone())));
    let (mut session, mut events) = MirrorSession::start(video, control, deps).unwrap();

    // Act
    send_units(&mut device, &[RawVideoUnit::media(7, IDR.to_vec())]);
    let first = events.blocking_recv();
    session
        .control()
        .push(ControlMessage::ExpandNotificationPanel)
        .unwrap();
    let mut byte = [0u8; 1];
    device.control.read_exact(&mut byte).unwrap();
    session.shutdown();

    // Assert
    assert!(matches!(first, Some(SessionEvent::NewFrame)));
    let frame = session.frames().acquire_for_render().unwrap();
    assert_eq!(frame.pts, 7);
    assert_eq!(frame.width, 1080);
    drop(frame);
    assert_eq!(
        decode_control_message(&byte).unwrap().0,
        ControlMessage::ExpandNotificationPanel
    );
    assert_eq!(log.entries(), vec!["decoder.open", "decoder.close"]);
}
