//! ScrMirror client entry point.
//!
//! Loads the configuration, connects both sockets, and runs a
//! [`MirrorSession`] until the stream ends or Ctrl-C is pressed.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML file or defaults
//!  └─ connect video, control   -- video socket first
//!  └─ read_device_info()       -- 68-byte preamble
//!  └─ MirrorSession::start()   -- control, device, video threads
//!  └─ event loop
//!       ├─ NewFrame        -> take the frame from the FrameBuffer
//!       ├─ StreamStopped   -> report recording summary, exit
//!       └─ Ctrl-C          -> shutdown
//! ```
//!
//! No window is opened here: frames are consumed and logged so the binary
//! is usable as a headless recorder. A GUI front-end drives the same
//! session and hands frames to its renderer instead.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use scrmirror_client::infrastructure::clipboard::MemoryClipboard;
use scrmirror_client::infrastructure::decoding::AnnexBParser;
use scrmirror_client::infrastructure::network::connect;
use scrmirror_client::infrastructure::recording::{open_muxer, Recorder};
use scrmirror_client::infrastructure::session::{MirrorSession, SessionDeps, SessionEvent};
use scrmirror_client::infrastructure::storage::{config_file_path, load_config, ClientConfig};
use scrmirror_client::infrastructure::video::{read_device_info, StreamRecorder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config_file_path().context("locating config file")?;
    let config = load_config(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .init();

    info!(config = %config_path.display(), "ScrMirror client starting");

    // ── Connections ───────────────────────────────────────────────────────────
    let video_addr = resolve(&config.server.host, config.server.video_port)?;
    let control_addr = resolve(&config.server.host, config.server.control_port)?;

    let mut video = connect(video_addr).context("connecting video socket")?;
    let control = connect(control_addr).context("connecting control socket")?;

    let device = read_device_info(&mut video).context("reading device info")?;
    info!(
        name = %device.name,
        width = device.frame_size.width,
        height = device.frame_size.height,
        "device connected"
    );

    // ── Session ───────────────────────────────────────────────────────────────
    let mut deps = SessionDeps::new(
        Box::new(AnnexBParser::new()),
        Arc::new(MemoryClipboard::new()),
    );
    deps.frame_policy = config.video.frame_policy;
    deps.control_queue_capacity = config.control.queue_capacity;
    deps.recorder = open_recorder(&config)?;

    let (mut session, mut events) =
        MirrorSession::start(video, control, deps).context("starting mirror session")?;

    // ── Event loop ────────────────────────────────────────────────────────────
    let mut frames_seen: u64 = 0;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::NewFrame) => {
                    if let Some(frame) = session.frames().acquire_for_render() {
                        frames_seen += 1;
                        debug!(pts = frame.pts, width = frame.width, height = frame.height, "frame ready");
                    }
                }
                Some(SessionEvent::StreamStopped { reason, recording }) => {
                    info!(?reason, frames = frames_seen, "video stream stopped");
                    if let Some(summary) = recording {
                        if summary.failed {
                            warn!(packets = summary.packets_written, "recording failed");
                        } else if !summary.is_complete() {
                            warn!(
                                packets = summary.packets_written,
                                dropped = summary.packets_dropped,
                                "recording saved with missing packets"
                            );
                        } else {
                            info!(packets = summary.packets_written, "recording saved");
                        }
                    }
                    break;
                }
                None => break,
            },
            _ = &mut ctrl_c => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    // the ingest thread joins the recorder, which can take a while on a slow disk
    tokio::task::block_in_place(|| session.shutdown());
    if let Ok(SessionEvent::StreamStopped { recording: Some(summary), .. }) = events.try_recv() {
        info!(
            packets = summary.packets_written,
            dropped = summary.packets_dropped,
            failed = summary.failed,
            "recording closed"
        );
    }

    info!("ScrMirror client stopped");
    Ok(())
}

fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("resolving {host}:{port}"))?
        .next()
        .with_context(|| format!("no address for {host}:{port}"))
}

fn open_recorder(config: &ClientConfig) -> anyhow::Result<Option<StreamRecorder>> {
    let Some(path) = config.recording.path.as_deref() else {
        return Ok(None);
    };
    let (path, format) = config
        .recording
        .target()
        .with_context(|| format!("cannot infer recording format from {}", path.display()))?;
    let muxer = open_muxer(path, format)
        .with_context(|| format!("opening recording file {}", path.display()))?;
    info!(path = %path.display(), ?format, "recording enabled");
    Ok(Some(Recorder::new(muxer, config.recording.queue_capacity)))
}
