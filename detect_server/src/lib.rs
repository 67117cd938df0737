//! Detection server: receives camera frame streams, runs object detection,
//! and promotes persistently seen classes into actionable browser controls.
//!
pub mod context;
pub mod controls;
pub mod data_socket;
pub mod endpoints;
pub mod filter;
pub mod inferer;
pub mod labels;
pub mod meter;
pub mod nn;
pub mod overlay;
pub mod presence;
pub mod reconcile;
pub mod router;

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use bytes::{Bytes, BytesMut};
use thingbuf::mpsc::{StaticChannel, StaticReceiver, StaticSender};
use tokio::sync::broadcast;

/// Incoming socket frames waiting to be routed.
pub static INCOMING_FRAMES_CHANNEL: StaticChannel<BytesMut, 8> = StaticChannel::new();

/// Frame jobs waiting for the detection pipeline.
pub static DETECT_JOBS_CHANNEL: StaticChannel<DetectJob, 4> = StaticChannel::new();

pub type StaticFrameSender = StaticSender<BytesMut>;
pub type StaticFrameReceiver = StaticReceiver<BytesMut>;
pub type StaticJobSender = StaticSender<DetectJob>;
pub type StaticJobReceiver = StaticReceiver<DetectJob>;

pub type BroadcastSender = broadcast::Sender<Bytes>;
pub type BroadcastReceiver = broadcast::Receiver<Bytes>;

/// One JPEG frame handed to the detection pipeline, with the broadcast
/// sender the rendered overlay should be published on (if anyone watches).
#[derive(Clone, Default)]
pub struct DetectJob {
    pub jpeg: Vec<u8>,
    pub reply: Option<BroadcastSender>,
}

pub fn broadcast_channel() -> (BroadcastSender, BroadcastReceiver) {
    broadcast::channel(4)
}

/// Stable hash of a channel or class name.
pub fn hashed(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Wrap a JPEG buffer as one part of a `multipart/x-mixed-replace` stream.
pub fn as_jpeg_stream_item(data: &[u8]) -> Bytes {
    Bytes::from(
        [
            "--frame\r\nContent-Type: image/jpeg\r\n\r\n".as_bytes(),
            data,
            "\r\n\r\n".as_bytes(),
        ]
        .concat(),
    )
}
