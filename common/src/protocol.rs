//! Protocol definition for the frame data socket.
//!
use serde::{Deserialize, Serialize};

/// Definition of protocol messages.
///
/// A sender announces itself with a [`ProtoMsg::ConnectReq`] carrying its
/// channel name, then streams [`ProtoMsg::FrameMsg`] frames tagged with the
/// same channel.
#[derive(Debug, Deserialize, Serialize)]
pub enum ProtoMsg {
    ConnectReq(String),
    FrameMsg(FrameMsg),
}

/// One JPEG-encoded camera frame on a named channel.
#[derive(Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FrameMsg {
    pub channel: String,
    pub data: Vec<u8>,
}

impl FrameMsg {
    pub fn new(channel: String, data: Vec<u8>) -> Self {
        Self { channel, data }
    }
}

impl ProtoMsg {
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Box<bincode::ErrorKind>> {
        bincode::deserialize(bytes)
    }
}
