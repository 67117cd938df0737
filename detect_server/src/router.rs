use std::{collections::HashMap, sync::Mutex};

use anyhow::{bail, Result};
use common::protocol::ProtoMsg;
use log::{debug, info};

use crate::{
    broadcast_channel, hashed, BroadcastReceiver, BroadcastSender, StaticFrameReceiver,
    StaticJobSender,
};

use super::as_jpeg_stream_item;

/// Fans incoming frames out to stream subscribers and the detection queue.
pub struct FrameRouter {
    raw_broadcast_map: Mutex<HashMap<u64, BroadcastSender>>,
    overlay_broadcast_map: Mutex<HashMap<u64, BroadcastSender>>,
    jobs_tx: StaticJobSender,
    detect_id: u64,
}

impl FrameRouter {
    pub fn new(jobs_tx: StaticJobSender, detect_channel: &str) -> Self {
        Self {
            raw_broadcast_map: Mutex::new(HashMap::new()),
            overlay_broadcast_map: Mutex::new(HashMap::new()),
            jobs_tx,
            detect_id: hashed(detect_channel),
        }
    }

    pub async fn run(&self, rx: StaticFrameReceiver) -> Result<()> {
        let mut raw_sender_map = HashMap::new();
        let mut overlay_sender_map = HashMap::new();

        loop {
            {
                let mut raw_broadcast_map = self.raw_broadcast_map.lock().unwrap();
                raw_broadcast_map.retain(|_id, sender| sender.receiver_count() > 0);

                for (id, sender) in raw_broadcast_map.iter() {
                    raw_sender_map.insert(*id, sender.clone());
                }
                raw_sender_map.retain(|id, _sender| raw_broadcast_map.contains_key(id))
            }
            {
                let mut overlay_broadcast_map = self.overlay_broadcast_map.lock().unwrap();
                overlay_broadcast_map.retain(|_id, sender| sender.receiver_count() > 0);

                for (id, sender) in overlay_broadcast_map.iter() {
                    overlay_sender_map.insert(*id, sender.clone());
                }
                overlay_sender_map.retain(|id, _sender| overlay_broadcast_map.contains_key(id))
            }

            for _ in 0..4 {
                match rx.recv_ref().await {
                    None => bail!("incoming frames channel closed"),
                    Some(data) => match ProtoMsg::deserialize(&data[..]) {
                        Ok(ProtoMsg::FrameMsg(frame_msg)) => {
                            let id = hashed(&frame_msg.channel);

                            if let Some(sender) = raw_sender_map.get(&id) {
                                sender.send(as_jpeg_stream_item(&frame_msg.data)).ok();
                            }

                            // Frames on the detect channel are queued even with
                            // no overlay viewers; presence tracking depends on
                            // them. The reply sender rides along only while
                            // somebody watches.
                            if id == self.detect_id {
                                let reply = overlay_sender_map.get(&id).cloned();
                                if let Ok(mut job) = self.jobs_tx.try_send_ref() {
                                    job.jpeg.clear();
                                    job.jpeg.extend_from_slice(&frame_msg.data);
                                    job.reply = reply;
                                }
                            }
                        }
                        Ok(ProtoMsg::ConnectReq(channel)) => {
                            info!("Sender connected for channel '{channel}'");
                        }
                        Err(e) => debug!("Dropping undecodable message: {e}"),
                    },
                }
            }
        }
    }

    pub fn get_raw_receiver(&self, name: &str) -> BroadcastReceiver {
        subscribe(&self.raw_broadcast_map, hashed(name))
    }

    pub fn get_overlay_receiver(&self, name: &str) -> BroadcastReceiver {
        subscribe(&self.overlay_broadcast_map, hashed(name))
    }
}

fn subscribe(map: &Mutex<HashMap<u64, BroadcastSender>>, id: u64) -> BroadcastReceiver {
    let mut broadcast_map = map.lock().unwrap();

    if let Some(tx) = broadcast_map.get(&id) {
        tx.subscribe()
    } else {
        let (tx, rx) = broadcast_channel();
        broadcast_map.insert(id, tx);

        rx
    }
}
