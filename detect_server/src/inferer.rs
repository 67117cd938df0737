//! Inference worker turning queued frames into detections and overlays.
use std::{sync::Arc, time::Instant};

use image::RgbImage;
use log::{debug, info, warn};

use crate::{
    as_jpeg_stream_item, context::DetectContext, filter::filter_detections, meter::METER,
    nn::DetectModel, overlay::OverlayRenderer, StaticJobReceiver,
};

pub struct Inferer<M> {
    jobs_rx: StaticJobReceiver,
    model: M,
    overlay: OverlayRenderer,
    ctx: Arc<DetectContext>,
}

impl<M: DetectModel> Inferer<M> {
    pub fn new(
        jobs_rx: StaticJobReceiver,
        model: M,
        overlay: OverlayRenderer,
        ctx: Arc<DetectContext>,
    ) -> Self {
        Self {
            jobs_rx,
            model,
            overlay,
            ctx,
        }
    }

    /// Process queued frames until the job channel closes.
    ///
    /// Any failure on a single frame drops that frame and moves on; the
    /// worker itself only exits with the channel.
    pub async fn run(self) {
        while let Some(job) = self.jobs_rx.recv_ref().await {
            let image: RgbImage = match turbojpeg::decompress_image(&job.jpeg) {
                Ok(image) => image,
                Err(e) => {
                    debug!("Skipping undecodable frame: {e}");
                    continue;
                }
            };
            if image.width() == 0 || image.height() == 0 {
                continue;
            }

            let raw = match self.model.detect(&image) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Detection failed: {e:#}");
                    continue;
                }
            };
            let detections =
                filter_detections(&raw, &self.ctx.labels, image.width(), image.height());
            self.ctx.observe_detections(&detections, Instant::now());
            METER.tick_processed();
            METER.add_objects(detections.len() as u64);

            // Overlay frames are only rendered while someone is watching.
            if let Some(reply) = &job.reply {
                let frame = self.overlay.draw(image, &detections);
                match turbojpeg::compress_image(&frame, 95, turbojpeg::Subsamp::Sub2x2) {
                    Ok(buf) => {
                        reply.send(as_jpeg_stream_item(&buf)).ok();
                    }
                    Err(e) => warn!("Failed to compress overlay frame: {e}"),
                }
            }
        }
        info!("Detection job channel closed, inference worker exiting");
    }
}
