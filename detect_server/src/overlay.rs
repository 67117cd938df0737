//! Drawing of detection overlays onto camera frames.
use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use imageproc::{
    drawing::{draw_hollow_rect, draw_text},
    rect::Rect,
};
use log::{error, info};
use rusttype::{Font, Scale};

use crate::filter::FilteredDetection;

const LABEL_SCALE: Scale = Scale { x: 16.0, y: 16.0 };

/// Renders filtered detections onto frames for the overlay stream.
pub struct OverlayRenderer {
    font: Option<Font<'static>>,
}

impl OverlayRenderer {
    /// Build a renderer; label text is drawn only when a font is given and
    /// loads. A broken font file downgrades to box-only overlays.
    pub fn new(font_path: Option<&Path>) -> Self {
        let font = match font_path {
            Some(path) => match load_font(path) {
                Ok(font) => Some(font),
                Err(e) => {
                    error!("Failed to load font: {e:#}");
                    None
                }
            },
            None => {
                info!("Rendering overlays without label text");
                None
            }
        };
        Self { font }
    }

    /// Draw one hollow box per detection, each in its class color, with
    /// "name score" next to the top-left corner.
    pub fn draw(&self, mut frame: RgbImage, detections: &[FilteredDetection]) -> RgbImage {
        for det in detections {
            let rect_width = (det.x_max - det.x_min).max(1) as u32;
            let rect_height = (det.y_max - det.y_min).max(1) as u32;
            let rect = Rect::at(det.x_min, det.y_min).of_size(rect_width, rect_height);

            frame = draw_hollow_rect(&frame, rect, det.color);
            if let Some(font) = &self.font {
                frame = draw_text(
                    &frame,
                    det.color,
                    det.x_min,
                    det.y_min,
                    LABEL_SCALE,
                    font,
                    &format!("{} {:.2}", det.class_name, det.score),
                );
            }
        }

        frame
    }
}

fn load_font(path: &Path) -> Result<Font<'static>> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read font from {}", path.display()))?;
    Font::try_from_vec(data).context("failed to parse font")
}
