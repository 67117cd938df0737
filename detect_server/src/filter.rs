//! Per-frame detection filtering and ranking.
//!
use image::Rgb;
use itertools::Itertools;

use crate::{labels::LabelMap, nn::RawDetection};

/// Lowest confidence a detection must exceed to survive filtering.
pub const SCORE_THRESHOLD: f32 = 0.4;

/// Most detections kept per frame.
pub const MAX_DETECTIONS: usize = 5;

/// One detection that survived filtering, in frame pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredDetection {
    pub class_name: String,
    pub score: f32,
    pub color: Rgb<u8>,
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

/// Filter one frame's raw detections.
///
/// Detections with unmapped class ids or scores at or below
/// [`SCORE_THRESHOLD`] are dropped before ranking, so they never occupy one
/// of the [`MAX_DETECTIONS`] slots. The rest are sorted by descending score
/// (stable, ties keep input order) and truncated. Bounding boxes come out
/// floored to integer pixel bounds of the `width` x `height` frame.
///
/// Callers must not invoke this for frames with zero dimensions; such
/// frames are skipped upstream.
pub fn filter_detections(
    raw: &[RawDetection],
    labels: &LabelMap,
    width: u32,
    height: u32,
) -> Vec<FilteredDetection> {
    raw.iter()
        .filter(|det| det.score > SCORE_THRESHOLD)
        .filter_map(|det| labels.resolve(det.class_id).map(|label| (det, label)))
        .sorted_by(|a, b| b.0.score.total_cmp(&a.0.score))
        .take(MAX_DETECTIONS)
        .map(|(det, label)| {
            let [y_min, x_min, y_max, x_max] = det.bbox;
            FilteredDetection {
                class_name: label.name.clone(),
                score: det.score,
                color: label.color,
                x_min: (x_min * width as f32).floor() as i32,
                y_min: (y_min * height as f32).floor() as i32,
                x_max: (x_max * width as f32).floor() as i32,
                y_max: (y_max * height as f32).floor() as i32,
            }
        })
        .collect()
}
