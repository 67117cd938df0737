//! SSD detection model wrapper.
//!
use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::s;
use smallvec::SmallVec;
use tract_onnx::prelude::*;

type NnModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;
type NnOut = SmallVec<[Arc<Tensor>; 4]>;

/// Edge length of the square model input.
pub const NN_INPUT_SIZE: u32 = 192;

/// One unfiltered candidate detection.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Normalized corner coordinates `[y_min, x_min, y_max, x_max]`.
    pub bbox: [f32; 4],
    pub class_id: i64,
    pub score: f32,
}

impl RawDetection {
    pub fn new(bbox: [f32; 4], class_id: i64, score: f32) -> Self {
        Self {
            bbox,
            class_id,
            score,
        }
    }
}

/// Detection models the pipeline can run frames through.
pub trait DetectModel {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<RawDetection>>;
}

/// Pre-trained SSD detection model loaded from an ONNX file.
///
/// The model takes a batched 192x192 integer tensor and answers with the
/// usual four-output detection head: boxes, class indices, scores and a
/// detection count.
pub struct SsdModel {
    model: NnModel,
    width: u32,
    height: u32,
}

impl SsdModel {
    /// Load and optimize the model.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (width, height) = (NN_INPUT_SIZE, NN_INPUT_SIZE);

        let input_fact = InferenceFact::dt_shape(
            i32::datum_type(),
            tvec!(1, height as usize, width as usize, 3),
        );
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to load model {}", path.display()))?
            .with_input_fact(0, input_fact)?
            .into_optimized()?
            .into_runnable()?;

        log::info!("Loaded detection model from {}", path.display());

        Ok(Self {
            model,
            width,
            height,
        })
    }
}

impl DetectModel for SsdModel {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<RawDetection>> {
        let input = tvec!(image_to_tensor(frame, self.width, self.height));
        let raw_out = self.model.run(input)?;
        parse_detections(&raw_out)
    }
}

/// Resize a frame and lay it out as the batched integer tensor the model
/// expects (NHWC, raw 0-255 channel values).
fn image_to_tensor(frame: &RgbImage, width: u32, height: u32) -> Tensor {
    let resized: RgbImage = image::imageops::resize(
        frame,
        width,
        height,
        image::imageops::FilterType::Triangle,
    );

    tract_ndarray::Array4::from_shape_fn(
        (1, height as usize, width as usize, 3),
        |(_, y, x, c)| resized[(x as u32, y as u32)][c] as i32,
    )
    .into()
}

/// Parse the model's four parallel outputs into raw detections.
///
/// The head emits `[boxes, classes, scores, count]`; boxes are flattened
/// groups of four normalized floats `[y_min, x_min, y_max, x_max]`.
fn parse_detections(out: &NnOut) -> Result<Vec<RawDetection>> {
    let boxes: Vec<f32> = out[0].to_array_view::<f32>()?.iter().copied().collect();
    let classes_view = out[1].to_array_view::<f32>()?;
    let classes = classes_view.slice(s![0, ..]);
    let scores_view = out[2].to_array_view::<f32>()?;
    let scores = scores_view.slice(s![0, ..]);
    let count = out[3].to_array_view::<f32>()?;

    let num = count.iter().next().copied().unwrap_or(0.0) as usize;
    let num = num
        .min(classes.len())
        .min(scores.len())
        .min(boxes.len() / 4);

    let detections = boxes
        .chunks_exact(4)
        .zip(classes.iter().zip(scores.iter()))
        .take(num)
        .map(|(bbox, (class, score))| RawDetection {
            bbox: [bbox[0], bbox[1], bbox[2], bbox[3]],
            class_id: *class as i64,
            score: *score,
        })
        .collect();

    Ok(detections)
}
