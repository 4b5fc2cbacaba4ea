//! YOLO object detector
//!
//! Runs a YOLOv8-style ONNX export through tract. The model is optional:
//! without one every frame yields no detections and the rover drives on
//! distance telemetry alone.

use crate::config::VisionConfig;
use crate::nms::non_max_suppression;
use crate::object::{BoundingBox, Detection, DetectionClass};
use crate::VisionError;
use camera_capture::VideoFrame;
use image::imageops::{self, FilterType};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, error, info, warn};

type OnnxModel = TypedRunnableModel<TypedModel>;

/// Image → detections capability used by the control loop
pub trait ObjectDetector: Send {
    /// Detect objects in `frame`; failures yield an empty list
    fn detect(&self, frame: &VideoFrame) -> Vec<Detection>;

    /// Whether a model is loaded
    fn is_available(&self) -> bool;
}

/// ONNX detector
pub struct VisionDetector {
    model: Option<OnnxModel>,
    config: VisionConfig,
}

impl VisionDetector {
    /// Create the detector, disabling detection if the model cannot be loaded
    pub fn new(config: &VisionConfig) -> Self {
        let model = match &config.model_path {
            Some(path) => {
                info!("Loading detection model from {}", path);
                match Self::load_model(path, config.input_size) {
                    Ok(model) => Some(model),
                    Err(e) => {
                        error!("Detection disabled: {}", e);
                        None
                    }
                }
            }
            None => {
                warn!("No detection model path configured. Obstacle and sign detection disabled.");
                None
            }
        };

        Self {
            model,
            config: config.clone(),
        }
    }

    fn load_model(path: &str, input_size: u32) -> Result<OnnxModel, VisionError> {
        let side = input_size as usize;
        tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, side, side]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| VisionError::ModelLoad(format!("{}: {}", path, e)))
    }

    /// Resize to the square model input and lay out as normalized NCHW
    fn preprocess(&self, frame: &VideoFrame) -> Result<Tensor, VisionError> {
        let image = frame.to_rgb_image().map_err(|_| VisionError::InvalidFrame)?;
        let size = self.config.input_size;
        let resized = imageops::resize(&image, size, size, FilterType::Triangle);

        let side = size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        Ok(input.into())
    }

    fn infer(&self, model: &OnnxModel, frame: &VideoFrame) -> Result<Vec<Detection>, VisionError> {
        let input = self.preprocess(frame)?;
        let outputs = model
            .run(tvec!(input.into()))
            .map_err(|e| VisionError::Inference(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| VisionError::Inference("model produced no outputs".to_string()))?
            .to_array_view::<f32>()
            .map_err(|e| VisionError::Inference(e.to_string()))?;

        let shape = output.shape().to_vec();
        let data: Vec<f32> = output.iter().copied().collect();
        decode_predictions(&data, &shape, frame.width, frame.height, &self.config)
    }
}

impl ObjectDetector for VisionDetector {
    fn detect(&self, frame: &VideoFrame) -> Vec<Detection> {
        let Some(model) = &self.model else {
            return Vec::new();
        };

        let start = Instant::now();
        match self.infer(model, frame) {
            Ok(detections) => {
                let elapsed = start.elapsed();
                metrics::histogram!("detection_latency_seconds").record(elapsed.as_secs_f64());
                debug!("Detected {} objects in {}ms", detections.len(), elapsed.as_millis());
                detections
            }
            Err(e) => {
                warn!("Detection failed on frame {}: {}", frame.sequence, e);
                Vec::new()
            }
        }
    }

    fn is_available(&self) -> bool {
        self.model.is_some()
    }
}

/// Decode a YOLOv8 head (`[1, 4 + classes, candidates]`, row-major) into
/// detections in source-frame pixels, then apply NMS.
pub fn decode_predictions(
    data: &[f32],
    shape: &[usize],
    frame_width: u32,
    frame_height: u32,
    config: &VisionConfig,
) -> Result<Vec<Detection>, VisionError> {
    let (attributes, candidates) = match shape {
        [1, attributes, candidates] if *attributes > 4 => (*attributes, *candidates),
        _ => return Err(VisionError::OutputShape(shape.to_vec())),
    };
    if data.len() < attributes * candidates {
        return Err(VisionError::OutputShape(shape.to_vec()));
    }

    let at = |attribute: usize, candidate: usize| data[attribute * candidates + candidate];
    let x_scale = frame_width as f32 / config.input_size as f32;
    let y_scale = frame_height as f32 / config.input_size as f32;

    let mut detections = Vec::new();
    for i in 0..candidates {
        // First maximum wins on equal scores
        let (class_index, score) = (4..attributes)
            .map(|a| (a - 4, at(a, i)))
            .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });

        if score < config.confidence_threshold {
            continue;
        }
        let Some(class) = DetectionClass::from_index(class_index) else {
            continue;
        };

        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        let Some(bbox) = BoundingBox::clipped(
            (cx - 0.5 * w) * x_scale,
            (cy - 0.5 * h) * y_scale,
            (cx + 0.5 * w) * x_scale,
            (cy + 0.5 * h) * y_scale,
            frame_width,
            frame_height,
        ) else {
            continue;
        };
        detections.push(Detection {
            class,
            bbox,
            confidence: score,
        });
    }

    Ok(non_max_suppression(detections, config.iou_threshold))
}
