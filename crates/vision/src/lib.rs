//! Rover Vision
//!
//! Forward-camera scene analysis for the autonomous loop:
//! - YOLO object detection over a 13-class road vocabulary
//! - Non-max suppression of overlapping boxes
//! - Reduction of detections to the three signals the arbitration
//!   engine consumes (blocked, stop sign seen, obstacle center)

pub mod config;
pub mod detector;
pub mod nms;
pub mod object;
pub mod perception;

pub use config::VisionConfig;
pub use detector::{decode_predictions, ObjectDetector, VisionDetector};
pub use nms::{iou, non_max_suppression};
pub use object::{BoundingBox, Detection, DetectionClass};
pub use perception::{PerceptionAdapter, PerceptionResult};

use thiserror::Error;

/// Vision error types
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unexpected model output shape {0:?}")]
    OutputShape(Vec<usize>),

    #[error("Invalid frame format")]
    InvalidFrame,
}
