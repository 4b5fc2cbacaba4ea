//! Vision configuration

use serde::{Deserialize, Serialize};

/// Vision configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// ONNX model path; detection is disabled when unset or unloadable
    pub model_path: Option<String>,

    /// Square model input size (pixels)
    pub input_size: u32,

    /// Minimum class score for a candidate box
    pub confidence_threshold: f32,

    /// IoU above which overlapping boxes are merged
    pub iou_threshold: f32,

    /// Fraction of the frame a box must cover to block the path
    pub obstacle_threshold: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: 320,
            confidence_threshold: 0.5,
            iou_threshold: 0.5,
            obstacle_threshold: 0.30,
        }
    }
}
