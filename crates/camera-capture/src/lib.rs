//! Camera Capture Library for the Rover
//!
//! Provides the RGB frame type shared by the vision pipeline and the
//! operator console, plus the frame sources the control loop pulls from:
//! - Synthetic frames (bench runs without a camera)
//! - A still image replayed every cycle (detector bring-up)
//! - No camera at all (degraded mode)

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{open_source, FrameSource, NoCamera, StillImageCamera, SyntheticCamera};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Frame encoding failed: {0}")]
    Encode(String),

    #[error("Camera not initialized")]
    NotInitialized,
}

/// Where frames come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSourceKind {
    /// Blank frames at the configured size
    #[default]
    Synthetic,
    /// The image at `image_path`, every cycle
    Still,
    /// No camera; every capture fails
    Disabled,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Frame source
    pub source: CameraSourceKind,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Image file for [`CameraSourceKind::Still`]
    pub image_path: Option<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: CameraSourceKind::Synthetic,
            width: 320,
            height: 240,
            image_path: None,
        }
    }
}
