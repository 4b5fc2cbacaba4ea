//! Frame sources for the control loop
//!
//! The physical camera driver lives outside this workspace; the control
//! loop only sees [`FrameSource`]. A failed capture is a value, and the
//! caller decides whether to skip the cycle.

use crate::frame::VideoFrame;
use crate::{CameraConfig, CameraError, CameraSourceKind};
use image::imageops::{self, FilterType};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Anything that can hand the control loop a frame
pub trait FrameSource: Send {
    /// Capture the next frame
    fn capture(&mut self) -> Result<VideoFrame, CameraError>;

    /// Short name for logs and health reporting
    fn name(&self) -> &'static str;
}

/// Build the source selected by `config`, degrading to [`NoCamera`] when it
/// cannot be opened
pub fn open_source(config: &CameraConfig) -> Box<dyn FrameSource> {
    match config.source {
        CameraSourceKind::Synthetic => Box::new(SyntheticCamera::new(config.width, config.height)),
        CameraSourceKind::Still => {
            let opened = config
                .image_path
                .as_deref()
                .ok_or_else(|| CameraError::Open("camera.image_path is not set".to_string()))
                .and_then(|path| StillImageCamera::open(path, config.width, config.height));
            match opened {
                Ok(camera) => Box::new(camera),
                Err(e) => {
                    warn!("Still image camera unavailable, running without video: {}", e);
                    Box::new(NoCamera)
                }
            }
        }
        CameraSourceKind::Disabled => {
            warn!("Camera disabled; autonomous driving will idle");
            Box::new(NoCamera)
        }
    }
}

/// Produces black frames of a fixed size
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    sequence: u32,
    opened_at: Instant,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        info!("Using synthetic camera {}x{}", width, height);
        Self {
            width,
            height,
            sequence: 0,
            opened_at: Instant::now(),
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn capture(&mut self) -> Result<VideoFrame, CameraError> {
        let mut frame = VideoFrame::blank(self.width, self.height);
        frame.timestamp_ns = self.opened_at.elapsed().as_nanos() as u64;
        frame.sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}

/// Replays one image file, resized to the configured capture size
pub struct StillImageCamera {
    frame: VideoFrame,
    sequence: u32,
    opened_at: Instant,
}

impl StillImageCamera {
    /// Load and resize the image at `path`
    pub fn open(path: impl AsRef<Path>, width: u32, height: u32) -> Result<Self, CameraError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| CameraError::Open(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        let resized = imageops::resize(&image, width, height, FilterType::Triangle);

        info!("Replaying still image {} at {}x{}", path.display(), width, height);
        Ok(Self {
            frame: VideoFrame::from_rgb_image(resized, 0, 0),
            sequence: 0,
            opened_at: Instant::now(),
        })
    }
}

impl FrameSource for StillImageCamera {
    fn capture(&mut self) -> Result<VideoFrame, CameraError> {
        let mut frame = self.frame.clone();
        frame.timestamp_ns = self.opened_at.elapsed().as_nanos() as u64;
        frame.sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }

    fn name(&self) -> &'static str {
        "still"
    }
}

/// No camera attached
pub struct NoCamera;

impl FrameSource for NoCamera {
    fn capture(&mut self) -> Result<VideoFrame, CameraError> {
        Err(CameraError::NotInitialized)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
