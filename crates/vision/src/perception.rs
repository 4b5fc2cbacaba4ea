//! Perception adapter
//!
//! Reduces a frame's detections to the signals the arbitration engine acts
//! on, and draws the overlay shown to the operator. The overlay is drawn
//! after the signals are computed and never feeds back into them.

use crate::config::VisionConfig;
use crate::object::{BoundingBox, Detection, DetectionClass};
use camera_capture::VideoFrame;
use image::Rgb;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use tracing::debug;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const STOP_BANNER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// Solid bar drawn above stop signs; the overlay carries no text
const STOP_BANNER_HEIGHT: u32 = 8;

/// Decision-relevant view of one frame
#[derive(Debug, Clone)]
pub struct PerceptionResult {
    /// A detection covers more than the obstacle threshold of the frame
    pub is_blocked: bool,

    /// A stop sign is in view
    pub stop_sign_seen: bool,

    /// Horizontal center of the blocking detection
    pub obstacle_center_x: Option<f32>,

    /// Width of the analysed frame
    pub frame_width: u32,

    /// Frame with boxes and stop-sign banners drawn, for display only
    pub annotated_frame: VideoFrame,
}

/// Turns detections into hazards
#[derive(Debug, Clone)]
pub struct PerceptionAdapter {
    obstacle_threshold: f32,
}

impl PerceptionAdapter {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            obstacle_threshold: config.obstacle_threshold,
        }
    }

    /// Evaluate `detections` against `frame` and annotate the frame
    pub fn perceive(&self, detections: &[Detection], frame: VideoFrame) -> PerceptionResult {
        let stop_sign_seen = detections
            .iter()
            .any(|d| d.class == DetectionClass::StopSign);
        let obstacle = self.blocking_obstacle(detections, frame.width, frame.height);

        PerceptionResult {
            is_blocked: obstacle.is_some(),
            stop_sign_seen,
            obstacle_center_x: obstacle.map(|d| d.bbox.center_x()),
            frame_width: frame.width,
            annotated_frame: annotate(frame, detections),
        }
    }

    /// The detection that blocks the path, if any.
    ///
    /// Among several qualifying detections the largest wins; equal areas
    /// keep the earlier detection.
    pub fn blocking_obstacle<'a>(
        &self,
        detections: &'a [Detection],
        frame_width: u32,
        frame_height: u32,
    ) -> Option<&'a Detection> {
        let frame_area = frame_width as f32 * frame_height as f32;
        if frame_area <= 0.0 {
            return None;
        }

        detections
            .iter()
            .map(|d| (d, d.bbox.area() / frame_area))
            .filter(|(_, ratio)| *ratio > self.obstacle_threshold)
            .fold(None::<(&Detection, f32)>, |best, cur| match best {
                Some(b) if b.1 >= cur.1 => Some(b),
                _ => Some(cur),
            })
            .map(|(d, _)| d)
    }
}

impl Default for PerceptionAdapter {
    fn default() -> Self {
        Self::new(&VisionConfig::default())
    }
}

/// Outline every detection in green and mark stop signs with a red banner
fn annotate(frame: VideoFrame, detections: &[Detection]) -> VideoFrame {
    if detections.is_empty() {
        return frame;
    }
    let mut canvas = match frame.to_rgb_image() {
        Ok(canvas) => canvas,
        Err(e) => {
            debug!("Skipping overlay: {}", e);
            return frame;
        }
    };

    let (canvas_width, canvas_height) = canvas.dimensions();
    for detection in detections {
        let b = detection.bbox;
        if b.width <= 0 || b.height <= 0 {
            continue;
        }
        // Draw only the part inside the frame
        let Some(b) = BoundingBox::clipped(
            b.left as f32,
            b.top as f32,
            b.right() as f32,
            b.bottom() as f32,
            canvas_width,
            canvas_height,
        ) else {
            continue;
        };
        let (w, h) = (b.width as u32, b.height as u32);

        // 2px outline
        draw_hollow_rect_mut(&mut canvas, Rect::at(b.left, b.top).of_size(w, h), BOX_COLOR);
        if w > 2 && h > 2 {
            draw_hollow_rect_mut(
                &mut canvas,
                Rect::at(b.left + 1, b.top + 1).of_size(w - 2, h - 2),
                BOX_COLOR,
            );
        }

        if detection.class == DetectionClass::StopSign {
            let banner_top = b.top - STOP_BANNER_HEIGHT as i32 - 2;
            draw_filled_rect_mut(
                &mut canvas,
                Rect::at(b.left, banner_top).of_size(w, STOP_BANNER_HEIGHT),
                STOP_BANNER_COLOR,
            );
        }
    }

    VideoFrame::from_rgb_image(canvas, frame.timestamp_ns, frame.sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class: DetectionClass, left: i32, top: i32, width: i32, height: i32) -> Detection {
        Detection {
            class,
            bbox: BoundingBox::new(left, top, width, height),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_empty_scene_is_clear() {
        let result = PerceptionAdapter::default().perceive(&[], VideoFrame::blank(320, 240));

        assert!(!result.is_blocked);
        assert!(!result.stop_sign_seen);
        assert_eq!(result.obstacle_center_x, None);
        assert_eq!(result.frame_width, 320);
    }

    #[test]
    fn test_stop_sign_seen_regardless_of_size() {
        let detections = [det(DetectionClass::StopSign, 10, 10, 20, 20)];
        let result = PerceptionAdapter::default().perceive(&detections, VideoFrame::blank(320, 240));

        assert!(result.stop_sign_seen);
        assert!(!result.is_blocked);
    }

    #[test]
    fn test_large_box_blocks_path() {
        // 200x150 = 39% of 320x240
        let detections = [det(DetectionClass::Person, 20, 40, 200, 150)];
        let result = PerceptionAdapter::default().perceive(&detections, VideoFrame::blank(320, 240));

        assert!(result.is_blocked);
        assert_eq!(result.obstacle_center_x, Some(120.0));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // 160x144 = exactly 30% of 320x240
        let detections = [det(DetectionClass::Car, 0, 0, 160, 144)];
        let result = PerceptionAdapter::default().perceive(&detections, VideoFrame::blank(320, 240));

        assert!(!result.is_blocked);
    }

    #[test]
    fn test_largest_obstacle_wins() {
        let adapter = PerceptionAdapter::default();
        let detections = [
            det(DetectionClass::Car, 0, 0, 160, 160),    // 33%
            det(DetectionClass::Truck, 100, 0, 220, 200), // 57%
            det(DetectionClass::Bus, 0, 0, 220, 200),     // 57%, later
        ];

        let obstacle = adapter.blocking_obstacle(&detections, 320, 240).unwrap();
        assert_eq!(obstacle.class, DetectionClass::Truck);

        let result = adapter.perceive(&detections, VideoFrame::blank(320, 240));
        assert_eq!(result.obstacle_center_x, Some(210.0));
    }

    #[test]
    fn test_overlay_drawn_on_copy() {
        let detections = [det(DetectionClass::StopSign, 100, 50, 40, 40)];
        let result = PerceptionAdapter::default().perceive(&detections, VideoFrame::blank(320, 240));

        let frame = &result.annotated_frame;
        assert!(frame.is_valid());
        assert_eq!(frame.get_pixel(100, 50), Some([0, 255, 0]));
        assert_eq!(frame.get_pixel(120, 70), Some([0, 0, 0]));
        // banner above the box
        assert_eq!(frame.get_pixel(110, 44), Some([255, 0, 0]));
    }

    #[test]
    fn test_overlay_clips_boxes_outside_frame() {
        let detections = [
            det(DetectionClass::StopSign, i32::MAX - 10, 0, i32::MAX, 100),
            det(DetectionClass::Car, -50, -50, 100, 100),
            det(DetectionClass::Person, i32::MIN, i32::MIN, 10, 10),
        ];
        let result = PerceptionAdapter::default().perceive(&detections, VideoFrame::blank(320, 240));

        let frame = &result.annotated_frame;
        assert!(frame.is_valid());
        assert_eq!(frame.get_pixel(0, 0), Some([0, 255, 0]));
        assert_eq!(frame.get_pixel(49, 49), Some([0, 255, 0]));
        assert_eq!(frame.get_pixel(319, 239), Some([0, 0, 0]));
    }

    #[test]
    fn test_zero_sized_frame_never_blocks() {
        let detections = [det(DetectionClass::Car, 0, 0, 10, 10)];
        assert!(PerceptionAdapter::default()
            .blocking_obstacle(&detections, 0, 0)
            .is_none());
    }
}
