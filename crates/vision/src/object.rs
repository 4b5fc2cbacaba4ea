//! Detected objects

use serde::{Deserialize, Serialize};

/// Object class vocabulary: the first 13 COCO classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionClass {
    Person,
    Bicycle,
    Car,
    Motorcycle,
    Airplane,
    Bus,
    Train,
    Truck,
    Boat,
    TrafficLight,
    FireHydrant,
    StopSign,
    ParkingMeter,
}

impl DetectionClass {
    /// Number of model classes the rover reacts to
    pub const VOCABULARY_LEN: usize = 13;

    const ALL: [DetectionClass; Self::VOCABULARY_LEN] = [
        DetectionClass::Person,
        DetectionClass::Bicycle,
        DetectionClass::Car,
        DetectionClass::Motorcycle,
        DetectionClass::Airplane,
        DetectionClass::Bus,
        DetectionClass::Train,
        DetectionClass::Truck,
        DetectionClass::Boat,
        DetectionClass::TrafficLight,
        DetectionClass::FireHydrant,
        DetectionClass::StopSign,
        DetectionClass::ParkingMeter,
    ];

    /// Class for a model output index, `None` outside the vocabulary
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Model output index
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            DetectionClass::Person => "person",
            DetectionClass::Bicycle => "bicycle",
            DetectionClass::Car => "car",
            DetectionClass::Motorcycle => "motorcycle",
            DetectionClass::Airplane => "airplane",
            DetectionClass::Bus => "bus",
            DetectionClass::Train => "train",
            DetectionClass::Truck => "truck",
            DetectionClass::Boat => "boat",
            DetectionClass::TrafficLight => "traffic light",
            DetectionClass::FireHydrant => "fire hydrant",
            DetectionClass::StopSign => "stop sign",
            DetectionClass::ParkingMeter => "parking meter",
        }
    }
}

/// Axis-aligned box in source-frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Area in square pixels (zero for degenerate boxes)
    pub fn area(&self) -> f32 {
        self.width.max(0) as f32 * self.height.max(0) as f32
    }

    /// Horizontal center
    pub fn center_x(&self) -> f32 {
        self.left as f32 + self.width as f32 / 2.0
    }

    /// Right edge, saturating at `i32::MAX`
    pub fn right(&self) -> i32 {
        self.left.saturating_add(self.width)
    }

    /// Bottom edge, saturating at `i32::MAX`
    pub fn bottom(&self) -> i32 {
        self.top.saturating_add(self.height)
    }

    /// Box from float corners, clipped to a `width` x `height` frame.
    ///
    /// Returns `None` for non-finite input or when nothing is left inside
    /// the frame.
    pub fn clipped(
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
        width: u32,
        height: u32,
    ) -> Option<Self> {
        if !(left.is_finite() && top.is_finite() && right.is_finite() && bottom.is_finite()) {
            return None;
        }
        let (w, h) = (width as f32, height as f32);
        let left = left.clamp(0.0, w) as i32;
        let top = top.clamp(0.0, h) as i32;
        let right = right.clamp(0.0, w) as i32;
        let bottom = bottom.clamp(0.0, h) as i32;
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self::new(left, top, right - left, bottom - top))
    }
}

/// Detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Object class
    pub class: DetectionClass,

    /// Bounding box in source-frame pixels
    pub bbox: BoundingBox,

    /// Detection confidence (0-1)
    pub confidence: f32,
}
