//! Non-maximum suppression

use crate::object::{BoundingBox, Detection};

/// Intersection over union of two boxes
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter_left = a.left.max(b.left);
    let inter_top = a.top.max(b.top);
    let inter_right = a.right().min(b.right());
    let inter_bottom = a.bottom().min(b.bottom());

    if inter_right <= inter_left || inter_bottom <= inter_top {
        return 0.0;
    }

    let inter = (i64::from(inter_right) - i64::from(inter_left)) as f32
        * (i64::from(inter_bottom) - i64::from(inter_top)) as f32;
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}

/// Greedy class-agnostic NMS.
///
/// Returns survivors in descending confidence; a box is dropped when it
/// overlaps an already-kept box by more than `iou_threshold`.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.retain(|d| d.confidence.is_finite());
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        if kept
            .iter()
            .all(|k| iou(&k.bbox, &candidate.bbox) <= iou_threshold)
        {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::DetectionClass;
    use proptest::prelude::*;

    fn det(class: DetectionClass, bbox: BoundingBox, confidence: f32) -> Detection {
        Detection {
            class,
            bbox,
            confidence,
        }
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox::new(0, 0, 10, 10);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(iou(&a, &BoundingBox::new(20, 20, 5, 5)), 0.0);
        // 5x10 overlap, union 150
        assert!((iou(&a, &BoundingBox::new(5, 0, 10, 10)) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_overlapping_boxes_collapse_to_best() {
        let detections = vec![
            det(DetectionClass::Car, BoundingBox::new(100, 100, 50, 50), 0.6),
            det(DetectionClass::Car, BoundingBox::new(102, 101, 50, 50), 0.9),
            det(DetectionClass::Truck, BoundingBox::new(104, 100, 48, 52), 0.7),
        ];

        let kept = non_max_suppression(detections, 0.5);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_distinct_objects_survive_in_confidence_order() {
        let detections = vec![
            det(DetectionClass::Person, BoundingBox::new(0, 0, 40, 80), 0.55),
            det(DetectionClass::StopSign, BoundingBox::new(200, 20, 30, 30), 0.8),
            det(DetectionClass::Person, BoundingBox::new(30, 0, 40, 80), 0.7),
        ];

        let kept = non_max_suppression(detections, 0.5);

        let confidences: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.8, 0.7, 0.55]);
    }

    #[test]
    fn test_extreme_boxes_do_not_overflow() {
        let far = BoundingBox::new(i32::MAX - 10, 0, i32::MAX, 100);
        let overlap = iou(&far, &far);
        assert!((0.0..=1.0).contains(&overlap));
        assert!(!non_max_suppression(
            vec![
                det(DetectionClass::Car, far, 0.9),
                det(DetectionClass::Car, far, 0.8),
            ],
            0.5,
        )
        .is_empty());

        let wide = BoundingBox::new(100, 0, i32::MAX, 100);
        assert!((iou(&wide, &wide) - 1.0).abs() < 1e-3);
        let kept = non_max_suppression(
            vec![
                det(DetectionClass::Truck, wide, 0.9),
                det(DetectionClass::Truck, wide, 0.8),
            ],
            0.5,
        );
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_nan_confidence_dropped() {
        let kept = non_max_suppression(
            vec![det(DetectionClass::Car, BoundingBox::new(0, 0, 5, 5), f32::NAN)],
            0.5,
        );
        assert!(kept.is_empty());
    }

    proptest! {
        #[test]
        fn prop_survivors_do_not_overlap(
            boxes in proptest::collection::vec(
                (0i32..300, 0i32..200, 1i32..120, 1i32..120, 0.0f32..1.0),
                0..20,
            )
        ) {
            let detections = boxes
                .into_iter()
                .map(|(l, t, w, h, c)| det(DetectionClass::Car, BoundingBox::new(l, t, w, h), c))
                .collect();

            let kept = non_max_suppression(detections, 0.5);

            for (i, a) in kept.iter().enumerate() {
                for b in &kept[i + 1..] {
                    prop_assert!(iou(&a.bbox, &b.bbox) <= 0.5);
                }
            }
            prop_assert!(kept.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        }
    }
}
