//! Removal of duplicate detections of the same physical character.

use std::cmp::Reverse;

use float_ord::FloatOrd;

use crate::{util::iou, CharacterDetection};

/// Indices (ascending) of the detections that survive duplicate suppression.
///
/// Any two detections whose boxes overlap with an IoU above `iou_threshold` are treated as the
/// same character and only the more confident one is kept. Suppression is class agnostic, and
/// equal confidences keep whichever detection comes first in `detections`. No pair of survivors
/// overlaps above the threshold, so suppressing the survivors again keeps all of them.
pub fn suppress_duplicates(detections: &[CharacterDetection], iou_threshold: f32) -> Vec<usize> {
    let mut candidates = (0..detections.len()).collect::<Vec<_>>();
    // Stable, so ties stay in input order.
    candidates.sort_by_key(|&index| Reverse(FloatOrd(detections[index].confidence)));

    let mut kept: Vec<usize> = Vec::with_capacity(candidates.len());
    for index in candidates {
        let bounds = &detections[index].bounds;
        let duplicate = kept
            .iter()
            .any(|&other| iou(bounds, &detections[other].bounds) > iou_threshold);
        if duplicate {
            log::trace!(
                "Suppressing detection {index} ({}, {:.3})",
                detections[index].label,
                detections[index].confidence
            );
        } else {
            kept.push(index);
        }
    }

    kept.sort_unstable();
    log::debug!(
        "Duplicate suppression kept {} of {} detections",
        kept.len(),
        detections.len()
    );
    kept
}
