//! Right-to-left reading order for character boxes on a single-line plate.

use std::cmp::Reverse;

use float_ord::FloatOrd;

use crate::CharacterDetection;

/// Orders `indices` into `detections` right to left by box center.
///
/// Centers whose x-coordinates lie within `epsilon` of the rightmost center of their run are
/// treated as one column and read top to bottom, then by input index. The x-sort is done first
/// and the columns are regrouped afterwards, so the comparator stays a total order even though
/// "within epsilon" is not transitive.
pub fn reading_order(
    detections: &[CharacterDetection],
    indices: &[usize],
    epsilon: f32,
) -> Vec<usize> {
    let center = |index: usize| detections[index].bounds.center();

    let mut by_x = indices.to_vec();
    by_x.sort_by_key(|&index| (Reverse(FloatOrd(center(index).x)), index));

    let mut ordered = Vec::with_capacity(by_x.len());
    let mut rest = by_x.as_slice();
    while let Some(&first) = rest.first() {
        let anchor = center(first).x;
        // The anchor always opens its column, even when its x is NaN.
        let column_len = 1 + rest[1..]
            .iter()
            .take_while(|&&index| {
                let x = center(index).x;
                x == anchor || anchor - x < epsilon
            })
            .count();
        let (column, tail) = rest.split_at(column_len);

        let mut column = column.to_vec();
        if column.len() > 1 {
            log::trace!("Breaking x tie between detections {column:?} by y");
            column.sort_by_key(|&index| (FloatOrd(center(index).y), index));
        }
        ordered.extend(column);
        rest = tail;
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(label: &str, center_x: f32, center_y: f32) -> CharacterDetection {
        CharacterDetection::new(label, 0.9, center_x - 5.0, center_y - 10.0, 10.0, 20.0)
    }

    #[test]
    fn descending_center_x() {
        let detections = vec![at("1", 60.0, 40.0), at("a", 500.0, 40.0), at("g", 340.0, 40.0)];
        assert_eq!(reading_order(&detections, &[0, 1, 2], 0.5), vec![1, 2, 0]);
    }

    #[test]
    fn only_given_indices_are_ordered() {
        let detections = vec![at("1", 60.0, 40.0), at("a", 500.0, 40.0), at("g", 340.0, 40.0)];
        assert_eq!(reading_order(&detections, &[0, 2], 0.5), vec![2, 0]);
    }

    #[test]
    fn near_equal_x_breaks_tie_by_y_then_index() {
        let detections = vec![
            at("b", 100.2, 60.0),
            at("a", 100.0, 20.0),
            at("c", 100.0, 60.0),
            at("1", 40.0, 40.0),
        ];
        assert_eq!(
            reading_order(&detections, &[0, 1, 2, 3], 0.5),
            vec![1, 0, 2, 3]
        );
    }

    #[test]
    fn exact_tie_uses_y_with_zero_epsilon() {
        let detections = vec![at("b", 100.0, 60.0), at("a", 100.0, 20.0)];
        assert_eq!(reading_order(&detections, &[0, 1], 0.0), vec![1, 0]);
    }

    #[test]
    fn nan_center_does_not_stall_ordering() {
        let detections = vec![
            CharacterDetection::new("a", 0.9, f32::NAN, 0.0, 10.0, 10.0),
            CharacterDetection::new("b", 0.9, 0.0, 0.0, 10.0, 10.0),
            CharacterDetection::new("c", 0.9, f32::NAN, 20.0, 10.0, 10.0),
        ];
        let mut order = reading_order(&detections, &[0, 1, 2], 0.5);
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn columns_are_anchored_on_their_rightmost_center() {
        // 100.0 is within epsilon of 100.4 but not of 100.8, so it starts a new column.
        let detections = vec![
            at("c", 100.0, 10.0),
            at("b", 100.4, 90.0),
            at("a", 100.8, 50.0),
        ];
        assert_eq!(reading_order(&detections, &[0, 1, 2], 0.5), vec![2, 1, 0]);
    }
}
