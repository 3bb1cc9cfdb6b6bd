use crate::types::Point;

pub(super) fn manhattan(a: Point, b: Point) -> f32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// -1, 0 or 1. Unlike `f32::signum`, zero maps to zero.
pub(super) fn axis_sign(delta: f32) -> i32 {
    if delta > 0.0 {
        1
    } else if delta < 0.0 {
        -1
    } else {
        0
    }
}
