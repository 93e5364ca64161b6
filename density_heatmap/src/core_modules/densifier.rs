// THEORY:
// The trajectory ("traffic") heatmap does not look for hotspots; it draws where
// something travelled. Recorded samples are sparse (one every few seconds), so
// stamping the samples directly would leave a dotted line. The densifier fills
// each segment of the path with evenly spaced points, one per `spacing` pixels
// of travel, and the rasterizer stamps those instead.
//
// Only interior points are produced. The recorded samples themselves are never
// emitted, so a path that barely moves contributes nothing. A segment whose
// length is not finite, or that would need more than `MAX_SEGMENT_POINTS`
// points, is skipped with a warning.

use crate::core_modules::point::Point2D;

/// Upper bound on the points a single segment may produce.
pub const MAX_SEGMENT_POINTS: usize = 1 << 20;

/// Fills every segment of `path` with `floor(length / spacing)` evenly spaced
/// interior points. Returns nothing for a zero spacing or a path shorter than two points.
pub fn densify(path: &[Point2D], spacing: u32) -> Vec<Point2D> {
    if spacing == 0 || path.len() < 2 {
        return Vec::new();
    }

    let spacing = spacing as f64;
    let mut densified = Vec::new();

    for segment in path.windows(2) {
        let (start, end) = (&segment[0], &segment[1]);
        let steps = (start.distance(end) / spacing).floor();
        if !steps.is_finite() || steps > MAX_SEGMENT_POINTS as f64 {
            log::warn!(
                "skipping path segment ({}, {}) -> ({}, {}): {steps} points exceed the limit",
                start.x,
                start.y,
                end.x,
                end.y
            );
            continue;
        }
        let steps = steps as usize;
        let divisions = (steps + 1) as f64;
        densified.extend((1..=steps).map(|j| start.lerp(end, j as f64 / divisions)));
    }

    densified
}
