//! Polyline helpers shared by topology repair and ribbon construction.

use super::Vec2;

pub fn polyline_length(points: &[Vec2]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Cumulative arc length at each point, starting at 0
pub fn cumulative_lengths(points: &[Vec2]) -> Vec<f64> {
    let mut lengths = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            total += points[i - 1].distance(*p);
        }
        lengths.push(total);
    }
    lengths
}

/// Compass bearing of the direction `from -> to` in degrees, clockwise from north, [0, 360)
pub fn bearing_deg(from: Vec2, to: Vec2) -> f64 {
    let d = to - from;
    let bearing = d.x.atan2(d.y).to_degrees();
    if bearing < 0.0 { bearing + 360.0 } else { bearing }
}

/// Smallest absolute difference between two bearings, in [0, 180]
pub fn bearing_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 { 360.0 - diff } else { diff }
}

/// Number of points to insert between two points `distance` apart so that no
/// resulting segment is longer than `max_distance`
pub fn points_to_insert(distance: f64, max_distance: f64) -> usize {
    // tolerance keeps the step idempotent on already-split segments
    if max_distance <= 0.0 || distance <= max_distance + 1e-6 {
        return 0;
    }
    (distance / max_distance).ceil() as usize - 1
}

/// Evenly spaced points strictly between `a` and `b`
pub fn interpolate_between(a: Vec2, b: Vec2, count: usize) -> Vec<Vec2> {
    (1..=count)
        .map(|k| a.lerp(b, k as f64 / (count + 1) as f64))
        .collect()
}

/// Point at arc length `s` along a polyline, clamped to its ends
pub fn point_at_distance(points: &[Vec2], s: f64) -> Option<Vec2> {
    let first = *points.first()?;
    if s <= 0.0 {
        return Some(first);
    }
    let mut walked = 0.0;
    for pair in points.windows(2) {
        let step = pair[0].distance(pair[1]);
        if step > 0.0 && walked + step >= s {
            return Some(pair[0].lerp(pair[1], (s - walked) / step));
        }
        walked += step;
    }
    points.last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearing() {
        let o = Vec2::ZERO;
        assert!((bearing_deg(o, Vec2::new(0.0, 1.0)) - 0.0).abs() < 1e-9);
        assert!((bearing_deg(o, Vec2::new(1.0, 0.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_deg(o, Vec2::new(0.0, -1.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_deg(o, Vec2::new(-1.0, 0.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_difference_wraps() {
        assert!((bearing_difference(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((bearing_difference(90.0, 270.0) - 180.0).abs() < 1e-9);
        assert!((bearing_difference(45.0, 45.0)).abs() < 1e-9);
    }

    #[test]
    fn test_cumulative_lengths() {
        let pts = vec![Vec2::new(0.0, 0.0), Vec2::new(3.0, 4.0), Vec2::new(3.0, 10.0)];
        assert_eq!(cumulative_lengths(&pts), vec![0.0, 5.0, 11.0]);
        assert_eq!(polyline_length(&pts), 11.0);
    }

    #[test]
    fn test_points_to_insert() {
        assert_eq!(points_to_insert(100.0, 100.0), 0);
        assert_eq!(points_to_insert(250.0, 100.0), 2);
        assert_eq!(points_to_insert(50.0, 100.0), 0);
    }

    #[test]
    fn test_interpolate_between() {
        let pts = interpolate_between(Vec2::ZERO, Vec2::new(30.0, 0.0), 2);
        assert_eq!(pts, vec![Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0)]);
    }

    #[test]
    fn test_point_at_distance() {
        let pts = vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)];
        assert_eq!(point_at_distance(&pts, 15.0), Some(Vec2::new(10.0, 5.0)));
        assert_eq!(point_at_distance(&pts, -1.0), Some(Vec2::ZERO));
        assert_eq!(point_at_distance(&pts, 50.0), Some(Vec2::new(10.0, 10.0)));
        assert_eq!(point_at_distance(&[], 1.0), None);
    }
}
