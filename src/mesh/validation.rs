//! Face validation before writing
//!
//! Drops faces that would render as nothing or break the file:
//! - fewer than 3 distinct nodes
//! - NaN/Inf node coordinates
//! - zero or near-zero area

use super::AcObject;
use super::builder::Face;
use tracing::warn;

/// Result of face validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub total: usize,
    /// Faces with zero or near-zero area, or repeated nodes
    pub degenerate: usize,
    /// Faces touching a node with NaN/Inf coordinates
    pub invalid_coords: usize,
}

impl ValidationResult {
    pub fn has_issues(&self) -> bool {
        self.degenerate > 0 || self.invalid_coords > 0
    }

    pub fn summary(&self) -> String {
        if !self.has_issues() {
            format!("Mesh valid: {} faces, no issues", self.total)
        } else {
            format!(
                "Mesh issues: {} total, {} degenerate, {} invalid coords",
                self.total, self.degenerate, self.invalid_coords
            )
        }
    }
}

/// Minimum face area in square metres
const MIN_FACE_AREA: f64 = 1e-6;

#[derive(Debug, PartialEq)]
enum FaceCheck {
    Ok,
    Degenerate,
    InvalidCoords,
}

fn check_face(nodes: &[[f64; 3]], face: &Face) -> FaceCheck {
    let mut points = Vec::with_capacity(face.refs.len());
    for &(index, u, v) in &face.refs {
        let Some(p) = nodes.get(index) else {
            return FaceCheck::InvalidCoords;
        };
        if !p.iter().all(|c| c.is_finite()) || !u.is_finite() || !v.is_finite() {
            return FaceCheck::InvalidCoords;
        }
        points.push(*p);
    }

    let mut distinct: Vec<usize> = face.refs.iter().map(|r| r.0).collect();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() < 3 || polygon_area(&points) < MIN_FACE_AREA {
        return FaceCheck::Degenerate;
    }
    FaceCheck::Ok
}

/// Area of a planar-ish polygon from the Newell normal
fn polygon_area(points: &[[f64; 3]]) -> f64 {
    let mut n = [0.0; 3];
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        n[0] += (a[1] - b[1]) * (a[2] + b[2]);
        n[1] += (a[2] - b[2]) * (a[0] + b[0]);
        n[2] += (a[0] - b[0]) * (a[1] + b[1]);
    }
    0.5 * (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt()
}

/// Validate an object's faces without changing it
pub fn validate_object(object: &AcObject) -> ValidationResult {
    let mut result = ValidationResult {
        total: object.face_count(),
        ..Default::default()
    };
    for face in object.faces() {
        match check_face(object.nodes(), face) {
            FaceCheck::Ok => {}
            FaceCheck::Degenerate => result.degenerate += 1,
            FaceCheck::InvalidCoords => result.invalid_coords += 1,
        }
    }
    result
}

/// Validate and drop every bad face in one pass
pub fn remove_bad_faces(object: &mut AcObject) -> ValidationResult {
    let report = validate_object(object);
    if report.has_issues() {
        warn!("object {}: {}", object.name, report.summary());
        let nodes = object.nodes().to_vec();
        object.retain_faces(|face| check_face(&nodes, face) == FaceCheck::Ok);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::builder::MAT_UNLIT;

    fn square(obj: &mut AcObject, size: f64) -> [usize; 4] {
        [
            obj.node(0.0, 0.0, 0.0),
            obj.node(size, 0.0, 0.0),
            obj.node(size, size, 0.0),
            obj.node(0.0, size, 0.0),
        ]
    }

    #[test]
    fn test_valid_quad() {
        let mut obj = AcObject::new("t", None);
        let [a, b, c, d] = square(&mut obj, 2.0);
        obj.quad([(a, 0.0, 0.0), (b, 1.0, 0.0), (c, 1.0, 1.0), (d, 0.0, 1.0)], MAT_UNLIT);
        let report = validate_object(&obj);
        assert_eq!(report.total, 1);
        assert!(!report.has_issues());
    }

    #[test]
    fn test_polygon_area() {
        let area = polygon_area(&[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 2.0, 0.0], [0.0, 2.0, 0.0]]);
        assert!((area - 4.0).abs() < 1e-9);
        let vertical = polygon_area(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 3.0], [0.0, 0.0, 3.0]]);
        assert!((vertical - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_remove_bad_faces() {
        let mut obj = AcObject::new("t", None);
        let [a, b, c, d] = square(&mut obj, 1.0);
        let nan = obj.node(f64::NAN, 0.0, 0.0);
        obj.quad([(a, 0.0, 0.0), (b, 1.0, 0.0), (c, 1.0, 1.0), (d, 0.0, 1.0)], MAT_UNLIT);
        // collapsed quad with a repeated node
        obj.quad([(a, 0.0, 0.0), (b, 1.0, 0.0), (b, 1.0, 1.0), (a, 0.0, 1.0)], MAT_UNLIT);
        obj.face(&[(a, 0.0, 0.0), (b, 0.0, 0.0), (nan, 0.0, 0.0)], MAT_UNLIT);

        let report = remove_bad_faces(&mut obj);
        assert_eq!(report.degenerate, 1);
        assert_eq!(report.invalid_coords, 1);
        assert_eq!(obj.face_count(), 1);
    }
}
