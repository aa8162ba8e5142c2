//! Helper functions

use crate::kinematic_traits::{JointConfiguration, Pose};

/// Checks if all joint values are finite.
pub fn is_finite(qs: &[f64]) -> bool {
    qs.iter().all(|&q| q.is_finite())
}

/// Sum of absolute per-joint differences (L1 distance in joint space). Joints are
/// compared up to the length of the shorter slice.
pub fn joint_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

/// Index of the candidate closest to the seed by [`joint_distance`]. Only a strictly
/// smaller distance replaces the current best, so ties go to the first encountered
/// candidate. Candidates at NaN distance are never chosen. Returns None if nothing qualifies.
pub fn closest_joint_pose(candidates: &[JointConfiguration], seed: &[f64]) -> Option<usize> {
    let mut best = None;
    let mut best_distance = f64::MAX;
    for (i, candidate) in candidates.iter().enumerate() {
        let distance = joint_distance(candidate, seed);
        if distance < best_distance {
            best_distance = distance;
            best = Some(i);
        }
    }
    best
}

/// Normalize angle into (-π, π]
pub(crate) fn normalize_angle(angle: f64) -> f64 {
    use std::f64::consts::PI;
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Format joint values as a row of degrees.
pub fn format_joints(joints: &[f64]) -> String {
    let mut row_str = String::new();
    for joint in joints {
        row_str.push_str(&format!("{:7.2} ", joint.to_degrees()));
    }
    format!("[{}]", row_str.trim_end())
}

/// Print the pose as translation and roll, pitch, yaw in degrees.
pub fn dump_pose(pose: &Pose) {
    let t = pose.translation.vector;
    let (roll, pitch, yaw) = pose.rotation.euler_angles();
    println!("x: {:.5}, y: {:.5}, z: {:.5}, roll: {:.3}, pitch: {:.3}, yaw: {:.3}",
             t.x, t.y, t.z, roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees());
}

/// Allows to specify joint values in degrees (converts to radians)
pub fn as_radians(degrees: &[f64]) -> JointConfiguration {
    degrees.iter().map(|d| d.to_radians()).collect()
}

/// formatting for YAML output
pub(crate) fn deg(x: &f64) -> String {
    if *x == 0.0 {
        return "0".to_string();
    }
    format!("deg({:.4})", x.to_degrees())
}
