//! Analytic kinematics solver for 6 axis robots with an ortho-parallel base and spherical wrist.

use std::f64::consts::PI;
use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};
use tracing::debug;

use crate::kinematic_traits::{IkResult, IkStatus, KinematicsSolver, Pose, QueryOptions, Solutions, SolverError};
use crate::parameters::opw_kinematics::Parameters;
use crate::utils::{closest_joint_pose, is_finite, normalize_angle};

const DOF: usize = 6;

/// Below this |sin(J5)| the wrist is treated as singular: J4 and J6 rotate around the
/// same axis and only their sum (or difference) is defined.
const SINGULARITY_THRESHOLD: f64 = 1e-6;

/// Forward check tolerance for returned solutions, meters and radians.
const FK_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct OPWKinematics {
    parameters: Parameters,
    base_frame: String,
    tip_frame: String,
}

impl OPWKinematics {
    /// Creates a new `OPWKinematics` instance with the given parameters, working
    /// between `base_link` and `tool0`.
    pub fn new(parameters: Parameters) -> Self {
        Self::with_frames(parameters, "base_link", "tool0")
    }

    pub fn with_frames(parameters: Parameters, base_frame: &str, tip_frame: &str) -> Self {
        OPWKinematics {
            parameters,
            base_frame: base_frame.to_string(),
            tip_frame: tip_frame.to_string(),
        }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Pose of the flange relative to the robot base.
    pub fn forward(&self, joints: &[f64; 6]) -> Pose {
        let mut q = [0.0; 6];
        let p = &self.parameters;

        for i in 0..6 {
            q[i] = joints[i] * p.sign_corrections[i] as f64 - p.offsets[i];
        }

        let psi3 = f64::atan2(p.a2, p.c3);
        let k = f64::sqrt(p.a2 * p.a2 + p.c3 * p.c3);

        let cx1 = p.c2 * f64::sin(q[1]) + k * f64::sin(q[1] + q[2] + psi3) + p.a1;
        let cy1 = p.b;
        let cz1 = p.c2 * f64::cos(q[1]) + k * f64::cos(q[1] + q[2] + psi3);

        let cx0 = cx1 * f64::cos(q[0]) - cy1 * f64::sin(q[0]);
        let cy0 = cx1 * f64::sin(q[0]) + cy1 * f64::cos(q[0]);
        let cz0 = cz1 + p.c1;

        let r_oe = Self::arm_rotation(q[0], q[1] + q[2]) * Self::wrist_rotation(q[3], q[4], q[5]);

        let translation = Vector3::new(cx0, cy0, cz0) + p.c4 * r_oe * Vector3::z();
        let rotation = Rotation3::from_matrix_unchecked(r_oe);

        Pose::from_parts(Translation3::from(translation),
                         UnitQuaternion::from_rotation_matrix(&rotation))
    }

    /// All 8 inverse kinematics branches for the flange pose. Unreachable branches are
    /// NaN rows. The seed only resolves J4 when the wrist is singular.
    pub fn inverse(&self, pose: &Pose, seed: &[f64; 6]) -> Solutions {
        let p = &self.parameters;
        let rotation = pose.rotation.to_rotation_matrix();
        let m = rotation.matrix();

        // Wrist center.
        let approach: Vector3<f64> = m.column(2).into_owned();
        let c = pose.translation.vector - p.c4 * approach;

        let nx1 = (c.x * c.x + c.y * c.y - p.b * p.b).sqrt() - p.a1;

        let tmp1 = c.y.atan2(c.x);
        let tmp2 = p.b.atan2(nx1 + p.a1);
        let theta1_i = tmp1 - tmp2;
        let theta1_ii = tmp1 + tmp2 - PI;

        let tmp3 = c.z - p.c1;
        let s1_2 = nx1 * nx1 + tmp3 * tmp3;
        let tmp4 = nx1 + 2.0 * p.a1;
        let s2_2 = tmp4 * tmp4 + tmp3 * tmp3;
        let kappa_2 = p.a2 * p.a2 + p.c3 * p.c3;
        let c2_2 = p.c2 * p.c2;

        let tmp5 = s1_2 + c2_2 - kappa_2;
        let s1 = s1_2.sqrt();
        let s2 = s2_2.sqrt();

        let tmp13 = (tmp5 / (2.0 * s1 * p.c2)).acos();
        let tmp14 = nx1.atan2(tmp3);
        let theta2_i = -tmp13 + tmp14;
        let theta2_ii = tmp13 + tmp14;

        let tmp6 = s2_2 + c2_2 - kappa_2;
        let tmp15 = (tmp6 / (2.0 * s2 * p.c2)).acos();
        let tmp16 = tmp4.atan2(tmp3);
        let theta2_iii = -tmp15 - tmp16;
        let theta2_iv = tmp15 - tmp16;

        let tmp7 = s1_2 - c2_2 - kappa_2;
        let tmp8 = s2_2 - c2_2 - kappa_2;
        let tmp9 = 2.0 * p.c2 * kappa_2.sqrt();
        let tmp10 = p.a2.atan2(p.c3);
        let tmp11 = (tmp7 / tmp9).acos();
        let tmp12 = (tmp8 / tmp9).acos();
        let theta3_i = tmp11 - tmp10;
        let theta3_ii = -tmp11 - tmp10;
        let theta3_iii = tmp12 - tmp10;
        let theta3_iv = -tmp12 - tmp10;

        let arms = [
            (theta1_i, theta2_i, theta3_i),
            (theta1_i, theta2_ii, theta3_ii),
            (theta1_ii, theta2_iii, theta3_iii),
            (theta1_ii, theta2_iv, theta3_iv),
        ];

        let e = |r: usize, c: usize| m[(r - 1, c - 1)];
        let seed_q4 = seed[3] * p.sign_corrections[3] as f64 - p.offsets[3];

        let mut solutions: Solutions = Vec::with_capacity(8);
        for flip in [false, true] {
            for &(theta1, theta2, theta3) in &arms {
                let (s1, c1) = theta1.sin_cos();
                let (s23, c23) = (theta2 + theta3).sin_cos();

                let mp = e(1, 3) * s23 * c1 + e(2, 3) * s23 * s1 + e(3, 3) * c23;
                let mut theta5 = (1.0 - mp * mp).max(0.0).sqrt().atan2(mp);
                let mut theta4 = (e(2, 3) * c1 - e(1, 3) * s1).atan2(
                    e(1, 3) * c23 * c1 + e(2, 3) * c23 * s1 - e(3, 3) * s23);
                let mut theta6 = (e(1, 2) * s23 * c1 + e(2, 2) * s23 * s1 + e(3, 2) * c23).atan2(
                    -e(1, 1) * s23 * c1 - e(2, 1) * s23 * s1 - e(3, 1) * c23);

                if flip {
                    theta4 += PI;
                    theta5 = -theta5;
                    theta6 -= PI;
                }

                if theta5.sin().abs() < SINGULARITY_THRESHOLD {
                    // Keep J4 where the seed has it and let J6 take the rest of the rotation.
                    let r_ce = Self::arm_rotation(theta1, theta2 + theta3).transpose() * m;
                    theta4 = seed_q4;
                    theta6 = if theta5.cos() > 0.0 {
                        r_ce[(1, 0)].atan2(r_ce[(0, 0)]) - theta4
                    } else {
                        theta4 - (-r_ce[(1, 0)]).atan2(-r_ce[(0, 0)])
                    };
                }

                let q = [theta1, theta2, theta3, theta4, theta5, theta6];
                let joints: Vec<f64> = (0..DOF)
                    .map(|i| {
                        let joint = (q[i] + p.offsets[i]) * p.sign_corrections[i] as f64;
                        if joint.is_finite() { normalize_angle(joint) } else { f64::NAN }
                    })
                    .collect();
                solutions.push(joints);
            }
        }
        solutions
    }

    /// Rotation of the wrist base: J1 around z, then J2 + J3 around y.
    fn arm_rotation(q1: f64, q23: f64) -> Matrix3<f64> {
        let (s1, c1) = q1.sin_cos();
        let (s23, c23) = q23.sin_cos();
        Matrix3::new(
            c1 * c23, -s1, c1 * s23,
            s1 * c23, c1, s1 * s23,
            -s23, 0.0, c23,
        )
    }

    /// Rotation of the spherical wrist: z, y, z.
    fn wrist_rotation(q4: f64, q5: f64, q6: f64) -> Matrix3<f64> {
        let (s4, c4) = q4.sin_cos();
        let (s5, c5) = q5.sin_cos();
        let (s6, c6) = q6.sin_cos();
        Matrix3::new(
            c4 * c5 * c6 - s4 * s6, -c4 * c5 * s6 - s4 * c6, c4 * s5,
            s4 * c5 * c6 + c4 * s6, -s4 * c5 * s6 + c4 * c6, s4 * s5,
            -s5 * c6, s5 * s6, c5,
        )
    }

    fn to_six(joints: &[f64]) -> Result<[f64; 6], SolverError> {
        <[f64; 6]>::try_from(joints)
            .map_err(|_| SolverError::WrongDof { expected: DOF, found: joints.len() })
    }
}

// Compare two poses with the given tolerance.
fn compare_poses(ta: &Isometry3<f64>, tb: &Isometry3<f64>, tolerance: f64) -> bool {
    let translation_distance = (ta.translation.vector - tb.translation.vector).norm();
    let angular_distance = ta.rotation.angle_to(&tb.rotation);

    if translation_distance > tolerance {
        debug!("Translation Error: {}", translation_distance);
        return false;
    }

    if angular_distance > tolerance {
        debug!("Angular Error: {}", angular_distance);
        return false;
    }
    true
}

impl KinematicsSolver for OPWKinematics {
    fn position_ik(&self, poses: &[Pose], seed: &[f64], options: &QueryOptions) -> Result<IkResult, SolverError> {
        let pose = match poses {
            [] => return Err(SolverError::NoPoses),
            [pose] => pose,
            _ => return Err(SolverError::MultiplePosesUnsupported(poses.len())),
        };
        let seed = Self::to_six(seed)?;

        let mut solutions: Solutions = self.inverse(pose, &seed)
            .into_iter()
            .filter(|joints| {
                if !options.verify_with_fk || !is_finite(joints) {
                    return true;
                }
                // Finite checked just above, always 6 values.
                let fk = self.forward(&[joints[0], joints[1], joints[2], joints[3], joints[4], joints[5]]);
                compare_poses(&fk, pose, FK_TOLERANCE)
            })
            .collect();

        let status = if solutions.iter().any(|s| is_finite(s)) {
            IkStatus::Found
        } else {
            IkStatus::NoSolution
        };

        if !options.all_solutions {
            solutions = closest_joint_pose(&solutions, &seed)
                .map(|i| vec![solutions.swap_remove(i)])
                .unwrap_or_default();
        }

        Ok(IkResult { solutions, status })
    }

    fn position_fk(&self, tip_frame: &str, joints: &[f64]) -> Result<Pose, SolverError> {
        if tip_frame != self.tip_frame {
            return Err(SolverError::UnknownFrame(tip_frame.to_string()));
        }
        Ok(self.forward(&Self::to_six(joints)?))
    }

    fn tip_frame(&self) -> &str {
        &self.tip_frame
    }

    fn base_frame(&self) -> &str {
        &self.base_frame
    }

    fn dof(&self) -> usize {
        DOF
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use super::*;

    fn robot() -> OPWKinematics {
        OPWKinematics::new(Parameters::irb2400_10())
    }

    fn assert_found(robot: &OPWKinematics, joints: &[f64; 6]) {
        let pose = robot.forward(joints);
        let result = robot.position_ik(&[pose], &[0.0; 6], &QueryOptions::default())
            .expect("solver call must succeed");
        assert_eq!(result.status, IkStatus::Found);
        let found = result.solutions.iter()
            .filter(|s| is_finite(s))
            .any(|s| s.iter().zip(joints.iter()).all(|(a, b)| (normalize_angle(a - b)).abs() < 1e-5));
        assert!(found, "Joints {:?} not among solutions {:?}", joints, result.solutions);
    }

    #[test]
    fn test_forward_at_zero() {
        let p = Parameters { offsets: [0.0; 6], ..Parameters::irb2400_10() };
        let robot = OPWKinematics::new(p);
        let pose = robot.forward(&[0.0; 6]);
        let expected = Vector3::new(p.a1 + p.a2, 0.0, p.c1 + p.c2 + p.c3 + p.c4);
        assert!((pose.translation.vector - expected).norm() < 1e-12);
        assert!(pose.rotation.angle() < 1e-12);
    }

    #[test]
    fn test_inverse_recovers_joints() {
        let robot = robot();
        assert_found(&robot, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_found(&robot, &[-0.5, 0.4, -0.2, 1.0, -0.7, 2.0]);
    }

    #[test]
    fn test_inverse_recovers_random_joints() {
        let robot = robot();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let joints: [f64; 6] = std::array::from_fn(|i| {
                // Keep J5 away from the singularity, the seed would decide J4 there.
                if i == 4 { rng.random_range(0.2..1.5) } else { rng.random_range(-1.5..1.5) }
            });
            assert_found(&robot, &joints);
        }
    }

    #[test]
    fn test_unreachable_pose() {
        let robot = robot();
        let pose = Pose::translation(5.0, 5.0, 5.0);
        let result = robot.position_ik(&[pose], &[0.0; 6], &QueryOptions::default()).unwrap();
        assert_eq!(result.status, IkStatus::NoSolution);
        assert!(result.solutions.iter().all(|s| !is_finite(s)));
    }

    #[test]
    fn test_singular_wrist_follows_seed() {
        let robot = robot();
        let joints = [0.2, 0.1, 0.3, 0.0, 0.0, 0.4];
        let pose = robot.forward(&joints);
        let seed = [0.2, 0.1, 0.3, 0.7, 0.0, -0.3];
        let result = robot.position_ik(&[pose], &seed,
                                       &QueryOptions { all_solutions: false, verify_with_fk: true }).unwrap();
        assert_eq!(result.solutions.len(), 1);
        let solution = &result.solutions[0];
        assert!((solution[3] - 0.7).abs() < 1e-9, "J4 must come from the seed: {:?}", solution);
        assert!((solution[5] - (-0.3)).abs() < 1e-6, "J6 takes the rest: {:?}", solution);
    }

    #[test]
    fn test_single_solution_is_closest_to_seed() {
        let robot = robot();
        let joints = [0.3, 0.2, 0.1, 0.5, 0.6, 0.7];
        let pose = robot.forward(&joints);
        let result = robot.position_ik(&[pose], &joints,
                                       &QueryOptions { all_solutions: false, verify_with_fk: true }).unwrap();
        assert_eq!(result.solutions.len(), 1);
        for (a, b) in result.solutions[0].iter().zip(joints.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_argument_errors() {
        let robot = robot();
        let pose = Pose::identity();
        let options = QueryOptions::default();
        assert_eq!(robot.position_ik(&[], &[0.0; 6], &options).unwrap_err(), SolverError::NoPoses);
        assert_eq!(robot.position_ik(&[pose, pose], &[0.0; 6], &options).unwrap_err(),
                   SolverError::MultiplePosesUnsupported(2));
        assert_eq!(robot.position_ik(&[pose], &[0.0; 5], &options).unwrap_err(),
                   SolverError::WrongDof { expected: 6, found: 5 });
        assert_eq!(robot.position_fk("flange", &[0.0; 6]).unwrap_err(),
                   SolverError::UnknownFrame("flange".to_string()));
        assert!(robot.position_fk("tool0", &[0.0; 6]).is_ok());
    }
}
