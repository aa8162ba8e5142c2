//! Synthetic 6 DOF Cartesian robot for exercising planners. Its joints are directly the
//! tool position and orientation (`x y z rx ry rz`), so inverse kinematics always has
//! exactly one answer when the pose is within the configured ranges.

use std::sync::Arc;
use nalgebra::{Translation3, UnitQuaternion};
use tracing::debug;

use crate::adapter_error::AdapterError;
use crate::collisions::{AllowedCollisionMatrix, CollisionContext};
use crate::kinematic_traits::{JointConfiguration, Pose, RobotModelAdapter, Solutions};
use crate::planning_scene::{PlanningScene, SceneError};
use crate::robot_model::RobotModel;
use crate::robot_state::RobotState;

const DOF: usize = 6;

#[derive(Debug, Clone)]
pub struct CartesianRobot {
    /// Allowed absolute value of x, y and z.
    pos_range: f64,
    /// Allowed absolute value of rx, ry and rz.
    orient_range: f64,
    velocity_limits: Vec<f64>,
    scene: CollisionContext,
}

impl CartesianRobot {
    /// Velocity limits are per joint, in units per second. The robot is usable right away,
    /// [`RobotModelAdapter::initialize`] is accepted but not required.
    pub fn new(pos_range: f64, orient_range: f64, velocity_limits: Vec<f64>) -> Self {
        CartesianRobot {
            pos_range,
            orient_range,
            velocity_limits,
            scene: CollisionContext::new(AllowedCollisionMatrix::new()),
        }
    }

    pub fn velocity_limits(&self) -> &[f64] {
        &self.velocity_limits
    }

    /// True if moving between the configurations in `dt` seconds respects the velocity
    /// limits. Non positive `dt` means the move is not timed and is always accepted.
    pub fn is_valid_move(&self, from: &[f64], to: &[f64], dt: f64) -> bool {
        if from.len() != DOF || to.len() != DOF {
            return false;
        }
        if dt <= 0.0 {
            return true;
        }
        from.iter().zip(to).zip(&self.velocity_limits)
            .all(|((a, b), limit)| (b - a).abs() / dt <= *limit)
    }

    fn joints_of(pose: &Pose) -> JointConfiguration {
        let t = pose.translation.vector;
        let (rx, ry, rz) = pose.rotation.euler_angles();
        vec![t.x, t.y, t.z, rx, ry, rz]
    }
}

impl RobotModelAdapter for CartesianRobot {
    fn initialize(&mut self, _model: Arc<RobotModel>, group_name: &str,
                  world_frame: &str, tcp_frame: &str) -> Result<(), AdapterError> {
        debug!("Cartesian robot bound to group '{}', {} -> {}", group_name, world_frame, tcp_frame);
        Ok(())
    }

    fn get_ik(&self, pose: &Pose, _seed: &[f64]) -> Option<JointConfiguration> {
        let joints = Self::joints_of(pose);
        if self.is_valid(&joints) {
            Some(joints)
        } else {
            debug!("Pose is out of the Cartesian robot range");
            None
        }
    }

    fn get_all_ik(&self, pose: &Pose) -> Option<Solutions> {
        self.get_ik(pose, &[]).map(|joints| vec![joints])
    }

    fn get_fk(&self, joints: &[f64]) -> Option<Pose> {
        if !self.is_valid(joints) {
            return None;
        }
        Some(Pose::from_parts(
            Translation3::new(joints[0], joints[1], joints[2]),
            UnitQuaternion::from_euler_angles(joints[3], joints[4], joints[5]),
        ))
    }

    fn is_valid(&self, joints: &[f64]) -> bool {
        joints.len() == DOF
            && joints[..3].iter().all(|v| v.abs() <= self.pos_range)
            && joints[3..].iter().all(|v| v.abs() <= self.orient_range)
    }

    fn set_state(&mut self, _state: RobotState) -> Result<(), AdapterError> {
        Ok(())
    }

    /// The robot has no geometry, so the scene is only checked for consistency.
    fn update_planning_scene(&mut self, scene: &PlanningScene) -> Result<(), SceneError> {
        scene.validate(&self.scene)
    }

    fn dof(&self) -> usize {
        DOF
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning_scene::{AcmMessage, CollisionObjectMsg};

    fn robot() -> CartesianRobot {
        CartesianRobot::new(5.0, 0.001, vec![1.0; 6])
    }

    #[test]
    fn test_fk_ik() {
        let robot = robot();
        let joints = [1.0, -2.0, 0.5, 0.0, 0.0005, 0.0];
        let pose = robot.get_fk(&joints).unwrap();
        assert!((pose.translation.vector.y + 2.0).abs() < 1e-12);

        let back = robot.get_ik(&pose, &[0.0; 6]).unwrap();
        for (a, b) in back.iter().zip(joints.iter()) {
            assert!((a - b).abs() < 1e-9, "{:?} vs {:?}", back, joints);
        }
        assert_eq!(robot.get_all_ik(&pose).unwrap().len(), 1);
    }

    #[test]
    fn test_ranges() {
        let robot = robot();
        assert!(robot.is_valid(&[5.0, -5.0, 0.0, 0.0, 0.0, 0.0]));
        assert!(!robot.is_valid(&[5.1, 0.0, 0.0, 0.0, 0.0, 0.0]));
        assert!(!robot.is_valid(&[0.0, 0.0, 0.0, 0.0, 0.01, 0.0]));
        assert!(!robot.is_valid(&[0.0, 0.0, f64::NAN, 0.0, 0.0, 0.0]));
        assert!(!robot.is_valid(&[0.0; 5]));

        let tilted = Pose::from_parts(Translation3::new(0.0, 0.0, 0.0),
                                      UnitQuaternion::from_euler_angles(0.2, 0.0, 0.0));
        assert!(robot.get_ik(&tilted, &[0.0; 6]).is_none());
        assert!(robot.get_all_ik(&Pose::translation(6.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_velocity() {
        let robot = robot();
        let from = [-1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let to = [-0.9, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert!(robot.is_valid_move(&from, &to, 0.2));
        assert!(!robot.is_valid_move(&from, &to, 0.001));
        assert!(robot.is_valid_move(&from, &to, 0.0));
        assert!(!robot.is_valid_move(&from, &to[..5], 1.0));
    }

    #[test]
    fn test_scene_checked() {
        let mut robot = robot();
        let good = PlanningScene { is_diff: true, ..Default::default() };
        assert!(robot.update_planning_scene(&good).is_ok());

        let bad = PlanningScene {
            allowed_collision_matrix: Some(AcmMessage {
                entry_names: vec!["a".into()],
                entry_values: vec![],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(robot.update_planning_scene(&bad).is_err());

        let mut removal = PlanningScene { is_diff: true, ..Default::default() };
        removal.world = Some(crate::planning_scene::PlanningSceneWorld {
            collision_objects: vec![CollisionObjectMsg::remove("missing")],
            octomap: None,
        });
        assert!(matches!(robot.update_planning_scene(&removal), Err(SceneError::UnknownObject(_))));
    }
}
