//! Core types and the two seams of this crate: the [`KinematicsSolver`] that does the
//! actual robot-specific mathematics, and the [`RobotModelAdapter`] that a Cartesian
//! path planner talks to.

extern crate nalgebra as na;

use std::fmt;
use std::sync::Arc;
use na::Isometry3;

use crate::adapter_error::AdapterError;
use crate::planning_scene::{PlanningScene, SceneError};
use crate::robot_model::RobotModel;
use crate::robot_state::RobotState;

/// Pose is used a pose of the robot tcp. It contains both Cartesian position and rotation quaternion
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion, Vector3};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(1.0, 0.0, 0.0);
/// // The quaternion should be normalized to represent a valid rotation.
/// let rotation = UnitQuaternion::from_quaternion(na::Quaternion::new(1.0, 0.0, 0.0, 1.0).normalize());
/// let transform = Pose::from_parts(translation, rotation);
/// ```
pub type Pose = Isometry3<f64>;

/// Ordered joint values of a planning group, radians for revolute joints and meters
/// for prismatic ones. The length always equals the number of active joints in the group.
pub type JointConfiguration = Vec<f64>;

/// Multiple joint configurations, typically all inverse kinematics branches for one pose.
pub type Solutions = Vec<JointConfiguration>;

/// Options of the inverse kinematics query.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// Return all branches. If false, only the branch closest to the seed is returned.
    pub all_solutions: bool,

    /// Drop finite branches whose forward kinematics does not reproduce the target.
    pub verify_with_fk: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            all_solutions: true,
            verify_with_fk: true,
        }
    }
}

/// Native classification of the solver outcome. The adapter only cares whether
/// candidates survive validation, but the status is kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IkStatus {
    Found,
    NoSolution,
}

/// Raw outcome of the inverse kinematics call. Solutions may contain NaN rows:
/// unreachable branches are reported this way and must be filtered by the caller.
#[derive(Debug, Clone)]
pub struct IkResult {
    pub solutions: Solutions,
    pub status: IkStatus,
}

/// Failure of the solver call itself (as opposed to a pose being unreachable).
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    WrongDof { expected: usize, found: usize },
    UnknownFrame(String),
    NoPoses,
    MultiplePosesUnsupported(usize),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SolverError::WrongDof { expected, found } =>
                write!(f, "Wrong number of joints: expected {}, found {}", expected, found),
            SolverError::UnknownFrame(frame) =>
                write!(f, "Solver does not know frame '{}'", frame),
            SolverError::NoPoses =>
                write!(f, "No target poses given"),
            SolverError::MultiplePosesUnsupported(n) =>
                write!(f, "Solver supports a single tip only, {} poses given", n),
        }
    }
}

impl std::error::Error for SolverError {}

/// Robot specific kinematics solver, working in its own native base and tip (flange) frames.
pub trait KinematicsSolver: Send + Sync {
    /// Solve inverse kinematics for the tip pose(s), expressed in the solver base frame.
    /// Seed is used for singularity resolution and, if only one solution is requested,
    /// for choosing it.
    fn position_ik(&self, poses: &[Pose], seed: &[f64], options: &QueryOptions)
                   -> Result<IkResult, SolverError>;

    /// Pose of the named tip frame relative to the solver base for the given joints.
    fn position_fk(&self, tip_frame: &str, joints: &[f64]) -> Result<Pose, SolverError>;

    /// Name of the frame the solver computes poses for (flange, often `tool0`).
    fn tip_frame(&self) -> &str;

    /// Name of the frame the solver computes poses in.
    fn base_frame(&self) -> &str;

    fn dof(&self) -> usize;
}

/// The robot model interface used by Cartesian path planners. The planner calls
/// these methods repeatedly while stitching a trajectory, so failures are routine
/// and reported as `None` / `false` rather than errors.
///
/// Implementations are expected to be used from one logical caller at a time;
/// mutating methods take `&mut self`, so sharing across threads requires wrapping
/// the whole adapter into a single lock.
pub trait RobotModelAdapter {
    /// Bind the adapter to the model, planning group, world frame and tool center
    /// point frame. Fails on any configuration error, adapter is unusable then.
    fn initialize(&mut self, model: Arc<RobotModel>, group_name: &str,
                  world_frame: &str, tcp_frame: &str) -> Result<(), AdapterError>;

    /// Valid solution closest to the seed, if any.
    fn get_ik(&self, pose: &Pose, seed: &[f64]) -> Option<JointConfiguration>;

    /// All valid solutions. `Some` is only returned for non-empty set.
    fn get_all_ik(&self, pose: &Pose) -> Option<Solutions>;

    /// Tool center point pose in the world frame. Invalid joints are rejected.
    fn get_fk(&self, joints: &[f64]) -> Option<Pose>;

    fn is_valid(&self, joints: &[f64]) -> bool;

    /// Replace the robot state. Derived frames are recomputed before returning.
    fn set_state(&mut self, state: RobotState) -> Result<(), AdapterError>;

    /// Replace collision state from the external planning scene, all or nothing.
    fn update_planning_scene(&mut self, scene: &PlanningScene) -> Result<(), SceneError>;

    fn dof(&self) -> usize;
}
