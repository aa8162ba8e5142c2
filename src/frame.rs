//! Frames relating the kinematics solver to the frames the planner works in.
//!
//! The solver computes the pose of its own tip (flange, usually `tool0`) relative to its own
//! base. The planner asks for the tool center point (tcp) relative to the world frame. Two
//! transforms bridge this: `world_to_base` places the solver base in the world, and
//! `tool0_to_tip` relates the flange to the tool center point. Both depend on the robot state
//! whenever articulated links lie between the frames, so they are recomputed every time the
//! state changes.

use nalgebra::Isometry3;
use tracing::{error, info};

use crate::adapter_error::AdapterError;
use crate::kinematic_traits::Pose;
use crate::robot_state::RobotState;

/// Rigid transform stored together with its inverse. The inverse is computed when the
/// frame is constructed and cannot be changed separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    frame: Isometry3<f64>,
    frame_inv: Isometry3<f64>,
}

impl Frame {
    pub fn new(frame: Isometry3<f64>) -> Self {
        Frame { frame, frame_inv: frame.inverse() }
    }

    pub fn identity() -> Self {
        Frame::new(Isometry3::identity())
    }

    pub fn frame(&self) -> &Isometry3<f64> {
        &self.frame
    }

    pub fn frame_inv(&self) -> &Isometry3<f64> {
        &self.frame_inv
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::identity()
    }
}

/// The two transforms between solver frames and planner frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransforms {
    tool0_to_tip: Frame,
    world_to_base: Frame,
}

impl FrameTransforms {
    /// Compute both transforms from the current state. `world_to_root` maps the model root
    /// frame into the world frame. Any frame name unknown to the state is an error.
    pub fn compute(state: &RobotState, world_to_root: &Frame, tcp_frame: &str,
                   solver_base_frame: &str, solver_tool_frame: &str) -> Result<Self, AdapterError> {
        let lookup = |name: &str| {
            state.frame_transform(name).ok_or_else(|| {
                error!("Failed to find transform for frame '{}' in robot model '{}'",
                    name, state.model().name());
                AdapterError::UnknownFrame(name.to_string())
            })
        };

        let tcp = lookup(tcp_frame)?;
        let solver_tool = lookup(solver_tool_frame)?;
        let solver_base = lookup(solver_base_frame)?;

        let transforms = FrameTransforms {
            tool0_to_tip: Frame::new(tcp.inverse() * solver_tool),
            world_to_base: Frame::new(world_to_root.frame() * solver_base),
        };
        info!("Frames recomputed: tool0_to_tip {:?}, world_to_base {:?}",
            transforms.tool0_to_tip.frame().translation.vector.as_slice(),
            transforms.world_to_base.frame().translation.vector.as_slice());
        Ok(transforms)
    }

    pub fn tool0_to_tip(&self) -> &Frame {
        &self.tool0_to_tip
    }

    pub fn world_to_base(&self) -> &Frame {
        &self.world_to_base
    }

    /// Convert the solver tip pose (relative to the solver base) into the tcp pose in the world.
    pub fn to_world(&self, solver_pose: &Pose) -> Pose {
        self.world_to_base.frame() * solver_pose * self.tool0_to_tip.frame_inv()
    }

    /// Convert the tcp pose in the world into the solver tip pose relative to the solver base.
    pub fn to_solver(&self, world_pose: &Pose) -> Pose {
        self.world_to_base.frame_inv() * world_pose * self.tool0_to_tip.frame()
    }
}
