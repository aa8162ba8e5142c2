//! Base state adapter: owns the robot state, the planning group and the frame names
//! the robot specific adapters build upon.

use std::sync::Arc;
use tracing::error;

use crate::adapter_error::AdapterError;
use crate::frame::Frame;
use crate::kinematic_traits::KinematicsSolver;
use crate::robot_model::{JointGroup, RobotModel};
use crate::robot_state::RobotState;

#[derive(Debug, Clone)]
pub struct StateAdapter {
    model: Arc<RobotModel>,
    group_index: usize,
    world_frame: String,
    tcp_frame: String,
    state: RobotState,
    /// Maps model root coordinates into world coordinates.
    world_to_root: Frame,
}

impl StateAdapter {
    /// Bind to the model, group and frames. The state starts at the model defaults.
    pub fn initialize(model: Arc<RobotModel>, group_name: &str, world_frame: &str, tcp_frame: &str)
                      -> Result<Self, AdapterError> {
        let group_index = model.groups().iter().position(|g| g.name == group_name)
            .ok_or_else(|| {
                error!("Planning group '{}' not found in robot model '{}'", group_name, model.name());
                AdapterError::UnknownGroup(group_name.to_string())
            })?;

        let state = RobotState::new(model.clone());
        if !state.knows_frame_transform(tcp_frame) {
            error!("Tool frame '{}' not found in robot model '{}'", tcp_frame, model.name());
            return Err(AdapterError::UnknownFrame(tcp_frame.to_string()));
        }
        let world_to_root = Self::compute_world_to_root(&state, world_frame)?;

        Ok(StateAdapter {
            model,
            group_index,
            world_frame: world_frame.to_string(),
            tcp_frame: tcp_frame.to_string(),
            state,
            world_to_root,
        })
    }

    fn compute_world_to_root(state: &RobotState, world_frame: &str) -> Result<Frame, AdapterError> {
        let root_world = state.frame_transform(world_frame).ok_or_else(|| {
            error!("World frame '{}' not found in robot model '{}'", world_frame, state.model().name());
            AdapterError::UnknownFrame(world_frame.to_string())
        })?;
        Ok(Frame::new(root_world.inverse()))
    }

    /// Replace the state. It must be built for the same model.
    pub fn set_state(&mut self, state: RobotState) -> Result<(), AdapterError> {
        if !Arc::ptr_eq(state.model(), &self.model) {
            return Err(AdapterError::ModelMismatch {
                expected: self.model.name().to_string(),
                found: state.model().name().to_string(),
            });
        }
        self.world_to_root = Self::compute_world_to_root(&state, &self.world_frame)?;
        self.state = state;
        Ok(())
    }

    pub fn model(&self) -> &Arc<RobotModel> {
        &self.model
    }

    pub fn group(&self) -> &JointGroup {
        &self.model.groups()[self.group_index]
    }

    pub fn solver(&self) -> Option<&Arc<dyn KinematicsSolver>> {
        self.group().solver.as_ref()
    }

    pub fn dof(&self) -> usize {
        self.group().dof()
    }

    pub fn state(&self) -> &RobotState {
        &self.state
    }

    pub fn world_frame(&self) -> &str {
        &self.world_frame
    }

    pub fn tcp_frame(&self) -> &str {
        &self.tcp_frame
    }

    pub fn world_to_root(&self) -> &Frame {
        &self.world_to_root
    }
}
