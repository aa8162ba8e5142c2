//! Live joint values of the robot together with the link transforms they produce.

use std::sync::Arc;
use nalgebra::Isometry3;

use crate::adapter_error::AdapterError;
use crate::robot_model::{JointGroup, RobotModel};

/// Snapshot of the robot: variable positions and the root-relative transform of
/// every link. Each mutation recomputes the transforms before returning, so they
/// always correspond to the positions.
#[derive(Clone, Debug)]
pub struct RobotState {
    model: Arc<RobotModel>,
    positions: Vec<f64>,
    link_transforms: Vec<Isometry3<f64>>,
}

impl RobotState {
    /// State at the model default positions.
    pub fn new(model: Arc<RobotModel>) -> Self {
        let positions = model.default_positions();
        let link_transforms = model.compute_link_transforms(&positions);
        RobotState { model, positions, link_transforms }
    }

    pub fn model(&self) -> &Arc<RobotModel> {
        &self.model
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn set_positions(&mut self, positions: &[f64]) -> Result<(), AdapterError> {
        if positions.len() != self.positions.len() {
            return Err(AdapterError::WrongDof { expected: self.positions.len(), found: positions.len() });
        }
        self.positions.copy_from_slice(positions);
        self.update();
        Ok(())
    }

    pub fn set_variable(&mut self, joint_name: &str, value: f64) -> Result<(), AdapterError> {
        let v = self.model.variable_index(joint_name)
            .ok_or_else(|| AdapterError::UnknownJoint(joint_name.to_string()))?;
        self.positions[v] = value;
        self.update();
        Ok(())
    }

    /// Set the positions of the group joints, leaving other variables as they are.
    pub fn set_group_positions(&mut self, group: &JointGroup, values: &[f64]) -> Result<(), AdapterError> {
        if values.len() != group.dof() {
            return Err(AdapterError::WrongDof { expected: group.dof(), found: values.len() });
        }
        for (&v, &value) in group.variable_indices.iter().zip(values) {
            self.positions[v] = value;
        }
        self.update();
        Ok(())
    }

    pub fn knows_frame_transform(&self, name: &str) -> bool {
        self.model.link_index(name).is_some()
    }

    /// Pose of the named frame relative to the model root.
    pub fn frame_transform(&self, name: &str) -> Option<Isometry3<f64>> {
        self.model.link_index(name).map(|i| self.link_transforms[i])
    }

    /// Root-relative transforms of all links, indexed as the model links.
    pub fn link_transforms(&self) -> &[Isometry3<f64>] {
        &self.link_transforms
    }

    fn update(&mut self) {
        self.link_transforms = self.model.compute_link_transforms(&self.positions);
    }
}
