//! Explicit configuration of the adapter: solver frames, collision checking and the
//! kinematics solvers to attach to planning groups. Defaults apply to anything not set,
//! see [`crate::parameters_from_file`] for the YAML form.

use std::sync::Arc;

use crate::collisions::CollisionChecks;
use crate::kinematics_impl::OPWKinematics;
use crate::parameter_error::ParameterError;
use crate::parameters::opw_kinematics::Parameters;
use crate::robot_model::RobotModel;

/// How the world tcp pose is turned into the solver input for inverse kinematics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IkFrameComposition {
    /// Apply `world_to_base` and `tool0_to_tip`, mirroring forward kinematics.
    #[default]
    Full,
    /// Pass the world pose to the solver unchanged. Only correct if the world frame is the
    /// solver base and the tcp is the solver tip.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionConfig {
    pub checks: CollisionChecks,
    pub octomap_link: String,
    pub arm_links: Vec<String>,
    pub robot_links: Vec<String>,
    pub exclude_links_from_octomap: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        CollisionConfig {
            checks: CollisionChecks::default(),
            octomap_link: "<octomap>".to_string(),
            arm_links: vec!["half_arm_2_link".to_string(), "forearm_link".to_string()],
            robot_links: vec!["tower_link".to_string(), "camera_box".to_string()],
            exclude_links_from_octomap: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolverKind {
    Opw(Parameters),
}

/// Solver for one planning group. Frames default to the group chain ends, or to the
/// model root and `tool0`.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub solver: SolverKind,
    pub base_frame: Option<String>,
    pub tip_frame: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct KinematicsConfig {
    /// Group name and its solver, in configuration order.
    pub groups: Vec<(String, SolverConfig)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    pub solver_base_frame: String,
    pub solver_tool_frame: String,
    pub ik_frame_composition: IkFrameComposition,
    /// Joint limits are extended by this much on both sides when validating.
    pub joint_limit_margin: f64,
    pub collision: CollisionConfig,
    pub kinematics: KinematicsConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            solver_base_frame: "base_link".to_string(),
            solver_tool_frame: "end_effector_link".to_string(),
            ik_frame_composition: IkFrameComposition::default(),
            joint_limit_margin: 0.0,
            collision: CollisionConfig::default(),
            kinematics: KinematicsConfig::default(),
        }
    }
}

impl RobotModel {
    /// Create and attach the configured solvers to their groups.
    pub fn configure_kinematics(&mut self, config: &KinematicsConfig) -> Result<(), ParameterError> {
        for (group_name, solver_config) in &config.groups {
            let group = self.group(group_name).ok_or_else(||
                ParameterError::UnknownName { kind: "group", name: group_name.clone() })?;

            let base_frame = solver_config.base_frame.clone()
                .or_else(|| group.base_link.clone())
                .unwrap_or_else(|| self.root_link().to_string());
            let tip_frame = solver_config.tip_frame.clone()
                .or_else(|| group.tip_link.clone())
                .unwrap_or_else(|| "tool0".to_string());
            for frame in [&base_frame, &tip_frame] {
                if self.link(frame).is_none() {
                    return Err(ParameterError::UnknownName { kind: "solver frame", name: frame.clone() });
                }
            }

            let solver = match &solver_config.solver {
                SolverKind::Opw(parameters) => {
                    if !parameters.is_sane() {
                        return Err(ParameterError::KinematicsConfigurationError(
                            format!("OPW parameters of group '{}' are not valid", group_name)));
                    }
                    Arc::new(OPWKinematics::with_frames(*parameters, &base_frame, &tip_frame))
                }
            };
            self.set_group_solver(group_name, solver)?;
        }
        Ok(())
    }
}
