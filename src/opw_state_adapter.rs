//! Robot model adapter that bridges a Cartesian planner to the kinematics solver of a
//! planning group, reconciling the solver base and tip frames with the world and tool
//! center point frames the planner uses.

use std::sync::Arc;
use tracing::{debug, error};

use crate::adapter_config::{AdapterConfig, IkFrameComposition};
use crate::adapter_error::AdapterError;
use crate::collisions::{AllowedCollisionMatrix, CollisionContext, RobotBody};
use crate::frame::FrameTransforms;
use crate::kinematic_traits::{JointConfiguration, KinematicsSolver, Pose, QueryOptions, RobotModelAdapter, Solutions};
use crate::planning_scene::{PlanningScene, SceneError};
use crate::robot_model::RobotModel;
use crate::robot_state::RobotState;
use crate::state_adapter::StateAdapter;
use crate::utils::closest_joint_pose;
use crate::validator::{self, Invalid, SolutionValidator};

struct Loaded {
    base: StateAdapter,
    solver: Arc<dyn KinematicsSolver>,
    /// None if the frames could not be resolved for the current state.
    frames: Option<FrameTransforms>,
    body: RobotBody,
    collision: CollisionContext,
}

impl Loaded {
    fn validator(&self, margin: f64) -> SolutionValidator<'_> {
        SolutionValidator {
            state: self.base.state(),
            group: self.base.group(),
            body: &self.body,
            context: &self.collision,
            limit_margin: margin,
        }
    }

    fn compute_frames(&self, config: &AdapterConfig) -> Result<FrameTransforms, AdapterError> {
        FrameTransforms::compute(self.base.state(), self.base.world_to_root(), self.base.tcp_frame(),
                                 &config.solver_base_frame, &config.solver_tool_frame)
    }
}

/// Adapter for a robot whose planning group carries an analytic solver (such as
/// [`crate::kinematics_impl::OPWKinematics`]) working between its own base and flange frames.
///
/// ```no_run
/// use std::sync::Arc;
/// use rs_kinematics_adapter::adapter_config::AdapterConfig;
/// use rs_kinematics_adapter::kinematic_traits::RobotModelAdapter;
/// use rs_kinematics_adapter::opw_state_adapter::OpwStateAdapter;
/// use rs_kinematics_adapter::robot_model::RobotModel;
///
/// let config = AdapterConfig::from_yaml_file("adapter.yaml").unwrap();
/// let mut model = RobotModel::from_urdf_file("robot.urdf").unwrap();
/// model.load_srdf_file("robot.srdf").unwrap();
/// model.configure_kinematics(&config.kinematics).unwrap();
///
/// let mut adapter = OpwStateAdapter::new(config);
/// adapter.initialize(Arc::new(model), "manipulator", "world", "tcp").unwrap();
/// let pose = adapter.get_fk(&[0.0, 0.2, 0.1, 0.0, 0.5, 0.0]).unwrap();
/// let joints = adapter.get_ik(&pose, &[0.0, 0.2, 0.1, 0.0, 0.5, 0.0]);
/// ```
pub struct OpwStateAdapter {
    config: AdapterConfig,
    loaded: Option<Loaded>,
}

impl OpwStateAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        OpwStateAdapter { config, loaded: None }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.loaded.is_some()
    }

    /// Replace both link exclusion sets. Takes effect on the next validity check.
    pub fn set_collision_links(&mut self, arm_links: &[String], robot_links: &[String]) {
        self.config.collision.arm_links = arm_links.to_vec();
        self.config.collision.robot_links = robot_links.to_vec();
        if let Some(loaded) = &mut self.loaded {
            loaded.collision.set_collision_links(arm_links, robot_links);
        }
    }

    pub fn has_nan(&self, joints: &[f64]) -> bool {
        validator::has_nan(joints)
    }

    /// Why the configuration is not valid, for diagnostics.
    pub fn check(&self, joints: &[f64]) -> Result<(), Invalid> {
        match &self.loaded {
            Some(loaded) => loaded.validator(self.config.joint_limit_margin).check(joints),
            None => Err(Invalid::WrongDof { expected: 0, found: joints.len() }),
        }
    }

    /// All disallowed colliding pairs for the configuration, sorted.
    pub fn collision_pairs(&self, joints: &[f64]) -> Vec<(String, String)> {
        self.loaded.as_ref()
            .map(|l| l.validator(self.config.joint_limit_margin).collision_pairs(joints))
            .unwrap_or_default()
    }

    pub fn collision_context(&self) -> Option<&CollisionContext> {
        self.loaded.as_ref().map(|l| &l.collision)
    }

    pub fn frames(&self) -> Option<&FrameTransforms> {
        self.loaded.as_ref().and_then(|l| l.frames.as_ref())
    }

    pub fn state(&self) -> Option<&RobotState> {
        self.loaded.as_ref().map(|l| l.base.state())
    }

    pub fn model(&self) -> Option<&Arc<RobotModel>> {
        self.loaded.as_ref().map(|l| l.base.model())
    }

    fn ready(&self) -> Option<(&Loaded, &FrameTransforms)> {
        let loaded = self.loaded.as_ref()?;
        match &loaded.frames {
            Some(frames) => Some((loaded, frames)),
            None => {
                debug!("Frames are not available for the current state");
                None
            }
        }
    }
}

impl Default for OpwStateAdapter {
    fn default() -> Self {
        Self::new(AdapterConfig::default())
    }
}

impl RobotModelAdapter for OpwStateAdapter {
    fn initialize(&mut self, model: Arc<RobotModel>, group_name: &str,
                  world_frame: &str, tcp_frame: &str) -> Result<(), AdapterError> {
        self.loaded = None;
        let base = StateAdapter::initialize(model.clone(), group_name, world_frame, tcp_frame)?;

        let solver = base.solver().cloned().ok_or_else(|| {
            error!("Planning group '{}' has no kinematics solver", group_name);
            AdapterError::NoSolver(group_name.to_string())
        })?;
        if solver.dof() != base.dof() {
            error!("Solver works with {} joints, group '{}' has {}", solver.dof(), group_name, base.dof());
            return Err(AdapterError::WrongDof { expected: base.dof(), found: solver.dof() });
        }

        let collision_config = &self.config.collision;
        let mut collision = CollisionContext::new(AllowedCollisionMatrix::from_model(&model));
        collision.set_collision_links(&collision_config.arm_links, &collision_config.robot_links);
        collision.octomap_link = collision_config.octomap_link.clone();
        collision.exclude_links_from_octomap = collision_config.exclude_links_from_octomap;
        collision.checks = collision_config.checks;

        let mut loaded = Loaded {
            base,
            solver,
            frames: None,
            body: RobotBody::from_model(&model),
            collision,
        };
        loaded.frames = Some(loaded.compute_frames(&self.config)?);
        self.loaded = Some(loaded);
        Ok(())
    }

    fn get_ik(&self, pose: &Pose, seed: &[f64]) -> Option<JointConfiguration> {
        let mut solutions = self.get_all_ik(pose)?;
        let index = closest_joint_pose(&solutions, seed)?;
        Some(solutions.swap_remove(index))
    }

    fn get_all_ik(&self, pose: &Pose) -> Option<Solutions> {
        let (loaded, frames) = self.ready()?;

        let solver_pose = match self.config.ik_frame_composition {
            IkFrameComposition::Full => frames.to_solver(pose),
            IkFrameComposition::Passthrough => *pose,
        };
        let seed = vec![0.0; loaded.solver.dof()];
        let options = QueryOptions { all_solutions: true, verify_with_fk: true };

        let result = match loaded.solver.position_ik(&[solver_pose], &seed, &options) {
            Ok(result) => result,
            Err(e) => {
                debug!("Inverse kinematics call failed: {}", e);
                return None;
            }
        };

        let validator = loaded.validator(self.config.joint_limit_margin);
        let valid: Solutions = result.solutions.into_iter()
            .filter(|joints| match validator.check(joints) {
                Ok(()) => true,
                Err(reason) => {
                    debug!("Inverse kinematics candidate rejected: {}", reason);
                    false
                }
            })
            .collect();

        if valid.is_empty() {
            debug!("No valid inverse kinematics solution, solver status {:?}", result.status);
            None
        } else {
            Some(valid)
        }
    }

    fn get_fk(&self, joints: &[f64]) -> Option<Pose> {
        let (loaded, frames) = self.ready()?;
        if let Err(reason) = loaded.validator(self.config.joint_limit_margin).check(joints) {
            debug!("Forward kinematics of invalid joints refused: {}", reason);
            return None;
        }
        match loaded.solver.position_fk(loaded.solver.tip_frame(), joints) {
            Ok(pose) => Some(frames.to_world(&pose)),
            Err(e) => {
                debug!("Forward kinematics call failed: {}", e);
                None
            }
        }
    }

    fn is_valid(&self, joints: &[f64]) -> bool {
        self.check(joints).is_ok()
    }

    fn set_state(&mut self, state: RobotState) -> Result<(), AdapterError> {
        let loaded = self.loaded.as_mut().ok_or(AdapterError::NotInitialized)?;
        loaded.base.set_state(state)?;
        match loaded.compute_frames(&self.config) {
            Ok(frames) => {
                loaded.frames = Some(frames);
                Ok(())
            }
            Err(e) => {
                loaded.frames = None;
                Err(e)
            }
        }
    }

    fn update_planning_scene(&mut self, scene: &PlanningScene) -> Result<(), SceneError> {
        let loaded = self.loaded.as_mut().ok_or(SceneError::NotInitialized)?;
        let next = loaded.collision.apply_scene(scene, loaded.base.model())?;
        loaded.collision = next;
        Ok(())
    }

    fn dof(&self) -> usize {
        self.loaded.as_ref().map(|l| l.base.dof()).unwrap_or(0)
    }
}
