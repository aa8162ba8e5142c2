use std::sync::Arc;
use nalgebra::Isometry3;

use crate::adapter_config::AdapterConfig;
use crate::kinematic_traits::RobotModelAdapter;
use crate::opw_state_adapter::OpwStateAdapter;
use crate::robot_model::RobotModel;

pub(crate) const URDF: &str = include_str!("data/generic_arm.urdf");
pub(crate) const SRDF: &str = include_str!("data/generic_arm.srdf");
pub(crate) const CONFIG: &str = include_str!("data/adapter.yaml");

pub(crate) const GROUP: &str = "manipulator";
pub(crate) const WORLD: &str = "world";
pub(crate) const TCP: &str = "tcp";

/// Joints of the generic arm that are well inside limits and free of collisions.
pub(crate) const SAFE_JOINTS: [f64; 6] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];

pub(crate) fn load_config() -> AdapterConfig {
    AdapterConfig::from_yaml_str(CONFIG).expect("Failed to parse adapter configuration")
}

/// Generic arm with groups from SRDF, but without any solver attached.
pub(crate) fn load_bare_model() -> RobotModel {
    let mut model = RobotModel::from_urdf(URDF).expect("Failed to parse URDF");
    model.load_srdf(SRDF).expect("Failed to parse SRDF");
    model
}

pub(crate) fn load_model(config: &AdapterConfig) -> Arc<RobotModel> {
    let mut model = load_bare_model();
    model.configure_kinematics(&config.kinematics).expect("Failed to configure kinematics");
    Arc::new(model)
}

pub(crate) fn initialized_adapter(config: AdapterConfig) -> OpwStateAdapter {
    let model = load_model(&config);
    let mut adapter = OpwStateAdapter::new(config);
    adapter.initialize(model, GROUP, WORLD, TCP).expect("Failed to initialize adapter");
    adapter
}

pub(crate) fn are_isometries_close(a: &Isometry3<f64>, b: &Isometry3<f64>, tolerance: f64) -> bool {
    let translation = (a.translation.vector - b.translation.vector).norm();
    let rotation = a.rotation.angle_to(&b.rotation);
    translation <= tolerance && rotation <= tolerance
}

pub(crate) fn are_joints_close(a: &[f64], b: &[f64], tolerance: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance)
}
