//! Robot model adapter for Cartesian path planners.
//!
//! A Cartesian planner asks the robot model for inverse kinematics of tool poses,
//! forward kinematics of joint configurations and whether a configuration is usable.
//! The kinematics solver of a robot, however, works in its own native frames: a base
//! frame it was derived against and a flange (often `tool0`). This crate bridges the two:
//!
//! - [`frame::FrameTransforms`] keeps `world_to_base` and `tool0_to_tip`, recomputed from
//!   the live [`robot_state::RobotState`] whenever it changes.
//! - [`validator::SolutionValidator`] rejects configurations with NaN, out of limit joints
//!   or disallowed collisions (allowed collision matrix plus arm / robot link exclusions).
//! - [`opw_state_adapter::OpwStateAdapter`] implements
//!   [`kinematic_traits::RobotModelAdapter`]: all valid IK solutions, the one closest to
//!   a seed (L1 distance, first wins ties), FK in the world frame and planning scene updates
//!   that are either applied completely or not at all.
//!
//! The robot is described by URDF (links, joints, box / sphere / cylinder collision
//! geometry) and SRDF (planning groups, disabled collisions), and the adapter is configured
//! with [`adapter_config::AdapterConfig`], loadable from YAML. The bundled solver is the
//! analytic solver for 6 axis robots with a parallel base and spherical wrist
//! ([`kinematics_impl::OPWKinematics`]), see _An Analytical Solution of the Inverse
//! Kinematics Problem of Industrial Serial Manipulators with an Ortho-parallel Basis and a
//! Spherical Wrist_ by Mathias Brandstötter, Arthur Angerer, and Michael Hofbaur.
//!
//! The library only emits [`tracing`] events, installing a subscriber is up to the application.

pub mod parameters;
pub mod parameters_robots;
pub mod parameters_from_file;
pub mod parameter_error;

pub mod utils;
pub mod kinematic_traits;
pub mod kinematics_impl;

pub mod constraints;

pub mod frame;

pub mod robot_model;
pub mod robot_state;
pub mod urdf;
pub mod srdf;

pub mod collisions;
pub mod planning_scene;
pub mod validator;

pub mod adapter_error;
pub mod adapter_config;
pub mod state_adapter;
pub mod opw_state_adapter;
pub mod cartesian_robot;

#[cfg(test)]
mod tests;
