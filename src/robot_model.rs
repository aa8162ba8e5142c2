//! Immutable kinematic description of the robot: link tree, joints with their limits,
//! collision geometry and planning groups. Built from URDF (see [`crate::urdf`]),
//! extended with SRDF groups (see [`crate::srdf`]) and kinematics solvers, then shared
//! as `Arc<RobotModel>`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};

use crate::constraints::{Constraints, JointLimits};
use crate::kinematic_traits::KinematicsSolver;
use crate::parameter_error::ParameterError;

/// Primitive collision shape as found in the robot description.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkShape {
    /// Full box size along x, y and z.
    Box { size: Vector3<f64> },
    Sphere { radius: f64 },
    /// Cylinder with the axis along z, as URDF defines it.
    Cylinder { radius: f64, length: f64 },
}

impl LinkShape {
    /// All dimensions finite and positive.
    pub fn is_sane(&self) -> bool {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        match self {
            LinkShape::Box { size } => size.iter().all(|&v| positive(v)),
            LinkShape::Sphere { radius } => positive(*radius),
            LinkShape::Cylinder { radius, length } => positive(*radius) && positive(*length),
        }
    }
}

/// Collision shape placed relative to the link frame.
#[derive(Debug, Clone)]
pub struct LinkGeometry {
    pub origin: Isometry3<f64>,
    pub shape: LinkShape,
}

#[derive(Debug, Clone)]
pub struct Link {
    pub name: String,
    pub collision: Vec<LinkGeometry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointType {
    Revolute,
    Continuous,
    Prismatic,
    Fixed,
}

impl JointType {
    pub fn is_active(&self) -> bool {
        *self != JointType::Fixed
    }
}

#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    /// Transform from the parent link frame to the joint frame at zero position.
    pub origin: Isometry3<f64>,
    pub axis: Unit<Vector3<f64>>,
    pub limits: JointLimits,
}

impl Joint {
    /// Transform from the parent link frame to the child link frame at the given position.
    pub fn transform(&self, value: f64) -> Isometry3<f64> {
        match self.joint_type {
            JointType::Revolute | JointType::Continuous =>
                self.origin * UnitQuaternion::from_axis_angle(&self.axis, value),
            JointType::Prismatic =>
                self.origin * Translation3::from(self.axis.into_inner() * value),
            JointType::Fixed => self.origin,
        }
    }
}

/// Planning group: ordered active joints the kinematics solver works with.
#[derive(Clone)]
pub struct JointGroup {
    pub name: String,
    /// Active joints of the group, in solver order.
    pub joints: Vec<String>,
    /// Index of each group joint in the model variable vector.
    pub variable_indices: Vec<usize>,
    pub constraints: Constraints,
    pub base_link: Option<String>,
    pub tip_link: Option<String>,
    pub solver: Option<Arc<dyn KinematicsSolver>>,
}

impl JointGroup {
    pub fn dof(&self) -> usize {
        self.joints.len()
    }
}

impl fmt::Debug for JointGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JointGroup")
            .field("name", &self.name)
            .field("joints", &self.joints)
            .field("base_link", &self.base_link)
            .field("tip_link", &self.tip_link)
            .field("solver", &self.solver.as_ref().map(|s| s.base_frame().to_string()))
            .finish()
    }
}

#[derive(Debug)]
pub struct RobotModel {
    name: String,
    links: Vec<Link>,
    joints: Vec<Joint>,
    link_index: HashMap<String, usize>,
    joint_index: HashMap<String, usize>,
    root: usize,
    /// Links in parent-before-child order, with the index of the joint to the parent.
    traversal: Vec<(usize, Option<usize>)>,
    /// Joint index for each model variable.
    variables: Vec<usize>,
    /// Variable index for each joint, None for fixed joints.
    variable_of_joint: Vec<Option<usize>>,
    groups: Vec<JointGroup>,
    disabled_collisions: Vec<(String, String)>,
}

impl RobotModel {
    /// Build the model from links and joints, checking the tree is well formed:
    /// unique names, known parent and child links, a single root, no cycles.
    pub fn new(name: &str, links: Vec<Link>, joints: Vec<Joint>) -> Result<Self, ParameterError> {
        let mut link_index = HashMap::with_capacity(links.len());
        for (i, link) in links.iter().enumerate() {
            if link_index.insert(link.name.clone(), i).is_some() {
                return Err(ParameterError::DuplicateName { kind: "link", name: link.name.clone() });
            }
        }
        if links.is_empty() {
            return Err(ParameterError::MalformedTree("robot has no links".into()));
        }

        let mut joint_index = HashMap::with_capacity(joints.len());
        let mut parent_joint: Vec<Option<usize>> = vec![None; links.len()];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); links.len()];
        for (j, joint) in joints.iter().enumerate() {
            if joint_index.insert(joint.name.clone(), j).is_some() {
                return Err(ParameterError::DuplicateName { kind: "joint", name: joint.name.clone() });
            }
            let parent = *link_index.get(&joint.parent).ok_or_else(||
                ParameterError::UnknownName { kind: "parent link", name: joint.parent.clone() })?;
            let child = *link_index.get(&joint.child).ok_or_else(||
                ParameterError::UnknownName { kind: "child link", name: joint.child.clone() })?;
            if parent_joint[child].is_some() {
                return Err(ParameterError::MalformedTree(
                    format!("link '{}' has more than one parent joint", joint.child)));
            }
            parent_joint[child] = Some(j);
            children[parent].push(j);
        }

        let roots: Vec<usize> = (0..links.len()).filter(|&i| parent_joint[i].is_none()).collect();
        let root = match roots.as_slice() {
            [root] => *root,
            [] => return Err(ParameterError::MalformedTree("no root link (cycle)".into())),
            _ => return Err(ParameterError::MalformedTree(format!(
                "multiple root links: {}",
                roots.iter().map(|&i| links[i].name.as_str()).collect::<Vec<_>>().join(", ")))),
        };

        // Breadth first from the root. Links not reached are part of a cycle.
        let mut traversal = Vec::with_capacity(links.len());
        traversal.push((root, None));
        let mut next = 0;
        while next < traversal.len() {
            let (link, _) = traversal[next];
            for &j in &children[link] {
                let child = link_index[&joints[j].child];
                traversal.push((child, Some(j)));
            }
            next += 1;
        }
        if traversal.len() != links.len() {
            return Err(ParameterError::MalformedTree("link graph contains a cycle".into()));
        }

        let mut variables = Vec::new();
        let mut variable_of_joint = vec![None; joints.len()];
        for (j, joint) in joints.iter().enumerate() {
            if joint.joint_type.is_active() {
                variable_of_joint[j] = Some(variables.len());
                variables.push(j);
            }
        }

        Ok(RobotModel {
            name: name.to_string(),
            links,
            joints,
            link_index,
            joint_index,
            root,
            traversal,
            variables,
            variable_of_joint,
            groups: Vec::new(),
            disabled_collisions: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.link_index.get(name).map(|&i| &self.links[i])
    }

    pub fn link_index(&self, name: &str) -> Option<usize> {
        self.link_index.get(name).copied()
    }

    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joint_index.get(name).map(|&j| &self.joints[j])
    }

    pub fn root_link(&self) -> &str {
        &self.links[self.root].name
    }

    /// Number of position variables (active joints).
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|&j| self.joints[j].name.as_str()).collect()
    }

    pub fn variable_index(&self, joint_name: &str) -> Option<usize> {
        self.joint_index.get(joint_name).and_then(|&j| self.variable_of_joint[j])
    }

    pub fn variable_limits(&self, variable: usize) -> JointLimits {
        self.joints[self.variables[variable]].limits
    }

    /// Zero for every variable, clamped into its limits.
    pub fn default_positions(&self) -> Vec<f64> {
        self.variables.iter().map(|&j| self.joints[j].limits.clamp(0.0)).collect()
    }

    /// Root-relative transform of every link (indexed as [`RobotModel::links`]) for the
    /// given variable positions. Positions must have [`RobotModel::variable_count`] length.
    pub fn compute_link_transforms(&self, positions: &[f64]) -> Vec<Isometry3<f64>> {
        let mut transforms = vec![Isometry3::identity(); self.links.len()];
        for &(link, joint) in &self.traversal {
            if let Some(j) = joint {
                let joint = &self.joints[j];
                let value = self.variable_of_joint[j]
                    .and_then(|v| positions.get(v).copied())
                    .unwrap_or(0.0);
                let parent = transforms[self.link_index[&joint.parent]];
                transforms[link] = parent * joint.transform(value);
            }
        }
        transforms
    }

    /// Pairs of links directly connected by a joint. These touch by construction.
    pub fn adjacent_link_pairs(&self) -> Vec<(String, String)> {
        self.joints.iter().map(|j| (j.parent.clone(), j.child.clone())).collect()
    }

    pub fn disabled_collisions(&self) -> &[(String, String)] {
        &self.disabled_collisions
    }

    pub fn add_disabled_collision(&mut self, link1: &str, link2: &str) -> Result<(), ParameterError> {
        for link in [link1, link2] {
            if self.link(link).is_none() {
                return Err(ParameterError::UnknownName { kind: "link", name: link.to_string() });
            }
        }
        self.disabled_collisions.push((link1.to_string(), link2.to_string()));
        Ok(())
    }

    pub fn groups(&self) -> &[JointGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&JointGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Add a group from the list of joint names. Fixed joints are skipped.
    pub fn add_group(&mut self, name: &str, joint_names: &[String],
                     base_link: Option<String>, tip_link: Option<String>) -> Result<(), ParameterError> {
        if self.group(name).is_some() {
            return Err(ParameterError::DuplicateName { kind: "group", name: name.to_string() });
        }
        let mut joints = Vec::new();
        let mut variable_indices = Vec::new();
        let mut limits = Vec::new();
        for joint_name in joint_names {
            let j = *self.joint_index.get(joint_name).ok_or_else(||
                ParameterError::UnknownName { kind: "joint", name: joint_name.clone() })?;
            if let Some(v) = self.variable_of_joint[j] {
                joints.push(joint_name.clone());
                variable_indices.push(v);
                limits.push(self.joints[j].limits);
            }
        }
        if joints.is_empty() {
            return Err(ParameterError::KinematicsConfigurationError(
                format!("group '{}' has no active joints", name)));
        }
        self.groups.push(JointGroup {
            name: name.to_string(),
            joints,
            variable_indices,
            constraints: Constraints::new(limits),
            base_link,
            tip_link,
            solver: None,
        });
        Ok(())
    }

    /// Add a group spanning the serial chain from base link to tip link.
    pub fn add_chain_group(&mut self, name: &str, base_link: &str, tip_link: &str) -> Result<(), ParameterError> {
        let joints = self.chain_joints(base_link, tip_link)?;
        self.add_group(name, &joints, Some(base_link.to_string()), Some(tip_link.to_string()))
    }

    /// Names of joints from base link down to tip link. The base must be an ancestor of the tip.
    pub fn chain_joints(&self, base_link: &str, tip_link: &str) -> Result<Vec<String>, ParameterError> {
        let base = self.link_index(base_link).ok_or_else(||
            ParameterError::UnknownName { kind: "link", name: base_link.to_string() })?;
        let mut current = self.link_index(tip_link).ok_or_else(||
            ParameterError::UnknownName { kind: "link", name: tip_link.to_string() })?;

        let mut chain = Vec::new();
        while current != base {
            let joint = self.joints.iter()
                .find(|j| self.link_index[&j.child] == current)
                .ok_or_else(|| ParameterError::KinematicsConfigurationError(
                    format!("'{}' is not an ancestor of '{}'", base_link, tip_link)))?;
            chain.push(joint.name.clone());
            current = self.link_index[&joint.parent];
        }
        chain.reverse();
        Ok(chain)
    }

    /// Attach the kinematics solver to the named group. The solver must work with
    /// as many joints as the group has.
    pub fn set_group_solver(&mut self, group_name: &str, solver: Arc<dyn KinematicsSolver>) -> Result<(), ParameterError> {
        let group = self.groups.iter_mut().find(|g| g.name == group_name).ok_or_else(||
            ParameterError::UnknownName { kind: "group", name: group_name.to_string() })?;
        if solver.dof() != group.dof() {
            return Err(ParameterError::InvalidLength {
                field: format!("solver joints of group '{}'", group_name),
                expected: group.dof(),
                found: solver.dof(),
            });
        }
        group.solver = Some(solver);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(name: &str) -> Link {
        Link { name: name.to_string(), collision: vec![] }
    }

    fn joint(name: &str, joint_type: JointType, parent: &str, child: &str, z: f64) -> Joint {
        Joint {
            name: name.to_string(),
            joint_type,
            parent: parent.to_string(),
            child: child.to_string(),
            origin: Isometry3::translation(0.0, 0.0, z),
            axis: Vector3::z_axis(),
            limits: JointLimits::new(-1.0, 1.0),
        }
    }

    fn two_link_model() -> RobotModel {
        RobotModel::new("test",
                        vec![link("base"), link("a"), link("b")],
                        vec![
                            joint("j1", JointType::Revolute, "base", "a", 1.0),
                            joint("j2", JointType::Prismatic, "a", "b", 0.5),
                        ]).expect("valid model")
    }

    #[test]
    fn test_link_transforms_follow_joints() {
        let model = two_link_model();
        let transforms = model.compute_link_transforms(&[std::f64::consts::FRAC_PI_2, 0.25]);
        let b = transforms[model.link_index("b").unwrap()];
        assert!((b.translation.vector - Vector3::new(0.0, 0.0, 1.75)).norm() < 1e-12);
        let a = transforms[model.link_index("a").unwrap()];
        assert!((a.rotation.angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let result = RobotModel::new("bad", vec![link("base")],
                                     vec![joint("j", JointType::Fixed, "nowhere", "base", 0.0)]);
        assert!(matches!(result, Err(ParameterError::UnknownName { .. })));
    }

    #[test]
    fn test_multiple_roots_rejected() {
        let result = RobotModel::new("bad", vec![link("a"), link("b")], vec![]);
        assert!(matches!(result, Err(ParameterError::MalformedTree(_))));
    }

    #[test]
    fn test_cycle_rejected() {
        let result = RobotModel::new("bad",
                                     vec![link("root"), link("a"), link("b")],
                                     vec![
                                         joint("j1", JointType::Fixed, "a", "b", 0.0),
                                         joint("j2", JointType::Fixed, "b", "a", 0.0),
                                     ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_chain_group() {
        let mut model = two_link_model();
        model.add_chain_group("arm", "base", "b").unwrap();
        let group = model.group("arm").unwrap();
        assert_eq!(group.joints, vec!["j1", "j2"]);
        assert_eq!(group.variable_indices, vec![0, 1]);
        assert!(model.add_chain_group("reverse", "b", "base").is_err());
    }

    #[test]
    fn test_default_positions_clamped() {
        let mut j = joint("j", JointType::Revolute, "base", "a", 0.0);
        j.limits = JointLimits::new(0.5, 1.0);
        let model = RobotModel::new("clamped", vec![link("base"), link("a")], vec![j]).unwrap();
        assert_eq!(model.default_positions(), vec![0.5]);
    }
}
