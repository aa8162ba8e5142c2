//! Planning scene as delivered by the environment: allowed collision matrix, collision
//! objects and an optional octomap. A scene is validated completely before anything
//! is applied, so a rejected scene leaves the collision context as it was.

use std::collections::HashSet;
use std::fmt;

use nalgebra::{Isometry3, Point3, Vector3};
use parry3d::shape::SharedShape;

use crate::collisions::{link_shape, AllowedCollisionMatrix, CollisionContext, CollisionObject};
use crate::kinematic_traits::Pose;
use crate::robot_model::{LinkShape, RobotModel};

/// Allowed collision matrix in message form: a square matrix over entry names plus
/// per-name default entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcmMessage {
    pub entry_names: Vec<String>,
    pub entry_values: Vec<Vec<bool>>,
    pub default_entry_names: Vec<String>,
    pub default_entry_values: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolidPrimitive {
    Box { x: f64, y: f64, z: f64 },
    Sphere { radius: f64 },
    /// Axis along z.
    Cylinder { height: f64, radius: f64 },
}

impl SolidPrimitive {
    fn to_link_shape(self) -> LinkShape {
        match self {
            SolidPrimitive::Box { x, y, z } => LinkShape::Box { size: Vector3::new(x, y, z) },
            SolidPrimitive::Sphere { radius } => LinkShape::Sphere { radius },
            SolidPrimitive::Cylinder { height, radius } => LinkShape::Cylinder { radius, length: height },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectOperation {
    Add,
    Remove,
}

/// Collision object. Poses are in the model root frame, primitive poses relative to
/// the object pose.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionObjectMsg {
    pub id: String,
    pub pose: Pose,
    pub primitives: Vec<SolidPrimitive>,
    pub primitive_poses: Vec<Pose>,
    pub operation: ObjectOperation,
}

impl CollisionObjectMsg {
    /// Single primitive at the given pose.
    pub fn add(id: &str, pose: Pose, primitive: SolidPrimitive) -> Self {
        CollisionObjectMsg {
            id: id.to_string(),
            pose,
            primitives: vec![primitive],
            primitive_poses: vec![Pose::identity()],
            operation: ObjectOperation::Add,
        }
    }

    pub fn remove(id: &str) -> Self {
        CollisionObjectMsg {
            id: id.to_string(),
            pose: Pose::identity(),
            primitives: vec![],
            primitive_poses: vec![],
            operation: ObjectOperation::Remove,
        }
    }
}

/// Occupied cells of an octree, as cell centers relative to the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct OctomapMsg {
    pub origin: Pose,
    pub resolution: f64,
    pub occupied: Vec<Point3<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanningSceneWorld {
    pub collision_objects: Vec<CollisionObjectMsg>,
    pub octomap: Option<OctomapMsg>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanningScene {
    pub name: String,
    /// If true, only the provided parts change. Otherwise the scene replaces everything.
    pub is_diff: bool,
    pub allowed_collision_matrix: Option<AcmMessage>,
    pub world: Option<PlanningSceneWorld>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    NotInitialized,
    AcmNotSquare { names: usize, rows: usize, row: Option<(usize, usize)> },
    AcmNotSymmetric(String, String),
    AcmDuplicateName(String),
    DefaultEntriesLength { names: usize, values: usize },
    EmptyObjectId,
    PrimitivePosesMismatch { id: String, primitives: usize, poses: usize },
    InvalidPrimitive(String),
    NonFinitePose(String),
    UnknownObject(String),
    RemoveInFullScene(String),
    InvalidOctomap(String),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SceneError::NotInitialized =>
                write!(f, "Adapter is not initialized"),
            SceneError::AcmNotSquare { names, rows, row } => match row {
                Some((index, length)) =>
                    write!(f, "ACM row {} has {} values, expected {}", index, length, names),
                None => write!(f, "ACM has {} rows for {} names", rows, names),
            },
            SceneError::AcmNotSymmetric(a, b) =>
                write!(f, "ACM is not symmetric for '{}' and '{}'", a, b),
            SceneError::AcmDuplicateName(name) =>
                write!(f, "ACM name '{}' appears more than once", name),
            SceneError::DefaultEntriesLength { names, values } =>
                write!(f, "ACM has {} default entry names but {} values", names, values),
            SceneError::EmptyObjectId =>
                write!(f, "Collision object without id"),
            SceneError::PrimitivePosesMismatch { id, primitives, poses } =>
                write!(f, "Object '{}' has {} primitives but {} poses", id, primitives, poses),
            SceneError::InvalidPrimitive(id) =>
                write!(f, "Object '{}' has a primitive with non positive or non finite dimensions", id),
            SceneError::NonFinitePose(id) =>
                write!(f, "Object '{}' has a non finite pose", id),
            SceneError::UnknownObject(id) =>
                write!(f, "Cannot remove unknown object '{}'", id),
            SceneError::RemoveInFullScene(id) =>
                write!(f, "Remove of '{}' is only valid in a diff scene", id),
            SceneError::InvalidOctomap(msg) =>
                write!(f, "Invalid octomap: {}", msg),
        }
    }
}

impl std::error::Error for SceneError {}

fn pose_is_finite(pose: &Pose) -> bool {
    pose.translation.vector.iter().all(|v| v.is_finite())
        && pose.rotation.coords.iter().all(|v| v.is_finite())
}

impl AcmMessage {
    pub fn validate(&self) -> Result<(), SceneError> {
        let n = self.entry_names.len();
        if self.entry_values.len() != n {
            return Err(SceneError::AcmNotSquare { names: n, rows: self.entry_values.len(), row: None });
        }
        if let Some((index, row)) = self.entry_values.iter().enumerate().find(|(_, row)| row.len() != n) {
            return Err(SceneError::AcmNotSquare { names: n, rows: n, row: Some((index, row.len())) });
        }
        let mut seen = HashSet::new();
        for name in &self.entry_names {
            if !seen.insert(name) {
                return Err(SceneError::AcmDuplicateName(name.clone()));
            }
        }
        for i in 0..n {
            for j in (i + 1)..n {
                if self.entry_values[i][j] != self.entry_values[j][i] {
                    return Err(SceneError::AcmNotSymmetric(
                        self.entry_names[i].clone(), self.entry_names[j].clone()));
                }
            }
        }
        if self.default_entry_names.len() != self.default_entry_values.len() {
            return Err(SceneError::DefaultEntriesLength {
                names: self.default_entry_names.len(),
                values: self.default_entry_values.len(),
            });
        }
        Ok(())
    }

    /// Matrix from the message. Every pair of entry names gets an explicit entry.
    pub fn to_matrix(&self) -> AllowedCollisionMatrix {
        let mut acm = AllowedCollisionMatrix::new();
        for (i, a) in self.entry_names.iter().enumerate() {
            for (j, b) in self.entry_names.iter().enumerate().skip(i + 1) {
                acm.set_entry(a, b, self.entry_values[i][j]);
            }
        }
        for (name, &allowed) in self.default_entry_names.iter().zip(&self.default_entry_values) {
            acm.set_default_entry(name, allowed);
        }
        acm
    }

    /// Message listing every name the matrix mentions. Pairs without an explicit entry
    /// get the value the matrix would report for them.
    pub fn from_matrix(acm: &AllowedCollisionMatrix) -> Self {
        let names = acm.names();
        let entry_values = names.iter()
            .map(|a| names.iter().map(|b| a != b && acm.is_allowed(a, b)).collect())
            .collect();
        let default_entry_names: Vec<String> = names.iter()
            .filter(|n| acm.default_entry(n).is_some())
            .cloned()
            .collect();
        let default_entry_values = default_entry_names.iter()
            .map(|n| acm.default_entry(n).unwrap_or(false))
            .collect();
        AcmMessage { entry_names: names, entry_values, default_entry_names, default_entry_values }
    }
}

impl CollisionObjectMsg {
    fn validate(&self) -> Result<(), SceneError> {
        if self.id.is_empty() {
            return Err(SceneError::EmptyObjectId);
        }
        if self.operation == ObjectOperation::Remove {
            return Ok(());
        }
        if self.primitives.len() != self.primitive_poses.len() {
            return Err(SceneError::PrimitivePosesMismatch {
                id: self.id.clone(),
                primitives: self.primitives.len(),
                poses: self.primitive_poses.len(),
            });
        }
        if !self.primitives.iter().all(|p| p.to_link_shape().is_sane()) {
            return Err(SceneError::InvalidPrimitive(self.id.clone()));
        }
        if !pose_is_finite(&self.pose) || !self.primitive_poses.iter().all(pose_is_finite) {
            return Err(SceneError::NonFinitePose(self.id.clone()));
        }
        Ok(())
    }

    fn to_object(&self) -> CollisionObject {
        CollisionObject {
            id: self.id.clone(),
            shapes: self.primitives.iter()
                .zip(&self.primitive_poses)
                .map(|(primitive, local)| link_shape(&primitive.to_link_shape(), &(self.pose * local)))
                .collect(),
        }
    }
}

impl OctomapMsg {
    fn validate(&self) -> Result<(), SceneError> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(SceneError::InvalidOctomap(format!("resolution {}", self.resolution)));
        }
        if !pose_is_finite(&self.origin) {
            return Err(SceneError::InvalidOctomap("non finite origin".into()));
        }
        if !self.occupied.iter().all(|p| p.coords.iter().all(|v| v.is_finite())) {
            return Err(SceneError::InvalidOctomap("non finite cell".into()));
        }
        Ok(())
    }

    /// Each occupied cell becomes a cube with the side of the resolution.
    fn to_object(&self, id: &str) -> CollisionObject {
        let half = self.resolution as f32 / 2.0;
        let cell = SharedShape::cuboid(half, half, half);
        CollisionObject {
            id: id.to_string(),
            shapes: self.occupied.iter()
                .map(|p| (cell.clone(), (self.origin * Isometry3::translation(p.x, p.y, p.z)).cast::<f32>()))
                .collect(),
        }
    }
}

impl PlanningScene {
    /// Check the whole scene against the current context without changing anything.
    pub fn validate(&self, current: &CollisionContext) -> Result<(), SceneError> {
        if let Some(acm) = &self.allowed_collision_matrix {
            acm.validate()?;
        }
        if let Some(world) = &self.world {
            let mut known: HashSet<&str> = if self.is_diff {
                current.objects.iter().map(|o| o.id.as_str()).collect()
            } else {
                HashSet::new()
            };
            for object in &world.collision_objects {
                object.validate()?;
                match object.operation {
                    ObjectOperation::Add => {
                        known.insert(object.id.as_str());
                    }
                    ObjectOperation::Remove if !self.is_diff =>
                        return Err(SceneError::RemoveInFullScene(object.id.clone())),
                    ObjectOperation::Remove => {
                        if !known.remove(object.id.as_str()) {
                            return Err(SceneError::UnknownObject(object.id.clone()));
                        }
                    }
                }
            }
            if let Some(octomap) = &world.octomap {
                octomap.validate()?;
            }
        }
        Ok(())
    }
}

impl CollisionContext {
    /// New context with the scene applied. Link exclusion sets and check settings carry over.
    /// A full scene without an ACM restores the model default matrix.
    pub fn apply_scene(&self, scene: &PlanningScene, model: &RobotModel) -> Result<CollisionContext, SceneError> {
        scene.validate(self)?;

        let mut next = self.clone();
        match (&scene.allowed_collision_matrix, scene.is_diff) {
            (Some(acm), _) => next.acm = acm.to_matrix(),
            (None, false) => next.acm = AllowedCollisionMatrix::from_model(model),
            (None, true) => {}
        }

        if !scene.is_diff {
            next.objects.clear();
        }
        if let Some(world) = &scene.world {
            for object in &world.collision_objects {
                next.objects.retain(|o| o.id != object.id);
                if object.operation == ObjectOperation::Add {
                    next.objects.push(object.to_object());
                }
            }
            if let Some(octomap) = &world.octomap {
                let id = next.octomap_link.clone();
                next.objects.retain(|o| o.id != id);
                next.objects.push(octomap.to_object(&id));
            }
        }
        Ok(next)
    }
}
