//! Implements collision detection between robot links and between robot links and
//! world obstacles, honoring the allowed collision matrix and link exclusion sets.

use std::collections::{BTreeSet, HashMap, HashSet};

use bitflags::bitflags;
use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use parry3d::shape::SharedShape;
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};
use tracing::warn;

use crate::robot_model::{LinkShape, RobotModel};

bitflags! {
    /// Which collision checks participate in validity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CollisionChecks: u8 {
        /// Robot links against each other.
        const SELF = 0b01;
        /// Robot links against world obstacles.
        const WORLD = 0b10;
    }
}

impl Default for CollisionChecks {
    fn default() -> Self {
        CollisionChecks::SELF | CollisionChecks::WORLD
    }
}

fn ordered(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Symmetric relation over names (links or world objects) telling which pairs are exempt
/// from collision checking. An explicit entry for the pair wins. Without one, the pair is
/// allowed if either name has a default entry allowing collisions with everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllowedCollisionMatrix {
    entries: HashMap<(String, String), bool>,
    defaults: HashMap<String, bool>,
}

impl AllowedCollisionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matrix allowing links connected by a joint and pairs disabled in SRDF.
    pub fn from_model(model: &RobotModel) -> Self {
        let mut acm = Self::new();
        for (a, b) in model.adjacent_link_pairs() {
            acm.set_entry(&a, &b, true);
        }
        for (a, b) in model.disabled_collisions() {
            acm.set_entry(a, b, true);
        }
        acm
    }

    pub fn set_entry(&mut self, a: &str, b: &str, allowed: bool) {
        self.entries.insert(ordered(a, b), allowed);
    }

    pub fn entry(&self, a: &str, b: &str) -> Option<bool> {
        self.entries.get(&ordered(a, b)).copied()
    }

    pub fn set_default_entry(&mut self, name: &str, allowed: bool) {
        self.defaults.insert(name.to_string(), allowed);
    }

    pub fn default_entry(&self, name: &str) -> Option<bool> {
        self.defaults.get(name).copied()
    }

    pub fn is_allowed(&self, a: &str, b: &str) -> bool {
        match self.entry(a, b) {
            Some(allowed) => allowed,
            None => self.default_entry(a).unwrap_or(false) || self.default_entry(b).unwrap_or(false),
        }
    }

    /// All names mentioned in entries or default entries, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: BTreeSet<&String> = BTreeSet::new();
        for (a, b) in self.entries.keys() {
            names.insert(a);
            names.insert(b);
        }
        names.extend(self.defaults.keys());
        names.into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.defaults.is_empty()
    }
}

/// World obstacle: one or more shapes with poses in the model root frame.
#[derive(Clone)]
pub struct CollisionObject {
    pub id: String,
    pub shapes: Vec<(SharedShape, Isometry3<f32>)>,
}

impl std::fmt::Debug for CollisionObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionObject")
            .field("id", &self.id)
            .field("shapes", &self.shapes.len())
            .finish()
    }
}

/// Everything collision checking needs besides the robot geometry: the allowed collision
/// matrix, world obstacles and the link exclusion sets. Replaced as a whole when a
/// planning scene arrives.
#[derive(Debug, Clone)]
pub struct CollisionContext {
    pub acm: AllowedCollisionMatrix,
    pub objects: Vec<CollisionObject>,
    pub arm_links: HashSet<String>,
    pub robot_links: HashSet<String>,
    /// Name of the obstacle holding the octomap.
    pub octomap_link: String,
    /// Do not check arm and robot links against the octomap. The sensor sees the robot
    /// itself, so these links always overlap occupied cells.
    pub exclude_links_from_octomap: bool,
    pub checks: CollisionChecks,
}

impl CollisionContext {
    pub fn new(acm: AllowedCollisionMatrix) -> Self {
        CollisionContext {
            acm,
            objects: Vec::new(),
            arm_links: HashSet::new(),
            robot_links: HashSet::new(),
            octomap_link: "<octomap>".to_string(),
            exclude_links_from_octomap: true,
            checks: CollisionChecks::default(),
        }
    }

    pub fn acm(&self) -> &AllowedCollisionMatrix {
        &self.acm
    }

    pub fn object(&self, id: &str) -> Option<&CollisionObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Replace both link exclusion sets.
    pub fn set_collision_links(&mut self, arm_links: &[String], robot_links: &[String]) {
        self.arm_links = arm_links.iter().cloned().collect();
        self.robot_links = robot_links.iter().cloned().collect();
    }

    /// True if this link/object pair is not checked.
    fn skip_world_pair(&self, link: &str, object: &str) -> bool {
        if self.acm.is_allowed(link, object) {
            return true;
        }
        object == self.octomap_link
            && self.exclude_links_from_octomap
            && (self.arm_links.contains(link) || self.robot_links.contains(link))
    }
}

/// Parry shape and its pose relative to the link frame.
pub fn link_shape(shape: &LinkShape, origin: &Isometry3<f64>) -> (SharedShape, Isometry3<f32>) {
    match shape {
        LinkShape::Box { size } => (
            SharedShape::cuboid(size.x as f32 / 2.0, size.y as f32 / 2.0, size.z as f32 / 2.0),
            origin.cast::<f32>(),
        ),
        LinkShape::Sphere { radius } => (SharedShape::ball(*radius as f32), origin.cast::<f32>()),
        LinkShape::Cylinder { radius, length } => {
            // Parry cylinders are along y, URDF ones along z.
            let z_to_y = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::FRAC_PI_2);
            (
                SharedShape::cylinder(*length as f32 / 2.0, *radius as f32),
                (origin * z_to_y).cast::<f32>(),
            )
        }
    }
}

struct LinkBody {
    name: String,
    link_index: usize,
    shapes: Vec<(SharedShape, Isometry3<f32>)>,
}

/// Collision geometry of all robot links that have any.
pub struct RobotBody {
    links: Vec<LinkBody>,
}

/// Struct representing a collision task for detecting collisions
/// between two shapes with given transforms.
struct CollisionTask<'a> {
    name_i: &'a str,
    name_j: &'a str,
    transform_i: Isometry3<f32>,
    transform_j: Isometry3<f32>,
    shape_i: &'a SharedShape,
    shape_j: &'a SharedShape,
}

impl CollisionTask<'_> {
    fn collides(&self) -> bool {
        parry3d::query::intersection_test(
            &self.transform_i, &*self.shape_i.0, &self.transform_j, &*self.shape_j.0)
            .unwrap_or_else(|_| {
                warn!("Intersection of '{}' and '{}' is not supported, assuming no collision",
                    self.name_i, self.name_j);
                false
            })
    }

    fn pair(&self) -> (String, String) {
        ordered(self.name_i, self.name_j)
    }
}

impl RobotBody {
    pub fn from_model(model: &RobotModel) -> Self {
        let links = model.links().iter()
            .filter(|link| !link.collision.is_empty())
            .filter_map(|link| {
                let link_index = model.link_index(&link.name)?;
                Some(LinkBody {
                    name: link.name.clone(),
                    link_index,
                    shapes: link.collision.iter()
                        .map(|geometry| link_shape(&geometry.shape, &geometry.origin))
                        .collect(),
                })
            })
            .collect();
        RobotBody { links }
    }

    /// Colliding pairs for the given root-relative link transforms. Pairs are ordered by
    /// name, sorted and unique. With `first_collision_only`, at most one pair is returned.
    pub fn detect_collisions(&self, link_transforms: &[Isometry3<f64>], context: &CollisionContext,
                             first_collision_only: bool) -> Vec<(String, String)> {
        let poses: Vec<Isometry3<f32>> = self.links.iter()
            .map(|l| link_transforms[l.link_index].cast::<f32>())
            .collect();

        let mut tasks = Vec::new();
        if context.checks.contains(CollisionChecks::SELF) {
            for i in 0..self.links.len() {
                for j in (i + 1)..self.links.len() {
                    let (a, b) = (&self.links[i], &self.links[j]);
                    if context.acm.is_allowed(&a.name, &b.name) {
                        continue;
                    }
                    for (shape_i, local_i) in &a.shapes {
                        for (shape_j, local_j) in &b.shapes {
                            tasks.push(CollisionTask {
                                name_i: &a.name,
                                name_j: &b.name,
                                transform_i: poses[i] * local_i,
                                transform_j: poses[j] * local_j,
                                shape_i,
                                shape_j,
                            });
                        }
                    }
                }
            }
        }

        if context.checks.contains(CollisionChecks::WORLD) {
            for (i, link) in self.links.iter().enumerate() {
                for object in &context.objects {
                    if context.skip_world_pair(&link.name, &object.id) {
                        continue;
                    }
                    for (shape_i, local_i) in &link.shapes {
                        for (shape_j, pose_j) in &object.shapes {
                            tasks.push(CollisionTask {
                                name_i: &link.name,
                                name_j: &object.id,
                                transform_i: poses[i] * local_i,
                                transform_j: *pose_j,
                                shape_i,
                                shape_j,
                            });
                        }
                    }
                }
            }
        }

        Self::process_collision_tasks(tasks, first_collision_only)
    }

    /// Parallel version with Rayon
    fn process_collision_tasks(tasks: Vec<CollisionTask>, first_collision_only: bool) -> Vec<(String, String)> {
        if first_collision_only {
            // Exit as soon as any collision is found
            tasks.par_iter()
                .find_map_any(|task| if task.collides() { Some(task.pair()) } else { None })
                .into_iter()
                .collect()
        } else {
            let found: BTreeSet<(String, String)> = tasks.par_iter()
                .filter_map(|task| if task.collides() { Some(task.pair()) } else { None })
                .collect::<Vec<_>>()
                .into_iter()
                .collect();
            found.into_iter().collect()
        }
    }
}
