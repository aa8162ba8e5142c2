//! Reads the robot model from URDF: links with their collision geometry and joints
//! with origins, axes and limits.

extern crate sxd_document;

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use regex::Regex;
use sxd_document::{dom, parser};
use tracing::warn;

use crate::constraints::JointLimits;
use crate::parameter_error::ParameterError;
use crate::robot_model::{Joint, JointType, Link, LinkGeometry, LinkShape, RobotModel};

impl RobotModel {
    /// Parse the robot model from URDF content.
    ///
    /// # Example
    /// ```
    /// use rs_kinematics_adapter::robot_model::RobotModel;
    /// let urdf = r#"
    ///   <robot name="pendulum">
    ///     <link name="base"/>
    ///     <link name="arm"/>
    ///     <joint name="swing" type="revolute">
    ///       <parent link="base"/>
    ///       <child link="arm"/>
    ///       <origin xyz="0 0 1" rpy="0 0 0"/>
    ///       <axis xyz="0 1 0"/>
    ///       <limit lower="${radians(-90)}" upper="${radians(90)}"/>
    ///     </joint>
    ///   </robot>"#;
    /// let model = RobotModel::from_urdf(urdf).expect("valid URDF");
    /// assert_eq!(model.variable_names(), vec!["swing"]);
    /// ```
    pub fn from_urdf(xml_content: &str) -> Result<RobotModel, ParameterError> {
        let package = parser::parse(xml_content)
            .map_err(|e| ParameterError::XmlProcessingError(format!("Failed to parse URDF: {}", e)))?;
        let document = package.as_document();

        let robot = document.root().children().into_iter()
            .find_map(|e| e.element())
            .ok_or_else(|| ParameterError::XmlProcessingError("No root element found".into()))?;
        if robot.name().local_part() != "robot" {
            return Err(ParameterError::XmlProcessingError(
                format!("Root element is <{}>, expected <robot>", robot.name().local_part())));
        }
        let robot_name = robot.attribute("name").map(|a| a.value()).unwrap_or("robot");

        let mut links = Vec::new();
        let mut joints = Vec::new();
        for element in elements(robot) {
            match element.name().local_part() {
                "link" => links.push(parse_link(element)?),
                "joint" => joints.push(parse_joint(element)?),
                _ => {}
            }
        }
        RobotModel::new(robot_name, links, joints)
    }

    #[cfg(feature = "allow_filesystem")]
    pub fn from_urdf_file<P: AsRef<std::path::Path>>(path: P) -> Result<RobotModel, ParameterError> {
        let xml_content = std::fs::read_to_string(path)?;
        Self::from_urdf(&xml_content)
    }
}

pub(crate) fn elements<'d>(element: dom::Element<'d>) -> impl Iterator<Item=dom::Element<'d>> {
    element.children().into_iter().filter_map(|e| e.element())
}

pub(crate) fn child<'d>(element: dom::Element<'d>, name: &str) -> Option<dom::Element<'d>> {
    elements(element).find(|e| e.name().local_part() == name)
}

pub(crate) fn required_attribute<'d>(element: dom::Element<'d>, name: &str) -> Result<&'d str, ParameterError> {
    element.attribute(name)
        .map(|a| a.value())
        .ok_or_else(|| ParameterError::MissingField(
            format!("'{}' attribute of <{}>", name, element.name().local_part())))
}

fn parse_link(element: dom::Element) -> Result<Link, ParameterError> {
    let name = required_attribute(element, "name")?.to_string();
    let mut collision = Vec::new();
    for collision_element in elements(element).filter(|e| e.name().local_part() == "collision") {
        let origin = child(collision_element, "origin").map(parse_origin).transpose()?
            .unwrap_or_else(Isometry3::identity);
        let geometry = child(collision_element, "geometry")
            .and_then(|g| elements(g).next())
            .ok_or_else(|| ParameterError::MissingField(format!("geometry of link '{}'", name)))?;
        let shape = match geometry.name().local_part() {
            "box" => {
                let size = parse_vector(required_attribute(geometry, "size")?)?;
                LinkShape::Box { size }
            }
            "sphere" => LinkShape::Sphere {
                radius: parse_number(required_attribute(geometry, "radius")?)?,
            },
            "cylinder" => LinkShape::Cylinder {
                radius: parse_number(required_attribute(geometry, "radius")?)?,
                length: parse_number(required_attribute(geometry, "length")?)?,
            },
            other => {
                warn!("Link '{}': collision geometry <{}> is not supported, skipped", name, other);
                continue;
            }
        };
        if !shape.is_sane() {
            return Err(ParameterError::InvalidValue {
                field: format!("collision geometry of link '{}'", name),
                value: format!("{:?}", shape),
            });
        }
        collision.push(LinkGeometry { origin, shape });
    }
    Ok(Link { name, collision })
}

fn parse_joint(element: dom::Element) -> Result<Joint, ParameterError> {
    let name = required_attribute(element, "name")?.to_string();
    let joint_type = match required_attribute(element, "type")? {
        "revolute" => JointType::Revolute,
        "continuous" => JointType::Continuous,
        "prismatic" => JointType::Prismatic,
        "fixed" => JointType::Fixed,
        other => return Err(ParameterError::InvalidValue {
            field: format!("type of joint '{}'", name),
            value: other.to_string(),
        }),
    };

    let link_of = |tag: &str| -> Result<String, ParameterError> {
        let e = child(element, tag).ok_or_else(||
            ParameterError::MissingField(format!("<{}> of joint '{}'", tag, name)))?;
        Ok(required_attribute(e, "link")?.to_string())
    };
    let parent = link_of("parent")?;
    let child_link = link_of("child")?;

    let origin = child(element, "origin").map(parse_origin).transpose()?
        .unwrap_or_else(Isometry3::identity);

    let axis = match child(element, "axis") {
        Some(axis) => parse_vector(required_attribute(axis, "xyz")?)?,
        None => Vector3::x(),
    };
    if joint_type.is_active() && !(axis.norm() > 0.0) {
        return Err(ParameterError::InvalidValue { field: format!("axis of joint '{}'", name), value: format!("{:?}", axis) });
    }
    let axis = if axis.norm() > 0.0 { Unit::new_normalize(axis) } else { Vector3::x_axis() };

    let limits = match joint_type {
        JointType::Revolute | JointType::Prismatic => {
            let limit = child(element, "limit").ok_or_else(||
                ParameterError::MissingField(format!("<limit> of joint '{}'", name)))?;
            let (lower, upper) = get_limits(limit)?;
            if lower > upper {
                return Err(ParameterError::InvalidValue {
                    field: format!("limits of joint '{}'", name),
                    value: format!("{} > {}", lower, upper),
                });
            }
            JointLimits::new(lower, upper)
        }
        JointType::Continuous | JointType::Fixed => JointLimits::UNBOUNDED,
    };

    Ok(Joint { name, joint_type, parent, child: child_link, origin, axis, limits })
}

fn parse_origin(element: dom::Element) -> Result<Isometry3<f64>, ParameterError> {
    let xyz = element.attribute("xyz").map(|a| parse_vector(a.value())).transpose()?
        .unwrap_or_else(Vector3::zeros);
    let rpy = element.attribute("rpy").map(|a| parse_vector(a.value())).transpose()?
        .unwrap_or_else(Vector3::zeros);
    Ok(Isometry3::from_parts(
        Translation3::from(xyz),
        UnitQuaternion::from_euler_angles(rpy.x, rpy.y, rpy.z),
    ))
}

/// Three whitespace separated values, each possibly in `${radians(..)}` form.
fn parse_vector(value: &str) -> Result<Vector3<f64>, ParameterError> {
    let values: Vec<f64> = value.split_whitespace()
        .map(parse_angle)
        .collect::<Result<_, _>>()?;
    if values.len() != 3 {
        return Err(ParameterError::InvalidLength { field: format!("'{}'", value), expected: 3, found: values.len() });
    }
    Ok(Vector3::new(values[0], values[1], values[2]))
}

fn parse_number(value: &str) -> Result<f64, ParameterError> {
    value.trim().parse()
        .map_err(|_| ParameterError::ParseError(format!("'{}' is not a number", value)))
}

fn parse_angle(attr_value: &str) -> Result<f64, ParameterError> {
    // Regular expression to match the ${radians(<number>)} format that is common in xacro
    let re = Regex::new(r"^\$\{radians\((-?\d+(\.\d+)?)\)\}$")
        .map_err(|_| ParameterError::ParseError("Invalid regex pattern".to_string()))?;

    // Check if the input matches the special format
    if let Some(caps) = re.captures(attr_value) {
        let degrees_str = caps.get(1)
            .ok_or(ParameterError::WrongAngle(format!("Bad representation: {}", attr_value)))?.as_str();
        let degrees: f64 = degrees_str.parse()
            .map_err(|_| ParameterError::WrongAngle(attr_value.to_string()))?;
        Ok(degrees.to_radians())
    } else {
        // Try to parse the input as a plain number in that case it is in radians
        let radians: f64 = attr_value.parse()
            .map_err(|_| ParameterError::WrongAngle(attr_value.to_string()))?;
        Ok(radians)
    }
}

fn get_limits(element: dom::Element) -> Result<(f64, f64), ParameterError> {
    let lower_limit = parse_angle(required_attribute(element, "lower")?)?;
    let upper_limit = parse_angle(required_attribute(element, "upper")?)?;
    Ok((lower_limit, upper_limit))
}
