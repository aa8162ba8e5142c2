//! Supports reading the adapter configuration, including OPW parameters, from YAML.

use regex::Regex;
use yaml_rust2::{Yaml, YamlLoader};

use crate::adapter_config::{AdapterConfig, CollisionConfig, IkFrameComposition, KinematicsConfig, SolverConfig, SolverKind};
use crate::collisions::CollisionChecks;
use crate::parameter_error::ParameterError;
use crate::parameters::opw_kinematics::Parameters;

impl AdapterConfig {
    /// Read the adapter configuration from YAML. Every key is optional and defaults as
    /// in [`AdapterConfig::default`]:
    /// ```yaml
    /// solver_base_frame: base_link
    /// solver_tool_frame: tool0
    /// ik_frame_composition: full        # or passthrough
    /// joint_limit_margin: 0.0
    /// collision:
    ///   checks: [self, world]
    ///   octomap_link: "<octomap>"
    ///   arm_links: [link_2, link_3]
    ///   robot_links: [tower_link, camera_box]
    ///   exclude_links_from_octomap: true
    /// kinematics:
    ///   manipulator:
    ///     solver: opw
    ///     base_frame: base_link
    ///     tip_frame: tool0
    ///     opw_kinematics_geometric_parameters:
    ///       a1: 0.1
    ///       a2: -0.135
    ///       b: 0.0
    ///       c1: 0.615
    ///       c2: 0.705
    ///       c3: 0.755
    ///       c4: 0.085
    ///     opw_kinematics_joint_offsets: [0.0, 0.0, deg(-90.0), 0.0, 0.0, 0.0]
    ///     opw_kinematics_joint_sign_corrections: [1, 1, 1, 1, 1, 1]
    /// ```
    /// Instead of the geometric parameters, `preset: irb2400_10` may name a known robot.
    /// Offsets and sign corrections are optional. Angles accept the `deg(angle)` form.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ParameterError> {
        let docs = YamlLoader::load_from_str(contents)
            .map_err(|e| ParameterError::ParseError(e.to_string()))?;
        let doc = match docs.first() {
            Some(doc) => doc,
            None => return Ok(AdapterConfig::default()),
        };
        if !doc.is_null() && doc.as_hash().is_none() {
            return Err(ParameterError::ParseError("configuration must be a mapping".into()));
        }

        let mut config = AdapterConfig::default();
        if let Some(frame) = optional_string(doc, "solver_base_frame")? {
            config.solver_base_frame = frame;
        }
        if let Some(frame) = optional_string(doc, "solver_tool_frame")? {
            config.solver_tool_frame = frame;
        }
        if let Some(composition) = optional_string(doc, "ik_frame_composition")? {
            config.ik_frame_composition = match composition.as_str() {
                "full" => IkFrameComposition::Full,
                "passthrough" => IkFrameComposition::Passthrough,
                other => return Err(ParameterError::InvalidValue {
                    field: "ik_frame_composition".into(),
                    value: other.to_string(),
                }),
            };
        }
        if present(&doc["joint_limit_margin"]) {
            let margin = number(&doc["joint_limit_margin"], "joint_limit_margin")?;
            if margin < 0.0 {
                return Err(ParameterError::InvalidValue { field: "joint_limit_margin".into(), value: margin.to_string() });
            }
            config.joint_limit_margin = margin;
        }
        if present(&doc["collision"]) {
            config.collision = collision_config(&doc["collision"])?;
        }
        if present(&doc["kinematics"]) {
            config.kinematics = kinematics_config(&doc["kinematics"])?;
        }
        Ok(config)
    }

    #[cfg(feature = "allow_filesystem")]
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}

impl Parameters {
    /// Read OPW parameters from the YAML node holding `opw_kinematics_geometric_parameters`,
    /// optional `opw_kinematics_joint_offsets` and `opw_kinematics_joint_sign_corrections`.
    pub fn from_yaml(node: &Yaml) -> Result<Self, ParameterError> {
        let gp = &node["opw_kinematics_geometric_parameters"];
        if !present(gp) {
            return Err(ParameterError::MissingField("opw_kinematics_geometric_parameters".into()));
        }
        let field = |name: &str| -> Result<f64, ParameterError> {
            let value = &gp[name];
            if !present(value) {
                return Err(ParameterError::MissingField(format!("opw_kinematics_geometric_parameters.{}", name)));
            }
            number(value, name)
        };

        let mut parameters = Parameters {
            a1: field("a1")?,
            a2: field("a2")?,
            b: field("b")?,
            c1: field("c1")?,
            c2: field("c2")?,
            c3: field("c3")?,
            c4: field("c4")?,
            ..Parameters::default()
        };

        let offsets = &node["opw_kinematics_joint_offsets"];
        if present(offsets) {
            let values = number_list(offsets, "opw_kinematics_joint_offsets")?;
            parameters.offsets = to_six(values, "opw_kinematics_joint_offsets")?;
        }

        let signs = &node["opw_kinematics_joint_sign_corrections"];
        if present(signs) {
            let values = number_list(signs, "opw_kinematics_joint_sign_corrections")?;
            let values = to_six(values, "opw_kinematics_joint_sign_corrections")?;
            for (i, &v) in values.iter().enumerate() {
                if v != 1.0 && v != -1.0 {
                    return Err(ParameterError::InvalidValue {
                        field: format!("opw_kinematics_joint_sign_corrections[{}]", i),
                        value: v.to_string(),
                    });
                }
                parameters.sign_corrections[i] = v as i8;
            }
        }
        Ok(parameters)
    }
}

fn present(value: &Yaml) -> bool {
    !value.is_badvalue() && !value.is_null()
}

fn optional_string(node: &Yaml, key: &str) -> Result<Option<String>, ParameterError> {
    let value = &node[key];
    if !present(value) {
        return Ok(None);
    }
    value.as_str()
        .map(|s| Some(s.to_string()))
        .ok_or_else(|| ParameterError::InvalidValue { field: key.into(), value: format!("{:?}", value) })
}

fn optional_bool(node: &Yaml, key: &str) -> Result<Option<bool>, ParameterError> {
    let value = &node[key];
    if !present(value) {
        return Ok(None);
    }
    value.as_bool()
        .map(Some)
        .ok_or_else(|| ParameterError::InvalidValue { field: key.into(), value: format!("{:?}", value) })
}

fn string_list(value: &Yaml, field: &str) -> Result<Vec<String>, ParameterError> {
    let items = value.as_vec().ok_or_else(||
        ParameterError::InvalidValue { field: field.into(), value: format!("{:?}", value) })?;
    items.iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(||
            ParameterError::InvalidValue { field: field.into(), value: format!("{:?}", item) }))
        .collect()
}

/// Number as integer, real or `deg(angle)`; must be finite.
fn number(value: &Yaml, field: &str) -> Result<f64, ParameterError> {
    let parsed = match value {
        Yaml::Real(_) => value.as_f64(),
        Yaml::Integer(i) => Some(*i as f64),
        Yaml::String(s) => parse_deg(s)?,
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(ParameterError::InvalidValue { field: field.into(), value: format!("{:?}", value) }),
    }
}

fn number_list(value: &Yaml, field: &str) -> Result<Vec<f64>, ParameterError> {
    let items = value.as_vec().ok_or_else(||
        ParameterError::InvalidValue { field: field.into(), value: format!("{:?}", value) })?;
    items.iter().map(|item| number(item, field)).collect()
}

fn to_six(values: Vec<f64>, field: &str) -> Result<[f64; 6], ParameterError> {
    let found = values.len();
    <[f64; 6]>::try_from(values)
        .map_err(|_| ParameterError::InvalidLength { field: field.into(), expected: 6, found })
}

/// Parse `deg(angle)` into radians. Returns None if the string is not in this form.
fn parse_deg(value: &str) -> Result<Option<f64>, ParameterError> {
    let re = Regex::new(r"^\s*deg\(\s*(-?\d+(\.\d+)?)\s*\)\s*$")
        .map_err(|_| ParameterError::ParseError("Invalid regex pattern".to_string()))?;
    match re.captures(value).and_then(|caps| caps.get(1)) {
        Some(degrees) => {
            let degrees: f64 = degrees.as_str().parse()
                .map_err(|_| ParameterError::WrongAngle(value.to_string()))?;
            Ok(Some(degrees.to_radians()))
        }
        None => Ok(None),
    }
}

fn collision_config(node: &Yaml) -> Result<CollisionConfig, ParameterError> {
    let mut config = CollisionConfig::default();
    if present(&node["checks"]) {
        let mut checks = CollisionChecks::empty();
        for check in string_list(&node["checks"], "collision.checks")? {
            checks |= match check.as_str() {
                "self" => CollisionChecks::SELF,
                "world" => CollisionChecks::WORLD,
                other => return Err(ParameterError::InvalidValue {
                    field: "collision.checks".into(),
                    value: other.to_string(),
                }),
            };
        }
        config.checks = checks;
    }
    if let Some(link) = optional_string(node, "octomap_link")? {
        config.octomap_link = link;
    }
    if present(&node["arm_links"]) {
        config.arm_links = string_list(&node["arm_links"], "collision.arm_links")?;
    }
    if present(&node["robot_links"]) {
        config.robot_links = string_list(&node["robot_links"], "collision.robot_links")?;
    }
    if let Some(exclude) = optional_bool(node, "exclude_links_from_octomap")? {
        config.exclude_links_from_octomap = exclude;
    }
    Ok(config)
}

fn kinematics_config(node: &Yaml) -> Result<KinematicsConfig, ParameterError> {
    let groups = node.as_hash().ok_or_else(||
        ParameterError::InvalidValue { field: "kinematics".into(), value: format!("{:?}", node) })?;
    let mut config = KinematicsConfig::default();
    for (name, group) in groups {
        let name = name.as_str().ok_or_else(||
            ParameterError::InvalidValue { field: "kinematics group name".into(), value: format!("{:?}", name) })?;
        let solver = optional_string(group, "solver")?
            .ok_or_else(|| ParameterError::MissingField(format!("kinematics.{}.solver", name)))?;
        let kind = match solver.as_str() {
            "opw" => {
                let parameters = match optional_string(group, "preset")? {
                    Some(preset) => Parameters::preset(&preset).ok_or_else(||
                        ParameterError::UnknownName { kind: "OPW preset", name: preset.clone() })?,
                    None => Parameters::from_yaml(group)?,
                };
                SolverKind::Opw(parameters)
            }
            other => return Err(ParameterError::UnknownName { kind: "solver", name: other.to_string() }),
        };
        config.groups.push((name.to_string(), SolverConfig {
            solver: kind,
            base_frame: optional_string(group, "base_frame")?,
            tip_frame: optional_string(group, "tip_frame")?,
        }));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;
    use super::*;

    #[test]
    fn test_empty_gives_defaults() {
        let config = AdapterConfig::from_yaml_str("").unwrap();
        assert_eq!(config, AdapterConfig::default());
        assert_eq!(config.solver_base_frame, "base_link");
        assert_eq!(config.solver_tool_frame, "end_effector_link");
        assert_eq!(config.collision.octomap_link, "<octomap>");
    }

    #[test]
    fn test_full_configuration() {
        let config = AdapterConfig::from_yaml_str(r#"
solver_base_frame: base_link
solver_tool_frame: tool0
ik_frame_composition: passthrough
joint_limit_margin: 0.01
collision:
  checks: [world]
  arm_links: [link_2]
  robot_links: []
  exclude_links_from_octomap: false
kinematics:
  manipulator:
    solver: opw
    tip_frame: tool0
    opw_kinematics_geometric_parameters:
      a1: 0.1
      a2: -0.135
      b: 0
      c1: 0.615
      c2: 0.705
      c3: 0.755
      c4: 0.085
    opw_kinematics_joint_offsets: [0, 0, deg(-90), 0, 0, 0]
    opw_kinematics_joint_sign_corrections: [1, 1, -1, 1, 1, 1]
"#).unwrap();
        assert_eq!(config.solver_tool_frame, "tool0");
        assert_eq!(config.ik_frame_composition, IkFrameComposition::Passthrough);
        assert_eq!(config.joint_limit_margin, 0.01);
        assert_eq!(config.collision.checks, CollisionChecks::WORLD);
        assert_eq!(config.collision.arm_links, vec!["link_2"]);
        assert!(config.collision.robot_links.is_empty());
        assert!(!config.collision.exclude_links_from_octomap);

        let (group, solver) = &config.kinematics.groups[0];
        assert_eq!(group, "manipulator");
        assert_eq!(solver.tip_frame.as_deref(), Some("tool0"));
        assert_eq!(solver.base_frame, None);
        let SolverKind::Opw(p) = &solver.solver;
        assert_eq!(p.b, 0.0);
        assert!((p.offsets[2] + PI / 2.0).abs() < 1e-12);
        assert_eq!(p.sign_corrections, [1, 1, -1, 1, 1, 1]);
    }

    #[test]
    fn test_preset() {
        let config = AdapterConfig::from_yaml_str("kinematics:\n  arm:\n    solver: opw\n    preset: irb2400_10\n").unwrap();
        assert_eq!(config.kinematics.groups[0].1.solver, SolverKind::Opw(Parameters::irb2400_10()));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(AdapterConfig::from_yaml_str("ik_frame_composition: sideways"),
            Err(ParameterError::InvalidValue { .. })));
        assert!(matches!(AdapterConfig::from_yaml_str("collision:\n  checks: [everything]"),
            Err(ParameterError::InvalidValue { .. })));
        assert!(matches!(AdapterConfig::from_yaml_str("kinematics:\n  arm:\n    solver: magic"),
            Err(ParameterError::UnknownName { .. })));
        assert!(matches!(AdapterConfig::from_yaml_str("kinematics:\n  arm:\n    solver: opw"),
            Err(ParameterError::MissingField(_))));
        assert!(matches!(AdapterConfig::from_yaml_str("joint_limit_margin: .nan"),
            Err(ParameterError::InvalidValue { .. })));
        assert!(matches!(AdapterConfig::from_yaml_str("key: [unclosed"),
            Err(ParameterError::ParseError(_))));
        assert!(matches!(AdapterConfig::from_yaml_str("- a\n- b\n"),
            Err(ParameterError::ParseError(_))));
    }

    #[test]
    fn test_wrong_offsets_length() {
        let yaml = r#"
opw_kinematics_geometric_parameters: {a1: 0, a2: 0, b: 0, c1: 1, c2: 1, c3: 1, c4: 0.1}
opw_kinematics_joint_offsets: [0, 0, 0]
"#;
        let docs = YamlLoader::load_from_str(yaml).unwrap();
        assert!(matches!(Parameters::from_yaml(&docs[0]),
            Err(ParameterError::InvalidLength { expected: 6, found: 3, .. })));
    }

    #[test]
    fn test_yaml_rendering_is_readable() {
        let original = Parameters::kuka_kr6_r700_sixx();
        let docs = YamlLoader::load_from_str(&original.to_yaml()).unwrap();
        let parsed = Parameters::from_yaml(&docs[0]).unwrap();
        assert_eq!(parsed.sign_corrections, original.sign_corrections);
        for (a, b) in parsed.offsets.iter().zip(original.offsets.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
