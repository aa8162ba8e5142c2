//! Reads planning groups and disabled collision pairs from SRDF.

use sxd_document::parser;

use crate::parameter_error::ParameterError;
use crate::robot_model::RobotModel;
use crate::urdf::{child, elements, required_attribute};

impl RobotModel {
    /// Add groups and disabled collisions from SRDF content. Groups are either a `<chain>`
    /// from base link to tip link or a list of `<joint>` elements. Unknown names are errors.
    pub fn load_srdf(&mut self, xml_content: &str) -> Result<(), ParameterError> {
        let package = parser::parse(xml_content)
            .map_err(|e| ParameterError::XmlProcessingError(format!("Failed to parse SRDF: {}", e)))?;
        let document = package.as_document();
        let robot = document.root().children().into_iter()
            .find_map(|e| e.element())
            .ok_or_else(|| ParameterError::XmlProcessingError("No root element found".into()))?;

        for element in elements(robot) {
            match element.name().local_part() {
                "group" => {
                    let name = required_attribute(element, "name")?;
                    if let Some(chain) = child(element, "chain") {
                        let base = required_attribute(chain, "base_link")?;
                        let tip = required_attribute(chain, "tip_link")?;
                        self.add_chain_group(name, base, tip)?;
                    } else {
                        let joints = elements(element)
                            .filter(|e| e.name().local_part() == "joint")
                            .map(|e| required_attribute(e, "name").map(str::to_string))
                            .collect::<Result<Vec<_>, _>>()?;
                        self.add_group(name, &joints, None, None)?;
                    }
                }
                "disable_collisions" => {
                    let link1 = required_attribute(element, "link1")?;
                    let link2 = required_attribute(element, "link2")?;
                    self.add_disabled_collision(link1, link2)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    #[cfg(feature = "allow_filesystem")]
    pub fn load_srdf_file<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<(), ParameterError> {
        let xml_content = std::fs::read_to_string(path)?;
        self.load_srdf(&xml_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URDF: &str = r#"
        <robot name="r">
          <link name="base"/><link name="a"/><link name="b"/><link name="tip"/>
          <joint name="j1" type="continuous"><parent link="base"/><child link="a"/></joint>
          <joint name="j2" type="revolute"><parent link="a"/><child link="b"/>
            <limit lower="-1" upper="1"/></joint>
          <joint name="j3" type="fixed"><parent link="b"/><child link="tip"/></joint>
        </robot>"#;

    #[test]
    fn test_chain_and_joint_groups() {
        let mut model = RobotModel::from_urdf(URDF).unwrap();
        model.load_srdf(r#"
            <robot name="r">
              <group name="arm"><chain base_link="base" tip_link="tip"/></group>
              <group name="wrist"><joint name="j2"/><joint name="j3"/></group>
              <disable_collisions link1="base" link2="b" reason="Never"/>
            </robot>"#).unwrap();

        let arm = model.group("arm").unwrap();
        assert_eq!(arm.joints, vec!["j1", "j2"]);
        assert_eq!(arm.tip_link.as_deref(), Some("tip"));
        assert_eq!(model.group("wrist").unwrap().joints, vec!["j2"]);
        assert_eq!(model.disabled_collisions(), &[("base".to_string(), "b".to_string())]);
    }

    #[test]
    fn test_unknown_names_rejected() {
        let mut model = RobotModel::from_urdf(URDF).unwrap();
        assert!(model.load_srdf(r#"<robot><group name="g"><joint name="nope"/></group></robot>"#).is_err());
        assert!(model.load_srdf(r#"<robot><group name="g"><chain base_link="base" tip_link="nope"/></group></robot>"#).is_err());
        assert!(model.load_srdf(r#"<robot><disable_collisions link1="base" link2="nope"/></robot>"#).is_err());
    }
}
