#[cfg(test)]
mod tests {
    use crate::adapter_config::{AdapterConfig, SolverKind};
    use crate::collisions::{AllowedCollisionMatrix, CollisionChecks};
    use crate::parameters::opw_kinematics::Parameters;
    use crate::robot_model::RobotModel;
    use crate::tests::test_utils::*;

    const READ_ERROR: &str = "Failed to load test data";

    #[test]
    fn test_generic_arm_model() {
        let model = load_bare_model();
        assert_eq!(model.name(), "generic_arm");
        assert_eq!(model.root_link(), "world");
        assert_eq!(model.variable_names(),
                   vec!["joint_1", "joint_2", "joint_3", "joint_4", "joint_5", "joint_6"]);

        let manipulator = model.group(GROUP).unwrap();
        assert_eq!(manipulator.dof(), 6);
        assert_eq!(manipulator.base_link.as_deref(), Some("base_link"));
        assert_eq!(manipulator.tip_link.as_deref(), Some("tool0"));
        assert!(manipulator.solver.is_none());

        let wrist = model.group("wrist").unwrap();
        assert_eq!(wrist.joints, vec!["joint_4", "joint_5", "joint_6"]);

        let limits = manipulator.constraints.limits[1];
        assert!((limits.lower - (-100.0_f64).to_radians()).abs() < 1e-12);
        assert!((limits.upper - 150.0_f64.to_radians()).abs() < 1e-12);

        // The mesh is skipped, the box stays.
        assert_eq!(model.link("camera_box").unwrap().collision.len(), 1);
        assert!(model.link("link_4").unwrap().collision.is_empty());
    }

    #[test]
    fn test_default_acm() {
        let acm = AllowedCollisionMatrix::from_model(&load_bare_model());
        assert!(acm.is_allowed("link_2", "link_3"));
        assert!(acm.is_allowed("base_link", "tower_link"));
        assert!(acm.is_allowed("tower_link", "link_1"), "disabled in SRDF");
        assert!(acm.is_allowed("camera_box", "base_link"), "disabled in SRDF");
        assert!(!acm.is_allowed("link_3", "tower_link"));
    }

    #[test]
    fn test_adapter_config() {
        let config = load_config();
        assert_eq!(config.solver_base_frame, "base_link");
        assert_eq!(config.solver_tool_frame, "tool0");
        assert_eq!(config.joint_limit_margin, 0.0);
        assert_eq!(config.collision.checks, CollisionChecks::SELF | CollisionChecks::WORLD);
        assert_eq!(config.collision.arm_links, vec!["link_2", "link_3"]);
        assert_eq!(config.collision.robot_links, vec!["tower_link", "camera_box"]);
        assert_eq!(config.collision.octomap_link, "<octomap>");
        assert!(config.collision.exclude_links_from_octomap);

        let expected = Parameters {
            a1: 0.1,
            a2: -0.135,
            b: 0.0,
            c1: 0.615,
            c2: 0.705,
            c3: 0.755,
            c4: 0.085,
            offsets: [0.0; 6],
            sign_corrections: [1; 6],
        };
        assert_eq!(config.kinematics.groups.len(), 1);
        let (group, solver) = &config.kinematics.groups[0];
        assert_eq!(group, GROUP);
        assert_eq!(solver.solver, SolverKind::Opw(expected));
        assert_eq!(solver.base_frame.as_deref(), Some("base_link"));
        assert_eq!(solver.tip_frame.as_deref(), Some("tool0"));
    }

    #[test]
    fn test_kinematics_for_unknown_group() {
        let mut config = load_config();
        config.kinematics.groups[0].0 = "arm".to_string();
        let mut model = load_bare_model();
        assert!(model.configure_kinematics(&config.kinematics).is_err());
    }

    #[test]
    fn test_kinematics_for_unknown_frame() {
        let mut config = load_config();
        config.kinematics.groups[0].1.tip_frame = Some("flange".to_string());
        let mut model = load_bare_model();
        assert!(model.configure_kinematics(&config.kinematics).is_err());
    }

    #[cfg(feature = "allow_filesystem")]
    #[test]
    fn test_load_from_files() {
        let config = AdapterConfig::from_yaml_file("src/tests/data/adapter.yaml").expect(READ_ERROR);
        assert_eq!(config, load_config());

        let mut model = RobotModel::from_urdf_file("src/tests/data/generic_arm.urdf").expect(READ_ERROR);
        model.load_srdf_file("src/tests/data/generic_arm.srdf").expect(READ_ERROR);
        assert_eq!(model.groups().len(), 2);

        assert!(RobotModel::from_urdf_file("src/tests/data/missing.urdf").is_err());
    }
}
