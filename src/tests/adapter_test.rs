#[cfg(test)]
mod tests {
    use nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::adapter_config::{AdapterConfig, IkFrameComposition};
    use crate::adapter_error::AdapterError;
    use crate::kinematic_traits::{Pose, RobotModelAdapter};
    use crate::kinematics_impl::OPWKinematics;
    use crate::opw_state_adapter::OpwStateAdapter;
    use crate::planning_scene::{PlanningScene, SceneError};
    use crate::robot_state::RobotState;
    use crate::tests::test_utils::*;
    use crate::utils::joint_distance;
    use crate::validator::Invalid;

    #[test]
    fn test_initialize_computes_frames() {
        let adapter = initialized_adapter(load_config());
        assert!(adapter.is_initialized());
        assert_eq!(adapter.dof(), 6);

        let frames = adapter.frames().expect("Frames must be computed on initialize");
        let world_to_base = frames.world_to_base().frame();
        assert!((world_to_base.translation.vector - Vector3::new(0.0, 0.0, 0.5)).norm() < 1e-12);
        assert!(world_to_base.rotation.angle() < 1e-12);

        let tool0_to_tip = frames.tool0_to_tip().frame();
        assert!((tool0_to_tip.translation.vector - Vector3::new(0.0, 0.0, -0.1)).norm() < 1e-12);
        assert!(tool0_to_tip.rotation.angle() < 1e-12);
    }

    #[test]
    fn test_fk_matches_model() {
        let adapter = initialized_adapter(load_config());
        let pose = adapter.get_fk(&SAFE_JOINTS).expect("FK of valid joints");

        // The world is the model root here, so the tcp link transform is the expected pose.
        let model = adapter.model().unwrap().clone();
        let mut state = RobotState::new(model.clone());
        state.set_group_positions(model.group(GROUP).unwrap(), &SAFE_JOINTS).unwrap();
        let expected = state.frame_transform(TCP).unwrap();
        assert!(are_isometries_close(&pose, &expected, 1e-9), "{} vs {}", pose, expected);
    }

    #[test]
    fn test_round_trip() {
        let adapter = initialized_adapter(load_config());
        let pose = adapter.get_fk(&SAFE_JOINTS).unwrap();
        let joints = adapter.get_ik(&pose, &SAFE_JOINTS).expect("IK of a reachable pose");
        assert!(are_joints_close(&joints, &SAFE_JOINTS, 1e-6), "{:?}", joints);
    }

    #[test]
    fn test_random_round_trips() {
        let adapter = initialized_adapter(load_config());
        let mut rng = StdRng::seed_from_u64(7);
        let mut checked = 0;
        for _ in 0..200 {
            let joints = vec![
                rng.random_range(-1.5..1.5),
                rng.random_range(-0.5..1.0),
                rng.random_range(-0.5..1.0),
                rng.random_range(-1.5..1.5),
                rng.random_range(0.2..1.5),
                rng.random_range(-1.5..1.5),
            ];
            if !adapter.is_valid(&joints) {
                continue;
            }
            checked += 1;
            let pose = adapter.get_fk(&joints).unwrap();
            let found = adapter.get_ik(&pose, &joints)
                .unwrap_or_else(|| panic!("No IK for {:?}", joints));
            assert!(are_joints_close(&found, &joints, 1e-6), "{:?} vs {:?}", found, joints);
        }
        assert!(checked > 150, "Only {} random configurations were valid", checked);
    }

    #[test]
    fn test_all_ik_solutions_are_valid() {
        let adapter = initialized_adapter(load_config());
        let pose = adapter.get_fk(&SAFE_JOINTS).unwrap();
        let solutions = adapter.get_all_ik(&pose).unwrap();
        assert!(!solutions.is_empty());
        for solution in &solutions {
            assert!(adapter.is_valid(solution), "{:?}", solution);
            let back = adapter.get_fk(solution).unwrap();
            assert!(are_isometries_close(&back, &pose, 1e-6));
        }
    }

    #[test]
    fn test_get_ik_is_closest_of_all_ik() {
        let adapter = initialized_adapter(load_config());
        let pose = adapter.get_fk(&SAFE_JOINTS).unwrap();
        let solutions = adapter.get_all_ik(&pose).unwrap();

        for seed in [[0.0; 6], [3.0, -1.0, 1.0, 2.0, -1.0, -2.0], [-2.0, 1.0, -2.0, 0.0, 1.0, 0.0]] {
            let chosen = adapter.get_ik(&pose, &seed).unwrap();
            let best = solutions.iter()
                .map(|s| joint_distance(s, &seed))
                .fold(f64::MAX, f64::min);
            assert_eq!(joint_distance(&chosen, &seed), best);
            let first_best = solutions.iter().find(|s| joint_distance(s, &seed) == best).unwrap();
            assert_eq!(&chosen, first_best);
        }
    }

    #[test]
    fn test_unreachable_pose() {
        let adapter = initialized_adapter(load_config());
        let pose = Pose::translation(5.0, 5.0, 5.0);
        assert!(adapter.get_all_ik(&pose).is_none());
        assert!(adapter.get_ik(&pose, &SAFE_JOINTS).is_none());
    }

    #[test]
    fn test_nan_is_never_valid() {
        let adapter = initialized_adapter(load_config());
        for joint in 0..6 {
            let mut joints = SAFE_JOINTS;
            joints[joint] = f64::NAN;
            assert!(adapter.has_nan(&joints));
            assert!(!adapter.is_valid(&joints));
            assert_eq!(adapter.check(&joints), Err(Invalid::NaN { joint }));
            assert!(adapter.get_fk(&joints).is_none());
        }
    }

    #[test]
    fn test_limits_and_length() {
        let adapter = initialized_adapter(load_config());
        let mut joints = SAFE_JOINTS;
        joints[0] = 3.05;
        assert!(matches!(adapter.check(&joints), Err(Invalid::OutOfLimits { joint: 0, .. })));
        assert!(adapter.get_fk(&joints).is_none());

        assert_eq!(adapter.check(&SAFE_JOINTS[..5]), Err(Invalid::WrongDof { expected: 6, found: 5 }));
        assert!(adapter.get_fk(&SAFE_JOINTS[..5]).is_none());
    }

    #[test]
    fn test_margin_extends_limits() {
        let mut config = load_config();
        config.joint_limit_margin = 0.1;
        let adapter = initialized_adapter(config);
        let mut joints = SAFE_JOINTS;
        joints[0] = 3.05;
        assert!(adapter.is_valid(&joints));
    }

    #[test]
    fn test_bad_base_frame_fails_initialize() {
        let mut config = load_config();
        config.solver_base_frame = "no_such_link".to_string();
        let model = load_model(&config);
        let mut adapter = OpwStateAdapter::new(config);
        assert_eq!(adapter.initialize(model, GROUP, WORLD, TCP),
                   Err(AdapterError::UnknownFrame("no_such_link".to_string())));
        assert!(!adapter.is_initialized());
        assert!(adapter.get_fk(&SAFE_JOINTS).is_none());
    }

    #[test]
    fn test_initialize_errors() {
        let config = load_config();
        let model = load_model(&config);
        let mut adapter = OpwStateAdapter::new(config);

        assert_eq!(adapter.initialize(model.clone(), "arm", WORLD, TCP),
                   Err(AdapterError::UnknownGroup("arm".to_string())));
        assert_eq!(adapter.initialize(model.clone(), GROUP, "map", TCP),
                   Err(AdapterError::UnknownFrame("map".to_string())));
        assert_eq!(adapter.initialize(model.clone(), GROUP, WORLD, "gripper"),
                   Err(AdapterError::UnknownFrame("gripper".to_string())));
        assert_eq!(adapter.initialize(model.clone(), "wrist", WORLD, TCP),
                   Err(AdapterError::NoSolver("wrist".to_string())));
        assert!(!adapter.is_initialized());

        // Failures leave nothing behind, a good call still works.
        assert!(adapter.initialize(model, GROUP, WORLD, TCP).is_ok());
    }

    #[test]
    fn test_set_state_recomputes_frames() {
        let mut config = load_config();
        // Articulated solver base, so the frame depends on the state.
        config.solver_base_frame = "link_1".to_string();
        let mut adapter = initialized_adapter(config);
        assert!(adapter.frames().unwrap().world_to_base().frame().rotation.angle() < 1e-12);

        let mut state = RobotState::new(adapter.model().unwrap().clone());
        state.set_variable("joint_1", 0.5).unwrap();
        adapter.set_state(state).unwrap();

        let world_to_base = adapter.frames().unwrap().world_to_base().frame();
        assert!((world_to_base.rotation.angle() - 0.5).abs() < 1e-12);
        let axis = world_to_base.rotation.axis().unwrap();
        assert!((axis.into_inner() - Vector3::z()).norm() < 1e-12);
        assert!((world_to_base.translation.vector - Vector3::new(0.0, 0.0, 0.5)).norm() < 1e-12);
        assert_eq!(adapter.state().unwrap().positions()[0], 0.5);
    }

    #[test]
    fn test_set_state_of_other_model_rejected() {
        let config = load_config();
        let mut adapter = initialized_adapter(config.clone());
        let before = *adapter.frames().unwrap();

        let other = load_model(&config);
        let result = adapter.set_state(RobotState::new(other));
        assert!(matches!(result, Err(AdapterError::ModelMismatch { .. })));
        assert_eq!(*adapter.frames().unwrap(), before);
        assert!(adapter.get_fk(&SAFE_JOINTS).is_some());
    }

    #[test]
    fn test_passthrough_feeds_raw_pose() {
        let mut config = load_config();
        config.ik_frame_composition = IkFrameComposition::Passthrough;
        let adapter = initialized_adapter(config);

        // The raw pose is taken as the flange relative to the solver base.
        let group = adapter.model().unwrap().group(GROUP).unwrap();
        let solver = group.solver.as_ref().unwrap();
        let flange = solver.position_fk(solver.tip_frame(), &SAFE_JOINTS).unwrap();
        let joints = adapter.get_ik(&flange, &SAFE_JOINTS).unwrap();
        assert!(are_joints_close(&joints, &SAFE_JOINTS, 1e-6));

        // FK still composes the frames, so the round trip does not hold.
        let world_pose = adapter.get_fk(&SAFE_JOINTS).unwrap();
        let back = adapter.get_ik(&world_pose, &SAFE_JOINTS);
        assert!(back.is_none_or(|j| !are_joints_close(&j, &SAFE_JOINTS, 1e-3)));
    }

    #[test]
    fn test_full_composition_is_default() {
        assert_eq!(AdapterConfig::default().ik_frame_composition, IkFrameComposition::Full);
        assert_eq!(load_config().ik_frame_composition, IkFrameComposition::Full);
    }

    #[test]
    fn test_uninitialized_adapter_fails_everything() {
        let mut adapter = OpwStateAdapter::default();
        assert!(!adapter.is_initialized());
        assert_eq!(adapter.dof(), 0);
        assert!(!adapter.is_valid(&SAFE_JOINTS));
        assert!(adapter.get_fk(&SAFE_JOINTS).is_none());
        assert!(adapter.get_all_ik(&Pose::identity()).is_none());
        assert!(adapter.get_ik(&Pose::identity(), &SAFE_JOINTS).is_none());
        assert!(adapter.frames().is_none());
        assert!(adapter.collision_pairs(&SAFE_JOINTS).is_empty());
        assert_eq!(adapter.update_planning_scene(&PlanningScene::default()), Err(SceneError::NotInitialized));

        let model = load_model(&load_config());
        assert_eq!(adapter.set_state(RobotState::new(model)), Err(AdapterError::NotInitialized));
    }

    #[test]
    fn test_solver_kept_as_configured() {
        let config = load_config();
        let model = load_model(&config);
        let solver = model.group(GROUP).unwrap().solver.clone().unwrap();
        assert_eq!(solver.base_frame(), "base_link");
        assert_eq!(solver.tip_frame(), "tool0");
        assert_eq!(solver.dof(), 6);

        let reference = OPWKinematics::new(crate::parameters::opw_kinematics::Parameters {
            a1: 0.1, a2: -0.135, b: 0.0, c1: 0.615, c2: 0.705, c3: 0.755, c4: 0.085,
            ..Default::default()
        });
        let expected = reference.forward(&SAFE_JOINTS);
        let actual = solver.position_fk("tool0", &SAFE_JOINTS).unwrap();
        assert!(are_isometries_close(&expected, &actual, 1e-12));
    }
}
