use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use rs_kinematics_adapter::adapter_config::AdapterConfig;
use rs_kinematics_adapter::kinematic_traits::RobotModelAdapter;
use rs_kinematics_adapter::opw_state_adapter::OpwStateAdapter;
use rs_kinematics_adapter::robot_model::RobotModel;
use rs_kinematics_adapter::utils::{as_radians, closest_joint_pose, dump_pose, format_joints};

/// Load a robot, compute forward kinematics for the given joints and solve the
/// resulting pose back, marking the solution chosen for the seed.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Robot description (URDF).
    #[arg(long)]
    urdf: String,

    /// Semantic description (SRDF) with planning groups and disabled collisions.
    #[arg(long)]
    srdf: Option<String>,

    /// Adapter configuration (YAML). Defaults are used if not given.
    #[arg(long)]
    config: Option<String>,

    #[arg(long, default_value = "manipulator")]
    group: String,

    #[arg(long, default_value = "world")]
    world: String,

    #[arg(long, default_value = "tool0")]
    tcp: String,

    /// Joint values in degrees.
    #[arg(long, num_args = 1.., allow_negative_numbers = true)]
    joints: Vec<f64>,

    /// Seed in degrees. Defaults to the joints.
    #[arg(long, num_args = 1.., allow_negative_numbers = true)]
    seed: Option<Vec<f64>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AdapterConfig::from_yaml_file(path)
            .with_context(|| format!("Reading adapter configuration {}", path))?,
        None => AdapterConfig::default(),
    };

    let mut model = RobotModel::from_urdf_file(&args.urdf)
        .with_context(|| format!("Reading robot description {}", args.urdf))?;
    if let Some(srdf) = &args.srdf {
        model.load_srdf_file(srdf)
            .with_context(|| format!("Reading semantic description {}", srdf))?;
    }
    model.configure_kinematics(&config.kinematics).context("Configuring kinematics")?;

    let mut adapter = OpwStateAdapter::new(config);
    adapter.initialize(Arc::new(model), &args.group, &args.world, &args.tcp)
        .context("Initializing adapter")?;

    let joints = if args.joints.is_empty() { vec![0.0; adapter.dof()] } else { as_radians(&args.joints) };
    let seed = args.seed.as_deref().map(as_radians).unwrap_or_else(|| joints.clone());

    if let Err(reason) = adapter.check(&joints) {
        anyhow::bail!("Joints {} are not valid: {}", format_joints(&joints), reason);
    }
    let pose = adapter.get_fk(&joints).context("Forward kinematics failed")?;
    println!("Tool center point for {}:", format_joints(&joints));
    dump_pose(&pose);

    match adapter.get_all_ik(&pose) {
        Some(solutions) => {
            let chosen = closest_joint_pose(&solutions, &seed);
            println!("{} valid solutions:", solutions.len());
            for (index, solution) in solutions.iter().enumerate() {
                let mark = if Some(index) == chosen { "*" } else { " " };
                println!("{} {}", mark, format_joints(solution));
            }
        }
        None => println!("No valid inverse kinematics solutions"),
    }
    Ok(())
}
