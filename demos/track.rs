use clap::Parser;
use nalgebra::Vector3;
use robot_arm_lib::scene::ArmScene;
use robot_arm_lib::utils::config_parser::Config;

/// Orbit the target around the arm and report how well the gripper tracks.
#[derive(Parser)]
struct Args {
    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 240)]
    ticks: usize,
    /// Radius of the target orbit
    #[arg(short, long, default_value_t = 0.35)]
    radius: f64,
    /// Settings file
    #[arg(short, long, default_value = "configs/settings.toml")]
    config: String,
}

fn main() -> Result<(), robot_arm_lib::Error> {
    env_logger::init();
    let args = Args::parse();
    let config = Config::load_or_default(&args.config);
    let mut scene = ArmScene::new(&config)?;

    for tick in 0..args.ticks {
        let phase = tick as f64 / 120.0 * std::f64::consts::TAU;
        scene.set_target(Vector3::new(
            args.radius * phase.cos(),
            0.1,
            args.radius * phase.sin(),
        ));
        let status = scene.update(1.0 / 60.0)?;
        if tick % 30 == 0 {
            let ee = scene.end_effector_position();
            println!(
                "tick {tick:4}  error {:.4}  gripper at ({:.3}, {:.3}, {:.3})",
                status.error, ee.x, ee.y, ee.z
            );
        }
    }
    Ok(())
}
