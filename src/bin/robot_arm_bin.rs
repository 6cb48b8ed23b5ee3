extern crate robot_arm_lib;
use nalgebra::Vector3;
use robot_arm_lib::scene::ArmScene;
use robot_arm_lib::utils::config_parser::Config;

fn main() -> Result<(), robot_arm_lib::Error> {
    env_logger::init();
    let default_path_to_settings = "configs/settings.toml";
    let config = Config::load_or_default(default_path_to_settings);
    let mut scene = ArmScene::new(&config)?;

    for _ in 0..10 {
        // gradually move the target along the y axis
        let target = scene.target() + Vector3::new(0.0, 0.01, 0.0);
        scene.set_target(target);
        let status = scene.update(1.0 / 60.0)?;
        println!(
            "Joint solutions: {:?} (error {:.5})",
            scene.joint_angles(),
            status.error
        );
    }
    Ok(())
}
