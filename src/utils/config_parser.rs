use std::fs;
use std::path::Path;

use log::warn;
use nalgebra::Vector3;
use serde::Deserialize;

use crate::errors::Error;

/// Scene placement and solver tuning. Every field has a default so a
/// missing or partial settings file still yields a runnable scene.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the robot base sits relative to the ground reference plane.
    pub root_offset: Vector3<f64>,
    /// Target position seeded at scene creation.
    pub initial_target: Vector3<f64>,
    /// Solver iteration budget per tick.
    pub max_iter: usize,
    /// Grasp-point distance below which a solve counts as converged.
    pub tolerance: f64,
    pub damping: f64,
    /// Per-iteration clamp on the pull toward the target.
    pub max_step: f64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            root_offset: Vector3::new(0.0, -0.6, 0.0),
            initial_target: Vector3::new(0.5, 0.0, -0.5),
            max_iter: 100,
            tolerance: 1e-4,
            damping: 0.1,
            max_step: 0.1,
        }
    }
}

impl Config {
    pub fn from_settings_file<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Falls back to the built-in defaults when the settings file is
    /// missing or malformed; the viewer should come up either way.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Config {
        match Config::from_settings_file(path.as_ref()) {
            Ok(config) => config,
            Err(err) => {
                warn!(
                    "settings file {} not usable ({err}), using defaults",
                    path.as_ref().display()
                );
                Config::default()
            }
        }
    }
}
