use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use crate::driver::IkDriver;
use crate::errors::Error;
use crate::render::{self, AxisGizmo, RenderInstance};
use crate::rig::segment::{Segment, SegmentKind};
use crate::solver::{DlsSolver, SolveStatus};
use crate::utils::config_parser::Config;

/// The surface the render-loop harness talks to: built once at startup,
/// ticked once per frame. The camera, the drag controls and the control
/// panel stay outside; they only move the target and flip debug mode.
pub struct ArmScene {
    root: Segment,
    base: Isometry3<f64>,
    driver: IkDriver,
    target: Vector3<f64>,
    debug_mode: bool,
}

impl ArmScene {
    /// Builds the robot, drops it to the configured offset below the
    /// ground reference plane and registers the chain with the solver.
    pub fn new(config: &Config) -> Result<ArmScene, Error> {
        let root = Segment::build(SegmentKind::Root);
        log::debug!("segment tree built ({} segments)", root.count());
        let base = Isometry3::from_parts(
            Translation3::from(config.root_offset),
            UnitQuaternion::identity(),
        );
        let solver = DlsSolver {
            max_iter: config.max_iter,
            tolerance: config.tolerance,
            damping: config.damping,
            max_step: config.max_step,
        };
        let driver = IkDriver::new(&root, solver, config.initial_target)?;
        log::info!(
            "arm scene ready, target seeded at {:?}",
            config.initial_target
        );
        Ok(ArmScene {
            root,
            base,
            driver,
            target: config.initial_target,
            debug_mode: false,
        })
    }

    /// Per-frame tick driven by the render-loop harness.
    pub fn update(&mut self, delta: f64) -> Result<SolveStatus, Error> {
        self.driver.update(&mut self.root, &self.base, self.target, delta)
    }

    /// Written by the input collaborator between ticks.
    pub fn set_target(&mut self, target: Vector3<f64>) {
        self.target = target;
    }

    pub fn target(&self) -> Vector3<f64> {
        self.target
    }

    /// Control-panel hook.
    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.debug_mode = enabled;
        self.root.set_debug_mode(enabled);
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn end_effector_position(&self) -> Vector3<f64> {
        self.driver.end_effector_position(&self.base)
    }

    pub fn joint_angles(&self) -> &[f64] {
        self.driver.joint_angles()
    }

    pub fn robot(&self) -> &Segment {
        &self.root
    }

    pub fn base_transform(&self) -> Isometry3<f64> {
        self.base
    }

    pub fn render_instances(&self) -> Vec<RenderInstance> {
        render::collect_instances(&self.root, &self.base)
    }

    pub fn axis_gizmos(&self) -> Vec<AxisGizmo> {
        render::collect_axis_gizmos(&self.root, &self.base)
    }
}
