use nalgebra::{Isometry3, Point3, Vector3};

use crate::chain::KinematicChain;
use crate::errors::Error;
use crate::rig::segment::Segment;
use crate::solver::{DlsSolver, SolveStatus};

/// Per-tick control loop: copies the target position, runs the solver, and
/// writes the solved joint orientations back into the segment tree in chain
/// order, root joint first.
pub struct IkDriver {
    chain: KinematicChain,
    solver: DlsSolver,
    xopt: Vec<f64>,
    target: Vector3<f64>,
}

impl IkDriver {
    /// Mirrors the tree into a kinematic chain and seeds the joint state
    /// from the rest pose. Fails fast if the tree is not a valid chain.
    pub fn new(
        root: &Segment,
        solver: DlsSolver,
        initial_target: Vector3<f64>,
    ) -> Result<IkDriver, Error> {
        let chain = KinematicChain::from_segment_tree(root)?;
        let xopt = chain.rest_angles();
        log::debug!(
            "ik driver ready: {} joints, max reach {:.3}",
            chain.num_dof(),
            chain.max_reach()
        );
        Ok(IkDriver {
            chain,
            solver,
            xopt,
            target: initial_target,
        })
    }

    /// One synchronization tick. The target is read exactly once; every
    /// joint is rewritten before the call returns, so no partial pose is
    /// observable between ticks. `delta` is part of the per-frame contract
    /// with the harness and unused by the solve itself.
    pub fn update(
        &mut self,
        root: &mut Segment,
        base: &Isometry3<f64>,
        target: Vector3<f64>,
        _delta: f64,
    ) -> Result<SolveStatus, Error> {
        self.target = target;
        let local_target = base.inverse_transform_point(&Point3::from(target)).coords;
        let status = self.solver.solve(&self.chain, &mut self.xopt, &local_target)?;
        for (joint, angle) in self.chain.joints.iter().zip(&self.xopt) {
            if !root.set_rotation(joint.kind, joint.local_rotation(*angle)) {
                log::warn!("no {:?} segment found while applying the solved pose", joint.kind);
            }
        }
        log::debug!(
            "tick: error {:.5} after {} iterations",
            status.error,
            status.iterations
        );
        Ok(status)
    }

    pub fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    pub fn joint_angles(&self) -> &[f64] {
        &self.xopt
    }

    /// Target snapshot taken by the last tick.
    pub fn target(&self) -> Vector3<f64> {
        self.target
    }

    /// Solved grasp-point position in world coordinates.
    pub fn end_effector_position(&self, base: &Isometry3<f64>) -> Vector3<f64> {
        base.transform_point(&Point3::from(self.chain.ee_position(&self.xopt)))
            .coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::segment::SegmentKind;
    use nalgebra::Point3;

    #[test]
    fn tick_writes_the_solved_pose_into_the_tree() {
        let mut root = Segment::build(SegmentKind::Root);
        let base = Isometry3::translation(0.0, -0.6, 0.0);
        let target = Vector3::new(0.5, 0.0, -0.5);
        let mut driver = IkDriver::new(&root, DlsSolver::default(), target).unwrap();
        driver.update(&mut root, &base, target, 1.0 / 60.0).unwrap();

        // The rendered tree must land its grasp point exactly where the
        // chain says the solver put it.
        let world = root.world_transforms(&base);
        let (_, ee_iso) = world
            .iter()
            .find(|(kind, _)| *kind == SegmentKind::EndEffector)
            .unwrap();
        let tree_grasp = ee_iso
            .transform_point(&Point3::from(driver.chain().tool_offset))
            .coords;
        assert!((tree_grasp - driver.end_effector_position(&base)).norm() < 1e-9);
    }

    #[test]
    fn tick_snapshots_the_target() {
        let mut root = Segment::build(SegmentKind::Root);
        let base = Isometry3::identity();
        let mut driver =
            IkDriver::new(&root, DlsSolver::default(), Vector3::zeros()).unwrap();
        let target = Vector3::new(0.3, 0.8, 0.1);
        driver.update(&mut root, &base, target, 0.016).unwrap();
        assert_eq!(driver.target(), target);
    }
}
