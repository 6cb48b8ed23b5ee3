use nalgebra::{DMatrix, Point3, Unit, UnitQuaternion, Vector3};

use crate::errors::Error;
use crate::rig::segment::{JawSide, Segment, SegmentKind, PINCHER_LENGTH};

/// Joint order the solver drives, root joint first.
pub const ARM_JOINTS: [SegmentKind; 4] = [
    SegmentKind::UpperArm,
    SegmentKind::MiddleArm,
    SegmentKind::LowerArm,
    SegmentKind::EndEffector,
];

#[derive(Clone, Debug)]
pub struct ChainJoint {
    pub kind: SegmentKind,
    /// Fixed linear displacement from the previous joint.
    pub lin_offset: Vector3<f64>,
    pub axis: Unit<Vector3<f64>>,
    pub rest_angle: f64,
    pub twist: UnitQuaternion<f64>,
}

impl ChainJoint {
    /// Local orientation to write back into the matching segment.
    pub fn local_rotation(&self, angle: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&self.axis, angle) * self.twist
    }
}

/// The solver-side mirror of the jointed arm segments.
///
/// Derived from the segment tree at setup, so offsets and chain length can
/// never drift apart from what the tree renders. Frames are expressed in
/// the robot base frame (the root segment's local frame).
#[derive(Clone, Debug)]
pub struct KinematicChain {
    pub joints: Vec<ChainJoint>,
    /// Grasp point of the gripper in the end effector's local frame.
    pub tool_offset: Vector3<f64>,
}

impl KinematicChain {
    /// Walks the tree along the expected kind path and mirrors each jointed
    /// segment. A tree that does not form the single serial chain is a
    /// configuration error and aborts setup.
    pub fn from_segment_tree(root: &Segment) -> Result<KinematicChain, Error> {
        if root.kind != SegmentKind::Root {
            return Err(Error::ChainMismatch(format!(
                "expected a Root segment at the base, found {:?}",
                root.kind
            )));
        }
        let mut joints = Vec::with_capacity(ARM_JOINTS.len());
        let mut node = root;
        for expected in ARM_JOINTS {
            let matches: Vec<&Segment> = node
                .children
                .iter()
                .filter(|child| child.kind == expected)
                .collect();
            let next = match matches.as_slice() {
                [one] => *one,
                [] => {
                    return Err(Error::ChainMismatch(format!(
                        "{:?} has no {:?} child",
                        node.kind, expected
                    )))
                }
                _ => {
                    return Err(Error::ChainMismatch(format!(
                        "{:?} has {} {:?} children, expected exactly one",
                        node.kind,
                        matches.len(),
                        expected
                    )))
                }
            };
            let joint = next.joint.as_ref().ok_or_else(|| {
                Error::ChainMismatch(format!("{:?} carries no joint", expected))
            })?;
            joints.push(ChainJoint {
                kind: next.kind,
                lin_offset: next.translation,
                axis: joint.axis,
                rest_angle: joint.rest_angle,
                twist: joint.twist,
            });
            node = next;
        }
        let tool_offset = grasp_point(node)?;
        let chain = KinematicChain { joints, tool_offset };
        log::debug!(
            "kinematic chain mirrored: {} joints, max reach {:.3}",
            chain.num_dof(),
            chain.max_reach()
        );
        Ok(chain)
    }

    pub fn num_dof(&self) -> usize {
        self.joints.len()
    }

    /// Joint angles matching the tree's rest pose.
    pub fn rest_angles(&self) -> Vec<f64> {
        self.joints.iter().map(|joint| joint.rest_angle).collect()
    }

    /// Cumulative length of the fully extended chain.
    pub fn max_reach(&self) -> f64 {
        self.joints
            .iter()
            .map(|joint| joint.lin_offset.norm())
            .sum::<f64>()
            + self.tool_offset.norm()
    }

    /// Base-frame position and orientation of every joint for the given
    /// angles, ending with the tool frame. Index 0 is the base itself.
    pub fn joint_frames(&self, x: &[f64]) -> (Vec<Vector3<f64>>, Vec<UnitQuaternion<f64>>) {
        let mut out_positions = Vec::with_capacity(self.joints.len() + 2);
        let mut out_rot_quats = Vec::with_capacity(self.joints.len() + 2);

        let mut pt: Vector3<f64> = Vector3::zeros();
        let mut rot_quat: UnitQuaternion<f64> = UnitQuaternion::identity();

        out_positions.push(pt);
        out_rot_quats.push(rot_quat);

        for (i, joint) in self.joints.iter().enumerate() {
            pt = rot_quat * joint.lin_offset + pt;
            rot_quat *= joint.local_rotation(x[i]);
            out_positions.push(pt);
            out_rot_quats.push(rot_quat);
        }

        // tool frame
        out_positions.push(rot_quat * self.tool_offset + pt);
        out_rot_quats.push(rot_quat);

        (out_positions, out_rot_quats)
    }

    /// Base-frame position of the grasp point.
    pub fn ee_position(&self, x: &[f64]) -> Vector3<f64> {
        let (positions, _) = self.joint_frames(x);
        positions[self.joints.len() + 1]
    }

    /// Position jacobian of the grasp point, one column per joint.
    pub fn jacobian(&self, x: &[f64]) -> DMatrix<f64> {
        let (positions, rotations) = self.joint_frames(x);
        let ee_position = positions[self.joints.len() + 1];

        let mut jacobian: DMatrix<f64> = DMatrix::zeros(3, self.joints.len());
        for (i, joint) in self.joints.iter().enumerate() {
            // The joint rotates about its axis expressed in the frame it is
            // entered from, around its own origin.
            let p_axis = rotations[i] * joint.axis;
            let disp = ee_position - positions[i + 1];
            let linear = p_axis.cross(&disp);
            jacobian.set_column(i, &linear);
        }
        jacobian
    }
}

/// Midpoint of the two jaw tips in the end effector's local frame, read
/// from the jaw segments themselves so tree and chain agree on where the
/// gripper grasps.
fn grasp_point(end_effector: &Segment) -> Result<Vector3<f64>, Error> {
    let mut midpoint = Vector3::zeros();
    for side in [JawSide::Left, JawSide::Right] {
        let base = end_effector
            .children
            .iter()
            .find(|child| child.kind == SegmentKind::JawBase(side))
            .ok_or_else(|| {
                Error::ChainMismatch(format!("end effector is missing its {:?} jaw", side))
            })?;
        let tip = base
            .children
            .iter()
            .find(|child| child.kind == SegmentKind::JawTip(side))
            .ok_or_else(|| {
                Error::ChainMismatch(format!("{:?} jaw is missing its tip link", side))
            })?;
        let frame = base.local_isometry() * tip.local_isometry();
        midpoint += frame
            .transform_point(&Point3::new(0.0, PINCHER_LENGTH / 2.0, 0.0))
            .coords;
    }
    Ok(midpoint / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Isometry3;

    fn build_chain() -> (Segment, KinematicChain) {
        let root = Segment::build(SegmentKind::Root);
        let chain = KinematicChain::from_segment_tree(&root).unwrap();
        (root, chain)
    }

    #[test]
    fn mirrors_the_tree_at_rest() {
        let (root, chain) = build_chain();
        let x = chain.rest_angles();
        let (positions, rotations) = chain.joint_frames(&x);
        let world = root.world_transforms(&Isometry3::identity());
        for (i, joint) in chain.joints.iter().enumerate() {
            let (_, iso) = world
                .iter()
                .find(|(kind, _)| *kind == joint.kind)
                .unwrap();
            assert!((iso.translation.vector - positions[i + 1]).norm() < 1e-12);
            assert!(iso.rotation.angle_to(&rotations[i + 1]) < 1e-12);
        }
    }

    #[test]
    fn stays_consistent_after_writing_angles_back() {
        let (mut root, chain) = build_chain();
        let x = [0.2, -0.4, 0.8, 0.1];
        for (joint, angle) in chain.joints.iter().zip(&x) {
            assert!(root.set_rotation(joint.kind, joint.local_rotation(*angle)));
        }
        let (positions, _) = chain.joint_frames(&x);
        let world = root.world_transforms(&Isometry3::identity());
        for (i, joint) in chain.joints.iter().enumerate() {
            let (_, iso) = world
                .iter()
                .find(|(kind, _)| *kind == joint.kind)
                .unwrap();
            assert!((iso.translation.vector - positions[i + 1]).norm() < 1e-12);
        }
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let (_, chain) = build_chain();
        let x = [0.3, 0.7, -0.4, 0.2];
        let jacobian = chain.jacobian(&x);
        let h = 1e-6;
        for i in 0..chain.num_dof() {
            let mut plus = x;
            plus[i] += h;
            let mut minus = x;
            minus[i] -= h;
            let fd = (chain.ee_position(&plus) - chain.ee_position(&minus)) / (2.0 * h);
            for row in 0..3 {
                assert!((jacobian[(row, i)] - fd[row]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn grasp_point_sits_between_the_jaws() {
        let (_, chain) = build_chain();
        assert!(chain.tool_offset.x.abs() < 1e-12);
        assert!(chain.tool_offset.z.abs() < 1e-12);
        assert!(chain.tool_offset.y > 0.1 && chain.tool_offset.y < 0.3);
    }

    #[test]
    fn rejects_a_rootless_tree() {
        let arm = Segment::build(SegmentKind::UpperArm);
        assert!(matches!(
            KinematicChain::from_segment_tree(&arm),
            Err(Error::ChainMismatch(_))
        ));
    }

    #[test]
    fn rejects_a_duplicated_arm() {
        // The two-arm variant is a duplication bug, not a feature; it must
        // be caught at setup instead of silently driving one arm of two.
        let mut root = Segment::build(SegmentKind::Root);
        let duplicate = root.children[0].clone();
        root.children.push(duplicate);
        assert!(matches!(
            KinematicChain::from_segment_tree(&root),
            Err(Error::ChainMismatch(_))
        ));
    }

    #[test]
    fn rejects_a_truncated_chain() {
        let mut root = Segment::build(SegmentKind::Root);
        root.children[0].children.clear();
        assert!(matches!(
            KinematicChain::from_segment_tree(&root),
            Err(Error::ChainMismatch(_))
        ));
    }
}
