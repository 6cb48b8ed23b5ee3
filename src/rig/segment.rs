use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};

use crate::rig::geometry::{Primitive, Shape};

/// Length of each gripper jaw link, shared by all four jaw boxes.
pub const PINCHER_LENGTH: f64 = 0.2 / 1.5;

/// Size of the per-segment axes gizmo shown in debug mode.
pub const DEBUG_AXES_SIZE: f64 = 0.07;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JawSide {
    Left,
    Right,
}

impl JawSide {
    fn sign(self) -> f64 {
        match self {
            JawSide::Left => 1.0,
            JawSide::Right => -1.0,
        }
    }
}

/// Closed vocabulary of rigid parts. The kind alone determines a segment's
/// rest offset, geometry and children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Root,
    UpperArm,
    MiddleArm,
    LowerArm,
    EndEffector,
    JawBase(JawSide),
    JawTip(JawSide),
}

/// Joint data for the segments the solver drives. The root and the jaw
/// links carry no joint and keep their build-time orientation.
#[derive(Clone, Debug)]
pub struct JointDef {
    pub axis: Unit<Vector3<f64>>,
    pub rest_angle: f64,
    /// Constant twist composed after the solved bend. A twist about the
    /// local Y axis cannot displace children offset along that axis, so the
    /// chain mirror stays position-exact without modeling it as a joint.
    pub twist: UnitQuaternion<f64>,
}

impl JointDef {
    fn bend_z(rest_angle: f64) -> JointDef {
        JointDef {
            axis: Vector3::z_axis(),
            rest_angle,
            twist: UnitQuaternion::identity(),
        }
    }

    fn yaw_y() -> JointDef {
        JointDef {
            axis: Vector3::y_axis(),
            rest_angle: 0.0,
            twist: UnitQuaternion::identity(),
        }
    }

    /// Local orientation for a given joint angle.
    pub fn local_rotation(&self, angle: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&self.axis, angle) * self.twist
    }
}

/// One rigid link of the arm: a node in a strictly single-parent tree.
///
/// The tree is built once at scene setup; afterwards only `rotation` (the
/// joint pose) and `debug_visible` ever change.
#[derive(Clone, Debug)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Fixed offset from the parent frame, applied before the rotation.
    pub translation: Vector3<f64>,
    /// Current local orientation. Starts at the rest pose and is replaced
    /// wholesale by `set_rotation`.
    pub rotation: UnitQuaternion<f64>,
    pub joint: Option<JointDef>,
    pub primitives: Vec<Primitive>,
    pub children: Vec<Segment>,
    pub debug_visible: bool,
}

impl Segment {
    /// Recursively constructs a segment and its full subtree. Construction
    /// is deterministic: two trees built from the same kind are identical.
    pub fn build(kind: SegmentKind) -> Segment {
        match kind {
            SegmentKind::Root => Segment {
                kind,
                translation: Vector3::zeros(),
                rotation: UnitQuaternion::identity(),
                joint: None,
                primitives: vec![
                    Primitive::offset_y(
                        Shape::Cuboid {
                            extents: Vector3::new(0.5, 0.05, 0.5),
                        },
                        0.025,
                    ),
                    Primitive::offset_y(Shape::Dome { radius: 0.1 }, 0.05),
                ],
                children: vec![Segment::build(SegmentKind::UpperArm)],
                debug_visible: false,
            },
            SegmentKind::UpperArm => {
                arm_link(kind, JointDef::yaw_y(), 0.0, 0.5, SegmentKind::MiddleArm)
            }
            SegmentKind::MiddleArm => arm_link(
                kind,
                JointDef::bend_z(FRAC_PI_4),
                0.5,
                0.4,
                SegmentKind::LowerArm,
            ),
            SegmentKind::LowerArm => arm_link(
                kind,
                JointDef::bend_z(FRAC_PI_4),
                0.4,
                0.4,
                SegmentKind::EndEffector,
            ),
            SegmentKind::EndEffector => {
                // Bend like the other joints, then turn the gripper sideways.
                let joint = JointDef {
                    axis: Vector3::z_axis(),
                    rest_angle: FRAC_PI_4,
                    twist: UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2),
                };
                let rotation = joint.local_rotation(joint.rest_angle);
                Segment {
                    kind,
                    translation: Vector3::new(0.0, 0.4, 0.0),
                    rotation,
                    joint: Some(joint),
                    primitives: Vec::new(),
                    children: vec![
                        Segment::build(SegmentKind::JawBase(JawSide::Left)),
                        Segment::build(SegmentKind::JawBase(JawSide::Right)),
                    ],
                    debug_visible: false,
                }
            }
            SegmentKind::JawBase(side) => {
                // Rotated first, then pushed out along its own tilted Y.
                let rotation = UnitQuaternion::from_axis_angle(
                    &Vector3::z_axis(),
                    side.sign() * FRAC_PI_4,
                );
                Segment {
                    kind,
                    translation: rotation * Vector3::new(0.0, PINCHER_LENGTH / 2.0 + 0.04, 0.0),
                    rotation,
                    joint: None,
                    primitives: vec![Primitive::new(jaw_box(), Isometry3::identity())],
                    children: vec![Segment::build(SegmentKind::JawTip(side))],
                    debug_visible: false,
                }
            }
            SegmentKind::JawTip(side) => {
                let pivot = UnitQuaternion::from_axis_angle(
                    &Vector3::z_axis(),
                    -side.sign() * 75.0_f64.to_radians(),
                );
                Segment {
                    kind,
                    translation: Vector3::new(0.0, PINCHER_LENGTH / 2.0, 0.0)
                        + pivot * Vector3::new(0.0, PINCHER_LENGTH / 2.0 - 0.01225, 0.0),
                    rotation: pivot,
                    joint: None,
                    primitives: vec![Primitive::new(jaw_box(), Isometry3::identity())],
                    children: Vec::new(),
                    debug_visible: false,
                }
            }
        }
    }

    /// Local frame relative to the parent: translate, then rotate.
    pub fn local_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation)
    }

    /// Depth-first search by kind; replaces the first match's local
    /// orientation wholesale. Returns whether any segment was found; a
    /// miss changes nothing.
    pub fn set_rotation(&mut self, kind: SegmentKind, rotation: UnitQuaternion<f64>) -> bool {
        if self.kind == kind {
            self.rotation = rotation;
            return true;
        }
        self.children
            .iter_mut()
            .any(|child| child.set_rotation(kind, rotation))
    }

    /// Recursively overrides the debug flag on every segment in the
    /// subtree. Visualization only; transforms are untouched.
    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.debug_visible = enabled;
        for child in &mut self.children {
            child.set_debug_mode(enabled);
        }
    }

    pub fn find(&self, kind: SegmentKind) -> Option<&Segment> {
        if self.kind == kind {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(kind))
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Segment::count).sum::<usize>()
    }

    /// World transform of every segment, depth first, parents before
    /// children.
    pub fn world_transforms(&self, base: &Isometry3<f64>) -> Vec<(SegmentKind, Isometry3<f64>)> {
        let mut out = Vec::with_capacity(self.count());
        self.collect_world(base, &mut out);
        out
    }

    fn collect_world(
        &self,
        parent: &Isometry3<f64>,
        out: &mut Vec<(SegmentKind, Isometry3<f64>)>,
    ) {
        let world = parent * self.local_isometry();
        out.push((self.kind, world));
        for child in &self.children {
            child.collect_world(&world, out);
        }
    }
}

fn arm_link(
    kind: SegmentKind,
    joint: JointDef,
    parent_offset: f64,
    length: f64,
    child: SegmentKind,
) -> Segment {
    let rotation = joint.local_rotation(joint.rest_angle);
    Segment {
        kind,
        translation: Vector3::new(0.0, parent_offset, 0.0),
        rotation,
        joint: Some(joint),
        primitives: vec![
            Primitive::offset_y(
                Shape::Cuboid {
                    extents: Vector3::new(0.05, length, 0.05),
                },
                length / 2.0,
            ),
            Primitive::offset_y(Shape::Sphere { radius: 0.05 }, length),
        ],
        children: vec![Segment::build(child)],
        debug_visible: false,
    }
}

fn jaw_box() -> Shape {
    Shape::Cuboid {
        extents: Vector3::new(0.025, PINCHER_LENGTH, 0.025),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Isometry3<f64> {
        Isometry3::identity()
    }

    #[test]
    fn build_is_deterministic() {
        let a = Segment::build(SegmentKind::Root);
        let b = Segment::build(SegmentKind::Root);
        assert_eq!(a.count(), b.count());
        assert_eq!(
            a.world_transforms(&identity()),
            b.world_transforms(&identity())
        );
    }

    #[test]
    fn tree_has_nine_segments() {
        // Root, three arm links, end effector and four jaw links.
        let root = Segment::build(SegmentKind::Root);
        assert_eq!(root.count(), 9);
    }

    #[test]
    fn kind_path_follows_arm_order() {
        let root = Segment::build(SegmentKind::Root);
        let mut node = &root;
        for expected in [
            SegmentKind::UpperArm,
            SegmentKind::MiddleArm,
            SegmentKind::LowerArm,
            SegmentKind::EndEffector,
        ] {
            assert_eq!(node.children.len(), 1);
            node = &node.children[0];
            assert_eq!(node.kind, expected);
        }
        // The gripper forks into two static jaw sub-chains.
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].kind, SegmentKind::JawBase(JawSide::Left));
        assert_eq!(node.children[1].kind, SegmentKind::JawBase(JawSide::Right));
        for jaw in &node.children {
            assert_eq!(jaw.children.len(), 1);
            assert!(jaw.children[0].children.is_empty());
        }
    }

    #[test]
    fn set_rotation_is_idempotent() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.3);
        let mut root = Segment::build(SegmentKind::Root);
        assert!(root.set_rotation(SegmentKind::MiddleArm, rotation));
        let first = root.world_transforms(&identity());
        assert!(root.set_rotation(SegmentKind::MiddleArm, rotation));
        let second = root.world_transforms(&identity());
        assert_eq!(first, second);
    }

    #[test]
    fn lookup_miss_changes_nothing() {
        let mut root = Segment::build(SegmentKind::Root);
        let before = root.children[0].world_transforms(&identity());
        // Root is not part of the upper-arm subtree.
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.0);
        assert!(!root.children[0].set_rotation(SegmentKind::Root, rotation));
        let after = root.children[0].world_transforms(&identity());
        assert_eq!(before, after);
    }

    #[test]
    fn debug_mode_propagates_everywhere() {
        let mut root = Segment::build(SegmentKind::Root);
        root.set_debug_mode(true);
        assert!(all_debug_flags(&root, true));
        root.set_debug_mode(false);
        assert!(all_debug_flags(&root, false));
    }

    fn all_debug_flags(segment: &Segment, expected: bool) -> bool {
        segment.debug_visible == expected
            && segment
                .children
                .iter()
                .all(|child| all_debug_flags(child, expected))
    }

    #[test]
    fn jaws_mirror_each_other() {
        let root = Segment::build(SegmentKind::Root);
        let left = root.find(SegmentKind::JawBase(JawSide::Left)).unwrap();
        let right = root.find(SegmentKind::JawBase(JawSide::Right)).unwrap();
        assert!((left.translation.x + right.translation.x).abs() < 1e-12);
        assert!((left.translation.y - right.translation.y).abs() < 1e-12);
    }
}
