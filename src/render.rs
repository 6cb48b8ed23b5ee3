use nalgebra::Isometry3;

use crate::rig::geometry::Shape;
use crate::rig::segment::{Segment, DEBUG_AXES_SIZE};

/// One world-space draw call for the renderer collaborator.
#[derive(Clone, Copy, Debug)]
pub struct RenderInstance {
    pub shape: Shape,
    pub world: Isometry3<f64>,
    /// Mirrors the owning segment's debug flag.
    pub wireframe: bool,
}

/// Local-axes marker emitted for every debug-visible segment.
#[derive(Clone, Copy, Debug)]
pub struct AxisGizmo {
    pub world: Isometry3<f64>,
    pub size: f64,
}

/// Flattens the tree into world-space draw data. Pure read; rendering never
/// feeds back into the kinematics.
pub fn collect_instances(root: &Segment, base: &Isometry3<f64>) -> Vec<RenderInstance> {
    let mut out = Vec::new();
    visit(root, base, &mut |segment, world| {
        for primitive in &segment.primitives {
            out.push(RenderInstance {
                shape: primitive.shape,
                world: world * primitive.local,
                wireframe: segment.debug_visible,
            });
        }
    });
    out
}

pub fn collect_axis_gizmos(root: &Segment, base: &Isometry3<f64>) -> Vec<AxisGizmo> {
    let mut out = Vec::new();
    visit(root, base, &mut |segment, world| {
        if segment.debug_visible {
            out.push(AxisGizmo {
                world: *world,
                size: DEBUG_AXES_SIZE,
            });
        }
    });
    out
}

fn visit<F: FnMut(&Segment, &Isometry3<f64>)>(
    segment: &Segment,
    parent: &Isometry3<f64>,
    f: &mut F,
) {
    let world = parent * segment.local_isometry();
    f(segment, &world);
    for child in &segment.children {
        visit(child, &world, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::segment::SegmentKind;

    #[test]
    fn emits_one_instance_per_primitive() {
        // Root and the three arm links carry two primitives each, the end
        // effector none, the four jaw links one each.
        let root = Segment::build(SegmentKind::Root);
        let instances = collect_instances(&root, &Isometry3::identity());
        assert_eq!(instances.len(), 12);
        assert!(instances.iter().all(|instance| !instance.wireframe));
    }

    #[test]
    fn debug_mode_drives_wireframes_and_gizmos() {
        let mut root = Segment::build(SegmentKind::Root);
        root.set_debug_mode(true);
        let base = Isometry3::identity();
        assert!(collect_instances(&root, &base)
            .iter()
            .all(|instance| instance.wireframe));
        assert_eq!(collect_axis_gizmos(&root, &base).len(), 9);
        root.set_debug_mode(false);
        assert!(collect_axis_gizmos(&root, &base).is_empty());
    }
}
