use nalgebra::{Isometry3, Vector3};

/// Renderable primitive shapes attached to segments. The renderer
/// collaborator owns the actual mesh resources; this crate only describes
/// what to draw and where.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Axis-aligned box given by its full extents.
    Cuboid { extents: Vector3<f64> },
    Sphere { radius: f64 },
    /// Upper half of a sphere, flat side down (the base dome).
    Dome { radius: f64 },
}

/// A shape at a fixed offset in its segment's local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Primitive {
    pub shape: Shape,
    pub local: Isometry3<f64>,
}

impl Primitive {
    pub fn new(shape: Shape, local: Isometry3<f64>) -> Primitive {
        Primitive { shape, local }
    }

    /// Most of the arm geometry sits plainly on its segment's local Y axis.
    pub fn offset_y(shape: Shape, y: f64) -> Primitive {
        Primitive {
            shape,
            local: Isometry3::translation(0.0, y, 0.0),
        }
    }
}
