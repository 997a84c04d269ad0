//! Vertex format for the fullscreen quad.
//!
//! The fractal is drawn entirely in the fragment shader; geometry is a
//! single quad covering clip space, four corners and two triangles.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Position-only vertex.
///
/// # Memory Layout
///
/// - Offset 0: position (12 bytes)
/// - Total size: 12 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: Vec3,
}

impl QuadVertex {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
        }
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 1] {
        [vk::VertexInputAttributeDescription {
            binding: 0,
            location: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: 0,
        }]
    }
}

/// Clip-space corners: top-left, top-right, bottom-right, bottom-left.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex::new(-1.0, 1.0, 0.0),
    QuadVertex::new(1.0, 1.0, 0.0),
    QuadVertex::new(1.0, -1.0, 0.0),
    QuadVertex::new(-1.0, -1.0, 0.0),
];

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];
