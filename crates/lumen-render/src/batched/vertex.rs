//! The batch vertex record and its GPU layout.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

/// How a vertex's tint combines with the sampled texel.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TintEffect {
    /// Texel multiplied by tint.
    #[default]
    Multiply = 0,
    /// Tint color masked by texel alpha.
    Fill = 1,
    /// Tint only, the texture is ignored.
    Solid = 2,
}

impl TintEffect {
    pub fn as_f32(self) -> f32 {
        self as u8 as f32
    }
}

/// One corner of a quad, or one mesh vertex.
///
/// 28 bytes. `texture_slot` is stamped by the pipeline when the vertex is
/// written; adapters leave it at zero. `tint` is RGBA8 in memory order and
/// reaches the shader as a normalized `vec4`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BatchVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub texture_slot: f32,
    pub tint_effect: f32,
    pub tint: u32,
}

const_assert_eq!(std::mem::size_of::<BatchVertex>(), 28);

impl BatchVertex {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(position: [f32; 2], uv: [f32; 2], tint: u32) -> Self {
        Self {
            position,
            uv,
            texture_slot: 0.0,
            tint_effect: TintEffect::Multiply.as_f32(),
            tint,
        }
    }

    pub fn with_effect(mut self, effect: TintEffect) -> Self {
        self.tint_effect = effect.as_f32();
        self
    }

    /// Slot index the pipeline assigned to this vertex.
    pub fn slot(&self) -> u32 {
        self.texture_slot as u32
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRS: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![
            0 => Float32x2, // position
            1 => Float32x2, // uv
            2 => Float32,   // texture_slot
            3 => Float32,   // tint_effect
            4 => Unorm8x4,  // tint
        ];
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_covers_whole_vertex() {
        let layout = BatchVertex::layout();
        assert_eq!(layout.array_stride, 28);
        let last = layout.attributes.last().unwrap();
        assert_eq!(last.offset + last.format.size(), 28);
    }

    #[test]
    fn test_tint_effect_values() {
        assert_eq!(TintEffect::Multiply.as_f32(), 0.0);
        assert_eq!(TintEffect::Fill.as_f32(), 1.0);
        assert_eq!(TintEffect::Solid.as_f32(), 2.0);
    }
}
