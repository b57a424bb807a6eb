//! Per-frame drawable records handed to the batcher by scene traversal.
//!
//! Records arrive in paint order with world transforms already resolved.
//! Nothing here holds GPU state; the render adapters turn a record into
//! vertices.

use std::sync::Arc;

use glam::{Affine2, Vec2};

use crate::adapters::DrawableKind;
use crate::batched::{FrameRect, TextureId, TintEffect};
use crate::blend::BlendMode;
use crate::color::Color;

/// Opaque identity of the scene object a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DrawableHandle(pub u64);

/// Color modulation for a drawable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tint {
    Uniform(Color),
    /// Top-left, top-right, bottom-right, bottom-left.
    Corners([Color; 4]),
}

impl Default for Tint {
    fn default() -> Self {
        Tint::Uniform(Color::WHITE)
    }
}

impl Tint {
    /// Color at corner `i` (TL, TR, BR, BL).
    pub fn corner(&self, i: usize) -> Color {
        match self {
            Tint::Uniform(color) => *color,
            Tint::Corners(colors) => colors[i % 4],
        }
    }

    /// Bilinear blend of the corners at normalized position `(s, t)`.
    pub fn sample(&self, s: f32, t: f32) -> Color {
        match self {
            Tint::Uniform(color) => *color,
            Tint::Corners([tl, tr, br, bl]) => {
                let top = tl.lerp(*tr, s);
                let bottom = bl.lerp(*br, s);
                top.lerp(bottom, t)
            }
        }
    }
}

/// Insets of a nine-slice, in local units and texels alike.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Insets {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Insets {
    pub fn uniform(inset: f32) -> Self {
        Self {
            left: inset,
            right: inset,
            top: inset,
            bottom: inset,
        }
    }
}

/// Row-major grid of tiles. `None` leaves a cell empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    pub origin: Vec2,
    pub tile_size: Vec2,
    pub columns: u32,
    pub tiles: Vec<Option<FrameRect>>,
}

/// One glyph or particle inside a list drawable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubQuad {
    pub origin: Vec2,
    pub size: Vec2,
    pub frame: Option<FrameRect>,
    /// Replaces the record tint for this quad.
    pub tint: Option<Color>,
}

/// Arbitrary indexed triangles in local space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub positions: Vec<Vec2>,
    pub uvs: Vec<Vec2>,
    /// Per-vertex colors, multiplied with the record tint.
    pub colors: Option<Vec<Color>>,
    pub indices: Vec<u32>,
}

/// Local-space shape of a drawable.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Quad { origin: Vec2, size: Vec2 },
    NineSlice { origin: Vec2, size: Vec2, insets: Insets },
    Tiles(TileGrid),
    Quads(Vec<SubQuad>),
    Mesh(MeshData),
}

/// Everything the batcher knows about one drawable for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawableRecord {
    pub handle: DrawableHandle,
    pub kind: DrawableKind,
    /// Local to world.
    pub transform: Affine2,
    pub blend: BlendMode,
    pub texture: TextureId,
    /// Region of `texture` to sample; whole texture if `None`.
    pub frame: Option<FrameRect>,
    pub tint: Tint,
    /// Alpha per corner (TL, TR, BR, BL).
    pub alpha: [f32; 4],
    pub tint_effect: TintEffect,
    /// Pipeline override; the adapter's pipeline is used when `None`.
    pub pipeline: Option<Arc<str>>,
    pub geometry: Geometry,
}

impl DrawableRecord {
    /// A sprite of `size` at the local origin.
    pub fn sprite(handle: DrawableHandle, texture: TextureId, size: Vec2) -> Self {
        Self {
            handle,
            kind: DrawableKind::Sprite,
            transform: Affine2::IDENTITY,
            blend: BlendMode::Normal,
            texture,
            frame: None,
            tint: Tint::default(),
            alpha: [1.0; 4],
            tint_effect: TintEffect::Multiply,
            pipeline: None,
            geometry: Geometry::Quad {
                origin: Vec2::ZERO,
                size,
            },
        }
    }

    /// Set the world transform from `[a, b, c, d, tx, ty]`.
    pub fn with_transform(mut self, matrix: [f32; 6]) -> Self {
        self.transform = Affine2::from_cols_array(&matrix);
        self
    }

    pub fn with_affine(mut self, transform: Affine2) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_frame(mut self, frame: FrameRect) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = Tint::Uniform(tint);
        self
    }

    pub fn with_corner_tints(mut self, tints: [Color; 4]) -> Self {
        self.tint = Tint::Corners(tints);
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = [alpha; 4];
        self
    }

    pub fn with_corner_alpha(mut self, alpha: [f32; 4]) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_tint_effect(mut self, effect: TintEffect) -> Self {
        self.tint_effect = effect;
        self
    }

    pub fn with_pipeline(mut self, pipeline: impl Into<Arc<str>>) -> Self {
        self.pipeline = Some(pipeline.into());
        self
    }

    pub fn with_kind(mut self, kind: DrawableKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }
}

/// A record after group inheritance has been applied.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedDrawable<'a> {
    pub record: &'a DrawableRecord,
    pub blend: BlendMode,
    /// Record alpha times every enclosing group's alpha.
    pub alpha: [f32; 4],
}

impl ResolvedDrawable<'_> {
    /// Packed RGBA8 tint for corner `i`, alpha applied.
    pub fn corner_tint(&self, i: usize) -> u32 {
        let color = self.record.tint.corner(i);
        color.with_alpha(color.a * self.alpha[i]).to_packed()
    }

    /// Packed tint at normalized position `(s, t)`, alpha interpolated the
    /// same way as the corner colors.
    pub fn tint_at(&self, s: f32, t: f32) -> u32 {
        let color = self.record.tint.sample(s, t);
        let [tl, tr, br, bl] = self.alpha;
        let top = tl + (tr - tl) * s;
        let bottom = bl + (br - bl) * s;
        let alpha = top + (bottom - top) * t;
        color.with_alpha(color.a * alpha).to_packed()
    }

    /// Transform a local point to world space.
    pub fn world(&self, local: Vec2) -> [f32; 2] {
        self.record.transform.transform_point2(local).to_array()
    }
}

/// A container or layer bracketing its children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawableGroup {
    /// Imposed on every child when set.
    pub blend: Option<BlendMode>,
    /// Multiplied into every child's alpha.
    pub alpha: f32,
}

impl Default for DrawableGroup {
    fn default() -> Self {
        Self {
            blend: None,
            alpha: 1.0,
        }
    }
}

impl DrawableGroup {
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = Some(blend);
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }
}

/// One entry of the ordered frame list.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameItem {
    Draw(DrawableRecord),
    BeginGroup(DrawableGroup),
    EndGroup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_array_order() {
        let record = DrawableRecord::sprite(DrawableHandle(1), TextureId::WHITE, Vec2::ONE)
            .with_transform([2.0, 0.0, 0.0, 3.0, 10.0, 20.0]);
        let resolved = ResolvedDrawable {
            record: &record,
            blend: BlendMode::Normal,
            alpha: [1.0; 4],
        };
        assert_eq!(resolved.world(Vec2::new(1.0, 1.0)), [12.0, 23.0]);
    }

    #[test]
    fn test_corner_tint_sampling() {
        let tint = Tint::Corners([Color::RED, Color::GREEN, Color::BLUE, Color::BLACK]);
        assert_eq!(tint.sample(0.0, 0.0), Color::RED);
        assert_eq!(tint.sample(1.0, 0.0), Color::GREEN);
        assert_eq!(tint.sample(1.0, 1.0), Color::BLUE);
        assert_eq!(tint.sample(0.0, 1.0), Color::BLACK);
        assert_eq!(tint.corner(2), Color::BLUE);
    }

    #[test]
    fn test_alpha_is_applied_to_packed_tint() {
        let record = DrawableRecord::sprite(DrawableHandle(1), TextureId::WHITE, Vec2::ONE)
            .with_corner_alpha([1.0, 0.5, 0.0, 1.0]);
        let resolved = ResolvedDrawable {
            record: &record,
            blend: BlendMode::Normal,
            alpha: record.alpha,
        };
        assert_eq!(resolved.corner_tint(0), Color::WHITE.to_packed());
        assert_eq!(resolved.corner_tint(2), Color::WHITE.with_alpha(0.0).to_packed());
        assert_eq!(resolved.tint_at(1.0, 0.0), resolved.corner_tint(1));
    }
}
