use glam::Vec2;

use crate::batched::{DiagnosticKey, PipelineWriter};
use crate::drawable::{Geometry, ResolvedDrawable};

/// Sprites, images and containers: one textured quad.
///
/// Alpha is applied per corner, so a container fading one edge draws as a
/// gradient without extra state.
pub fn render_quad(writer: &mut PipelineWriter<'_>, drawable: &ResolvedDrawable<'_>) {
    let record = drawable.record;
    let Geometry::Quad { origin, size } = record.geometry else {
        writer.reject(DiagnosticKey::GeometryMismatch(record.kind), || {
            format!("{:?} adapter expects quad geometry", record.kind)
        });
        return;
    };

    let corners = [
        drawable.world(origin),
        drawable.world(origin + Vec2::new(size.x, 0.0)),
        drawable.world(origin + size),
        drawable.world(origin + Vec2::new(0.0, size.y)),
    ];
    let uv = writer.uv_rect(record.texture, record.frame.as_ref());
    let tints = std::array::from_fn(|i| drawable.corner_tint(i));
    writer.add_quad(corners, uv, tints, record.tint_effect, record.texture, drawable.blend);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::AdapterHarness;
    use crate::batched::{FrameRect, TextureId};
    use crate::color::Color;
    use crate::drawable::{DrawableHandle, DrawableRecord};

    #[test]
    fn test_quad_corners_follow_transform() {
        let mut h = AdapterHarness::new();
        let record = DrawableRecord::sprite(DrawableHandle(1), TextureId::WHITE, Vec2::new(10.0, 5.0))
            .with_transform([1.0, 0.0, 0.0, 1.0, 100.0, 50.0]);
        h.run(render_quad, &record);

        let positions: Vec<[f32; 2]> = h.pipeline.buffer().vertices().iter().map(|v| v.position).collect();
        assert_eq!(positions, [[100.0, 50.0], [110.0, 50.0], [110.0, 55.0], [100.0, 55.0]]);
        assert_eq!(h.pipeline.buffer().indices(), &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_frame_maps_to_uvs() {
        let mut h = AdapterHarness::new();
        let atlas = h.textures.upload_rgba8("atlas", 4, 4, &[255; 64]).unwrap();
        let record = DrawableRecord::sprite(DrawableHandle(1), atlas, Vec2::ONE).with_frame(FrameRect::new(2.0, 0.0, 2.0, 2.0));
        h.run(render_quad, &record);

        let uvs: Vec<[f32; 2]> = h.pipeline.buffer().vertices().iter().map(|v| v.uv).collect();
        assert_eq!(uvs, [[0.5, 0.0], [1.0, 0.0], [1.0, 0.5], [0.5, 0.5]]);
    }

    #[test]
    fn test_container_alpha_per_corner() {
        let mut h = AdapterHarness::new();
        let record = DrawableRecord::sprite(DrawableHandle(1), TextureId::WHITE, Vec2::ONE)
            .with_tint(Color::RED)
            .with_corner_alpha([1.0, 1.0, 0.0, 0.0]);
        h.run(render_quad, &record);

        let alphas: Vec<u8> = h
            .pipeline
            .buffer()
            .vertices()
            .iter()
            .map(|v| v.tint.to_le_bytes()[3])
            .collect();
        assert_eq!(alphas, [255, 255, 0, 0]);
    }

    #[test]
    fn test_wrong_geometry_is_rejected() {
        let mut h = AdapterHarness::new();
        let record = DrawableRecord::sprite(DrawableHandle(1), TextureId::WHITE, Vec2::ONE)
            .with_geometry(Geometry::Quads(Vec::new()));
        h.run(render_quad, &record);
        assert!(h.pipeline.is_empty());
        assert_eq!(h.stats.dropped, 1);
    }
}
