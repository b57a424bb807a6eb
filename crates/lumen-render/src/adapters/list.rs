use glam::Vec2;

use crate::batched::{DiagnosticKey, PipelineWriter};
use crate::drawable::{Geometry, ResolvedDrawable};

/// Text runs and particle fields: many small quads sharing one texture.
///
/// Glyph and particle positions are local to the record transform. A
/// sub-quad tint replaces the record tint; record alpha still applies.
pub fn render_quad_list(writer: &mut PipelineWriter<'_>, drawable: &ResolvedDrawable<'_>) {
    let record = drawable.record;
    let Geometry::Quads(quads) = &record.geometry else {
        writer.reject(DiagnosticKey::GeometryMismatch(record.kind), || {
            format!("{:?} adapter expects a quad list", record.kind)
        });
        return;
    };
    if quads.is_empty() || !writer.require_resident(record.texture) {
        return;
    }

    for quad in quads {
        let corners = [
            quad.origin,
            quad.origin + Vec2::new(quad.size.x, 0.0),
            quad.origin + quad.size,
            quad.origin + Vec2::new(0.0, quad.size.y),
        ]
        .map(|p| drawable.world(p));
        let tints = std::array::from_fn(|i| match quad.tint {
            Some(color) => color.with_alpha(color.a * drawable.alpha[i]).to_packed(),
            None => drawable.corner_tint(i),
        });
        let uv = writer.uv_rect(record.texture, quad.frame.as_ref().or(record.frame.as_ref()));
        writer.add_quad(corners, uv, tints, record.tint_effect, record.texture, drawable.blend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::DrawableKind;
    use crate::adapters::testing::AdapterHarness;
    use crate::batched::{TextureId, TintEffect};
    use crate::color::Color;
    use crate::drawable::{DrawableHandle, DrawableRecord, SubQuad};

    fn glyph(x: f32, tint: Option<Color>) -> SubQuad {
        SubQuad {
            origin: Vec2::new(x, 0.0),
            size: Vec2::new(8.0, 12.0),
            frame: None,
            tint,
        }
    }

    #[test]
    fn test_text_run_batches_into_one_write_per_glyph() {
        let mut h = AdapterHarness::new();
        let record = DrawableRecord::sprite(DrawableHandle(1), TextureId::WHITE, Vec2::ONE)
            .with_kind(DrawableKind::Text)
            .with_tint_effect(TintEffect::Fill)
            .with_geometry(Geometry::Quads(vec![glyph(0.0, None), glyph(8.0, Some(Color::RED)), glyph(16.0, None)]));
        h.run(render_quad_list, &record);

        let v = h.pipeline.buffer().vertices();
        assert_eq!(v.len(), 12);
        assert_eq!(v[4].position, [8.0, 0.0]);
        assert_eq!(v[4].tint, Color::RED.to_packed());
        assert_eq!(v[0].tint, Color::WHITE.to_packed());
        assert!(v.iter().all(|v| v.tint_effect == TintEffect::Fill.as_f32()));
        assert!(h.draws.is_empty());
    }

    #[test]
    fn test_empty_list_writes_nothing() {
        let mut h = AdapterHarness::new();
        let record = DrawableRecord::sprite(DrawableHandle(1), TextureId::WHITE, Vec2::ONE)
            .with_kind(DrawableKind::Particles)
            .with_geometry(Geometry::Quads(Vec::new()));
        h.run(render_quad_list, &record);
        assert!(h.pipeline.is_empty());
        assert_eq!(h.stats.dropped, 0);
    }

    #[test]
    fn test_missing_particle_texture_counts_one_drop() {
        let mut h = AdapterHarness::new();
        let record = DrawableRecord::sprite(DrawableHandle(1), TextureId(77), Vec2::ONE)
            .with_kind(DrawableKind::Particles)
            .with_geometry(Geometry::Quads((0..50).map(|i| glyph(i as f32, None)).collect()));
        h.run(render_quad_list, &record);

        assert!(h.pipeline.is_empty());
        assert_eq!(h.stats.dropped, 1);
        assert_eq!(h.diagnostics.suppressed(), 0);
    }
}
