use glam::Vec2;

use crate::batched::{BatchVertex, DiagnosticKey, PipelineWriter};
use crate::drawable::{Geometry, ResolvedDrawable};

/// Nine-slice panel: a 4x4 vertex grid written as one mesh.
///
/// Corners keep their texel size while edges and center stretch. Insets
/// larger than the panel shrink proportionally.
pub fn render_nine_slice(writer: &mut PipelineWriter<'_>, drawable: &ResolvedDrawable<'_>) {
    let record = drawable.record;
    let Geometry::NineSlice { origin, size, insets } = record.geometry else {
        writer.reject(DiagnosticKey::GeometryMismatch(record.kind), || {
            format!("{:?} adapter expects nine-slice geometry", record.kind)
        });
        return;
    };

    let (frame_w, frame_h) = match (&record.frame, writer.texture_size(record.texture)) {
        (Some(frame), _) => (frame.width, frame.height),
        (None, Some((w, h))) => (w as f32, h as f32),
        (None, None) => (1.0, 1.0),
    };
    let uv = writer.uv_rect(record.texture, record.frame.as_ref());

    let xs = stops(insets.left, insets.right, size.x);
    let ys = stops(insets.top, insets.bottom, size.y);
    let us = stops(insets.left, insets.right, frame_w).map(|x| fraction(x, frame_w));
    let vs = stops(insets.top, insets.bottom, frame_h).map(|y| fraction(y, frame_h));

    let mut vertices = [BatchVertex::new([0.0; 2], [0.0; 2], 0); 16];
    for (j, &y) in ys.iter().enumerate() {
        for (i, &x) in xs.iter().enumerate() {
            let s = fraction(x, size.x);
            let t = fraction(y, size.y);
            vertices[j * 4 + i] = BatchVertex::new(
                drawable.world(origin + Vec2::new(x, y)),
                uv.lerp(us[i], vs[j]),
                drawable.tint_at(s, t),
            )
            .with_effect(record.tint_effect);
        }
    }

    let mut indices = [0u32; 54];
    for cell in 0..9u32 {
        let tl = (cell / 3) * 4 + cell % 3;
        let (tr, bl) = (tl + 1, tl + 4);
        let br = bl + 1;
        let at = cell as usize * 6;
        indices[at..at + 6].copy_from_slice(&[tl, tr, br, tl, br, bl]);
    }

    writer.add_vertices(&vertices, &indices, record.texture, drawable.blend);
}

/// Tile layer: one quad per occupied cell, in row-major order.
pub fn render_tiles(writer: &mut PipelineWriter<'_>, drawable: &ResolvedDrawable<'_>) {
    let record = drawable.record;
    let Geometry::Tiles(grid) = &record.geometry else {
        writer.reject(DiagnosticKey::GeometryMismatch(record.kind), || {
            format!("{:?} adapter expects a tile grid", record.kind)
        });
        return;
    };
    if grid.columns == 0 {
        writer.reject(DiagnosticKey::GeometryMismatch(record.kind), || {
            "Tile grid has zero columns".to_string()
        });
        return;
    }
    if !writer.require_resident(record.texture) {
        return;
    }

    let columns = grid.columns as usize;
    let rows = grid.tiles.len().div_ceil(columns);
    let extent = grid.tile_size * Vec2::new(columns as f32, rows as f32);

    for (index, frame) in grid.tiles.iter().enumerate() {
        let Some(frame) = frame else { continue };
        let cell = Vec2::new((index % columns) as f32, (index / columns) as f32);
        let min = cell * grid.tile_size;
        let local = [
            min,
            min + Vec2::new(grid.tile_size.x, 0.0),
            min + grid.tile_size,
            min + Vec2::new(0.0, grid.tile_size.y),
        ];
        let corners = local.map(|p| drawable.world(grid.origin + p));
        let tints = local.map(|p| drawable.tint_at(fraction(p.x, extent.x), fraction(p.y, extent.y)));
        let uv = writer.uv_rect(record.texture, Some(frame));
        writer.add_quad(corners, uv, tints, record.tint_effect, record.texture, drawable.blend);
    }
}

/// Grid lines along one axis: `[0, near, extent - far, extent]`.
fn stops(near: f32, far: f32, extent: f32) -> [f32; 4] {
    let (mut near, mut far) = (near.max(0.0), far.max(0.0));
    let total = near + far;
    if total > extent && total > 0.0 {
        let scale = extent.max(0.0) / total;
        near *= scale;
        far *= scale;
    }
    [0.0, near, extent - far, extent]
}

fn fraction(value: f32, extent: f32) -> f32 {
    if extent > 0.0 { value / extent } else { 0.0 }
}
