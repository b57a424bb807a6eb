use crate::batched::{BatchVertex, DiagnosticKey, PipelineWriter};
use crate::color::Color;
use crate::drawable::{Geometry, MeshData, ResolvedDrawable};

/// Arbitrary indexed mesh, written in a single call.
///
/// UVs are normalized within the record's frame. Vertex colors multiply the
/// record tint, which is sampled over the mesh's bounding box.
pub fn render_mesh(writer: &mut PipelineWriter<'_>, drawable: &ResolvedDrawable<'_>) {
    let record = drawable.record;
    let Geometry::Mesh(mesh) = &record.geometry else {
        writer.reject(DiagnosticKey::GeometryMismatch(record.kind), || {
            format!("{:?} adapter expects mesh geometry", record.kind)
        });
        return;
    };
    if let Some((attribute, count)) = mismatched_attribute(mesh) {
        writer.reject(DiagnosticKey::GeometryMismatch(record.kind), || {
            format!(
                "Mesh has {} positions but {} {}; attribute counts must match",
                mesh.positions.len(),
                count,
                attribute
            )
        });
        return;
    }
    if mesh.positions.is_empty() {
        return;
    }

    let (min, max) = mesh
        .positions
        .iter()
        .fold((mesh.positions[0], mesh.positions[0]), |(min, max), p| (min.min(*p), max.max(*p)));
    let extent = max - min;
    let frame = writer.uv_rect(record.texture, record.frame.as_ref());

    let vertices: Vec<BatchVertex> = mesh
        .positions
        .iter()
        .zip(&mesh.uvs)
        .enumerate()
        .map(|(i, (position, uv))| {
            let s = if extent.x > 0.0 { (position.x - min.x) / extent.x } else { 0.0 };
            let t = if extent.y > 0.0 { (position.y - min.y) / extent.y } else { 0.0 };
            let tint = match &mesh.colors {
                Some(colors) => {
                    let base = record.tint.sample(s, t);
                    let c = colors[i];
                    let alpha = drawable.alpha.iter().sum::<f32>() / 4.0;
                    Color::rgba(base.r * c.r, base.g * c.g, base.b * c.b, base.a * c.a * alpha).to_packed()
                }
                None => drawable.tint_at(s, t),
            };
            BatchVertex::new(drawable.world(*position), frame.lerp(uv.x, uv.y), tint).with_effect(record.tint_effect)
        })
        .collect();

    writer.add_vertices(&vertices, &mesh.indices, record.texture, drawable.blend);
}

/// First attribute whose length differs from the position count.
fn mismatched_attribute(mesh: &MeshData) -> Option<(&'static str, usize)> {
    let positions = mesh.positions.len();
    if mesh.uvs.len() != positions {
        return Some(("uvs", mesh.uvs.len()));
    }
    match &mesh.colors {
        Some(colors) if colors.len() != positions => Some(("colors", colors.len())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::adapters::DrawableKind;
    use crate::adapters::testing::AdapterHarness;
    use crate::batched::TextureId;
    use crate::drawable::{DrawableHandle, DrawableRecord};

    fn triangle_mesh(indices: Vec<u32>) -> DrawableRecord {
        DrawableRecord::sprite(DrawableHandle(9), TextureId::WHITE, Vec2::ONE)
            .with_kind(DrawableKind::Mesh)
            .with_transform([1.0, 0.0, 0.0, 1.0, 5.0, 5.0])
            .with_geometry(Geometry::Mesh(MeshData {
                positions: vec![Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0), Vec2::new(0.0, 4.0)],
                uvs: vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
                colors: Some(vec![Color::RED, Color::WHITE, Color::WHITE]),
                indices,
            }))
    }

    #[test]
    fn test_mesh_is_written_in_one_call() {
        let mut h = AdapterHarness::new();
        h.run(render_mesh, &triangle_mesh(vec![0, 1, 2]));

        let v = h.pipeline.buffer().vertices();
        assert_eq!(v.len(), 3);
        assert_eq!(v[1].position, [9.0, 5.0]);
        assert_eq!(v[2].uv, [0.0, 1.0]);
        assert_eq!(v[0].tint, Color::RED.to_packed());
        assert_eq!(h.pipeline.buffer().indices(), &[0, 1, 2]);
    }

    #[test]
    fn test_partial_triangle_is_dropped() {
        let mut h = AdapterHarness::new();
        h.run(render_mesh, &triangle_mesh(vec![0, 1]));
        assert!(h.pipeline.is_empty());
        assert_eq!(h.stats.dropped, 1);
    }

    #[test]
    fn test_attribute_mismatch_is_rejected() {
        let mut h = AdapterHarness::new();
        let mut record = triangle_mesh(vec![0, 1, 2]);
        if let Geometry::Mesh(mesh) = &mut record.geometry {
            mesh.uvs.pop();
        }
        h.run(render_mesh, &record);
        assert!(h.pipeline.is_empty());
        assert_eq!(h.stats.dropped, 1);
    }

    #[test]
    fn test_color_count_mismatch_names_colors() {
        let mut record = triangle_mesh(vec![0, 1, 2]);
        let Geometry::Mesh(mesh) = &mut record.geometry else {
            unreachable!()
        };
        mesh.colors = Some(vec![Color::RED]);

        assert_eq!(mismatched_attribute(mesh), Some(("colors", 1)));
        mesh.uvs.pop();
        assert_eq!(mismatched_attribute(mesh), Some(("uvs", 2)));
        mesh.uvs.push(Vec2::ONE);
        mesh.colors = None;
        assert_eq!(mismatched_attribute(mesh), None);
    }
}
