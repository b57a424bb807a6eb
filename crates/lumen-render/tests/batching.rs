//! End-to-end batching behaviour against the mock render context.

use std::sync::Arc;

use glam::{Mat4, Vec2};
use lumen_render::batched::DiagnosticKey;
use lumen_render::{
    BatchConfig, BatchError, BatchManager, BatchVertex, BlendMode, Color, DrawableGroup, DrawableHandle, DrawableKind,
    DrawableRecord, FlushReason, FrameItem, PipelineDescriptor, RenderContext, ShaderTemplate, TextureId,
};
use lumen_test_utils::MockRenderContext;

fn manager_with(mock: &Arc<MockRenderContext>, config: BatchConfig) -> BatchManager {
    let ctx: Arc<dyn RenderContext> = mock.clone();
    BatchManager::new(ctx, wgpu::TextureFormat::Bgra8UnormSrgb, config).unwrap()
}

fn sprite(id: u64, texture: TextureId, x: f32) -> DrawableRecord {
    DrawableRecord::sprite(DrawableHandle(id), texture, Vec2::splat(8.0)).with_transform([1.0, 0.0, 0.0, 1.0, x, 0.0])
}

fn upload(batcher: &mut BatchManager, label: &str) -> TextureId {
    batcher.textures_mut().upload_rgba8(label, 2, 2, &[255; 16]).unwrap()
}

/// Vertices of every recorded draw, read back from the mock's buffers.
fn uploaded_vertices(mock: &MockRenderContext, batcher: &BatchManager) -> Vec<BatchVertex> {
    let mut vertices = Vec::new();
    for draw in batcher.draw_list() {
        let data = mock.buffer_data(draw.vertex_buffer.mock_id().unwrap());
        for chunk in data.chunks_exact(BatchVertex::SIZE as usize).take(draw.vertex_count as usize) {
            vertices.push(bytemuck::pod_read_unaligned::<BatchVertex>(chunk));
        }
    }
    vertices
}

#[test]
fn test_three_quads_one_texture_is_one_draw() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default().with_vertex_capacity(4000));
    let texture = upload(&mut batcher, "sprites");

    batcher.begin_frame(Mat4::IDENTITY);
    for i in 0..3 {
        batcher.submit(&sprite(i, texture, i as f32 * 10.0));
    }
    let stats = batcher.end_frame();

    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.vertices, 12);
    assert_eq!(stats.indices, 18);
    assert_eq!(stats.flushes(FlushReason::EndOfFrame), 1);
    assert_eq!(batcher.draw_list().commands()[0].textures, vec![texture]);
}

#[test]
fn test_single_slot_forces_flush_between_textures() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default().with_max_texture_units(1));
    let a = upload(&mut batcher, "a");
    let b = upload(&mut batcher, "b");

    batcher.begin_frame(Mat4::IDENTITY);
    batcher.submit(&sprite(1, a, 0.0));
    batcher.submit(&sprite(2, b, 10.0));
    let stats = batcher.end_frame();

    let draws = batcher.draw_list().commands();
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(draws[0].vertex_count, 4);
    assert_eq!(draws[1].vertex_count, 4);
    assert_eq!(draws[0].reason, FlushReason::TextureSlots);
    assert_eq!(draws[1].reason, FlushReason::EndOfFrame);
    assert_eq!(draws[0].textures, vec![a]);
    assert_eq!(draws[1].textures, vec![b]);
}

#[test]
fn test_single_vertex_writes_split_at_capacity() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default().with_vertex_capacity(2000));

    batcher.begin_frame(Mat4::IDENTITY);
    batcher.set_active_pipeline(lumen_render::DEFAULT_PIPELINE).unwrap();
    {
        let mut writer = batcher.active_writer().unwrap();
        let vertex = BatchVertex::new([1.0, 2.0], [0.0, 0.0], u32::MAX);
        for _ in 0..5000 {
            writer.add_vertices(&[vertex], &[], TextureId::WHITE, BlendMode::Normal);
            assert!(writer.pipeline().buffer().vertex_count() <= 2000);
        }
    }
    let stats = batcher.end_frame();

    let counts: Vec<u32> = batcher.draw_list().iter().map(|d| d.vertex_count).collect();
    assert_eq!(counts, [2000, 2000, 1000]);
    assert_eq!(stats.flushes(FlushReason::BufferCapacity), 2);
    assert_eq!(stats.flushes(FlushReason::EndOfFrame), 1);
}

#[test]
fn test_draw_count_follows_capacity_and_blend_changes() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default().with_vertex_capacity(40));

    batcher.begin_frame(Mat4::IDENTITY);
    for i in 0..25 {
        batcher.submit(&sprite(i, TextureId::WHITE, 0.0));
    }
    assert_eq!(batcher.end_frame().draw_calls, 3);

    batcher.begin_frame(Mat4::IDENTITY);
    for (i, blend) in [BlendMode::Normal, BlendMode::Normal, BlendMode::Add, BlendMode::Add, BlendMode::Normal]
        .into_iter()
        .enumerate()
    {
        batcher.submit(&sprite(i as u64, TextureId::WHITE, 0.0).with_blend(blend));
    }
    let stats = batcher.end_frame();
    assert_eq!(stats.draw_calls, 3);
    assert_eq!(stats.flushes(FlushReason::BlendChange), 2);

    let blends: Vec<BlendMode> = batcher.draw_list().iter().map(|d| d.blend).collect();
    assert_eq!(blends, [BlendMode::Normal, BlendMode::Add, BlendMode::Normal]);
}

#[test]
fn test_uploaded_vertices_keep_submission_order() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default().with_vertex_capacity(8).with_max_texture_units(2));
    let textures = [upload(&mut batcher, "a"), upload(&mut batcher, "b"), upload(&mut batcher, "c")];

    batcher.begin_frame(Mat4::IDENTITY);
    for i in 0..7u64 {
        let texture = textures[i as usize % 3];
        batcher.submit(&sprite(i, texture, i as f32 * 100.0));
    }
    batcher.end_frame();

    let xs: Vec<f32> = uploaded_vertices(&mock, &batcher)
        .iter()
        .step_by(4)
        .map(|v| v.position[0])
        .collect();
    assert_eq!(xs, [0.0, 100.0, 200.0, 300.0, 400.0, 500.0, 600.0]);
}

#[test]
fn test_slots_are_assigned_in_first_seen_order() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());
    let a = upload(&mut batcher, "a");
    let b = upload(&mut batcher, "b");
    let c = upload(&mut batcher, "c");

    batcher.begin_frame(Mat4::IDENTITY);
    for (i, texture) in [a, b, a, c].into_iter().enumerate() {
        batcher.submit(&sprite(i as u64, texture, 0.0));
    }
    batcher.end_frame();

    let slots: Vec<u32> = uploaded_vertices(&mock, &batcher).iter().step_by(4).map(|v| v.slot()).collect();
    assert_eq!(slots, [0, 1, 0, 2]);
    assert_eq!(batcher.draw_list().commands()[0].textures, vec![a, b, c]);
}

#[test]
fn test_empty_flush_changes_nothing() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());

    batcher.begin_frame(Mat4::IDENTITY);
    batcher.submit(&sprite(1, TextureId::WHITE, 0.0));
    assert!(batcher.flush());

    let calls_before = mock.call_count();
    assert!(!batcher.flush());
    assert!(!batcher.flush());
    assert_eq!(mock.call_count(), calls_before);

    let pipeline = batcher.pipeline(lumen_render::DEFAULT_PIPELINE).unwrap();
    assert!(pipeline.is_empty());
    assert!(pipeline.slots().is_empty());
    assert_eq!(batcher.end_frame().draw_calls, 1);
}

#[test]
fn test_empty_frame_records_no_draws() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());
    batcher.begin_frame(Mat4::IDENTITY);
    assert_eq!(batcher.end_frame().draw_calls, 0);
    assert!(batcher.draw_list().is_empty());
}

#[test]
fn test_compile_failure_falls_back_to_one_unit() {
    let mock = Arc::new(MockRenderContext::new());
    mock.fail_shader_compilation_when(|source| source.contains("texture1"));
    let batcher = manager_with(&mock, BatchConfig::default());

    let pipeline = batcher.pipeline(lumen_render::DEFAULT_PIPELINE).unwrap();
    assert_eq!(pipeline.texture_units(), 1);
    assert!(batcher.program_cache().has_failed("multi", 16));
    assert_eq!(mock.count_shader_failures(), 1);
}

#[test]
fn test_compile_failure_without_fallback_is_fatal() {
    let mock = Arc::new(MockRenderContext::new());
    mock.fail_shader_compilation_when(|_| true);
    let ctx: Arc<dyn RenderContext> = mock.clone();

    let err = match BatchManager::new(ctx, wgpu::TextureFormat::Bgra8UnormSrgb, BatchConfig::default()) {
        Ok(_) => panic!("manager should not start without a program"),
        Err(err) => err,
    };
    match &err {
        BatchError::ProgramCompilation { units, .. } => assert_eq!(*units, 16),
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.to_string().contains("16 texture unit(s)"));
}

#[test]
fn test_group_blend_overrides_children() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());

    batcher.begin_frame(Mat4::IDENTITY);
    batcher.submit_items(&[
        FrameItem::BeginGroup(DrawableGroup::default().with_blend(BlendMode::Add).with_alpha(0.5)),
        FrameItem::Draw(sprite(1, TextureId::WHITE, 0.0).with_blend(BlendMode::Multiply)),
        FrameItem::BeginGroup(DrawableGroup::default().with_blend(BlendMode::Screen)),
        FrameItem::Draw(sprite(2, TextureId::WHITE, 0.0)),
        FrameItem::EndGroup,
        FrameItem::EndGroup,
        FrameItem::Draw(sprite(3, TextureId::WHITE, 0.0).with_blend(BlendMode::Multiply)),
    ]);
    batcher.end_frame();

    let blends: Vec<BlendMode> = batcher.draw_list().iter().map(|d| d.blend).collect();
    assert_eq!(blends, [BlendMode::Add, BlendMode::Multiply]);

    let first = uploaded_vertices(&mock, &batcher)[0];
    assert_eq!(first.tint, Color::WHITE.with_alpha(0.5).to_packed());
}

#[test]
fn test_child_blend_is_kept_when_group_has_none() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());

    batcher.begin_frame(Mat4::IDENTITY);
    batcher.pre_batch(&DrawableGroup::default());
    batcher.submit(&sprite(1, TextureId::WHITE, 0.0).with_blend(BlendMode::Add));
    batcher.post_batch();
    batcher.end_frame();

    assert_eq!(batcher.draw_list().commands()[0].blend, BlendMode::Add);
}

#[test]
fn test_missing_texture_is_skipped_and_reported_once() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());
    let missing = TextureId(999);

    for _ in 0..3 {
        batcher.begin_frame(Mat4::IDENTITY);
        batcher.submit(&sprite(1, missing, 0.0));
        batcher.submit(&sprite(2, TextureId::WHITE, 0.0));
        let stats = batcher.end_frame();
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.dropped, 1);
    }

    assert!(batcher.diagnostics().has_reported(&DiagnosticKey::MissingTexture(missing)));
    assert_eq!(batcher.diagnostics().suppressed(), 2);
}

#[test]
fn test_pipeline_switch_flushes_previous_pipeline() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());
    batcher
        .register_pipeline(
            "outline",
            PipelineDescriptor::new(ShaderTemplate::multi_texture()).with_max_texture_units(2),
        )
        .unwrap();

    batcher.begin_frame(Mat4::IDENTITY);
    batcher.submit(&sprite(1, TextureId::WHITE, 0.0));
    batcher.submit(&sprite(2, TextureId::WHITE, 0.0).with_pipeline("outline"));
    batcher.submit(&sprite(3, TextureId::WHITE, 0.0).with_pipeline("outline"));
    let stats = batcher.end_frame();

    let draws = batcher.draw_list().commands();
    assert_eq!(draws.len(), 2);
    assert_eq!(&*draws[0].pipeline, "multi");
    assert_eq!(draws[0].reason, FlushReason::PipelineSwitch);
    assert_eq!(&*draws[1].pipeline, "outline");
    assert_eq!(draws[1].vertex_count, 8);
    assert_eq!(stats.pipeline_switches, 1);
    assert_eq!(batcher.pipeline("outline").unwrap().texture_units(), 2);
}

#[test]
fn test_unknown_and_duplicate_pipelines() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());

    assert_eq!(
        batcher.set_active_pipeline("missing"),
        Err(BatchError::UnknownPipeline("missing".into()))
    );
    assert_eq!(
        batcher.register_pipeline("multi", PipelineDescriptor::new(ShaderTemplate::multi_texture())),
        Err(BatchError::DuplicatePipeline("multi".into()))
    );

    batcher.begin_frame(Mat4::IDENTITY);
    batcher.submit(&sprite(1, TextureId::WHITE, 0.0).with_pipeline("missing"));
    let stats = batcher.end_frame();
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.draw_calls, 0);
}

#[test]
fn test_unknown_adapter_drops_drawable() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());

    batcher.begin_frame(Mat4::IDENTITY);
    batcher.submit(&sprite(1, TextureId::WHITE, 0.0).with_kind(DrawableKind::Custom(7)));
    let stats = batcher.end_frame();

    assert_eq!(stats.drawables_submitted, 1);
    assert_eq!(stats.dropped, 1);
    assert!(batcher.diagnostics().has_reported(&DiagnosticKey::UnknownAdapter(DrawableKind::Custom(7))));
}

#[test]
fn test_lowering_texture_units_rebuilds_programs() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());
    let textures: Vec<TextureId> = (0..3).map(|i| upload(&mut batcher, &format!("t{}", i))).collect();

    batcher.begin_frame(Mat4::IDENTITY);
    batcher.submit(&sprite(0, textures[0], 0.0));
    batcher.set_max_texture_units(2).unwrap();
    for (i, texture) in textures.iter().enumerate() {
        batcher.submit(&sprite(i as u64 + 1, *texture, 0.0));
    }
    let stats = batcher.end_frame();

    assert_eq!(batcher.pipeline("multi").unwrap().texture_units(), 2);
    assert_eq!(stats.flushes(FlushReason::TextureUnitChange), 1);
    assert_eq!(stats.flushes(FlushReason::TextureSlots), 1);
    assert_eq!(stats.draw_calls, 3);
    assert!(batcher.program_cache().contains("multi", 2));
}

#[test]
fn test_failed_unit_change_leaves_every_pipeline_untouched() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());
    let source = format!("// CUSTOM\n{}", ShaderTemplate::multi_texture().source());
    batcher
        .register_pipeline("custom", PipelineDescriptor::new(ShaderTemplate::new("custom", source)))
        .unwrap();
    mock.fail_shader_compilation_when(|source| source.starts_with("// CUSTOM"));

    let err = batcher.set_max_texture_units(2).unwrap_err();

    assert!(matches!(err, BatchError::ProgramCompilation { ref template, .. } if template == "custom"));
    assert_eq!(batcher.max_texture_units(), 16);
    assert_eq!(batcher.config().texture_unit_cap(), 16);
    assert_eq!(batcher.pipeline("multi").unwrap().texture_units(), 16);
    assert_eq!(batcher.pipeline("custom").unwrap().texture_units(), 16);
}

#[test]
fn test_round_pixels_snaps_uploaded_positions() {
    let record = DrawableRecord::sprite(DrawableHandle(1), TextureId::WHITE, Vec2::splat(8.0))
        .with_transform([1.0, 0.0, 0.0, 1.0, 10.4, 20.6]);

    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default().with_round_pixels(true));
    batcher.begin_frame(Mat4::IDENTITY);
    batcher.submit(&record);
    batcher.end_frame();
    let snapped: Vec<[f32; 2]> = uploaded_vertices(&mock, &batcher).iter().map(|v| v.position).collect();
    assert_eq!(snapped, [[10.0, 21.0], [18.0, 21.0], [18.0, 29.0], [10.0, 29.0]]);

    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());
    batcher.begin_frame(Mat4::IDENTITY);
    batcher.submit(&record);
    batcher.end_frame();
    let exact = uploaded_vertices(&mock, &batcher);
    assert_eq!(exact[0].position, [10.4, 20.6]);
}

#[test]
fn test_projection_is_uploaded_each_frame() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default());
    let projection = Mat4::orthographic_rh(0.0, 320.0, 240.0, 0.0, -1.0, 1.0);

    batcher.begin_frame(projection);

    let globals = (0..)
        .map_while(|id| mock.buffer_label(id).map(|label| (id, label)))
        .find(|(_, label)| label == "lumen_globals")
        .map(|(id, _)| id)
        .unwrap();
    assert_eq!(mock.buffer_data(globals), bytemuck::bytes_of(&projection));
}

#[test]
fn test_gpu_regions_are_recycled_across_frames() {
    let mock = Arc::new(MockRenderContext::new());
    let mut batcher = manager_with(&mock, BatchConfig::default().with_max_texture_units(1));
    let a = upload(&mut batcher, "a");
    let b = upload(&mut batcher, "b");

    let run_frame = |batcher: &mut BatchManager| {
        batcher.begin_frame(Mat4::IDENTITY);
        batcher.submit(&sprite(1, a, 0.0));
        batcher.submit(&sprite(2, b, 0.0));
        batcher.end_frame();
    };

    run_frame(&mut batcher);
    let creates = mock.count_buffer_creates();
    run_frame(&mut batcher);
    run_frame(&mut batcher);
    assert_eq!(mock.count_buffer_creates(), creates);
}
