//! Benchmarks for the batching hot path against the mock render context.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::{Mat4, Vec2};
use lumen_render::batched::generate_source;
use lumen_render::{
    BatchConfig, BatchManager, BatchVertex, BlendMode, DrawableHandle, DrawableRecord, RenderContext, ShaderTemplate,
    TextureId,
};
use lumen_test_utils::MockRenderContext;

fn manager(textures: usize) -> (BatchManager, Vec<TextureId>) {
    let ctx: Arc<dyn RenderContext> = Arc::new(MockRenderContext::new());
    let mut batcher = BatchManager::new(ctx, wgpu::TextureFormat::Bgra8UnormSrgb, BatchConfig::default()).unwrap();
    let ids = (0..textures)
        .map(|i| batcher.textures_mut().upload_rgba8(&format!("bench_{}", i), 1, 1, &[255; 4]).unwrap())
        .collect();
    (batcher, ids)
}

fn bench_submit_sprites(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_sprites");

    for count in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(count as u64));

        for textures in [1, 8, 32] {
            let (mut batcher, ids) = manager(textures);
            let sprites: Vec<DrawableRecord> = (0..count)
                .map(|i| {
                    DrawableRecord::sprite(DrawableHandle(i as u64), ids[i % textures], Vec2::splat(16.0))
                        .with_transform([1.0, 0.0, 0.0, 1.0, (i % 100) as f32, (i / 100) as f32])
                })
                .collect();

            group.bench_with_input(
                BenchmarkId::new(format!("{}_textures", textures), count),
                &sprites,
                |b, sprites| {
                    b.iter(|| {
                        batcher.begin_frame(Mat4::IDENTITY);
                        for sprite in sprites {
                            batcher.submit(black_box(sprite));
                        }
                        black_box(batcher.end_frame())
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_raw_vertices(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_vertices");
    let quad = [
        BatchVertex::new([0.0, 0.0], [0.0, 0.0], u32::MAX),
        BatchVertex::new([1.0, 0.0], [1.0, 0.0], u32::MAX),
        BatchVertex::new([1.0, 1.0], [1.0, 1.0], u32::MAX),
        BatchVertex::new([0.0, 1.0], [0.0, 1.0], u32::MAX),
    ];

    group.throughput(Throughput::Elements(10000));
    group.bench_function("quads_10000", |b| {
        let (mut batcher, _) = manager(0);
        b.iter(|| {
            batcher.begin_frame(Mat4::IDENTITY);
            batcher.set_active_pipeline(lumen_render::DEFAULT_PIPELINE).unwrap();
            if let Some(mut writer) = batcher.active_writer() {
                for _ in 0..10000 {
                    writer.add_vertices(&quad, &lumen_render::batched::QUAD_INDICES, TextureId::WHITE, BlendMode::Normal);
                }
            }
            black_box(batcher.end_frame())
        });
    });

    group.finish();
}

fn bench_shader_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("shader_generation");
    let template = ShaderTemplate::multi_texture();

    for units in [1, 8, 16, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(units), &units, |b, &units| {
            b.iter(|| generate_source(black_box(template.source()), units).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_submit_sprites, bench_raw_vertices, bench_shader_generation);
criterion_main!(benches);
