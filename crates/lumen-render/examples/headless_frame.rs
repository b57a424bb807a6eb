//! Render one batched frame into an offscreen texture.
//!
//! Draws a grid of sprites over four textures, a nine-slice panel inside a
//! faded group and a particle burst with additive blending, then prints the
//! frame counters.
//!
//! Run with `RUST_LOG=lumen_render=debug cargo run --example headless_frame`.
//! Set `LUMEN_MAX_TEXTURES=1` to watch texture-slot flushes appear.

use glam::{Mat4, Vec2};
use lumen_core::profiling::{ProfilingBackend, init_profiling};
use lumen_render::{
    BatchConfig, BatchManager, BlendMode, Color, DrawableGroup, DrawableHandle, DrawableKind, DrawableRecord,
    FlushReason, FrameItem, Geometry, GraphicsContext, Insets, SubQuad,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

fn solid(color: Color) -> Vec<u8> {
    color.to_packed().to_le_bytes().repeat(16 * 16)
}

fn main() {
    lumen_core::logging::init();
    init_profiling(ProfilingBackend::InProcess);

    let ctx = match GraphicsContext::new_owned_sync() {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("{}", e);
            return;
        }
    };
    tracing::info!("Running on {}", ctx.info().name);

    let mut batcher = match BatchManager::new(ctx.clone(), FORMAT, BatchConfig::from_env()) {
        Ok(batcher) => batcher,
        Err(e) => {
            tracing::error!("{}", e);
            return;
        }
    };

    let palette = [Color::RED, Color::GREEN, Color::BLUE, Color::from_hex(0xFFCC00)];
    let textures: Vec<_> = match palette
        .iter()
        .enumerate()
        .map(|(i, color)| batcher.textures_mut().upload_rgba8(&format!("swatch_{}", i), 16, 16, &solid(*color)))
        .collect::<Result<_, _>>()
    {
        Ok(textures) => textures,
        Err(e) => {
            tracing::error!("{}", e);
            return;
        }
    };

    let mut items = Vec::new();
    for i in 0..64u64 {
        let (x, y) = ((i % 16) as f32 * 40.0, (i / 16) as f32 * 40.0);
        items.push(FrameItem::Draw(
            DrawableRecord::sprite(DrawableHandle(i), textures[i as usize % textures.len()], Vec2::splat(32.0))
                .with_transform([1.0, 0.0, 0.0, 1.0, x, y]),
        ));
    }

    items.push(FrameItem::BeginGroup(DrawableGroup::default().with_alpha(0.6)));
    items.push(FrameItem::Draw(
        DrawableRecord::sprite(DrawableHandle(100), textures[2], Vec2::ONE)
            .with_kind(DrawableKind::NineSlice)
            .with_corner_tints([Color::WHITE, Color::WHITE, Color::BLACK, Color::BLACK])
            .with_geometry(Geometry::NineSlice {
                origin: Vec2::new(40.0, 200.0),
                size: Vec2::new(300.0, 120.0),
                insets: Insets::uniform(4.0),
            }),
    ));
    items.push(FrameItem::EndGroup);

    let particles = (0..200)
        .map(|i| {
            let angle = i as f32 * 0.31;
            SubQuad {
                origin: Vec2::new(angle.cos(), angle.sin()) * (i as f32 * 0.5),
                size: Vec2::splat(3.0),
                frame: None,
                tint: Some(Color::from_hex(0xFF8844).with_alpha(1.0 - i as f32 / 200.0)),
            }
        })
        .collect();
    items.push(FrameItem::Draw(
        DrawableRecord::sprite(DrawableHandle(200), lumen_render::TextureId::WHITE, Vec2::ONE)
            .with_kind(DrawableKind::Particles)
            .with_blend(BlendMode::Add)
            .with_transform([1.0, 0.0, 0.0, 1.0, 480.0, 320.0])
            .with_geometry(Geometry::Quads(particles)),
    ));

    let target = ctx.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("headless_target"),
        size: wgpu::Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    batcher.begin_frame(Mat4::orthographic_rh(0.0, WIDTH as f32, HEIGHT as f32, 0.0, -1.0, 1.0));
    batcher.submit_items(&items);
    let stats = batcher.end_frame();

    let mut encoder = ctx
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("headless_encoder"),
        });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("headless_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(Color::BLACK.to_wgpu()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        batcher.encode(&mut pass);
    }
    ctx.queue().submit(std::iter::once(encoder.finish()));

    println!(
        "{} drawables -> {} draw calls ({} vertices, {} indices)",
        stats.drawables_submitted, stats.draw_calls, stats.vertices, stats.indices
    );
    for reason in FlushReason::ALL {
        let count = stats.flushes(reason);
        if count > 0 {
            println!("  {:<20} {}", reason.to_string(), count);
        }
    }
}
