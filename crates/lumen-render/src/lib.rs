//! Lumen Render - batched 2D drawing on wgpu
//!
//! Turns an ordered list of drawables into as few draw calls as possible
//! while keeping paint order:
//! - Drawables sharing a pipeline, blend mode and texture-slot budget are
//!   coalesced into one vertex buffer and one draw
//! - Fragment shaders are generated for as many texture units as the device
//!   allows, so a batch can mix textures without rebinding
//! - Render adapters turn sprites, tile layers, nine-slices, text, particles
//!   and meshes into vertices
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use glam::{Mat4, Vec2};
//! use lumen_render::{BatchConfig, BatchManager, Color, DrawableHandle, DrawableRecord, GraphicsContext};
//!
//! lumen_core::logging::init();
//! let ctx = GraphicsContext::new_owned_sync().expect("no GPU");
//! let mut batcher = BatchManager::new(ctx, wgpu::TextureFormat::Rgba8UnormSrgb, BatchConfig::default()).unwrap();
//!
//! let atlas = batcher.textures_mut().upload_rgba8("atlas", 2, 2, &[255; 16]).unwrap();
//!
//! batcher.begin_frame(Mat4::orthographic_rh(0.0, 640.0, 480.0, 0.0, -1.0, 1.0));
//! for i in 0..100 {
//!     let sprite = DrawableRecord::sprite(DrawableHandle(i), atlas, Vec2::splat(16.0))
//!         .with_transform([1.0, 0.0, 0.0, 1.0, i as f32 * 4.0, 0.0])
//!         .with_tint(Color::from_hex(0x66CCFF));
//!     batcher.submit(&sprite);
//! }
//! let stats = batcher.end_frame();
//! assert_eq!(stats.draw_calls, 1);
//!
//! // Inside a render pass:
//! // batcher.encode(&mut pass);
//! ```

pub mod adapters;
pub mod batched;
pub mod blend;
pub mod color;
pub mod config;
pub mod context;
mod context_impl;
pub mod drawable;
pub mod error;

pub use adapters::{AdapterFn, AdapterTable, DrawableKind, RenderAdapter};
pub use batched::{
    BatchManager, BatchVertex, DEFAULT_PIPELINE, DrawList, FlushReason, FrameRect, FrameStats, PipelineDescriptor,
    PipelineWriter, ShaderTemplate, TextureId, TintEffect, UvRect,
};
pub use blend::BlendMode;
pub use color::Color;
pub use config::BatchConfig;
pub use context::{GraphicsContext, GraphicsContextDescriptor, GraphicsError};
pub use drawable::{
    DrawableGroup, DrawableHandle, DrawableRecord, FrameItem, Geometry, Insets, MeshData, ResolvedDrawable, SubQuad,
    TileGrid, Tint,
};
pub use error::BatchError;

// Re-export the GPU abstraction so callers can build their own contexts.
pub use lumen_test_utils::RenderContext;
