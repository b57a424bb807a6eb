//! GPU context abstraction and test utilities for Lumen.
//!
//! The batcher never talks to `wgpu::Device` directly. Every resource it
//! creates goes through [`RenderContext`], which has two implementations:
//!
//! - the real `GraphicsContext` in `lumen-render`
//! - `MockRenderContext` (requires the `mock` feature), which records every
//!   call, keeps the bytes written to buffers and reports configurable limits
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use lumen_test_utils::{MockRenderContext, RenderContext};
//! use wgpu::*;
//!
//! let mock = MockRenderContext::new().with_max_sampled_textures(4);
//! assert_eq!(mock.limits().max_sampled_textures_per_shader_stage, 4);
//!
//! let buffer = mock.create_buffer(&BufferDescriptor {
//!     label: Some("batch_vertices"),
//!     size: 1024,
//!     usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
//!     mapped_at_creation: false,
//! });
//! mock.write_buffer(&buffer, 0, &[1, 2, 3, 4]);
//!
//! assert!(buffer.is_mock());
//! assert_eq!(mock.buffer_data(buffer.mock_id().unwrap())[..4], [1, 2, 3, 4]);
//! # }
//! ```
//!
//! All wrapper types are owned and cheap to clone, so no lifetimes leak out
//! of the trait and `dyn RenderContext` stays object safe.

pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_render;
pub mod render_context;

pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_render::*;
pub use render_context::*;
