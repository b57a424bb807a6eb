//! Batching core: vertex staging, texture slots, shader programs, pipelines.
//!
//! Everything below [`BatchManager`] is single-threaded and synchronous. A
//! frame's draws are recorded into a [`DrawList`] and replayed into a render
//! pass afterwards.

mod diagnostics;
mod draw_list;
mod manager;
mod pipeline;
mod shader;
mod slots;
mod texture;
mod vertex;
mod vertex_buffer;

pub use diagnostics::{DiagnosticKey, Diagnostics};
pub use draw_list::{DrawCommand, DrawList, FlushReason, FrameStats};
pub use manager::{BatchManager, DEFAULT_PIPELINE};
pub(crate) use pipeline::SharedBindings;
pub use pipeline::{FrameSink, Pipeline, PipelineDescriptor, PipelineState, PipelineWriter, QUAD_INDICES};
pub use shader::{
    MULTI_TEXTURE_TEMPLATE, SAMPLE_SLOT_TOKEN, ShaderProgram, ShaderProgramCache, ShaderTemplate,
    TEXTURE_BINDINGS_TOKEN, generate_slot_lookup, generate_source, generate_texture_bindings,
};
pub use slots::{SlotBind, TextureSlotTable};
pub use texture::{FrameRect, ResidentTexture, TextureId, TextureRegistry, UvRect};
pub use vertex::{BatchVertex, TintEffect};
pub use vertex_buffer::{UploadedBatch, VertexBuffer};
