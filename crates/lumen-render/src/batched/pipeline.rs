//! A named batching pipeline: one program, one vertex buffer, one slot table.
//!
//! The pipeline owns the flush boundary. [`Pipeline::add_vertices`] may close
//! the open batch before it writes, when the write would not fit, when its
//! texture needs a slot and none is free, or when its blend mode differs from
//! the batch's. Callers never see these as errors; the data they pass is
//! always written into the batch that is open when the call returns.

use std::sync::Arc;

use lumen_core::alloc::HashMap;
use lumen_core::profiling::{profile_function, profile_scope};
use lumen_test_utils::{
    BatchPipelineDescriptor, GpuBindGroup, GpuBindGroupLayout, GpuRenderPipeline, GpuSampler,
    GpuTextureView, RenderContext, TextureBindGroupDescriptor,
};

use super::diagnostics::{DiagnosticKey, Diagnostics};
use super::draw_list::{DrawCommand, DrawList, FlushReason, FrameStats};
use super::shader::{ShaderProgram, ShaderTemplate};
use super::slots::TextureSlotTable;
use super::texture::{FrameRect, TextureId, TextureRegistry, UvRect};
use super::vertex::{BatchVertex, TintEffect};
use super::vertex_buffer::VertexBuffer;
use crate::blend::BlendMode;
use crate::error::BatchError;

/// Upper bound on cached texture bind groups per pipeline.
const MAX_CACHED_BIND_GROUPS: usize = 256;

/// Batch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No batch open.
    Idle,
    /// A batch holds at least one vertex.
    Accumulating,
    /// Upload and draw recording in progress.
    Flushing,
}

/// Options for registering a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineDescriptor {
    pub template: ShaderTemplate,
    /// Cap on texture units for this pipeline; the manager's cap still applies.
    pub max_texture_units: Option<u32>,
    /// Vertex capacity; `None` uses the manager's.
    pub vertex_capacity: Option<usize>,
}

impl PipelineDescriptor {
    pub fn new(template: ShaderTemplate) -> Self {
        Self {
            template,
            max_texture_units: None,
            vertex_capacity: None,
        }
    }

    pub fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_texture_units = Some(units);
        self
    }

    pub fn with_vertex_capacity(mut self, vertices: usize) -> Self {
        self.vertex_capacity = Some(vertices);
        self
    }
}

/// Frame-scoped state a pipeline writes into while batching.
pub struct FrameSink<'a> {
    pub textures: &'a TextureRegistry,
    pub draws: &'a mut DrawList,
    pub diagnostics: &'a mut Diagnostics,
    pub stats: &'a mut FrameStats,
}

/// GPU objects every pipeline of a manager shares.
#[derive(Clone)]
pub(crate) struct SharedBindings {
    pub globals_layout: GpuBindGroupLayout,
    pub sampler: GpuSampler,
    pub format: wgpu::TextureFormat,
}

pub struct Pipeline {
    name: Arc<str>,
    ctx: Arc<dyn RenderContext>,
    template: ShaderTemplate,
    unit_cap: Option<u32>,
    program: Arc<ShaderProgram>,
    buffer: VertexBuffer,
    slots: TextureSlotTable,
    state: PipelineState,
    blend: BlendMode,
    shared: SharedBindings,
    round_pixels: bool,
    render_pipelines: HashMap<BlendMode, GpuRenderPipeline>,
    bind_groups: HashMap<Vec<TextureId>, GpuBindGroup>,
    bind_group_generation: u64,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: Arc<str>,
        ctx: Arc<dyn RenderContext>,
        descriptor: &PipelineDescriptor,
        program: Arc<ShaderProgram>,
        vertex_capacity: usize,
        index_capacity: usize,
        shared: SharedBindings,
        round_pixels: bool,
    ) -> Self {
        let buffer = VertexBuffer::new(name.clone(), vertex_capacity, index_capacity);
        let slots = TextureSlotTable::new(program.units);
        Self {
            name,
            ctx,
            template: descriptor.template.clone(),
            unit_cap: descriptor.max_texture_units,
            program,
            buffer,
            slots,
            state: PipelineState::Idle,
            blend: BlendMode::Normal,
            shared,
            round_pixels,
            render_pipelines: HashMap::new(),
            bind_groups: HashMap::new(),
            bind_group_generation: 0,
        }
    }

    /// Queue geometry for drawing.
    ///
    /// `indices` index into `vertices` and must describe whole triangles; an
    /// empty slice draws `vertices` in order. The pipeline stamps the texture
    /// slot onto every vertex.
    ///
    /// May flush the open batch first. Drawables that cannot be drawn at all
    /// (too large for the buffer, texture not resident, malformed indices)
    /// are dropped with a one-time warning.
    pub fn add_vertices(
        &mut self,
        sink: &mut FrameSink<'_>,
        vertices: &[BatchVertex],
        indices: &[u32],
        texture: TextureId,
        blend: BlendMode,
    ) {
        profile_function!();
        if vertices.is_empty() {
            return;
        }

        if let Err(err) = validate_indices(vertices.len(), indices) {
            sink.stats.dropped += 1;
            sink.diagnostics.warn_once(DiagnosticKey::InvalidGeometry(self.name.clone()), || {
                format!("Dropping drawable on pipeline '{}': {}", self.name, err)
            });
            return;
        }

        let index_count = if indices.is_empty() { vertices.len() } else { indices.len() };
        if vertices.len() > self.buffer.capacity() || index_count > self.buffer.index_capacity() {
            sink.stats.dropped += 1;
            let (requested, capacity) = if vertices.len() > self.buffer.capacity() {
                (vertices.len(), self.buffer.capacity())
            } else {
                (index_count, self.buffer.index_capacity())
            };
            let err = BatchError::BufferOverflow { requested, capacity };
            sink.diagnostics.warn_once(DiagnosticKey::OversizeWrite(self.name.clone()), || {
                format!("Dropping drawable on pipeline '{}': {}", self.name, err)
            });
            return;
        }

        if !sink.textures.contains(texture) {
            sink.stats.dropped += 1;
            sink.diagnostics.warn_once(DiagnosticKey::MissingTexture(texture), || {
                BatchError::TextureNotResident(texture).to_string()
            });
            return;
        }

        let blend = if blend.is_supported() {
            blend
        } else {
            sink.diagnostics.warn_once(DiagnosticKey::UnsupportedBlend(blend), || {
                format!("Blend mode '{}' is not supported, using normal", blend.label())
            });
            blend.resolve()
        };

        if self.state == PipelineState::Accumulating && blend != self.blend {
            self.flush(sink, FlushReason::BlendChange);
        }

        if self.buffer.is_full(vertices.len()) || self.buffer.is_index_full(index_count) {
            self.flush(sink, FlushReason::BufferCapacity);
        }

        let slot = match self.slots.bind(texture).slot() {
            Some(slot) => slot,
            None => {
                self.flush(sink, FlushReason::TextureSlots);
                let rebound = self.slots.bind(texture).slot();
                debug_assert!(rebound.is_some(), "empty slot table refused a texture");
                rebound.unwrap_or(0)
            }
        };

        self.blend = blend;
        self.state = PipelineState::Accumulating;

        let base = self.buffer.vertex_count() as u32;
        for vertex in vertices {
            let mut vertex = *vertex;
            vertex.texture_slot = slot as f32;
            if self.round_pixels {
                vertex.position = [vertex.position[0].round(), vertex.position[1].round()];
            }
            self.buffer.write(vertex);
        }
        if indices.is_empty() {
            self.buffer.write_indices(base..base + vertices.len() as u32);
        } else {
            self.buffer.write_indices(indices.iter().map(|&i| base + i));
        }

        tracing::trace!(
            "'{}' queued {} vertices with {} in slot {}",
            self.name,
            vertices.len(),
            texture,
            slot
        );
    }

    /// Close the open batch: upload it and record one draw.
    ///
    /// Returns `false`, touching nothing, when the batch is empty.
    pub fn flush(&mut self, sink: &mut FrameSink<'_>, reason: FlushReason) -> bool {
        profile_function!();
        if self.buffer.is_empty() {
            return false;
        }
        self.state = PipelineState::Flushing;

        let Some(upload) = self.buffer.upload(self.ctx.as_ref()) else {
            self.state = PipelineState::Idle;
            return false;
        };

        let textures = self.slots.textures().to_vec();
        let texture_bind_group = self.texture_bind_group(sink, &textures);
        let render_pipeline = self.render_pipeline(self.blend);

        tracing::debug!(
            "Flush '{}' ({}): {} vertices, {} indices, {} textures",
            self.name,
            reason,
            upload.vertex_count,
            upload.index_count,
            textures.len()
        );
        sink.stats.record_draw(reason, upload.vertex_count, upload.index_count);
        sink.draws.push(DrawCommand {
            pipeline: self.name.clone(),
            render_pipeline,
            texture_bind_group,
            vertex_buffer: upload.vertex_buffer,
            index_buffer: upload.index_buffer,
            vertex_count: upload.vertex_count,
            index_count: upload.index_count,
            blend: self.blend,
            textures,
            reason,
        });

        self.buffer.reset();
        self.slots.clear();
        self.state = PipelineState::Idle;
        true
    }

    fn texture_bind_group(&mut self, sink: &mut FrameSink<'_>, textures: &[TextureId]) -> GpuBindGroup {
        profile_scope!("texture_bind_group");
        if self.bind_group_generation != sink.textures.generation()
            || self.bind_groups.len() >= MAX_CACHED_BIND_GROUPS
        {
            self.bind_groups.clear();
            self.bind_group_generation = sink.textures.generation();
        }
        if let Some(bind_group) = self.bind_groups.get(textures) {
            return bind_group.clone();
        }

        let white = sink.textures.white_view();
        let mut views: Vec<GpuTextureView> = Vec::with_capacity(self.program.units as usize);
        for &texture in textures {
            match sink.textures.view(texture) {
                Some(view) => views.push(view.clone()),
                None => {
                    sink.diagnostics.warn_once(DiagnosticKey::VanishedTexture(texture), || {
                        format!("Texture {} was removed before its batch was drawn", texture)
                    });
                    views.push(white.clone());
                }
            }
        }
        // Every declared binding needs a view, used or not.
        views.resize(self.program.units as usize, white.clone());

        let bind_group = self.ctx.create_texture_bind_group(&TextureBindGroupDescriptor {
            label: Some(&format!("{}_textures", self.name)),
            layout: &self.program.texture_layout,
            sampler: &self.shared.sampler,
            views: &views,
        });
        self.bind_groups.insert(textures.to_vec(), bind_group.clone());
        bind_group
    }

    fn render_pipeline(&mut self, blend: BlendMode) -> GpuRenderPipeline {
        if let Some(pipeline) = self.render_pipelines.get(&blend) {
            return pipeline.clone();
        }

        let label = format!("{}_{}_x{}", self.name, blend.label(), self.program.units);
        let pipeline = self.ctx.create_batch_pipeline(&BatchPipelineDescriptor {
            label: Some(&label),
            shader: &self.program.module,
            bind_group_layouts: &[&self.shared.globals_layout, &self.program.texture_layout],
            vertex_layout: BatchVertex::layout(),
            blend: blend.to_blend_state(),
            format: self.shared.format,
        });
        self.render_pipelines.insert(blend, pipeline.clone());
        pipeline
    }

    /// Swap in a program built for a different unit count.
    ///
    /// The batch must be empty.
    pub(crate) fn set_program(&mut self, program: Arc<ShaderProgram>) {
        debug_assert!(self.buffer.is_empty(), "program swapped with an open batch");
        if Arc::ptr_eq(&self.program, &program) {
            return;
        }
        self.slots.set_capacity(program.units);
        self.program = program;
        self.render_pipelines.clear();
        self.bind_groups.clear();
    }

    /// Recycle GPU regions and drop any batch left open by an unfinished frame.
    pub(crate) fn begin_frame(&mut self) {
        if !self.buffer.is_empty() {
            tracing::warn!(
                "Pipeline '{}' discarded {} vertices left from the previous frame",
                self.name,
                self.buffer.vertex_count()
            );
        }
        self.buffer.reset();
        self.slots.clear();
        self.buffer.recycle();
        self.state = PipelineState::Idle;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn template(&self) -> &ShaderTemplate {
        &self.template
    }

    pub(crate) fn unit_cap(&self) -> Option<u32> {
        self.unit_cap
    }

    pub fn program(&self) -> &Arc<ShaderProgram> {
        &self.program
    }

    /// Texture units the current program samples from.
    pub fn texture_units(&self) -> u32 {
        self.program.units
    }

    /// Blend mode of the open batch.
    pub fn current_blend(&self) -> BlendMode {
        self.blend
    }

    pub fn buffer(&self) -> &VertexBuffer {
        &self.buffer
    }

    pub fn slots(&self) -> &TextureSlotTable {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn validate_indices(vertex_count: usize, indices: &[u32]) -> Result<(), BatchError> {
    let invalid = |reason| BatchError::InvalidGeometry {
        vertices: vertex_count,
        indices: indices.len(),
        reason,
    };
    if indices.len() % 3 != 0 {
        return Err(invalid("index count is not a multiple of three"));
    }
    if indices.iter().any(|&i| i as usize >= vertex_count) {
        return Err(invalid("index out of range"));
    }
    Ok(())
}

/// A pipeline plus the frame it writes into; what render adapters receive.
pub struct PipelineWriter<'a> {
    pipeline: &'a mut Pipeline,
    sink: FrameSink<'a>,
}

impl<'a> PipelineWriter<'a> {
    pub fn new(pipeline: &'a mut Pipeline, sink: FrameSink<'a>) -> Self {
        Self { pipeline, sink }
    }

    /// See [`Pipeline::add_vertices`].
    pub fn add_vertices(&mut self, vertices: &[BatchVertex], indices: &[u32], texture: TextureId, blend: BlendMode) {
        self.pipeline
            .add_vertices(&mut self.sink, vertices, indices, texture, blend);
    }

    /// Queue one quad. Corners and tints run top-left, top-right,
    /// bottom-right, bottom-left.
    pub fn add_quad(
        &mut self,
        corners: [[f32; 2]; 4],
        uv: UvRect,
        tints: [u32; 4],
        effect: TintEffect,
        texture: TextureId,
        blend: BlendMode,
    ) {
        let uvs = [[uv.u0, uv.v0], [uv.u1, uv.v0], [uv.u1, uv.v1], [uv.u0, uv.v1]];
        let vertices: [BatchVertex; 4] =
            std::array::from_fn(|i| BatchVertex::new(corners[i], uvs[i], tints[i]).with_effect(effect));
        self.add_vertices(&vertices, &QUAD_INDICES, texture, blend);
    }

    /// Close the open batch.
    pub fn flush(&mut self, reason: FlushReason) -> bool {
        self.pipeline.flush(&mut self.sink, reason)
    }

    /// Normalized coordinates of `frame` in `texture` (whole texture if `None`).
    pub fn uv_rect(&self, texture: TextureId, frame: Option<&FrameRect>) -> UvRect {
        self.sink.textures.uv_rect(texture, frame)
    }

    /// Size in texels of a resident texture.
    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.sink.textures.size(texture)
    }

    /// Whether `texture` can be bound. A non-resident texture drops the
    /// drawable once here, so adapters writing many quads check before
    /// their loop.
    pub fn require_resident(&mut self, texture: TextureId) -> bool {
        if self.sink.textures.contains(texture) {
            return true;
        }
        self.reject(DiagnosticKey::MissingTexture(texture), || {
            BatchError::TextureNotResident(texture).to_string()
        });
        false
    }

    /// Count a drawable the adapter could not render and warn once per key.
    pub fn reject(&mut self, key: DiagnosticKey, message: impl FnOnce() -> String) {
        self.sink.stats.dropped += 1;
        self.sink.diagnostics.warn_once(key, message);
    }

    pub fn pipeline(&self) -> &Pipeline {
        &*self.pipeline
    }
}

/// Two triangles over corners TL, TR, BR, BL.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];
