//! Draw calls recorded by flushes, and per-frame statistics.

use std::sync::Arc;

use lumen_core::profiling::profile_function;
use lumen_test_utils::{GpuBindGroup, GpuBuffer, GpuRenderPipeline};

use super::texture::TextureId;
use crate::blend::BlendMode;

/// Why a batch was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushReason {
    /// The next write would not fit in the vertex or index buffer.
    BufferCapacity,
    /// A new texture needed a slot and none was free.
    TextureSlots,
    /// The next drawable uses a different blend mode.
    BlendChange,
    /// Another pipeline became active.
    PipelineSwitch,
    /// The frame ended.
    EndOfFrame,
    /// Requested by the caller.
    Explicit,
    /// The texture unit count is being changed.
    TextureUnitChange,
}

impl FlushReason {
    pub const COUNT: usize = 7;

    pub const ALL: [FlushReason; Self::COUNT] = [
        FlushReason::BufferCapacity,
        FlushReason::TextureSlots,
        FlushReason::BlendChange,
        FlushReason::PipelineSwitch,
        FlushReason::EndOfFrame,
        FlushReason::Explicit,
        FlushReason::TextureUnitChange,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for FlushReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FlushReason::BufferCapacity => "buffer capacity",
            FlushReason::TextureSlots => "texture slots",
            FlushReason::BlendChange => "blend change",
            FlushReason::PipelineSwitch => "pipeline switch",
            FlushReason::EndOfFrame => "end of frame",
            FlushReason::Explicit => "explicit",
            FlushReason::TextureUnitChange => "texture unit change",
        };
        f.write_str(name)
    }
}

/// One issued draw: everything needed to replay it into a render pass.
#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub pipeline: Arc<str>,
    pub render_pipeline: GpuRenderPipeline,
    pub texture_bind_group: GpuBindGroup,
    pub vertex_buffer: GpuBuffer,
    pub index_buffer: GpuBuffer,
    pub vertex_count: u32,
    pub index_count: u32,
    pub blend: BlendMode,
    /// Textures in slot order.
    pub textures: Vec<TextureId>,
    pub reason: FlushReason,
}

/// Draw calls of the current frame, in issue order.
#[derive(Debug, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DrawCommand> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Record every draw into `pass`. `globals` is bound at group 0.
    pub fn encode(&self, pass: &mut wgpu::RenderPass<'_>, globals: &GpuBindGroup) {
        profile_function!();
        if self.commands.is_empty() {
            return;
        }

        pass.push_debug_group("lumen::batches");
        pass.set_bind_group(0, globals.as_wgpu(), &[]);
        for command in &self.commands {
            let vertex_bytes = command.vertex_count as u64 * super::BatchVertex::SIZE;
            let index_bytes = command.index_count as u64 * std::mem::size_of::<u32>() as u64;

            pass.set_pipeline(command.render_pipeline.as_wgpu());
            pass.set_bind_group(1, command.texture_bind_group.as_wgpu(), &[]);
            pass.set_vertex_buffer(0, command.vertex_buffer.as_wgpu().slice(..vertex_bytes));
            pass.set_index_buffer(
                command.index_buffer.as_wgpu().slice(..index_bytes),
                wgpu::IndexFormat::Uint32,
            );
            pass.draw_indexed(0..command.index_count, 0, 0..1);
        }
        pass.pop_debug_group();
    }
}

impl<'a> IntoIterator for &'a DrawList {
    type Item = &'a DrawCommand;
    type IntoIter = std::slice::Iter<'a, DrawCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

/// Counters for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draw calls issued.
    pub draw_calls: u32,
    /// Vertices uploaded across all draws.
    pub vertices: u32,
    /// Indices uploaded across all draws.
    pub indices: u32,
    /// Drawables handed to `submit`.
    pub drawables_submitted: u32,
    /// Writes or drawables dropped (missing texture, oversize, bad geometry).
    pub dropped: u32,
    /// Changes of the active pipeline.
    pub pipeline_switches: u32,
    flushes: [u32; FlushReason::COUNT],
}

impl FrameStats {
    pub(crate) fn record_draw(&mut self, reason: FlushReason, vertices: u32, indices: u32) {
        self.draw_calls += 1;
        self.vertices += vertices;
        self.indices += indices;
        self.flushes[reason.index()] += 1;
    }

    /// Draws closed for `reason`.
    pub fn flushes(&self, reason: FlushReason) -> u32 {
        self.flushes[reason.index()]
    }
}
