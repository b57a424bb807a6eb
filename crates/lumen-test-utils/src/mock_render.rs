//! Mock implementation of RenderContext for testing.
//!
//! The mock never touches a GPU. It records every call, keeps a CPU copy of
//! every buffer so tests can decode what was uploaded, remembers the source
//! of every shader it was asked to compile and can be told to reject some of
//! them.

use crate::{gpu_types::*, render_context::*};
use parking_lot::Mutex;
use wgpu::{
    BindGroupLayoutDescriptor, BlendState, BufferDescriptor, BufferUsages, SamplerDescriptor,
    ShaderModuleDescriptor, ShaderSource, TextureDescriptor, TextureFormat,
};

/// Records a GPU operation call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    CreateBuffer {
        label: Option<String>,
        size: u64,
        usage: BufferUsages,
    },
    WriteBuffer {
        buffer_id: usize,
        offset: u64,
        size: usize,
    },
    CreateTexture {
        width: u32,
        height: u32,
        format: TextureFormat,
    },
    WriteTexture {
        texture_id: usize,
        size: usize,
    },
    CreateTextureView {
        texture_id: usize,
    },
    CreateShaderModule {
        label: Option<String>,
    },
    ShaderCompilationFailed {
        label: Option<String>,
    },
    CreateRenderPipeline {
        label: Option<String>,
        blend: Option<BlendState>,
    },
    CreateBindGroupLayout {
        label: Option<String>,
    },
    CreateBindGroup {
        label: Option<String>,
        entries: usize,
    },
    CreateSampler {
        label: Option<String>,
    },
}

/// Mock buffers stored in the context.
#[derive(Debug, Clone)]
struct MockBuffer {
    label: Option<String>,
    data: Vec<u8>,
}

type ShaderPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Mock implementation of RenderContext for testing.
///
/// `parking_lot::Mutex` provides the interior mutability; it is `Send + Sync`
/// as the trait requires.
///
/// # Example
///
/// ```rust
/// use lumen_test_utils::{MockRenderContext, RenderContext};
/// use wgpu::{ShaderModuleDescriptor, ShaderSource};
///
/// let mock = MockRenderContext::new();
/// mock.fail_shader_compilation_when(|source| source.contains("texture15"));
///
/// let result = mock.create_shader_module(&ShaderModuleDescriptor {
///     label: Some("big"),
///     source: ShaderSource::Wgsl("var texture15: texture_2d<f32>;".into()),
/// });
/// assert!(result.is_err());
/// ```
pub struct MockRenderContext {
    /// Recorded calls for verification
    calls: Mutex<Vec<RenderCall>>,

    /// CPU copies of every buffer, indexed by mock id
    buffers: Mutex<Vec<MockBuffer>>,

    /// Texture dimensions, indexed by mock id
    textures: Mutex<Vec<(u32, u32)>>,

    /// Source of every successfully compiled shader, indexed by mock id
    shader_sources: Mutex<Vec<String>>,

    /// Sources matching this predicate fail to compile
    shader_failure: Mutex<Option<ShaderPredicate>>,

    limits: wgpu::Limits,

    next_view_id: Mutex<usize>,
    next_pipeline_id: Mutex<usize>,
    next_bind_group_layout_id: Mutex<usize>,
    next_bind_group_id: Mutex<usize>,
    next_sampler_id: Mutex<usize>,
}

fn next_id(counter: &Mutex<usize>) -> usize {
    let mut id = counter.lock();
    let current = *id;
    *id += 1;
    current
}

impl MockRenderContext {
    /// Create a new mock render context with default `wgpu` limits.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            buffers: Mutex::new(Vec::new()),
            textures: Mutex::new(Vec::new()),
            shader_sources: Mutex::new(Vec::new()),
            shader_failure: Mutex::new(None),
            limits: wgpu::Limits::default(),
            next_view_id: Mutex::new(0),
            next_pipeline_id: Mutex::new(0),
            next_bind_group_layout_id: Mutex::new(0),
            next_bind_group_id: Mutex::new(0),
            next_sampler_id: Mutex::new(0),
        }
    }

    /// Report `limits` from [`RenderContext::limits`].
    pub fn with_limits(mut self, limits: wgpu::Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Report `count` as the per-stage sampled texture limit.
    pub fn with_max_sampled_textures(mut self, count: u32) -> Self {
        self.limits.max_sampled_textures_per_shader_stage = count;
        self
    }

    /// Make every shader whose source satisfies `predicate` fail to compile.
    pub fn fail_shader_compilation_when(
        &self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) {
        *self.shader_failure.lock() = Some(Box::new(predicate));
    }

    /// Let every shader compile again.
    pub fn clear_shader_failures(&self) {
        *self.shader_failure.lock() = None;
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    fn count(&self, filter: impl Fn(&RenderCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| filter(call)).count()
    }

    /// Count buffer creates.
    pub fn count_buffer_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateBuffer { .. }))
    }

    /// Count buffer write operations.
    pub fn count_buffer_writes(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::WriteBuffer { .. }))
    }

    /// Count texture creates.
    pub fn count_texture_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateTexture { .. }))
    }

    /// Count successful shader module creates.
    pub fn count_shader_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateShaderModule { .. }))
    }

    /// Count rejected shader modules.
    pub fn count_shader_failures(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::ShaderCompilationFailed { .. }))
    }

    /// Count render pipeline creates.
    pub fn count_render_pipeline_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateRenderPipeline { .. }))
    }

    /// Count bind group creates.
    pub fn count_bind_group_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateBindGroup { .. }))
    }

    /// Current contents of a mock buffer.
    ///
    /// # Panics
    /// Panics if no buffer with this id was created.
    pub fn buffer_data(&self, id: usize) -> Vec<u8> {
        self.buffers.lock()[id].data.clone()
    }

    /// Label a mock buffer was created with.
    pub fn buffer_label(&self, id: usize) -> Option<String> {
        self.buffers.lock().get(id).and_then(|buffer| buffer.label.clone())
    }

    /// Source of a compiled shader module, by mock id.
    pub fn shader_source(&self, id: usize) -> Option<String> {
        self.shader_sources.lock().get(id).cloned()
    }

    /// Sources of every compiled shader module, in creation order.
    pub fn shader_sources(&self) -> Vec<String> {
        self.shader_sources.lock().clone()
    }

    /// Clear recorded calls (useful between test steps).
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, call: RenderCall) {
        self.calls.lock().push(call);
    }
}

impl Default for MockRenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderContext for MockRenderContext {
    fn limits(&self) -> wgpu::Limits {
        self.limits.clone()
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        let mut buffers = self.buffers.lock();
        let id = buffers.len();
        buffers.push(MockBuffer {
            label: desc.label.map(str::to_string),
            data: vec![0; desc.size as usize],
        });

        self.record(RenderCall::CreateBuffer {
            label: desc.label.map(str::to_string),
            size: desc.size,
            usage: desc.usage,
        });

        GpuBuffer::mock(id, desc.size)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        let Some(buffer_id) = buffer.mock_id() else {
            return;
        };

        {
            let mut buffers = self.buffers.lock();
            let target = &mut buffers[buffer_id].data;
            let start = offset as usize;
            let end = start + data.len();
            assert!(
                end <= target.len(),
                "Write of {} bytes at offset {} overruns mock buffer {} of {} bytes",
                data.len(),
                offset,
                buffer_id,
                target.len()
            );
            target[start..end].copy_from_slice(data);
        }

        self.record(RenderCall::WriteBuffer {
            buffer_id,
            offset,
            size: data.len(),
        });
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture {
        let mut textures = self.textures.lock();
        let id = textures.len();
        textures.push((desc.size.width, desc.size.height));

        self.record(RenderCall::CreateTexture {
            width: desc.size.width,
            height: desc.size.height,
            format: desc.format,
        });

        GpuTexture::mock(id, desc.size.width, desc.size.height)
    }

    fn write_texture(&self, texture: &GpuTexture, data: &[u8], _width: u32, _height: u32) {
        if let Some(texture_id) = texture.mock_id() {
            self.record(RenderCall::WriteTexture {
                texture_id,
                size: data.len(),
            });
        }
    }

    fn create_texture_view(&self, texture: &GpuTexture) -> GpuTextureView {
        let id = next_id(&self.next_view_id);
        if let Some(texture_id) = texture.mock_id() {
            self.record(RenderCall::CreateTextureView { texture_id });
        }
        GpuTextureView::mock(id)
    }

    fn create_shader_module(&self, desc: &ShaderModuleDescriptor) -> Result<GpuShaderModule, String> {
        let source = match &desc.source {
            ShaderSource::Wgsl(source) => source.to_string(),
            _ => String::new(),
        };
        let label = desc.label.map(str::to_string);

        let rejected = self
            .shader_failure
            .lock()
            .as_ref()
            .is_some_and(|predicate| predicate(&source));
        if rejected {
            self.record(RenderCall::ShaderCompilationFailed {
                label: label.clone(),
            });
            return Err(format!(
                "mock compiler rejected shader {:?} ({} bytes)",
                label.unwrap_or_default(),
                source.len()
            ));
        }

        let mut sources = self.shader_sources.lock();
        let id = sources.len();
        sources.push(source);
        self.record(RenderCall::CreateShaderModule { label });

        Ok(GpuShaderModule::mock(id))
    }

    fn create_bind_group_layout(&self, desc: &BindGroupLayoutDescriptor) -> GpuBindGroupLayout {
        let id = next_id(&self.next_bind_group_layout_id);
        self.record(RenderCall::CreateBindGroupLayout {
            label: desc.label.map(str::to_string),
        });
        GpuBindGroupLayout::mock(id)
    }

    fn create_texture_bind_group(&self, desc: &TextureBindGroupDescriptor) -> GpuBindGroup {
        let id = next_id(&self.next_bind_group_id);
        self.record(RenderCall::CreateBindGroup {
            label: desc.label.map(str::to_string),
            entries: desc.views.len() + 1,
        });
        GpuBindGroup::mock(id)
    }

    fn create_uniform_bind_group(
        &self,
        label: Option<&str>,
        _layout: &GpuBindGroupLayout,
        _buffer: &GpuBuffer,
    ) -> GpuBindGroup {
        let id = next_id(&self.next_bind_group_id);
        self.record(RenderCall::CreateBindGroup {
            label: label.map(str::to_string),
            entries: 1,
        });
        GpuBindGroup::mock(id)
    }

    fn create_batch_pipeline(&self, desc: &BatchPipelineDescriptor) -> GpuRenderPipeline {
        let id = next_id(&self.next_pipeline_id);
        self.record(RenderCall::CreateRenderPipeline {
            label: desc.label.map(str::to_string),
            blend: desc.blend,
        });
        GpuRenderPipeline::mock(id)
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler {
        let id = next_id(&self.next_sampler_id);
        self.record(RenderCall::CreateSampler {
            label: desc.label.map(str::to_string),
        });
        GpuSampler::mock(id)
    }
}
