//! Trait abstracting GPU operations for testing.
//!
//! `RenderContext` covers exactly the resource work the batcher does: buffers
//! for vertex/index/uniform data, textures with their views, shader modules,
//! bind groups and render pipelines for the batch vertex layout.

use crate::gpu_types::*;
use wgpu::{
    BindGroupLayoutDescriptor, BlendState, BufferDescriptor, SamplerDescriptor,
    ShaderModuleDescriptor, TextureDescriptor, TextureFormat, VertexBufferLayout,
};

/// Bind group holding one sampler followed by a run of texture views.
///
/// The sampler lives at binding 0 and `views[i]` at binding `i + 1`, which is
/// the layout the generated multi-texture shaders expect.
pub struct TextureBindGroupDescriptor<'a> {
    pub label: Option<&'a str>,
    pub layout: &'a GpuBindGroupLayout,
    pub sampler: &'a GpuSampler,
    pub views: &'a [GpuTextureView],
}

/// Render pipeline for a single vertex buffer and a single colour target.
///
/// The pipeline layout is created from `bind_group_layouts` in order. Entry
/// points are always `vs_main` and `fs_main`, topology is a triangle list.
pub struct BatchPipelineDescriptor<'a> {
    pub label: Option<&'a str>,
    pub shader: &'a GpuShaderModule,
    pub bind_group_layouts: &'a [&'a GpuBindGroupLayout],
    pub vertex_layout: VertexBufferLayout<'a>,
    pub blend: Option<BlendState>,
    pub format: TextureFormat,
}

/// Trait abstracting GPU resource creation and operations.
///
/// Methods take `&self` and return owned wrapper types, so the context can be
/// shared behind an `Arc` and mocks can record calls through interior
/// mutability.
///
/// # Example
///
/// ```rust,no_run
/// use lumen_test_utils::RenderContext;
/// use wgpu::{BufferDescriptor, BufferUsages};
///
/// fn upload(ctx: &dyn RenderContext, data: &[u8]) {
///     let buffer = ctx.create_buffer(&BufferDescriptor {
///         label: None,
///         size: data.len() as u64,
///         usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
///         mapped_at_creation: false,
///     });
///     ctx.write_buffer(&buffer, 0, data);
/// }
/// ```
pub trait RenderContext: Send + Sync {
    /// Device limits. The batcher reads the sampled-texture limit from here.
    fn limits(&self) -> wgpu::Limits;

    // Buffer operations

    /// Create a GPU buffer.
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer;

    /// Write data to a buffer at `offset`.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);

    // Texture operations

    /// Create a GPU texture.
    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture;

    /// Upload tightly packed RGBA8 texels covering the whole first mip level.
    fn write_texture(&self, texture: &GpuTexture, data: &[u8], width: u32, height: u32);

    /// Create the default view of a texture.
    fn create_texture_view(&self, texture: &GpuTexture) -> GpuTextureView;

    // Shader operations

    /// Compile a shader module.
    ///
    /// Returns the compiler log on failure.
    fn create_shader_module(&self, desc: &ShaderModuleDescriptor) -> Result<GpuShaderModule, String>;

    // Bind group operations

    /// Create a bind group layout.
    fn create_bind_group_layout(&self, desc: &BindGroupLayoutDescriptor) -> GpuBindGroupLayout;

    /// Create a sampler + texture views bind group.
    fn create_texture_bind_group(&self, desc: &TextureBindGroupDescriptor) -> GpuBindGroup;

    /// Create a bind group with `buffer` bound as a uniform at binding 0.
    fn create_uniform_bind_group(
        &self,
        label: Option<&str>,
        layout: &GpuBindGroupLayout,
        buffer: &GpuBuffer,
    ) -> GpuBindGroup;

    // Pipeline operations

    /// Create a render pipeline (and its layout) for batched geometry.
    fn create_batch_pipeline(&self, desc: &BatchPipelineDescriptor) -> GpuRenderPipeline;

    // Sampler operations

    /// Create a texture sampler.
    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler;
}
