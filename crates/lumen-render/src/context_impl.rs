//! Implementation of RenderContext for GraphicsContext.

use crate::context::GraphicsContext;
use lumen_test_utils::{
    BatchPipelineDescriptor, GpuBindGroup, GpuBindGroupLayout, GpuBuffer, GpuRenderPipeline,
    GpuSampler, GpuShaderModule, GpuTexture, GpuTextureView, RenderContext,
    TextureBindGroupDescriptor,
};
use wgpu::{
    BindGroupLayoutDescriptor, BufferDescriptor, SamplerDescriptor, ShaderModuleDescriptor,
    TextureDescriptor,
};

impl RenderContext for GraphicsContext {
    fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        GpuBuffer::from_wgpu(self.device.create_buffer(desc))
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer.as_wgpu(), offset, data);
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture {
        GpuTexture::from_wgpu(self.device.create_texture(desc))
    }

    fn write_texture(&self, texture: &GpuTexture, data: &[u8], width: u32, height: u32) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: texture.as_wgpu(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn create_texture_view(&self, texture: &GpuTexture) -> GpuTextureView {
        let view = texture
            .as_wgpu()
            .create_view(&wgpu::TextureViewDescriptor::default());
        GpuTextureView::from_wgpu(view)
    }

    fn create_shader_module(&self, desc: &ShaderModuleDescriptor) -> Result<GpuShaderModule, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(desc.clone());
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(error.to_string()),
            None => Ok(GpuShaderModule::from_wgpu(module)),
        }
    }

    fn create_bind_group_layout(&self, desc: &BindGroupLayoutDescriptor) -> GpuBindGroupLayout {
        GpuBindGroupLayout::from_wgpu(self.device.create_bind_group_layout(desc))
    }

    fn create_texture_bind_group(&self, desc: &TextureBindGroupDescriptor) -> GpuBindGroup {
        let mut entries = Vec::with_capacity(desc.views.len() + 1);
        entries.push(wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(desc.sampler.as_wgpu()),
        });
        for (slot, view) in desc.views.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: slot as u32 + 1,
                resource: wgpu::BindingResource::TextureView(view.as_wgpu()),
            });
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: desc.label,
            layout: desc.layout.as_wgpu(),
            entries: &entries,
        });
        GpuBindGroup::from_wgpu(bind_group)
    }

    fn create_uniform_bind_group(
        &self,
        label: Option<&str>,
        layout: &GpuBindGroupLayout,
        buffer: &GpuBuffer,
    ) -> GpuBindGroup {
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label,
            layout: layout.as_wgpu(),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_wgpu().as_entire_binding(),
            }],
        });
        GpuBindGroup::from_wgpu(bind_group)
    }

    fn create_batch_pipeline(&self, desc: &BatchPipelineDescriptor) -> GpuRenderPipeline {
        let layouts: Vec<&wgpu::BindGroupLayout> =
            desc.bind_group_layouts.iter().map(|layout| layout.as_wgpu()).collect();

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: desc.label,
                bind_group_layouts: &layouts,
                push_constant_ranges: &[],
            });

        let module = desc.shader.as_wgpu();
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: desc.label,
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    buffers: std::slice::from_ref(&desc.vertex_layout),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: desc.format,
                        blend: desc.blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // 2D quads may be mirrored by negative scale
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
        GpuRenderPipeline::from_wgpu(pipeline)
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler {
        GpuSampler::from_wgpu(self.device.create_sampler(desc))
    }
}
