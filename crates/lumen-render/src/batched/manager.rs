//! Frame orchestration across named pipelines.

use std::sync::Arc;

use glam::Mat4;
use lumen_core::alloc::HashMap;
use lumen_core::profiling::{self, profile_function};
use lumen_test_utils::{GpuBindGroup, GpuBindGroupLayout, GpuBuffer, RenderContext};

use super::diagnostics::{DiagnosticKey, Diagnostics};
use super::draw_list::{DrawList, FlushReason, FrameStats};
use super::pipeline::{FrameSink, Pipeline, PipelineDescriptor, PipelineWriter, SharedBindings};
use super::shader::{ShaderProgramCache, ShaderTemplate};
use super::texture::TextureRegistry;
use crate::adapters::AdapterTable;
use crate::config::{BatchConfig, index_capacity_for};
use crate::drawable::{DrawableGroup, DrawableRecord, FrameItem, ResolvedDrawable};
use crate::error::BatchError;

/// Name of the pipeline every manager registers at creation.
pub const DEFAULT_PIPELINE: &str = "multi";

const GLOBALS_SIZE: u64 = std::mem::size_of::<Mat4>() as u64;

/// Owns every pipeline and decides which one is active.
///
/// A frame runs `begin_frame`, any number of `submit` calls (optionally
/// bracketed by `pre_batch`/`post_batch`), then `end_frame`. The recorded
/// draws replay into a render pass with [`encode`](Self::encode).
///
/// At most one pipeline holds unflushed vertices at any time; switching the
/// active pipeline flushes the previous one first, so draws reach the GPU in
/// submission order.
///
/// # Example
///
/// ```rust,no_run
/// use glam::{Mat4, Vec2};
/// use lumen_render::{BatchConfig, BatchManager, DrawableHandle, DrawableRecord, GraphicsContext, TextureId};
///
/// let ctx = GraphicsContext::new_owned_sync().expect("no GPU");
/// let mut batcher = BatchManager::new(ctx, wgpu::TextureFormat::Bgra8UnormSrgb, BatchConfig::from_env())
///     .expect("shader compilation failed");
///
/// batcher.begin_frame(Mat4::orthographic_rh(0.0, 800.0, 600.0, 0.0, -1.0, 1.0));
/// batcher.submit(&DrawableRecord::sprite(DrawableHandle(1), TextureId::WHITE, Vec2::splat(32.0)));
/// let stats = batcher.end_frame();
/// assert_eq!(stats.draw_calls, 1);
/// ```
pub struct BatchManager {
    ctx: Arc<dyn RenderContext>,
    config: BatchConfig,
    max_texture_units: u32,
    programs: ShaderProgramCache,
    pipelines: HashMap<Arc<str>, Pipeline>,
    pipeline_order: Vec<Arc<str>>,
    active: Option<Arc<str>>,
    textures: TextureRegistry,
    adapters: AdapterTable,
    draws: DrawList,
    diagnostics: Diagnostics,
    stats: FrameStats,
    groups: Vec<DrawableGroup>,
    shared: SharedBindings,
    globals_buffer: GpuBuffer,
    globals_bind_group: GpuBindGroup,
}

impl BatchManager {
    /// Create a manager with the default pipeline registered.
    ///
    /// Fails only if the multi-texture program cannot be compiled even with a
    /// single texture unit.
    pub fn new(
        ctx: Arc<dyn RenderContext>,
        format: wgpu::TextureFormat,
        config: BatchConfig,
    ) -> Result<Self, BatchError> {
        profile_function!();
        let config = config.validated();

        let globals_buffer = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen_globals"),
            size: GLOBALS_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        ctx.write_buffer(&globals_buffer, 0, bytemuck::bytes_of(&Mat4::IDENTITY));

        let globals_layout = create_globals_layout(ctx.as_ref());
        let globals_bind_group =
            ctx.create_uniform_bind_group(Some("lumen_globals"), &globals_layout, &globals_buffer);

        let sampler = ctx.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen_batch_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: config.filter,
            min_filter: config.filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let mut manager = Self {
            programs: ShaderProgramCache::new(ctx.clone()),
            textures: TextureRegistry::new(ctx.clone()),
            max_texture_units: config.texture_unit_cap(),
            config,
            pipelines: HashMap::new(),
            pipeline_order: Vec::new(),
            active: None,
            adapters: AdapterTable::with_builtins(),
            draws: DrawList::new(),
            diagnostics: Diagnostics::new(),
            stats: FrameStats::default(),
            groups: Vec::new(),
            shared: SharedBindings {
                globals_layout,
                sampler,
                format,
            },
            globals_buffer,
            globals_bind_group,
            ctx,
        };
        manager.register_pipeline(DEFAULT_PIPELINE, PipelineDescriptor::new(ShaderTemplate::multi_texture()))?;

        tracing::info!(
            "Batch manager ready: {} vertices per batch, {} texture units",
            manager.config.vertex_capacity,
            manager.programs.clamp_units(manager.max_texture_units)
        );
        Ok(manager)
    }

    /// Add a named pipeline. Names are unique for the manager's lifetime.
    pub fn register_pipeline(
        &mut self,
        name: impl Into<Arc<str>>,
        descriptor: PipelineDescriptor,
    ) -> Result<(), BatchError> {
        let name = name.into();
        if self.pipelines.contains_key(&name) {
            return Err(BatchError::DuplicatePipeline(name.to_string()));
        }

        let units = self.units_for(descriptor.max_texture_units);
        let program = self.programs.get_program(&descriptor.template, units)?;
        let (vertex_capacity, index_capacity) = match descriptor.vertex_capacity {
            Some(vertices) => {
                let vertices = vertices.max(4);
                (vertices, index_capacity_for(vertices))
            }
            None => (self.config.vertex_capacity, self.config.index_capacity),
        };

        tracing::info!(
            "Registered pipeline '{}' ({} units, {} vertices)",
            name,
            program.units,
            vertex_capacity
        );
        let pipeline = Pipeline::new(
            name.clone(),
            self.ctx.clone(),
            &descriptor,
            program,
            vertex_capacity,
            index_capacity,
            self.shared.clone(),
            self.config.round_pixels,
        );
        self.pipelines.insert(name.clone(), pipeline);
        self.pipeline_order.push(name);
        Ok(())
    }

    fn units_for(&self, pipeline_cap: Option<u32>) -> u32 {
        pipeline_cap.map_or(self.max_texture_units, |cap| cap.min(self.max_texture_units))
    }

    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.get(name)
    }

    /// Registered pipeline names, oldest first.
    pub fn pipeline_names(&self) -> impl Iterator<Item = &str> {
        self.pipeline_order.iter().map(|name| &**name)
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureRegistry {
        &mut self.textures
    }

    pub fn adapters(&self) -> &AdapterTable {
        &self.adapters
    }

    pub fn adapters_mut(&mut self) -> &mut AdapterTable {
        &mut self.adapters
    }

    /// Reset per-frame state and upload the projection.
    ///
    /// Draws recorded for the previous frame are discarded, so encode them
    /// before calling this.
    pub fn begin_frame(&mut self, projection: Mat4) {
        profile_function!();
        profiling::new_frame();

        self.draws.clear();
        self.stats = FrameStats::default();
        self.groups.clear();
        self.active = None;
        for pipeline in self.pipelines.values_mut() {
            pipeline.begin_frame();
        }
        self.ctx
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&projection));
    }

    /// Make `name` the active pipeline, flushing the previous one.
    pub fn set_active_pipeline(&mut self, name: &str) -> Result<(), BatchError> {
        let Some((key, _)) = self.pipelines.get_key_value(name) else {
            return Err(BatchError::UnknownPipeline(name.to_string()));
        };
        if self.active.as_deref() == Some(name) {
            return Ok(());
        }
        let key = key.clone();

        if self.active.is_some() {
            self.flush_active(FlushReason::PipelineSwitch);
            self.stats.pipeline_switches += 1;
        }
        tracing::trace!("Active pipeline is now '{}'", key);
        self.active = Some(key);
        Ok(())
    }

    pub fn active_pipeline_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Open a group. Children inherit its blend mode, overriding their own,
    /// and have their alpha multiplied by its alpha. An enclosing group's
    /// blend wins over this one's.
    pub fn pre_batch(&mut self, group: &DrawableGroup) {
        let parent = self.groups.last().copied().unwrap_or_default();
        self.groups.push(DrawableGroup {
            blend: parent.blend.or(group.blend),
            alpha: parent.alpha * group.alpha,
        });
    }

    /// Close the innermost group.
    pub fn post_batch(&mut self) {
        if self.groups.pop().is_none() {
            self.diagnostics.warn_once(DiagnosticKey::UnbalancedGroups, || {
                "post_batch called without a matching pre_batch".to_string()
            });
        }
    }

    /// Render one drawable through its adapter.
    pub fn submit(&mut self, record: &DrawableRecord) {
        profile_function!();
        self.stats.drawables_submitted += 1;

        let Some(adapter) = self.adapters.get(record.kind).cloned() else {
            self.stats.dropped += 1;
            self.diagnostics.warn_once(DiagnosticKey::UnknownAdapter(record.kind), || {
                format!("No render adapter registered for {:?}", record.kind)
            });
            return;
        };

        let pipeline = record.pipeline.clone().unwrap_or(adapter.pipeline);
        if self.set_active_pipeline(&pipeline).is_err() {
            self.stats.dropped += 1;
            self.diagnostics.warn_once(DiagnosticKey::UnknownPipeline(pipeline.clone()), || {
                BatchError::UnknownPipeline(pipeline.to_string()).to_string()
            });
            return;
        }

        let group = self.groups.last().copied().unwrap_or_default();
        let resolved = ResolvedDrawable {
            record,
            blend: group.blend.unwrap_or(record.blend),
            alpha: record.alpha.map(|alpha| alpha * group.alpha),
        };
        if let Some(mut writer) = self.writer(&pipeline) {
            (adapter.render)(&mut writer, &resolved);
        }
    }

    /// Walk an ordered frame list.
    pub fn submit_items(&mut self, items: &[FrameItem]) {
        for item in items {
            match item {
                FrameItem::Draw(record) => self.submit(record),
                FrameItem::BeginGroup(group) => self.pre_batch(group),
                FrameItem::EndGroup => self.post_batch(),
            }
        }
    }

    /// Writer for the active pipeline, for geometry that bypasses adapters.
    pub fn active_writer(&mut self) -> Option<PipelineWriter<'_>> {
        let name = self.active.clone()?;
        self.writer(&name)
    }

    fn writer(&mut self, name: &str) -> Option<PipelineWriter<'_>> {
        let pipeline = self.pipelines.get_mut(name)?;
        Some(PipelineWriter::new(
            pipeline,
            FrameSink {
                textures: &self.textures,
                draws: &mut self.draws,
                diagnostics: &mut self.diagnostics,
                stats: &mut self.stats,
            },
        ))
    }

    fn flush_active(&mut self, reason: FlushReason) -> bool {
        let Some(name) = self.active.clone() else {
            return false;
        };
        self.writer(&name).is_some_and(|mut writer| writer.flush(reason))
    }

    /// Flush the active pipeline now. Returns whether a draw was recorded.
    pub fn flush(&mut self) -> bool {
        self.flush_active(FlushReason::Explicit)
    }

    /// Flush whatever is pending and return the frame's counters.
    pub fn end_frame(&mut self) -> FrameStats {
        profile_function!();
        self.flush_active(FlushReason::EndOfFrame);
        if !self.groups.is_empty() {
            let open = self.groups.len();
            self.diagnostics.warn_once(DiagnosticKey::UnbalancedGroups, || {
                format!("{} drawable group(s) still open at end of frame", open)
            });
            self.groups.clear();
        }

        tracing::trace!(
            "Frame done: {} draws, {} vertices, {} drawables, {} dropped",
            self.stats.draw_calls,
            self.stats.vertices,
            self.stats.drawables_submitted,
            self.stats.dropped
        );
        self.stats
    }

    /// Draws recorded since `begin_frame`.
    pub fn draw_list(&self) -> &DrawList {
        &self.draws
    }

    /// Replay the recorded draws into `pass`.
    pub fn encode(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.draws.encode(pass, &self.globals_bind_group);
    }

    /// Change the texture unit cap and rebuild every pipeline's program.
    ///
    /// The active batch is flushed before programs are swapped. Programs for a
    /// unit count already seen come from the cache. When any program fails,
    /// the cap and every pipeline stay as they were.
    pub fn set_max_texture_units(&mut self, units: u32) -> Result<(), BatchError> {
        let units = units.max(1);
        if units == self.max_texture_units {
            return Ok(());
        }

        // Every program resolves before anything changes, so a failure leaves
        // the cap and all pipelines as they were.
        let mut resolved = Vec::with_capacity(self.pipeline_order.len());
        for name in &self.pipeline_order {
            let Some(pipeline) = self.pipelines.get(name) else {
                continue;
            };
            let requested = pipeline.unit_cap().map_or(units, |cap| cap.min(units));
            let program = self.programs.get_program(pipeline.template(), requested)?;
            resolved.push((name.clone(), program));
        }

        self.flush_active(FlushReason::TextureUnitChange);
        self.max_texture_units = units;
        self.config.max_texture_units = Some(units);
        for (name, program) in resolved {
            if let Some(pipeline) = self.pipelines.get_mut(&name) {
                pipeline.set_program(program);
            }
        }
        tracing::debug!("Texture unit cap set to {}", units);
        Ok(())
    }

    /// Configured cap, before the device limit is applied.
    pub fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Counters for the frame in progress.
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn program_cache(&self) -> &ShaderProgramCache {
        &self.programs
    }

    pub fn globals_bind_group(&self) -> &GpuBindGroup {
        &self.globals_bind_group
    }
}

impl Drop for BatchManager {
    fn drop(&mut self) {
        tracing::debug!(
            "Dropping batch manager ({} pipelines, {} programs)",
            self.pipelines.len(),
            self.programs.len()
        );
    }
}

fn create_globals_layout(ctx: &dyn RenderContext) -> GpuBindGroupLayout {
    ctx.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("lumen_globals_layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(GLOBALS_SIZE),
            },
            count: None,
        }],
    })
}
