//! Multi-texture shader generation and the compiled program cache.
//!
//! Shading languages can't index an array of samplers with a varying, so the
//! fragment lookup is unrolled from a template into one branch per texture
//! unit:
//!
//! ```text
//! if (slot < 0.5) { color = textureSampleGrad(texture0, ...); }
//! else if (slot < 1.5) { color = textureSampleGrad(texture1, ...); }
//! ...
//! ```
//!
//! A template is WGSL containing two substitution points:
//!
//! - `{{texture_bindings}}`: one `texture_2d<f32>` per unit in group 1,
//!   bindings `1..=K` (the shared sampler is binding 0)
//! - `{{sample_slot}}`: the branch chain, assigning `color` from `slot`, `uv`,
//!   `ddx` and `ddy`

use std::fmt::Write as _;
use std::sync::Arc;

use lumen_core::alloc::HashMap;
use lumen_core::profiling::profile_function;
use lumen_test_utils::{GpuBindGroupLayout, GpuShaderModule, RenderContext};

use crate::error::BatchError;

pub const TEXTURE_BINDINGS_TOKEN: &str = "{{texture_bindings}}";
pub const SAMPLE_SLOT_TOKEN: &str = "{{sample_slot}}";

/// Name of the built-in template.
pub const MULTI_TEXTURE_TEMPLATE: &str = "multi";

/// Named WGSL source with substitution points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderTemplate {
    name: Arc<str>,
    source: Arc<str>,
}

impl ShaderTemplate {
    pub fn new(name: impl Into<Arc<str>>, source: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// The built-in sprite template.
    pub fn multi_texture() -> Self {
        Self::new(
            MULTI_TEXTURE_TEMPLATE,
            include_str!("../../shaders/multi_texture.wgsl"),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitute both tokens for `units` texture units.
    pub fn render(&self, units: u32) -> Result<String, String> {
        generate_source(&self.source, units)
    }
}

/// `@group(1)` texture declarations for `units` slots.
pub fn generate_texture_bindings(units: u32) -> String {
    let mut out = String::new();
    for i in 0..units {
        let _ = writeln!(
            out,
            "@group(1) @binding({}) var texture{}: texture_2d<f32>;",
            i + 1,
            i
        );
    }
    out
}

/// The slot lookup: a chain of `units` branches, or a plain sample for one.
pub fn generate_slot_lookup(units: u32) -> String {
    if units <= 1 {
        return "    color = textureSampleGrad(texture0, batch_sampler, uv, ddx, ddy);\n".to_string();
    }

    let mut out = String::new();
    for i in 0..units {
        let keyword = if i == 0 { "    if" } else { " else if" };
        let _ = write!(
            out,
            "{} (slot < {}.5) {{\n        color = textureSampleGrad(texture{}, batch_sampler, uv, ddx, ddy);\n    }}",
            keyword, i, i
        );
    }
    out.push('\n');
    out
}

/// Expand `template` for `units` texture units.
///
/// Fails when a substitution point is missing.
pub fn generate_source(template: &str, units: u32) -> Result<String, String> {
    profile_function!();
    for token in [TEXTURE_BINDINGS_TOKEN, SAMPLE_SLOT_TOKEN] {
        if !template.contains(token) {
            return Err(format!("template is missing {}", token));
        }
    }

    let units = units.max(1);
    Ok(template
        .replace(TEXTURE_BINDINGS_TOKEN, &generate_texture_bindings(units))
        .replace(SAMPLE_SLOT_TOKEN, &generate_slot_lookup(units)))
}

/// A compiled program for one (template, unit count) pair.
#[derive(Debug)]
pub struct ShaderProgram {
    pub units: u32,
    pub template: Arc<str>,
    pub source: String,
    pub module: GpuShaderModule,
    /// Group 1: sampler at binding 0, `units` textures after it.
    pub texture_layout: GpuBindGroupLayout,
}

/// Template name, template source and unit count. Two templates sharing a
/// name but not a source compile separately.
type ProgramKey = (Arc<str>, Arc<str>, u32);

/// Compiles programs on demand and keeps them for the renderer's lifetime.
///
/// Unit counts are clamped to what the device reports before anything is
/// generated, so each distinct template compiles at most once per clamped
/// count. A count that failed once is never retried.
pub struct ShaderProgramCache {
    ctx: Arc<dyn RenderContext>,
    device_max_units: u32,
    programs: HashMap<ProgramKey, Arc<ShaderProgram>>,
    failures: HashMap<ProgramKey, String>,
}

impl ShaderProgramCache {
    pub fn new(ctx: Arc<dyn RenderContext>) -> Self {
        let device_max_units = ctx.limits().max_sampled_textures_per_shader_stage.max(1);
        tracing::debug!("Device supports {} sampled textures per stage", device_max_units);
        Self {
            ctx,
            device_max_units,
            programs: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    pub fn device_max_units(&self) -> u32 {
        self.device_max_units
    }

    /// `requested` bounded by the device limit, at least one.
    pub fn clamp_units(&self, requested: u32) -> u32 {
        requested.min(self.device_max_units).max(1)
    }

    /// Program for `template` with up to `requested` units.
    ///
    /// Falls back to a single-unit program when the clamped count fails to
    /// compile. Fails only when that fallback fails too.
    pub fn get_program(
        &mut self,
        template: &ShaderTemplate,
        requested: u32,
    ) -> Result<Arc<ShaderProgram>, BatchError> {
        let units = self.clamp_units(requested);
        if units < requested {
            tracing::debug!(
                "Clamped '{}' from {} to {} texture units",
                template.name(),
                requested,
                units
            );
        }

        let log = match self.compile_cached(template, units) {
            Ok(program) => return Ok(program),
            Err(log) => log,
        };

        if units == 1 {
            tracing::error!("Shader '{}' failed with one texture unit: {}", template.name(), log);
            return Err(BatchError::ProgramCompilation {
                template: template.name().to_string(),
                units,
                log,
            });
        }

        tracing::warn!(
            "Shader '{}' failed with {} texture units, retrying with 1: {}",
            template.name(),
            units,
            log
        );
        self.compile_cached(template, 1).map_err(|fallback_log| {
            tracing::error!(
                "Shader '{}' fallback to one texture unit failed: {}",
                template.name(),
                fallback_log
            );
            BatchError::ProgramCompilation {
                template: template.name().to_string(),
                units,
                log: format!("{} units: {}; 1 unit: {}", units, log, fallback_log),
            }
        })
    }

    fn compile_cached(&mut self, template: &ShaderTemplate, units: u32) -> Result<Arc<ShaderProgram>, String> {
        let key: ProgramKey = (template.name.clone(), template.source.clone(), units);
        if let Some(program) = self.programs.get(&key) {
            return Ok(program.clone());
        }
        if let Some(log) = self.failures.get(&key) {
            return Err(log.clone());
        }

        match self.compile(template, units) {
            Ok(program) => {
                let program = Arc::new(program);
                self.programs.insert(key, program.clone());
                Ok(program)
            }
            Err(log) => {
                self.failures.insert(key, log.clone());
                Err(log)
            }
        }
    }

    fn compile(&self, template: &ShaderTemplate, units: u32) -> Result<ShaderProgram, String> {
        profile_function!();
        let source = template.render(units)?;
        let label = format!("{}_x{}", template.name(), units);

        let module = self.ctx.create_shader_module(&wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(source.as_str().into()),
        })?;

        let mut entries = Vec::with_capacity(units as usize + 1);
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        for i in 0..units {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: i + 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        let texture_layout = self.ctx.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{}_textures", label)),
            entries: &entries,
        });

        tracing::info!("Compiled shader program '{}'", label);
        Ok(ShaderProgram {
            units,
            template: template.name.clone(),
            source,
            module,
            texture_layout,
        })
    }

    /// Whether a program for this template and exact unit count is cached.
    pub fn contains(&self, template: &str, units: u32) -> bool {
        self.programs.keys().any(|(name, _, u)| &**name == template && *u == units)
    }

    /// Whether this template and unit count failed to compile.
    pub fn has_failed(&self, template: &str, units: u32) -> bool {
        self.failures.keys().any(|(name, _, u)| &**name == template && *u == units)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
