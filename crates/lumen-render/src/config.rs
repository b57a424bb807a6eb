//! Batch renderer configuration.

/// Environment variable overriding [`BatchConfig::vertex_capacity`].
pub const ENV_BATCH_VERTICES: &str = "LUMEN_BATCH_VERTICES";
/// Environment variable overriding [`BatchConfig::max_texture_units`].
pub const ENV_MAX_TEXTURES: &str = "LUMEN_MAX_TEXTURES";

/// Default vertex capacity: 2000 quads.
pub const DEFAULT_VERTEX_CAPACITY: usize = 2000 * 4;
/// Texture unit cap used when none is configured.
pub const DEFAULT_MAX_TEXTURE_UNITS: u32 = 16;

/// Tunables for the batch manager and the pipelines it creates.
///
/// ```
/// use lumen_render::BatchConfig;
///
/// let config = BatchConfig::default()
///     .with_vertex_capacity(4000)
///     .with_max_texture_units(8);
/// assert_eq!(config.index_capacity, 6000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Vertices one batch can hold before it must flush.
    pub vertex_capacity: usize,
    /// Indices one batch can hold before it must flush.
    pub index_capacity: usize,
    /// Upper bound on texture units, applied on top of the device limit.
    pub max_texture_units: Option<u32>,
    /// Filter used by the shared batch sampler.
    pub filter: wgpu::FilterMode,
    /// Snap transformed vertex positions to whole pixels.
    pub round_pixels: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            vertex_capacity: DEFAULT_VERTEX_CAPACITY,
            index_capacity: index_capacity_for(DEFAULT_VERTEX_CAPACITY),
            max_texture_units: None,
            filter: wgpu::FilterMode::Linear,
            round_pixels: false,
        }
    }
}

/// Six indices per four vertices, never fewer than one per vertex.
pub(crate) fn index_capacity_for(vertices: usize) -> usize {
    (vertices / 4 * 6).max(vertices)
}

impl BatchConfig {
    /// Defaults overridden by `LUMEN_BATCH_VERTICES` / `LUMEN_MAX_TEXTURES`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_BATCH_VERTICES) {
            match raw.trim().parse::<usize>() {
                Ok(vertices) => config = config.with_vertex_capacity(vertices),
                Err(e) => tracing::warn!("Ignoring {}={:?}: {}", ENV_BATCH_VERTICES, raw, e),
            }
        }

        if let Some(raw) = lookup(ENV_MAX_TEXTURES) {
            match raw.trim().parse::<u32>() {
                Ok(units) => config = config.with_max_texture_units(units),
                Err(e) => tracing::warn!("Ignoring {}={:?}: {}", ENV_MAX_TEXTURES, raw, e),
            }
        }

        config
    }

    /// Set the vertex capacity; the index capacity follows it.
    pub fn with_vertex_capacity(mut self, vertices: usize) -> Self {
        self.vertex_capacity = vertices;
        self.index_capacity = index_capacity_for(vertices);
        self
    }

    /// Set the index capacity explicitly.
    pub fn with_index_capacity(mut self, indices: usize) -> Self {
        self.index_capacity = indices;
        self
    }

    /// Cap the number of texture units below the device limit.
    pub fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_texture_units = Some(units);
        self
    }

    pub fn with_filter(mut self, filter: wgpu::FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_round_pixels(mut self, round_pixels: bool) -> Self {
        self.round_pixels = round_pixels;
        self
    }

    /// The texture unit cap in effect.
    pub fn texture_unit_cap(&self) -> u32 {
        self.max_texture_units.unwrap_or(DEFAULT_MAX_TEXTURE_UNITS)
    }

    /// Copy with capacities raised to the smallest usable values.
    pub fn validated(&self) -> Self {
        let mut config = self.clone();
        config.vertex_capacity = config.vertex_capacity.max(4);
        config.index_capacity = config.index_capacity.max(6);
        config.max_texture_units = config.max_texture_units.map(|units| units.max(1));
        config
    }
}
