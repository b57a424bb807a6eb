use crate::batched::TextureId;

/// Errors raised by the batch renderer.
///
/// Only [`BatchError::ProgramCompilation`] escapes a frame: it is returned when
/// no program can be built at all. The others describe per-drawable problems
/// that the pipeline logs and recovers from by dropping the drawable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// Shader program failed to compile for `units` texture units, including
    /// the single-unit fallback.
    ProgramCompilation {
        template: String,
        units: u32,
        log: String,
    },

    /// A single write needs more room than the whole buffer has.
    BufferOverflow { requested: usize, capacity: usize },

    /// A drawable referenced a texture that was never uploaded.
    TextureNotResident(TextureId),

    /// Index list does not describe whole triangles over the given vertices.
    InvalidGeometry {
        vertices: usize,
        indices: usize,
        reason: &'static str,
    },

    /// No pipeline is registered under this name.
    UnknownPipeline(String),

    /// A pipeline with this name is already registered.
    DuplicatePipeline(String),

    /// Texel data does not match the texture size it was uploaded with.
    TextureData {
        label: String,
        expected: usize,
        actual: usize,
    },
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProgramCompilation {
                template,
                units,
                log,
            } => write!(
                f,
                "Failed to compile shader program '{}' for {} texture unit(s): {}",
                template, units, log
            ),
            Self::BufferOverflow {
                requested,
                capacity,
            } => write!(
                f,
                "Write of {} elements exceeds batch buffer capacity of {}",
                requested, capacity
            ),
            Self::TextureNotResident(id) => write!(f, "Texture {} is not resident", id),
            Self::InvalidGeometry {
                vertices,
                indices,
                reason,
            } => write!(
                f,
                "Invalid geometry ({} vertices, {} indices): {}",
                vertices, indices, reason
            ),
            Self::UnknownPipeline(name) => write!(f, "Pipeline '{}' is not registered", name),
            Self::DuplicatePipeline(name) => write!(f, "Pipeline '{}' is already registered", name),
            Self::TextureData {
                label,
                expected,
                actual,
            } => write!(
                f,
                "Texture '{}' needs {} bytes of RGBA8 data, got {}",
                label, expected, actual
            ),
        }
    }
}

impl std::error::Error for BatchError {}
