//! Render adapters: stateless functions turning a drawable into vertices.
//!
//! An adapter receives the writer of the pipeline it is bound to and a
//! resolved record. It must only emit geometry through the writer; it never
//! holds state between calls.

mod grid;
mod list;
mod mesh;
mod quad;

use std::sync::Arc;

use lumen_core::alloc::HashMap;

use crate::batched::{PipelineWriter, DEFAULT_PIPELINE};
use crate::drawable::ResolvedDrawable;

pub use grid::{render_nine_slice, render_tiles};
pub use list::render_quad_list;
pub use mesh::render_mesh;
pub use quad::render_quad;

/// The adapter family a drawable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawableKind {
    Sprite,
    Image,
    Container,
    TileLayer,
    NineSlice,
    Text,
    Particles,
    Mesh,
    /// Application-defined kinds.
    Custom(u32),
}

pub type AdapterFn = fn(&mut PipelineWriter<'_>, &ResolvedDrawable<'_>);

/// An adapter and the pipeline it writes into.
#[derive(Debug, Clone)]
pub struct RenderAdapter {
    pub pipeline: Arc<str>,
    pub render: AdapterFn,
}

impl RenderAdapter {
    pub fn new(pipeline: impl Into<Arc<str>>, render: AdapterFn) -> Self {
        Self {
            pipeline: pipeline.into(),
            render,
        }
    }
}

/// Kind to adapter lookup.
#[derive(Debug, Clone, Default)]
pub struct AdapterTable {
    adapters: HashMap<DrawableKind, RenderAdapter>,
}

impl AdapterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in adapters, all on the default pipeline.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        let builtins: [(DrawableKind, AdapterFn); 8] = [
            (DrawableKind::Sprite, render_quad),
            (DrawableKind::Image, render_quad),
            (DrawableKind::Container, render_quad),
            (DrawableKind::TileLayer, render_tiles),
            (DrawableKind::NineSlice, render_nine_slice),
            (DrawableKind::Text, render_quad_list),
            (DrawableKind::Particles, render_quad_list),
            (DrawableKind::Mesh, render_mesh),
        ];
        for (kind, render) in builtins {
            table.register(kind, RenderAdapter::new(DEFAULT_PIPELINE, render));
        }
        table
    }

    /// Bind `kind` to `adapter`, returning the adapter it replaces.
    pub fn register(&mut self, kind: DrawableKind, adapter: RenderAdapter) -> Option<RenderAdapter> {
        self.adapters.insert(kind, adapter)
    }

    pub fn get(&self, kind: DrawableKind) -> Option<&RenderAdapter> {
        self.adapters.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
