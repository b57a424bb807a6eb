//! CPU staging for one batch and the GPU buffers it is uploaded into.
//!
//! All draws of a frame are encoded into the render pass after batching has
//! finished, so every flush in a frame needs its own GPU region. Regions are
//! taken from a per-buffer pool and recycled at the start of the next frame.

use std::sync::Arc;

use lumen_core::profiling::profile_function;
use lumen_test_utils::{GpuBuffer, RenderContext};

use super::vertex::BatchVertex;
use crate::error::BatchError;

struct GpuRegion {
    vertices: GpuBuffer,
    indices: GpuBuffer,
}

/// GPU buffers holding one uploaded batch.
#[derive(Debug, Clone)]
pub struct UploadedBatch {
    pub vertex_buffer: GpuBuffer,
    pub index_buffer: GpuBuffer,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// Fixed-capacity vertex and index staging.
///
/// Capacity never grows. Writing past it is a bug in the caller and panics;
/// the pipeline checks [`is_full`](Self::is_full) and flushes first.
pub struct VertexBuffer {
    label: Arc<str>,
    vertices: Vec<BatchVertex>,
    indices: Vec<u32>,
    vertex_capacity: usize,
    index_capacity: usize,
    regions: Vec<GpuRegion>,
    next_region: usize,
}

impl VertexBuffer {
    pub fn new(label: impl Into<Arc<str>>, vertex_capacity: usize, index_capacity: usize) -> Self {
        Self {
            label: label.into(),
            vertices: Vec::with_capacity(vertex_capacity),
            indices: Vec::with_capacity(index_capacity),
            vertex_capacity,
            index_capacity,
            regions: Vec::new(),
            next_region: 0,
        }
    }

    /// Rewind the write cursor. GPU regions are untouched.
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Append one vertex and return its index within the batch.
    ///
    /// # Panics
    /// Panics if the buffer is full.
    pub fn write(&mut self, vertex: BatchVertex) -> u32 {
        assert!(
            !self.is_full(1),
            "VertexBuffer '{}' overflow: {} vertices already written, capacity {}",
            self.label,
            self.vertices.len(),
            self.vertex_capacity
        );
        self.vertices.push(vertex);
        self.vertices.len() as u32 - 1
    }

    /// Checked variant of [`write`](Self::write).
    pub fn try_write(&mut self, vertex: BatchVertex) -> Result<u32, BatchError> {
        if self.is_full(1) {
            return Err(BatchError::BufferOverflow {
                requested: self.vertices.len() + 1,
                capacity: self.vertex_capacity,
            });
        }
        Ok(self.write(vertex))
    }

    /// Append indices.
    ///
    /// # Panics
    /// Panics if they do not fit.
    pub fn write_indices(&mut self, indices: impl IntoIterator<Item = u32>) {
        self.indices.extend(indices);
        assert!(
            self.indices.len() <= self.index_capacity,
            "VertexBuffer '{}' index overflow: {} indices, capacity {}",
            self.label,
            self.indices.len(),
            self.index_capacity
        );
    }

    /// Whether `additional` more vertices would exceed capacity.
    pub fn is_full(&self, additional: usize) -> bool {
        self.vertices.len() + additional > self.vertex_capacity
    }

    /// Whether `additional` more indices would exceed capacity.
    pub fn is_index_full(&self, additional: usize) -> bool {
        self.indices.len() + additional > self.index_capacity
    }

    /// Copy the staged range into a fresh GPU region.
    ///
    /// Returns `None` when nothing is staged. Staging is left as is; call
    /// [`reset`](Self::reset) once the batch is recorded.
    pub fn upload(&mut self, ctx: &dyn RenderContext) -> Option<UploadedBatch> {
        profile_function!();
        if self.vertices.is_empty() {
            return None;
        }

        if self.next_region == self.regions.len() {
            let region = self.create_region(ctx);
            self.regions.push(region);
        }
        let region = &self.regions[self.next_region];
        self.next_region += 1;

        ctx.write_buffer(&region.vertices, 0, bytemuck::cast_slice(&self.vertices));
        if !self.indices.is_empty() {
            ctx.write_buffer(&region.indices, 0, bytemuck::cast_slice(&self.indices));
        }

        Some(UploadedBatch {
            vertex_buffer: region.vertices.clone(),
            index_buffer: region.indices.clone(),
            vertex_count: self.vertices.len() as u32,
            index_count: self.indices.len() as u32,
        })
    }

    fn create_region(&self, ctx: &dyn RenderContext) -> GpuRegion {
        let n = self.regions.len();
        tracing::debug!("Allocating GPU region {} for '{}'", n, self.label);
        let vertices = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{}_vertices_{}", self.label, n)),
            size: self.vertex_capacity as u64 * BatchVertex::SIZE,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let indices = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{}_indices_{}", self.label, n)),
            size: self.index_capacity as u64 * std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        GpuRegion { vertices, indices }
    }

    /// Make every GPU region available again. Call once per frame, before
    /// the first upload.
    pub fn recycle(&mut self) {
        self.next_region = 0;
    }

    pub fn vertices(&self) -> &[BatchVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.vertex_capacity
    }

    pub fn index_capacity(&self) -> usize {
        self.index_capacity
    }

    /// GPU regions allocated so far.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}
