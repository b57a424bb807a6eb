//! Resident textures and atlas regions.
//!
//! The registry is the batcher's view of the asset manager: a texture id is
//! bindable only once its GPU view has been inserted here.

use std::sync::Arc;

use lumen_core::alloc::HashMap;
use lumen_test_utils::{GpuTexture, GpuTextureView, RenderContext};

use crate::error::BatchError;

/// Identity of a GPU-resident texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

impl TextureId {
    /// The 1x1 opaque white texture every registry starts with.
    pub const WHITE: TextureId = TextureId(0);
}

impl std::fmt::Display for TextureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Region of a texture in texels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FrameRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Normalized texture coordinates of a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    pub const FULL: UvRect = UvRect {
        u0: 0.0,
        v0: 0.0,
        u1: 1.0,
        v1: 1.0,
    };

    /// Point at fraction (`s`, `t`) across the region.
    pub fn lerp(&self, s: f32, t: f32) -> [f32; 2] {
        [self.u0 + (self.u1 - self.u0) * s, self.v0 + (self.v1 - self.v0) * t]
    }
}

impl Default for UvRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// A texture the renderer may bind.
#[derive(Debug, Clone)]
pub struct ResidentTexture {
    pub view: GpuTextureView,
    pub width: u32,
    pub height: u32,
    /// Kept alive when the registry created the texture itself.
    texture: Option<GpuTexture>,
}

impl ResidentTexture {
    pub fn new(view: GpuTextureView, width: u32, height: u32) -> Self {
        Self {
            view,
            width,
            height,
            texture: None,
        }
    }

    pub fn texture(&self) -> Option<&GpuTexture> {
        self.texture.as_ref()
    }

    /// Normalize a texel region against this texture's size.
    pub fn uv_rect(&self, frame: &FrameRect) -> UvRect {
        let w = self.width.max(1) as f32;
        let h = self.height.max(1) as f32;
        UvRect {
            u0: frame.x / w,
            v0: frame.y / h,
            u1: (frame.x + frame.width) / w,
            v1: (frame.y + frame.height) / h,
        }
    }
}

/// Texture id to GPU view table.
pub struct TextureRegistry {
    ctx: Arc<dyn RenderContext>,
    textures: HashMap<TextureId, ResidentTexture>,
    white: GpuTextureView,
    next_id: u64,
    generation: u64,
}

impl TextureRegistry {
    /// Create a registry holding only [`TextureId::WHITE`].
    pub fn new(ctx: Arc<dyn RenderContext>) -> Self {
        let white = upload(ctx.as_ref(), "lumen_white", 1, 1, &[255; 4]);
        let white_view = white.view.clone();

        let mut textures = HashMap::new();
        textures.insert(TextureId::WHITE, white);

        Self {
            ctx,
            textures,
            white: white_view,
            next_id: 1,
            generation: 0,
        }
    }

    /// Create a texture from tightly packed RGBA8 texels and make it resident.
    ///
    /// Nothing is created when `texels` is not exactly `width * height * 4`
    /// bytes or either dimension is zero.
    pub fn upload_rgba8(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        texels: &[u8],
    ) -> Result<TextureId, BatchError> {
        let expected = width as usize * height as usize * 4;
        if expected == 0 || texels.len() != expected {
            tracing::warn!(
                "Refusing texture '{}' ({}x{}): {} bytes of texel data, expected {}",
                label,
                width,
                height,
                texels.len(),
                expected
            );
            return Err(BatchError::TextureData {
                label: label.to_string(),
                expected,
                actual: texels.len(),
            });
        }
        let resident = upload(self.ctx.as_ref(), label, width, height, texels);
        Ok(self.insert_resident(resident))
    }

    /// Make an externally created view resident under a fresh id.
    pub fn insert(&mut self, view: GpuTextureView, width: u32, height: u32) -> TextureId {
        self.insert_resident(ResidentTexture::new(view, width, height))
    }

    fn insert_resident(&mut self, resident: ResidentTexture) -> TextureId {
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.textures.insert(id, resident);
        self.generation += 1;
        id
    }

    /// Make a view resident under a caller-chosen id, replacing any previous one.
    ///
    /// Returns `false` for [`TextureId::WHITE`], which cannot be replaced.
    pub fn insert_with_id(&mut self, id: TextureId, view: GpuTextureView, width: u32, height: u32) -> bool {
        if id == TextureId::WHITE {
            return false;
        }
        self.next_id = self.next_id.max(id.0 + 1);
        self.textures.insert(id, ResidentTexture::new(view, width, height));
        self.generation += 1;
        true
    }

    /// Evict a texture. The white texture stays.
    pub fn remove(&mut self, id: TextureId) -> Option<ResidentTexture> {
        if id == TextureId::WHITE {
            return None;
        }
        let removed = self.textures.remove(&id);
        if removed.is_some() {
            self.generation += 1;
        }
        removed
    }

    pub fn get(&self, id: TextureId) -> Option<&ResidentTexture> {
        self.textures.get(&id)
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.textures.contains_key(&id)
    }

    pub fn view(&self, id: TextureId) -> Option<&GpuTextureView> {
        self.textures.get(&id).map(|t| &t.view)
    }

    pub fn white_view(&self) -> &GpuTextureView {
        &self.white
    }

    pub fn size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&id).map(|t| (t.width, t.height))
    }

    /// Normalized coordinates of `frame` within `id`, or the whole texture.
    pub fn uv_rect(&self, id: TextureId, frame: Option<&FrameRect>) -> UvRect {
        match (self.textures.get(&id), frame) {
            (Some(texture), Some(frame)) => texture.uv_rect(frame),
            _ => UvRect::FULL,
        }
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Bumped on every insert and removal; bind groups built for an older
    /// generation may reference stale views.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn upload(ctx: &dyn RenderContext, label: &str, width: u32, height: u32, texels: &[u8]) -> ResidentTexture {
    let texture = ctx.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    ctx.write_texture(&texture, texels, width, height);
    let view = ctx.create_texture_view(&texture);

    ResidentTexture {
        view,
        width,
        height,
        texture: Some(texture),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_test_utils::MockRenderContext;

    fn registry() -> TextureRegistry {
        TextureRegistry::new(Arc::new(MockRenderContext::new()))
    }

    #[test]
    fn test_white_is_always_resident() {
        let mut textures = registry();
        assert!(textures.contains(TextureId::WHITE));
        assert_eq!(textures.size(TextureId::WHITE), Some((1, 1)));
        assert!(textures.remove(TextureId::WHITE).is_none());
        assert!(textures.contains(TextureId::WHITE));
    }

    #[test]
    fn test_upload_assigns_fresh_ids() {
        let mut textures = registry();
        let a = textures.upload_rgba8("a", 2, 2, &[0; 16]).unwrap();
        let b = textures.upload_rgba8("b", 4, 4, &[0; 64]).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, TextureId::WHITE);
        assert_eq!(textures.size(b), Some((4, 4)));
        assert_eq!(textures.len(), 3);
    }

    #[test]
    fn test_short_texel_data_is_refused() {
        let mock = Arc::new(MockRenderContext::new());
        let mut textures = TextureRegistry::new(mock.clone());
        let creates = mock.count_texture_creates();

        let err = textures.upload_rgba8("short", 4, 4, &[0; 16]).unwrap_err();
        assert_eq!(
            err,
            BatchError::TextureData {
                label: "short".to_string(),
                expected: 64,
                actual: 16,
            }
        );
        assert!(textures.upload_rgba8("empty", 0, 4, &[]).is_err());
        assert_eq!(mock.count_texture_creates(), creates);
        assert_eq!(textures.len(), 1);
    }

    #[test]
    fn test_generation_tracks_changes() {
        let mut textures = registry();
        let start = textures.generation();
        let id = textures.upload_rgba8("a", 1, 1, &[0; 4]).unwrap();
        assert_eq!(textures.generation(), start + 1);
        textures.remove(id);
        assert_eq!(textures.generation(), start + 2);
        textures.remove(id);
        assert_eq!(textures.generation(), start + 2);
    }

    #[test]
    fn test_insert_with_id_moves_counter_past_id() {
        let mut textures = registry();
        assert!(textures.insert_with_id(TextureId(10), GpuTextureView::mock(99), 8, 8));
        let next = textures.upload_rgba8("next", 1, 1, &[0; 4]).unwrap();
        assert_eq!(next, TextureId(11));
        assert!(!textures.insert_with_id(TextureId::WHITE, GpuTextureView::mock(98), 1, 1));
    }

    #[test]
    fn test_frame_uv_normalization() {
        let mut textures = registry();
        let atlas = textures.upload_rgba8("atlas", 64, 32, &[0; 64 * 32 * 4]).unwrap();
        let uv = textures.uv_rect(atlas, Some(&FrameRect::new(16.0, 8.0, 16.0, 16.0)));
        assert_eq!(uv, UvRect { u0: 0.25, v0: 0.25, u1: 0.5, v1: 0.75 });
        assert_eq!(textures.uv_rect(atlas, None), UvRect::FULL);
    }
}
