/// An RGBA color with `f32` components in the `0.0..=1.0` range.
///
/// Vertices carry colors packed into four normalized bytes, see
/// [`Color::to_packed`]. Construction mirrors the usual float, byte and hex
/// forms:
///
/// ```
/// use lumen_render::Color;
///
/// let orange = Color::from_hex(0xFF8800);
/// let faded = orange.with_alpha(0.5);
/// assert_eq!(faded.to_packed().to_le_bytes(), [255, 136, 0, 128]);
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    /// Create a color from RGB components with full opacity.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from RGBA components.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from 8-bit RGBA values.
    pub fn from_rgba_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Create a color from a 24-bit RGB hex value (e.g. `0xFF8800`).
    pub fn from_hex(hex: u32) -> Self {
        let [b, g, r, _] = hex.to_le_bytes();
        Self::from_rgba_u8(r, g, b, 255)
    }

    /// Same color with alpha replaced.
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Linear interpolation between two colors.
    pub fn lerp(self, other: Color, t: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Pack into the `Unorm8x4` vertex attribute format.
    ///
    /// Byte order in memory is R, G, B, A. Components are clamped first.
    pub fn to_packed(self) -> u32 {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        u32::from_le_bytes([quantize(self.r), quantize(self.g), quantize(self.b), quantize(self.a)])
    }

    /// Inverse of [`Color::to_packed`].
    pub fn from_packed(packed: u32) -> Self {
        let [r, g, b, a] = packed.to_le_bytes();
        Self::from_rgba_u8(r, g, b, a)
    }

    /// Convert to the equivalent `wgpu::Color` (f64 components).
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }

    /// Convert to an `[r, g, b, a]` array.
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 4]> for Color {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Color> for [f32; 4] {
    fn from(color: Color) -> Self {
        color.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing_is_rgba_in_memory() {
        let packed = Color::rgba(1.0, 0.0, 0.0, 1.0).to_packed();
        assert_eq!(packed.to_le_bytes(), [255, 0, 0, 255]);
        assert_eq!(Color::WHITE.to_packed(), u32::MAX);
    }

    #[test]
    fn test_packing_clamps() {
        let packed = Color::rgba(2.0, -1.0, 0.5, 1.0).to_packed();
        assert_eq!(packed.to_le_bytes(), [255, 0, 128, 255]);
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex(0x00FF00), Color::GREEN);
    }

    #[test]
    fn test_lerp_midpoint() {
        let mid = Color::BLACK.lerp(Color::WHITE, 0.5);
        assert_eq!(mid, Color::rgb(0.5, 0.5, 0.5));
    }
}
