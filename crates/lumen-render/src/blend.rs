//! Blend modes understood by the batcher.
//!
//! Fragment shaders output premultiplied alpha, so every supported mode is
//! expressed with premultiplied factors. Color and alpha use the same
//! component.

use wgpu::{BlendComponent, BlendFactor, BlendOperation, BlendState};

/// How a batch's fragments combine with the render target.
///
/// All vertices in one draw share a blend mode; a change of mode between two
/// drawables forces a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Premultiplied source-over: `src + dst * (1 - src.a)`.
    #[default]
    Normal,
    /// `src + dst * dst.a`. Glows, light sources.
    Add,
    /// `src * dst + dst * (1 - src.a)`.
    Multiply,
    /// `src + dst * (1 - src)`.
    Screen,
    /// Removes destination coverage where the source is opaque.
    Erase,
    /// No blending, source replaces destination.
    Replace,
    /// Caller-supplied blend state.
    Custom(BlendState),

    // Modes that need a read of the destination in the shader. They are
    // representable so scene data can carry them, but resolve to `Normal`.
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

const fn uniform(src_factor: BlendFactor, dst_factor: BlendFactor, operation: BlendOperation) -> BlendState {
    let component = BlendComponent {
        src_factor,
        dst_factor,
        operation,
    };
    BlendState {
        color: component,
        alpha: component,
    }
}

impl BlendMode {
    /// Whether the fixed-function blender can express this mode.
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            BlendMode::Normal
                | BlendMode::Add
                | BlendMode::Multiply
                | BlendMode::Screen
                | BlendMode::Erase
                | BlendMode::Replace
                | BlendMode::Custom(_)
        )
    }

    /// The mode actually used for drawing: `self` if supported, else `Normal`.
    pub fn resolve(self) -> BlendMode {
        if self.is_supported() { self } else { BlendMode::Normal }
    }

    /// Convert to a wgpu blend state. Unsupported modes map to `Normal`'s.
    pub fn to_blend_state(self) -> Option<BlendState> {
        match self.resolve() {
            BlendMode::Normal => Some(BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            BlendMode::Add => Some(uniform(BlendFactor::One, BlendFactor::DstAlpha, BlendOperation::Add)),
            BlendMode::Multiply => Some(uniform(
                BlendFactor::Dst,
                BlendFactor::OneMinusSrcAlpha,
                BlendOperation::Add,
            )),
            BlendMode::Screen => Some(uniform(BlendFactor::One, BlendFactor::OneMinusSrc, BlendOperation::Add)),
            BlendMode::Erase => Some(uniform(
                BlendFactor::Zero,
                BlendFactor::OneMinusSrcAlpha,
                BlendOperation::ReverseSubtract,
            )),
            BlendMode::Replace => None,
            BlendMode::Custom(state) => Some(state),
            _ => Some(BlendState::PREMULTIPLIED_ALPHA_BLENDING),
        }
    }

    /// Short name used in labels and log lines.
    pub fn label(self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Add => "add",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Erase => "erase",
            BlendMode::Replace => "replace",
            BlendMode::Custom(_) => "custom",
            BlendMode::Overlay => "overlay",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::ColorDodge => "color-dodge",
            BlendMode::ColorBurn => "color-burn",
            BlendMode::HardLight => "hard-light",
            BlendMode::SoftLight => "soft-light",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
            BlendMode::Hue => "hue",
            BlendMode::Saturation => "saturation",
            BlendMode::Color => "color",
            BlendMode::Luminosity => "luminosity",
        }
    }
}

impl From<BlendState> for BlendMode {
    fn from(state: BlendState) -> Self {
        BlendMode::Custom(state)
    }
}
