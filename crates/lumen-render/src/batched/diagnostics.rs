//! Report-once warnings for conditions the batcher recovers from.

use std::sync::Arc;

use lumen_core::alloc::HashSet;

use super::texture::TextureId;
use crate::adapters::DrawableKind;
use crate::blend::BlendMode;

/// What a warning is about. Each key is logged at most once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DiagnosticKey {
    MissingTexture(TextureId),
    /// Texture was evicted after being slotted but before the flush.
    VanishedTexture(TextureId),
    UnsupportedBlend(BlendMode),
    OversizeWrite(Arc<str>),
    InvalidGeometry(Arc<str>),
    UnknownPipeline(Arc<str>),
    UnknownAdapter(DrawableKind),
    GeometryMismatch(DrawableKind),
    UnbalancedGroups,
}

/// Rate limiter for `tracing` warnings.
#[derive(Debug, Default)]
pub struct Diagnostics {
    reported: HashSet<DiagnosticKey>,
    suppressed: u64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message` unless `key` was already reported. Returns whether it
    /// was logged.
    pub fn warn_once(&mut self, key: DiagnosticKey, message: impl FnOnce() -> String) -> bool {
        if self.reported.insert(key) {
            tracing::warn!("{}", message());
            true
        } else {
            self.suppressed += 1;
            false
        }
    }

    pub fn has_reported(&self, key: &DiagnosticKey) -> bool {
        self.reported.contains(key)
    }

    pub fn reported_count(&self) -> usize {
        self.reported.len()
    }

    /// Repeats swallowed since creation.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_key_warns_once() {
        let mut diagnostics = Diagnostics::new();
        let key = DiagnosticKey::MissingTexture(TextureId(3));

        assert!(diagnostics.warn_once(key.clone(), || "missing".to_string()));
        assert!(!diagnostics.warn_once(key.clone(), || unreachable!()));
        assert!(diagnostics.warn_once(DiagnosticKey::MissingTexture(TextureId(4)), || "other".into()));

        assert!(diagnostics.has_reported(&key));
        assert_eq!(diagnostics.reported_count(), 2);
        assert_eq!(diagnostics.suppressed(), 1);
    }
}
