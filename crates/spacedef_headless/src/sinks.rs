//! Renderer and audio sinks for headless runs.
//!
//! Nothing is drawn or played; calls are counted and traced so a run can
//! report what a frontend would have shown.

use std::collections::BTreeSet;

use spacedef_core::math::Vec2;
use spacedef_core::presentation::{AmbientMode, Audio, AudioClip, Color, Renderer, VisualHandle, VisualKind};

/// Renderer that only tracks live handles.
#[derive(Debug, Default)]
pub struct TracingRenderer {
    next: u64,
    live: BTreeSet<VisualHandle>,
    peak: usize,
    created: u64,
}

impl TracingRenderer {
    /// Create an empty renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Visuals currently alive.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Most visuals alive at once.
    #[must_use]
    pub const fn peak(&self) -> usize {
        self.peak
    }

    /// Visuals created over the run.
    #[must_use]
    pub const fn created(&self) -> u64 {
        self.created
    }
}

impl Renderer for TracingRenderer {
    fn create_visual(&mut self, kind: VisualKind) -> VisualHandle {
        self.next += 1;
        self.created += 1;
        let handle = VisualHandle(self.next);
        self.live.insert(handle);
        self.peak = self.peak.max(self.live.len());
        tracing::trace!(handle = handle.0, ?kind, "create visual");
        handle
    }

    fn set_position(&mut self, _handle: VisualHandle, _position: Vec2) {}

    fn set_rotation(&mut self, _handle: VisualHandle, _radians: f32) {}

    fn set_color(&mut self, _handle: VisualHandle, _color: Color) {}

    fn destroy(&mut self, handle: VisualHandle) {
        if !self.live.remove(&handle) {
            tracing::warn!(handle = handle.0, "Destroying unknown visual");
        }
    }
}

/// Audio sink that counts clips and remembers the ambient mode.
#[derive(Debug, Default)]
pub struct TracingAudio {
    /// One-shot clips played.
    pub clips: u64,
    /// Ambient mode changes.
    pub mode_changes: u32,
    /// Current ambient mode.
    pub mode: AmbientMode,
}

impl Audio for TracingAudio {
    fn play_one_shot(&mut self, position: Vec2, clip: AudioClip) {
        self.clips += 1;
        tracing::trace!(?clip, x = position.x, y = position.y, "one-shot");
    }

    fn set_ambient_mode(&mut self, mode: AmbientMode) {
        self.mode_changes += 1;
        self.mode = mode;
        tracing::debug!(?mode, "Ambient mode");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_tracks_peak() {
        let mut renderer = TracingRenderer::new();
        let a = renderer.create_visual(VisualKind::Mineral);
        let _b = renderer.create_visual(VisualKind::Junk);
        renderer.destroy(a);
        let _c = renderer.create_visual(VisualKind::Junk);

        assert_eq!(renderer.live(), 2);
        assert_eq!(renderer.peak(), 2);
        assert_eq!(renderer.created(), 3);
    }

    #[test]
    fn test_audio_counts() {
        let mut audio = TracingAudio::default();
        audio.play_one_shot(Vec2::ZERO, AudioClip::Explosion);
        audio.set_ambient_mode(AmbientMode::Combat);

        assert_eq!(audio.clips, 1);
        assert_eq!(audio.mode_changes, 1);
        assert_eq!(audio.mode, AmbientMode::Combat);
    }
}
