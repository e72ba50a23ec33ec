//! Frame ↔ progress mapping.
//!
//! Keyframes are authored in composition frames. Each keyframe's span is
//! converted once, at track construction, into a `[start, end)` interval on
//! the composition's normalized progress axis; a property whose keyframes
//! cover only part of the composition therefore clamps to its own first and
//! last keyframe while the global progress keeps moving.

use crate::error::{LottieError, Result};

/// Composition-level time base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    start_frame: f32,
    end_frame: f32,
    frame_rate: f32,
}

impl Timeline {
    pub fn new(start_frame: f32, end_frame: f32, frame_rate: f32) -> Result<Self> {
        if !start_frame.is_finite() || !end_frame.is_finite() {
            return Err(LottieError::timeline("frame bounds must be finite"));
        }
        if end_frame <= start_frame {
            return Err(LottieError::timeline(format!(
                "end frame {end_frame} must be after start frame {start_frame}"
            )));
        }
        if !(frame_rate > 0.0) {
            return Err(LottieError::timeline(format!(
                "frame rate {frame_rate} must be positive"
            )));
        }
        Ok(Self {
            start_frame,
            end_frame,
            frame_rate,
        })
    }

    pub fn start_frame(&self) -> f32 {
        self.start_frame
    }

    pub fn end_frame(&self) -> f32 {
        self.end_frame
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn duration_frames(&self) -> f32 {
        self.end_frame - self.start_frame
    }

    pub fn duration_secs(&self) -> f32 {
        self.duration_frames() / self.frame_rate
    }

    /// Position of `frame` on the progress axis. Not clamped: keyframes
    /// authored before `ip` or after `op` map outside [0,1].
    pub fn progress_at_frame(&self, frame: f32) -> f32 {
        (frame - self.start_frame) / self.duration_frames()
    }

    /// Host-facing conversion, clamped to [0,1].
    pub fn progress_for_frame(&self, frame: f32) -> f32 {
        self.progress_at_frame(frame).clamp(0.0, 1.0)
    }

    pub fn progress_for_time(&self, secs: f32) -> f32 {
        self.progress_for_frame(self.start_frame + secs * self.frame_rate)
    }

    pub fn frame_for_progress(&self, progress: f32) -> f32 {
        self.start_frame + progress * self.duration_frames()
    }
}

/// Frames during which a layer is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSpan {
    pub in_frame: f32,
    pub out_frame: f32,
}

impl LayerSpan {
    pub fn new(in_frame: f32, out_frame: f32) -> Self {
        Self {
            in_frame,
            out_frame,
        }
    }

    /// Span covering the whole timeline, used when a layer leaves `op` unset.
    pub fn whole(timeline: &Timeline) -> Self {
        Self::new(timeline.start_frame(), timeline.end_frame())
    }

    /// `in_frame <= frame < out_frame`
    pub fn contains(&self, frame: f32) -> bool {
        frame >= self.in_frame && frame < self.out_frame
    }

    pub fn is_visible_at(&self, timeline: &Timeline, progress: f32) -> bool {
        let frame = timeline.frame_for_progress(progress);
        // The last frame of the composition stays visible for layers that run to the end.
        self.contains(frame)
            || (progress >= 1.0
                && self.out_frame >= timeline.end_frame()
                && frame >= self.in_frame)
    }
}

/// Maps composition time into a layer's own time. Keyframes inside a layer
/// are authored relative to its start time `st` and played at `1 / sr` speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerTime {
    pub start_time: f32,
    pub stretch: f32,
}

impl LayerTime {
    pub const IDENTITY: LayerTime = LayerTime {
        start_time: 0.0,
        stretch: 1.0,
    };

    pub fn new(start_time: f32, stretch: f32) -> Self {
        let stretch = if stretch == 0.0 || !stretch.is_finite() { 1.0 } else { stretch };
        Self { start_time, stretch }
    }

    pub fn is_identity(&self) -> bool {
        self.start_time == 0.0 && self.stretch == 1.0
    }

    /// Progress on the layer's keyframe axis for a composition progress.
    pub fn local_progress(&self, timeline: &Timeline, progress: f32) -> f32 {
        if self.is_identity() {
            return progress;
        }
        let frame = timeline.frame_for_progress(progress);
        timeline.progress_at_frame((frame - self.start_time) / self.stretch)
    }
}

impl Default for LayerTime {
    fn default() -> Self {
        Self::IDENTITY
    }
}
