//! Per-entry animation state.

use crate::geo::Position;
use crate::util::easing::EasingFunction;

/// A frame-counted move from one position to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    from: Position,
    to: Position,
    /// Frames already advanced.
    frame: u32,
    duration_frames: u32,
}

impl Transition {
    /// Transition that has not advanced yet. A zero duration is treated as
    /// one frame.
    #[must_use]
    pub fn new(from: Position, to: Position, duration_frames: u32) -> Self {
        Self {
            from,
            to,
            frame: 0,
            duration_frames: duration_frames.max(1),
        }
    }

    /// Start position.
    #[must_use]
    pub fn from(&self) -> Position {
        self.from
    }

    /// Target position.
    #[must_use]
    pub fn to(&self) -> Position {
        self.to
    }

    /// Frames advanced so far.
    #[must_use]
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Total frames.
    #[must_use]
    pub fn duration_frames(&self) -> u32 {
        self.duration_frames
    }

    /// Linear progress in [0, 1].
    #[must_use]
    pub fn progress(&self) -> f64 {
        f64::from(self.frame) / f64::from(self.duration_frames)
    }

    /// Interpolated position at the current frame.
    #[must_use]
    pub fn position(&self, easing: EasingFunction) -> Position {
        if self.is_complete() {
            return self.to;
        }
        self.from.lerp(self.to, easing.evaluate(self.progress()))
    }

    /// Whether the final frame has been reached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.frame >= self.duration_frames
    }

    /// Advance one frame and return the position to commit. The final frame
    /// yields `to` exactly.
    pub fn step(&mut self, easing: EasingFunction) -> Position {
        self.frame = self.frame.saturating_add(1).min(self.duration_frames);
        self.position(easing)
    }
}

/// Whether an entry is at rest or moving.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AnimationState {
    /// Displayed position equals the committed target.
    #[default]
    Idle,
    /// A transition is in flight.
    Animating(Transition),
}

impl AnimationState {
    /// Whether a transition is in flight.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        matches!(self, Self::Animating(_))
    }

    /// The in-flight transition, if any.
    #[must_use]
    pub fn transition(&self) -> Option<&Transition> {
        match self {
            Self::Animating(t) => Some(t),
            Self::Idle => None,
        }
    }
}
