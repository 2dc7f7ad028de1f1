//! Frame-driven animator for registry entries.
//!
//! Starting an animation only records a [`Transition`] on the entry;
//! [`Animator::tick`] advances every in-flight transition by one frame and
//! commits the interpolated position to the surface. A new target arriving
//! mid-flight restarts from the position last committed to the proxy, so
//! there is never more than one transition per entry.

use super::state::{AnimationState, Transition};
use crate::geo::Position;
use crate::options::AnimationOptions;
use crate::registry::{ProxyRegistry, RegistryEntry};
use crate::surface::VisualSurface;
use crate::util::easing::EasingFunction;

/// Default transition length in frames.
pub const DEFAULT_DURATION_FRAMES: u32 = 60;

/// Result of [`Animator::animate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimateOutcome {
    /// A transition was started on an idle entry.
    Scheduled,
    /// An in-flight transition was replaced.
    Superseded,
    /// Start and target coincide; nothing scheduled.
    NoOp,
}

/// Running totals since construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimatorStats {
    /// Transitions started (including supersessions).
    pub scheduled: u64,
    /// Transitions that replaced an in-flight one.
    pub superseded: u64,
    /// Transitions that ran to their final frame.
    pub completed: u64,
    /// Ticks run.
    pub frames: u64,
}

/// Advances all in-flight transitions once per frame.
#[derive(Debug, Clone)]
pub struct Animator {
    duration_frames: u32,
    easing: EasingFunction,
    enabled: bool,
    stats: AnimatorStats,
}

impl Animator {
    /// Animator with the given transition length and curve.
    #[must_use]
    pub fn new(duration_frames: u32, easing: EasingFunction) -> Self {
        Self {
            duration_frames: duration_frames.max(1),
            easing,
            enabled: true,
            stats: AnimatorStats::default(),
        }
    }

    /// Animator configured from options.
    #[must_use]
    pub fn from_options(options: &AnimationOptions) -> Self {
        let mut animator = Self::new(options.duration_frames, options.easing);
        animator.set_enabled(options.enabled);
        animator
    }

    /// Enable or disable smooth motion. When disabled, targets are committed
    /// on the next tick.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether smooth motion is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Frames per transition.
    #[must_use]
    pub fn duration_frames(&self) -> u32 {
        self.duration_frames
    }

    /// Easing curve.
    #[must_use]
    pub fn easing(&self) -> EasingFunction {
        self.easing
    }

    /// Running totals.
    #[must_use]
    pub fn stats(&self) -> AnimatorStats {
        self.stats
    }

    /// Start moving `entry` toward `to`.
    ///
    /// Any in-flight transition is discarded and the new one starts from the
    /// position last committed to the proxy; otherwise it starts at `from`.
    /// Identical start and target schedule nothing.
    pub fn animate(
        &mut self,
        entry: &mut RegistryEntry,
        from: Position,
        to: Position,
    ) -> AnimateOutcome {
        let in_flight = entry.animation.is_animating();
        let start = if in_flight { entry.displayed } else { from };

        if start == to {
            if in_flight {
                // Target moved back onto the displayed position.
                entry.animation = AnimationState::Idle;
            }
            return AnimateOutcome::NoOp;
        }

        let frames = if self.enabled { self.duration_frames } else { 1 };
        entry.animation =
            AnimationState::Animating(Transition::new(start, to, frames));
        self.stats.scheduled += 1;

        if in_flight {
            self.stats.superseded += 1;
            log::trace!("{}: retargeted mid-flight", entry.id);
            AnimateOutcome::Superseded
        } else {
            AnimateOutcome::Scheduled
        }
    }

    /// Advance every in-flight transition by one frame, committing positions
    /// to `surface`. Returns the number still in flight.
    pub fn tick<S: VisualSurface + ?Sized>(
        &mut self,
        registry: &mut ProxyRegistry,
        surface: &mut S,
    ) -> usize {
        let mut active = 0;
        for entry in registry.entries_mut() {
            let AnimationState::Animating(transition) = &mut entry.animation
            else {
                continue;
            };
            let position = transition.step(self.easing);
            let done = transition.is_complete();

            surface.set_proxy_position(entry.handle, position);
            entry.displayed = position;

            if done {
                entry.animation = AnimationState::Idle;
                self.stats.completed += 1;
            } else {
                active += 1;
            }
        }
        self.stats.frames += 1;
        active
    }

    /// Jump every in-flight transition to its target. Returns how many were
    /// skipped.
    pub fn skip_all<S: VisualSurface + ?Sized>(
        &mut self,
        registry: &mut ProxyRegistry,
        surface: &mut S,
    ) -> usize {
        let mut skipped = 0;
        for entry in registry.entries_mut() {
            let AnimationState::Animating(transition) = entry.animation else {
                continue;
            };
            surface.set_proxy_position(entry.handle, transition.to());
            entry.displayed = transition.to();
            entry.animation = AnimationState::Idle;
            skipped += 1;
        }
        skipped
    }
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_FRAMES, EasingFunction::default())
    }
}
