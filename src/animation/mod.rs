//! Frame-counted position animation for vehicle proxies.

mod animator;
mod state;

pub use animator::{
    AnimateOutcome, Animator, AnimatorStats, DEFAULT_DURATION_FRAMES,
};
pub use state::{AnimationState, Transition};
