//! Time-driven interpolation with explicit cancellation.
//!
//! An [`Animator`] owns at most one [`Tween`]. Starting a new one cancels the
//! previous token first, so two tweens never drive the same value. Time is
//! always passed in by the caller; nothing here reads the clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Linear interpolation between two values of the same type
pub trait Lerp: Copy {
    fn lerp(from: Self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(from: Self, to: Self, t: f32) -> Self {
        from + (to - from) * t
    }
}

/// Ease-out cubic for smooth deceleration
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Shared flag; once set, the tween it belongs to never advances again
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct Tween<T> {
    pub from: T,
    pub to: T,
    started_at: Instant,
    duration: Duration,
    easing: fn(f32) -> f32,
    token: CancelToken,
}

/// One evaluated frame of a tween
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<T> {
    pub value: T,
    /// Raw time progress, clamped to [0, 1]
    pub progress: f32,
    pub finished: bool,
}

impl<T: Lerp> Tween<T> {
    pub fn new(from: T, to: T, duration: Duration, started_at: Instant) -> Self {
        Self {
            from,
            to,
            started_at,
            duration,
            easing: ease_out_cubic,
            token: CancelToken::new(),
        }
    }

    pub fn with_easing(mut self, easing: fn(f32) -> f32) -> Self {
        self.easing = easing;
        self
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn sample(&self, now: Instant) -> Sample<T> {
        let progress = self.progress(now);
        let eased = (self.easing)(progress);
        Sample {
            value: T::lerp(self.from, self.to, eased),
            progress,
            finished: progress >= 1.0,
        }
    }
}

/// Runs one tween at a time: "cancel previous, run new"
#[derive(Debug)]
pub struct Animator<T> {
    active: Option<Tween<T>>,
}

impl<T> Default for Animator<T> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<T: Lerp> Animator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is running and start `tween`. Returns its token.
    pub fn run(&mut self, tween: Tween<T>) -> CancelToken {
        self.cancel();
        let token = tween.token.clone();
        self.active = Some(tween);
        token
    }

    /// Advance to `now`. A finished or cancelled tween is dropped; a
    /// cancelled one yields nothing.
    pub fn sample(&mut self, now: Instant) -> Option<Sample<T>> {
        let tween = self.active.as_ref()?;
        if tween.token.is_cancelled() {
            self.active = None;
            return None;
        }
        let sample = tween.sample(now);
        if sample.finished {
            self.active = None;
        }
        Some(sample)
    }

    /// Current interpolated value without consuming a finished tween
    pub fn peek(&self, now: Instant) -> Option<T> {
        self.active.as_ref()
            .filter(|t| !t.token.is_cancelled())
            .map(|t| t.sample(now).value)
    }

    pub fn cancel(&mut self) {
        if let Some(tween) = self.active.take() {
            tween.token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|t| !t.token.is_cancelled())
    }

    pub fn target(&self) -> Option<T> {
        self.active.as_ref().map(|t| t.to)
    }
}
