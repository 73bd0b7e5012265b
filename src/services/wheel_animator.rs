//! Drives the wheel from its resting angle onto the segment of an awarded prize.
//!
//! The rotation only ever grows across a session. A target that arrives while
//! the wheel is still turning is dropped, never queued and never allowed to
//! interrupt the running animation.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::cell::{Cell, RefCell};

use crate::config::WheelConfig;
use crate::error::{AppError, AppResult};
use crate::models::Prize;
use crate::utils::{RotationPlan, ease_out_cubic, plan_rotation, sample_jitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelMode {
    Idle,
    Spinning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationOutcome {
    /// The wheel stopped on this prize and the completion callback ran.
    Completed(Prize),
    /// The wheel was already turning; the target was dropped.
    Ignored,
    /// The prize was awarded but could not be shown on the wheel.
    Skipped(Prize),
}

pub struct WheelAnimator {
    config: WheelConfig,
    rotation: Cell<f64>,
    mode: Cell<WheelMode>,
    active: Cell<Option<RotationPlan>>,
    rng: RefCell<StdRng>,
}

impl WheelAnimator {
    pub fn new(config: WheelConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: WheelConfig, rng: StdRng) -> Self {
        Self {
            config,
            rotation: Cell::new(0.0),
            mode: Cell::new(WheelMode::Idle),
            active: Cell::new(None),
            rng: RefCell::new(rng),
        }
    }

    pub fn rotation(&self) -> f64 {
        self.rotation.get()
    }

    pub fn mode(&self) -> WheelMode {
        self.mode.get()
    }

    /// Angle to draw at `progress` (0..=1) of the running animation.
    pub fn angle_at(&self, progress: f64) -> f64 {
        match self.active.get() {
            Some(plan) => plan.from + (plan.to - plan.from) * ease_out_cubic(progress),
            None => self.rotation.get(),
        }
    }

    /// Turn the wheel onto `prize` and call `on_complete` once the animation ends.
    ///
    /// `segments` is the list currently drawn; its order only decides where the
    /// wheel stops. The prize handed to `on_complete` is the awarded one, matched
    /// by id, so a prize list refreshed mid-animation cannot change the result.
    pub async fn spin_to<F>(
        &self,
        prize: &Prize,
        segments: &[Prize],
        on_complete: F,
    ) -> AppResult<AnimationOutcome>
    where
        F: FnOnce(&Prize),
    {
        if self.mode.get() == WheelMode::Spinning {
            log::warn!("Wheel already spinning, dropping target {}", prize.id);
            return Ok(AnimationOutcome::Ignored);
        }
        if segments.is_empty() {
            return Err(AppError::PreconditionFailed(
                "Cannot spin a wheel with no segments".into(),
            ));
        }
        let index = segments
            .iter()
            .position(|p| p.id == prize.id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Prize {} is not on the wheel", prize.id))
            })?;

        let jitter = sample_jitter(
            &mut *self.rng.borrow_mut(),
            segments.len(),
            self.config.jitter_epsilon_deg,
        )?;
        let plan = plan_rotation(
            self.rotation.get(),
            index,
            segments.len(),
            self.config.full_turns,
            jitter,
        )?;
        log::debug!(
            "Spinning to segment {index}/{} ({:.1}° -> {:.1}°)",
            segments.len(),
            plan.from,
            plan.to
        );

        let awarded = prize.clone();
        let guard = SpinningGuard::start(self, plan);
        tokio::time::sleep(self.config.duration()).await;
        drop(guard);

        on_complete(&awarded);
        Ok(AnimationOutcome::Completed(awarded))
    }
}

/// Holds the wheel in `Spinning`. Dropping it, on completion or when the
/// animation future is abandoned, leaves the wheel idle at the planned angle.
struct SpinningGuard<'a> {
    animator: &'a WheelAnimator,
    plan: RotationPlan,
}

impl<'a> SpinningGuard<'a> {
    fn start(animator: &'a WheelAnimator, plan: RotationPlan) -> Self {
        animator.mode.set(WheelMode::Spinning);
        animator.active.set(Some(plan));
        Self { animator, plan }
    }
}

impl Drop for SpinningGuard<'_> {
    fn drop(&mut self) {
        self.animator.rotation.set(self.plan.to);
        self.animator.active.set(None);
        self.animator.mode.set(WheelMode::Idle);
    }
}
