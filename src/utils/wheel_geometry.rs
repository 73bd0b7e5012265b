//! Angles for landing the wheel on a chosen segment.
//!
//! Segment `i` of `n` spans `[i * 360/n, (i + 1) * 360/n)` degrees on the wheel,
//! measured clockwise from the pointer, which sits fixed at the top (0°).

use rand::Rng;

use crate::error::{AppError, AppResult};

pub const FULL_TURN_DEG: f64 = 360.0;

pub fn segment_angle(segment_count: usize) -> AppResult<f64> {
    if segment_count == 0 {
        return Err(AppError::PreconditionFailed(
            "Wheel needs at least one segment".into(),
        ));
    }
    Ok(FULL_TURN_DEG / segment_count as f64)
}

pub fn segment_center(index: usize, segment_count: usize) -> AppResult<f64> {
    let angle = segment_angle(segment_count)?;
    if index >= segment_count {
        return Err(AppError::PreconditionFailed(format!(
            "Segment index {index} out of range for {segment_count} segments"
        )));
    }
    Ok(index as f64 * angle + angle / 2.0)
}

/// Rotation (mod 360) that brings the centre of segment `index` under the pointer.
pub fn target_angle(index: usize, segment_count: usize) -> AppResult<f64> {
    Ok(FULL_TURN_DEG - segment_center(index, segment_count)?)
}

/// Largest jitter magnitude that keeps the pointer `epsilon` degrees inside the segment.
pub fn jitter_half_width(segment_count: usize, epsilon: f64) -> AppResult<f64> {
    let half = segment_angle(segment_count)? / 2.0;
    Ok((half - epsilon.max(0.0)).max(0.0))
}

pub fn sample_jitter<R: Rng + ?Sized>(
    rng: &mut R,
    segment_count: usize,
    epsilon: f64,
) -> AppResult<f64> {
    let width = jitter_half_width(segment_count, epsilon)?;
    if width <= 0.0 {
        return Ok(0.0);
    }
    Ok(rng.gen_range(-width..width))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationPlan {
    pub segment_angle: f64,
    pub target_angle: f64,
    pub jitter: f64,
    pub from: f64,
    pub to: f64,
}

/// Plan the next spin. The target is measured from the last whole turn, so the
/// residual angle left by the previous spin does not offset the landing.
pub fn plan_rotation(
    current_rotation: f64,
    index: usize,
    segment_count: usize,
    full_turns: u32,
    jitter: f64,
) -> AppResult<RotationPlan> {
    let segment_angle = segment_angle(segment_count)?;
    let target_angle = target_angle(index, segment_count)?;
    let residual = current_rotation.rem_euclid(FULL_TURN_DEG);
    let to = current_rotation + f64::from(full_turns) * FULL_TURN_DEG + target_angle + jitter
        - residual;
    Ok(RotationPlan {
        segment_angle,
        target_angle,
        jitter,
        from: current_rotation,
        to,
    })
}

/// Segment under the pointer once the wheel has turned `rotation` degrees clockwise.
pub fn segment_under_pointer(rotation: f64, segment_count: usize) -> AppResult<usize> {
    let angle = segment_angle(segment_count)?;
    let wheel_angle = (FULL_TURN_DEG - rotation.rem_euclid(FULL_TURN_DEG)).rem_euclid(FULL_TURN_DEG);
    Ok(((wheel_angle / angle).floor() as usize).min(segment_count - 1))
}

/// Ease-out cubic on `[0, 1]`; monotonic, starts fast and settles.
pub fn ease_out_cubic(progress: f64) -> f64 {
    let t = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}
