use std::f64::consts::PI;
use std::time::{Duration, Instant};

use crate::common::config::AnimationEasing;
use crate::sys::geometry::{Point, Rect, Size};
use crate::ui::expanded_folder::GridState;

/// Values that can be tweened between two endpoints.
pub trait Interpolate: Copy {
    fn interpolate(from: Self, to: Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(from: Self, to: Self, t: f64) -> Self { blend(from, to, t) }
}

impl Interpolate for Rect {
    fn interpolate(from: Self, to: Self, t: f64) -> Self {
        Rect {
            origin: Point {
                x: blend(from.origin.x, to.origin.x, t),
                y: blend(from.origin.y, to.origin.y, t),
            },
            size: Size {
                width: blend(from.size.width, to.size.width, t),
                height: blend(from.size.height, to.size.height, t),
            },
        }
    }
}

impl Interpolate for GridState {
    fn interpolate(from: Self, to: Self, t: f64) -> Self {
        let lerp = |a: i32, b: i32| blend(f64::from(a), f64::from(b), t).round() as i32;
        GridState {
            span: if t < 1.0 { from.span } else { to.span },
            cell_w: lerp(from.cell_w, to.cell_w),
            cell_h: lerp(from.cell_h, to.cell_h),
            border_space: lerp(from.border_space, to.border_space),
            icon_size: lerp(from.icon_size, to.icon_size),
            start_x: lerp(from.start_x, to.start_x),
            start_y: lerp(from.start_y, to.start_y),
        }
    }
}

pub fn blend(a: f64, b: f64, s: f64) -> f64 { (1.0 - s) * a + s * b }

// https://easings.net
pub fn ease(easing: AnimationEasing, t: f64) -> f64 {
    use AnimationEasing::*;
    let t = t.clamp(0.0, 1.0);
    match easing {
        Linear => t,
        EaseInSine => 1.0 - f64::cos(t * PI / 2.0),
        EaseOutSine => f64::sin(t * PI / 2.0),
        EaseInOutSine => -(f64::cos(PI * t) - 1.0) / 2.0,
        EaseInQuad => t * t,
        EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
        EaseInOutQuad => in_out(t, 2),
        EaseInCubic => t.powi(3),
        EaseOutCubic => 1.0 - (1.0 - t).powi(3),
        EaseInOutCubic => in_out(t, 3),
        EaseInQuart => t.powi(4),
        EaseOutQuart => 1.0 - (1.0 - t).powi(4),
        EaseInOutQuart => in_out(t, 4),
        EaseInQuint => t.powi(5),
        EaseOutQuint => 1.0 - (1.0 - t).powi(5),
        EaseInOutQuint => in_out(t, 5),
        EaseInExpo => {
            if t == 0.0 {
                0.0
            } else {
                f64::powf(2.0, 10.0 * t - 10.0)
            }
        }
        EaseOutExpo => {
            if t == 1.0 {
                1.0
            } else {
                1.0 - f64::powf(2.0, -10.0 * t)
            }
        }
        EaseInOutExpo => {
            if t == 0.0 || t == 1.0 {
                t
            } else if t < 0.5 {
                f64::powf(2.0, 20.0 * t - 10.0) / 2.0
            } else {
                (2.0 - f64::powf(2.0, -20.0 * t + 10.0)) / 2.0
            }
        }
        EaseInCirc => 1.0 - f64::sqrt(1.0 - t * t),
        EaseOutCirc => f64::sqrt(1.0 - (t - 1.0).powi(2)),
        EaseInOutCirc | EaseInOut => {
            if t < 0.5 {
                (1.0 - f64::sqrt(1.0 - f64::powi(2.0 * t, 2))) / 2.0
            } else {
                (f64::sqrt(1.0 - f64::powi(-2.0 * t + 2.0, 2)) + 1.0) / 2.0
            }
        }
    }
}

fn in_out(t: f64, power: i32) -> f64 {
    if t < 0.5 {
        f64::powi(2.0, power - 1) * t.powi(power)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(power) / 2.0
    }
}

/// A time-based tween of the resize frame toward its new bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapAnimation {
    from: Rect,
    to: Rect,
    start: Instant,
    duration: Duration,
    easing: AnimationEasing,
}

impl SnapAnimation {
    pub fn new(from: Rect, to: Rect, start: Instant, duration: Duration, easing: AnimationEasing) -> Self {
        SnapAnimation { from, to, start, duration, easing }
    }

    pub fn from(&self) -> Rect { self.from }

    pub fn to(&self) -> Rect { self.to }

    pub fn duration(&self) -> Duration { self.duration }

    pub fn progress_at(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn frame_at(&self, now: Instant) -> Rect {
        let t = self.progress_at(now);
        if t >= 1.0 {
            return self.to;
        }
        Rect::interpolate(self.from, self.to, ease(self.easing, t))
    }

    pub fn is_finished(&self, now: Instant) -> bool { self.progress_at(now) >= 1.0 }

    /// Jumps to the end state.
    pub fn finish(self) -> Rect { self.to }

    /// Number of frames needed at `fps` to cover the duration.
    pub fn frame_count(&self, fps: f64) -> u32 {
        (self.duration.as_secs_f64() * fps).round().max(1.0) as u32
    }
}
