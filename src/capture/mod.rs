//! Window capture and input.
//!
//! The scanner talks to the emulator window only through [`WindowDriver`].
//! On Windows the live implementation uses GDI `PrintWindow` for frames and
//! posted mouse messages for input, so the emulator never needs focus.
//! [`replay::ReplayDriver`] plays back recorded frames for offline runs and tests.

pub mod replay;

#[cfg(windows)]
pub mod input;
#[cfg(windows)]
pub mod screenshot;
#[cfg(windows)]
pub mod window;

use anyhow::Result;
use image::RgbImage;
use std::time::Duration;

#[cfg(windows)]
pub use screenshot::Win32Window;

/// A captured client-area frame, border already removed.
pub type CaptureFrame = RgbImage;

/// Number of intermediate mouse moves in a drag.
pub const DRAG_STEPS: u32 = 50;

/// Base delay between drag moves, multiplied by the scroll speed factor.
pub const DRAG_STEP_DELAY: Duration = Duration::from_millis(10);

/// Pause before releasing the button at the end of a drag so the list
/// does not fling.
pub const DRAG_RELEASE_DELAY: Duration = Duration::from_millis(300);

/// Client-area pixel coordinate in canonical resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Handle to the foreign emulator window.
///
/// All methods take `&self` and the driver moves to the scan thread, so
/// implementations serialise access to their native resources internally.
pub trait WindowDriver: Send + Sync {
    /// Forces the client area to `width` x `height`, adding the configured
    /// border thickness to get the outer window size.
    fn resize(&self, width: u32, height: u32) -> Result<()>;

    /// Captures the client area. Restores a minimised window first.
    fn capture(&self) -> Result<CaptureFrame>;

    /// Clicks at `point`, then waits `delay`.
    fn click(&self, point: Point, delay: Duration) -> Result<()>;

    /// Presses at `from`, moves along [`drag_path`] and releases at `to`.
    /// `should_stop` is polled between moves; when it returns true the
    /// remaining moves are skipped and the button is released where the
    /// pointer stopped.
    fn drag_line(
        &self,
        from: Point,
        to: Point,
        speed_scale: f32,
        should_stop: &dyn Fn() -> bool,
    ) -> Result<()>;

    /// Releases native resources. Safe to call more than once.
    fn cleanup(&self);
}

/// Linearly interpolated drag points from `from` to `to`, excluding the
/// start point and ending exactly at `to`.
pub fn drag_path(from: Point, to: Point, steps: u32) -> Vec<Point> {
    let steps = steps.max(1);
    (1..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            Point::new(
                from.x + ((to.x - from.x) as f32 * t).round() as i32,
                from.y + ((to.y - from.y) as f32 * t).round() as i32,
            )
        })
        .collect()
}

/// Moves along the drag path with `move_to` until `should_stop` fires.
///
/// Returns the point the pointer was last moved to, `from` if it never moved.
pub fn walk_drag(
    from: Point,
    to: Point,
    should_stop: &dyn Fn() -> bool,
    mut move_to: impl FnMut(Point) -> Result<()>,
) -> Result<Point> {
    let mut last = from;
    for point in drag_path(from, to, DRAG_STEPS) {
        if should_stop() {
            break;
        }
        move_to(point)?;
        last = point;
    }
    Ok(last)
}

/// Delay between two drag moves for the given speed factor, in whole
/// milliseconds.
pub fn drag_step_delay(speed_scale: f32) -> Duration {
    let millis = DRAG_STEP_DELAY.as_millis() as f64 * f64::from(speed_scale.max(0.0));
    Duration::from_millis(millis.round() as u64)
}
