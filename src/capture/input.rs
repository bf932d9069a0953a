//! Mouse input posted to the emulator's input window.
//!
//! Messages go straight into the window's queue with `PostMessageW`, so the
//! user's real cursor is never moved and the emulator does not need focus.

use anyhow::{Context, Result};
use std::thread;

use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    PostMessageW, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE,
};

use super::{DRAG_RELEASE_DELAY, Point, drag_step_delay, walk_drag};

/// MK_LBUTTON: left button held.
const MK_LBUTTON: WPARAM = WPARAM(0x0001);

/// Packs client coordinates the way mouse messages expect (MAKELPARAM).
fn make_lparam(point: Point) -> LPARAM {
    let x = (point.x as u32) & 0xFFFF;
    let y = (point.y as u32) & 0xFFFF;
    LPARAM(((y << 16) | x) as isize)
}

fn post_mouse(hwnd: HWND, msg: u32, wparam: WPARAM, point: Point) -> Result<()> {
    unsafe { PostMessageW(hwnd, msg, wparam, make_lparam(point)) }
        .with_context(|| format!("PostMessageW({:#x}) at {:?} failed", msg, point))
}

/// Left click: button down then up at the same point.
pub fn post_click(hwnd: HWND, point: Point) -> Result<()> {
    post_mouse(hwnd, WM_LBUTTONDOWN, MK_LBUTTON, point)?;
    post_mouse(hwnd, WM_LBUTTONUP, WPARAM(0), point)?;
    Ok(())
}

/// Drags with the left button along a straight line.
///
/// 1. Button down at `from`
/// 2. `DRAG_STEPS` moves, each after a delay scaled by `speed_scale`
/// 3. Short pause, then button up at the last point reached
pub fn post_drag(
    hwnd: HWND,
    from: Point,
    to: Point,
    speed_scale: f32,
    should_stop: &dyn Fn() -> bool,
) -> Result<()> {
    post_mouse(hwnd, WM_LBUTTONDOWN, MK_LBUTTON, from)?;

    let step_delay = drag_step_delay(speed_scale);
    let last = walk_drag(from, to, should_stop, |point| {
        thread::sleep(step_delay);
        post_mouse(hwnd, WM_MOUSEMOVE, MK_LBUTTON, point)
    })?;
    if last != to {
        crate::log(&format!("Drag interrupted at {:?}", last));
    }

    thread::sleep(DRAG_RELEASE_DELAY);
    post_mouse(hwnd, WM_LBUTTONUP, WPARAM(0), last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_lparam_packs_coordinates() {
        assert_eq!(make_lparam(Point::new(0x12, 0x34)).0, 0x0034_0012);
        assert_eq!(make_lparam(Point::new(1450, 360)).0, (360 << 16) | 1450);
    }
}
