//! Offline window driver that plays back a fixed list of frames.
//!
//! Each completed drag moves to the next frame (the list is treated as
//! consecutive depot pages). Clicks can optionally do the same, which is how
//! menu navigation is replayed. Every input is recorded so callers can
//! inspect what the scanner did.

use anyhow::{Result, anyhow};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{CaptureFrame, Point, WindowDriver, walk_drag};

/// One recorded driver call.
#[derive(Clone, Debug, PartialEq)]
pub enum DriverAction {
    Resize { width: u32, height: u32 },
    Capture { frame: usize },
    Click { point: Point, delay: Duration },
    Drag { from: Point, to: Point, released: Point, completed: bool },
}

#[derive(Debug, Default)]
struct ReplayState {
    cursor: usize,
    /// An input changed the screen; the next capture shows the next frame.
    advance_pending: bool,
    actions: Vec<DriverAction>,
}

pub struct ReplayDriver {
    frames: Vec<CaptureFrame>,
    advance_on_click: bool,
    state: Mutex<ReplayState>,
    cleanups: AtomicUsize,
}

impl ReplayDriver {
    pub fn new(frames: Vec<CaptureFrame>) -> Self {
        Self {
            frames,
            advance_on_click: false,
            state: Mutex::new(ReplayState::default()),
            cleanups: AtomicUsize::new(0),
        }
    }

    /// Loads frames from image files, in order.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let frame = image::open(path)
                .map_err(|e| anyhow!("Failed to load frame {}: {}", path.display(), e))?
                .to_rgb8();
            frames.push(frame);
        }
        crate::log(&format!("Replay driver: {} frame(s) loaded", frames.len()));
        Ok(Self::new(frames))
    }

    /// Clicks also move to the next frame (replaying navigation screens).
    pub fn advance_on_click(mut self, enabled: bool) -> Self {
        self.advance_on_click = enabled;
        self
    }

    pub fn actions(&self) -> Vec<DriverAction> {
        self.lock().actions.clone()
    }

    pub fn clicks(&self) -> Vec<Point> {
        self.lock()
            .actions
            .iter()
            .filter_map(|a| match a {
                DriverAction::Click { point, .. } => Some(*point),
                _ => None,
            })
            .collect()
    }

    pub fn drag_count(&self) -> usize {
        self.lock()
            .actions
            .iter()
            .filter(|a| matches!(a, DriverAction::Drag { .. }))
            .count()
    }

    pub fn cleanup_count(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReplayState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WindowDriver for ReplayDriver {
    fn resize(&self, width: u32, height: u32) -> Result<()> {
        self.lock().actions.push(DriverAction::Resize { width, height });
        Ok(())
    }

    fn capture(&self) -> Result<CaptureFrame> {
        let mut state = self.lock();
        if state.advance_pending {
            state.advance_pending = false;
            if state.cursor + 1 < self.frames.len() {
                state.cursor += 1;
            }
        }
        let frame = self
            .frames
            .get(state.cursor)
            .cloned()
            .ok_or_else(|| anyhow!("Replay driver has no frames"))?;
        let index = state.cursor;
        state.actions.push(DriverAction::Capture { frame: index });
        Ok(frame)
    }

    fn click(&self, point: Point, delay: Duration) -> Result<()> {
        let mut state = self.lock();
        state.actions.push(DriverAction::Click { point, delay });
        if self.advance_on_click {
            state.advance_pending = true;
        }
        Ok(())
    }

    fn drag_line(
        &self,
        from: Point,
        to: Point,
        _speed_scale: f32,
        should_stop: &dyn Fn() -> bool,
    ) -> Result<()> {
        let released = walk_drag(from, to, should_stop, |_| Ok(()))?;
        let completed = released == to;

        let mut state = self.lock();
        state.actions.push(DriverAction::Drag {
            from,
            to,
            released,
            completed,
        });
        if completed {
            state.advance_pending = true;
        }
        Ok(())
    }

    fn cleanup(&self) {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn frames(n: u8) -> Vec<CaptureFrame> {
        (0..n).map(|i| RgbImage::from_pixel(2, 2, Rgb([i, i, i]))).collect()
    }

    fn shade(frame: &CaptureFrame) -> u8 {
        frame.get_pixel(0, 0)[0]
    }

    #[test]
    fn test_drag_advances_to_next_frame() {
        let driver = ReplayDriver::new(frames(3));
        assert_eq!(shade(&driver.capture().unwrap()), 0);
        assert_eq!(shade(&driver.capture().unwrap()), 0);

        driver
            .drag_line(Point::new(10, 0), Point::new(0, 0), 1.0, &|| false)
            .unwrap();
        assert_eq!(shade(&driver.capture().unwrap()), 1);

        // Stays on the last frame once the list runs out
        for _ in 0..3 {
            driver
                .drag_line(Point::new(10, 0), Point::new(0, 0), 1.0, &|| false)
                .unwrap();
        }
        assert_eq!(shade(&driver.capture().unwrap()), 2);
    }

    #[test]
    fn test_cancelled_drag_does_not_advance() {
        let driver = ReplayDriver::new(frames(2));
        driver
            .drag_line(Point::new(10, 0), Point::new(0, 0), 1.0, &|| true)
            .unwrap();
        assert_eq!(shade(&driver.capture().unwrap()), 0);
        assert!(driver.actions().contains(&DriverAction::Drag {
            from: Point::new(10, 0),
            to: Point::new(0, 0),
            released: Point::new(10, 0),
            completed: false,
        }));
    }

    #[test]
    fn test_clicks_only_advance_when_enabled() {
        let driver = ReplayDriver::new(frames(2));
        driver.click(Point::new(1, 1), Duration::ZERO).unwrap();
        assert_eq!(shade(&driver.capture().unwrap()), 0);

        let driver = ReplayDriver::new(frames(3)).advance_on_click(true);
        // Two clicks before a capture count as one screen change
        driver.click(Point::new(1, 1), Duration::ZERO).unwrap();
        driver.click(Point::new(2, 2), Duration::ZERO).unwrap();
        assert_eq!(shade(&driver.capture().unwrap()), 1);
        assert_eq!(driver.clicks(), vec![Point::new(1, 1), Point::new(2, 2)]);
    }

    #[test]
    fn test_empty_driver_errors() {
        let driver = ReplayDriver::new(Vec::new());
        assert!(driver.capture().is_err());
        driver.cleanup();
        driver.cleanup();
        assert_eq!(driver.cleanup_count(), 2);
    }
}
