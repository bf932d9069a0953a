//! Live emulator window driver using GDI capture.
//!
//! The window is rendered into an off-screen bitmap with `PrintWindow`, which
//! works even when the emulator is covered by other windows. Device contexts
//! are created once per session and released by [`WindowDriver::cleanup`].

use anyhow::{Result, anyhow};
use image::{RgbImage, imageops};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, CreateCompatibleBitmap, CreateCompatibleDC, DIB_RGB_COLORS,
    DeleteDC, DeleteObject, GetDIBits, GetWindowDC, HBITMAP, HDC, HGDIOBJ, ReleaseDC, SelectObject,
};
use windows::Win32::Storage::Xps::{PRINT_WINDOW_FLAGS, PrintWindow};
use windows::Win32::UI::WindowsAndMessaging::{
    GetWindowPlacement, GetWindowRect, SW_SHOWMINIMIZED, SW_SHOWNOACTIVATE, SWP_NOACTIVATE,
    SWP_NOZORDER, SetWindowPos, ShowWindow, WINDOWPLACEMENT,
};

use super::input;
use super::window::{find_window, has_client_area, resolve_input_window};
use super::{CaptureFrame, Point, WindowDriver};
use crate::scan::ScanConfig;
use crate::scan::ScanError;

/// PW_RENDERFULLCONTENT: capture hardware-accelerated content too.
const PW_RENDERFULLCONTENT: PRINT_WINDOW_FLAGS = PRINT_WINDOW_FLAGS(2);

/// GDI objects owned by one capture session.
struct DeviceContexts {
    window_dc: HDC,
    mem_dc: HDC,
    bitmap: HBITMAP,
    previous: HGDIOBJ,
    width: i32,
    height: i32,
}

// SAFETY: GDI handles are plain process-wide identifiers. They are only used
// while holding the Win32Window mutex.
unsafe impl Send for DeviceContexts {}

/// The emulator window, resolved and ready for capture.
pub struct Win32Window {
    hwnd: HWND,
    input: HWND,
    /// Non-client border: left, top, right, bottom.
    border: [u32; 4],
    restore_delay: Duration,
    capture_retries: u32,
    capture_retry_delay: Duration,
    contexts: Mutex<Option<DeviceContexts>>,
}

// SAFETY: window handles are valid from any thread; the GDI state is
// guarded by a mutex.
unsafe impl Send for Win32Window {}
unsafe impl Sync for Win32Window {}

impl Win32Window {
    /// Finds the emulator window and its input surface and prepares the
    /// off-screen capture buffer.
    pub fn resolve(config: &ScanConfig) -> Result<Self, ScanError> {
        let hwnd = find_window(&config.window_title)?;
        let input = resolve_input_window(
            hwnd,
            config.input_child_class.as_deref(),
            config.auto_input_child,
        )?;

        let window = Self {
            hwnd,
            input,
            border: config.window_border,
            restore_delay: Duration::from_millis(config.restore_delay_ms),
            capture_retries: config.capture_retries.max(1),
            capture_retry_delay: Duration::from_millis(config.capture_retry_delay_ms),
            contexts: Mutex::new(None),
        };

        window.restore_if_minimized();
        if !has_client_area(hwnd) {
            return Err(ScanError::WindowNotReady(
                "window has no client area".to_string(),
            ));
        }
        window
            .ensure_contexts()
            .map_err(|e| ScanError::WindowNotReady(format!("{:#}", e)))?;
        Ok(window)
    }

    /// Shows a minimised window without activating it, so it renders again.
    fn restore_if_minimized(&self) {
        let mut placement = WINDOWPLACEMENT {
            length: std::mem::size_of::<WINDOWPLACEMENT>() as u32,
            ..Default::default()
        };
        let minimized = unsafe { GetWindowPlacement(self.hwnd, &mut placement) }.is_ok()
            && placement.showCmd == SW_SHOWMINIMIZED.0 as u32;
        if minimized {
            crate::log("Window is minimized, restoring without activation");
            unsafe {
                let _ = ShowWindow(self.hwnd, SW_SHOWNOACTIVATE);
            }
            thread::sleep(self.restore_delay);
        }
    }

    fn window_rect(&self) -> Result<RECT> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(self.hwnd, &mut rect)? };
        Ok(rect)
    }

    /// Creates (or recreates after a size change) the memory DC and bitmap.
    fn ensure_contexts(&self) -> Result<()> {
        let rect = self.window_rect()?;
        let width = rect.right - rect.left;
        let height = rect.bottom - rect.top;
        if width <= 0 || height <= 0 {
            return Err(anyhow!("Invalid window size {}x{}", width, height));
        }

        let mut guard = self.contexts.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ctx) = guard.as_ref() {
            if ctx.width == width && ctx.height == height {
                return Ok(());
            }
        }
        if let Some(old) = guard.take() {
            self.release(old);
        }

        unsafe {
            let window_dc = GetWindowDC(self.hwnd);
            if window_dc.is_invalid() {
                return Err(anyhow!("GetWindowDC failed"));
            }
            let mem_dc = CreateCompatibleDC(window_dc);
            let bitmap = CreateCompatibleBitmap(window_dc, width, height);
            if mem_dc.is_invalid() || bitmap.is_invalid() {
                if !bitmap.is_invalid() {
                    let _ = DeleteObject(bitmap);
                }
                if !mem_dc.is_invalid() {
                    let _ = DeleteDC(mem_dc);
                }
                ReleaseDC(self.hwnd, window_dc);
                return Err(anyhow!("Failed to create capture bitmap"));
            }
            let previous = SelectObject(mem_dc, bitmap);
            *guard = Some(DeviceContexts {
                window_dc,
                mem_dc,
                bitmap,
                previous,
                width,
                height,
            });
        }
        Ok(())
    }

    fn release(&self, ctx: DeviceContexts) {
        unsafe {
            SelectObject(ctx.mem_dc, ctx.previous);
            let _ = DeleteObject(ctx.bitmap);
            let _ = DeleteDC(ctx.mem_dc);
            ReleaseDC(self.hwnd, ctx.window_dc);
        }
    }

    /// Renders the whole window into the bitmap and converts BGRX to RGB.
    fn print_window(&self) -> Result<RgbImage> {
        self.ensure_contexts()?;
        let guard = self.contexts.lock().unwrap_or_else(|e| e.into_inner());
        let ctx = guard
            .as_ref()
            .ok_or_else(|| anyhow!("Capture resources already released"))?;

        unsafe {
            if !PrintWindow(self.hwnd, ctx.mem_dc, PW_RENDERFULLCONTENT).as_bool() {
                return Err(anyhow!("PrintWindow failed"));
            }

            let mut bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: ctx.width,
                    biHeight: -ctx.height, // top-down
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };

            let mut buffer = vec![0u8; (ctx.width * ctx.height * 4) as usize];
            let lines = GetDIBits(
                ctx.mem_dc,
                ctx.bitmap,
                0,
                ctx.height as u32,
                Some(buffer.as_mut_ptr() as *mut _),
                &mut bmi,
                DIB_RGB_COLORS,
            );
            if lines == 0 {
                return Err(anyhow!("GetDIBits failed"));
            }

            let rgb: Vec<u8> = buffer
                .chunks_exact(4)
                .flat_map(|bgrx| [bgrx[2], bgrx[1], bgrx[0]])
                .collect();
            RgbImage::from_raw(ctx.width as u32, ctx.height as u32, rgb)
                .ok_or_else(|| anyhow!("Captured buffer has unexpected size"))
        }
    }

    /// Removes the non-client border from a full-window image.
    fn crop_border(&self, full: &RgbImage) -> Result<CaptureFrame> {
        let [left, top, right, bottom] = self.border;
        let (w, h) = full.dimensions();
        if left + right >= w || top + bottom >= h {
            return Err(anyhow!(
                "Window {}x{} is smaller than its configured border",
                w,
                h
            ));
        }
        Ok(imageops::crop_imm(full, left, top, w - left - right, h - top - bottom).to_image())
    }
}

impl WindowDriver for Win32Window {
    fn resize(&self, width: u32, height: u32) -> Result<()> {
        let [left, top, right, bottom] = self.border;
        let rect = self.window_rect()?;
        let outer_w = (width + left + right) as i32;
        let outer_h = (height + top + bottom) as i32;
        if rect.right - rect.left == outer_w && rect.bottom - rect.top == outer_h {
            return Ok(());
        }
        crate::log(&format!("Resizing window to {}x{} (outer)", outer_w, outer_h));
        unsafe {
            SetWindowPos(
                self.hwnd,
                HWND::default(),
                rect.left,
                rect.top,
                outer_w,
                outer_h,
                SWP_NOACTIVATE | SWP_NOZORDER,
            )?;
        }
        Ok(())
    }

    fn capture(&self) -> Result<CaptureFrame> {
        self.restore_if_minimized();
        let mut last_error = anyhow!("No capture attempted");
        for attempt in 1..=self.capture_retries {
            match self.print_window().and_then(|full| self.crop_border(&full)) {
                Ok(frame) => return Ok(frame),
                Err(e) => {
                    crate::log(&format!(
                        "Capture attempt {}/{} failed: {}",
                        attempt, self.capture_retries, e
                    ));
                    last_error = e;
                    thread::sleep(self.capture_retry_delay);
                }
            }
        }
        Err(last_error)
    }

    fn click(&self, point: Point, delay: Duration) -> Result<()> {
        input::post_click(self.input, point)?;
        thread::sleep(delay);
        Ok(())
    }

    fn drag_line(
        &self,
        from: Point,
        to: Point,
        speed_scale: f32,
        should_stop: &dyn Fn() -> bool,
    ) -> Result<()> {
        input::post_drag(self.input, from, to, speed_scale, should_stop)
    }

    fn cleanup(&self) {
        let taken = self
            .contexts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(ctx) = taken {
            self.release(ctx);
            crate::log("Capture resources released");
        }
    }
}

impl Drop for Win32Window {
    fn drop(&mut self) {
        self.cleanup();
    }
}
