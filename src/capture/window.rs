//! Window discovery for the emulator window and its input child.

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE};
use windows::Win32::UI::Input::KeyboardAndMouse::IsWindowEnabled;
use windows::Win32::UI::WindowsAndMessaging::{
    EnumChildWindows, EnumWindows, FindWindowW, GetClassNameW, GetClientRect,
    GetWindowTextLengthW, GetWindowTextW, IsWindowVisible,
};
use windows::core::{HSTRING, PCWSTR};

use crate::scan::ScanError;

/// A visible child window of the emulator.
#[derive(Clone, Debug)]
pub struct ChildWindow {
    pub hwnd: HWND,
    pub class_name: String,
    pub enabled: bool,
}

/// Finds a top-level window by its exact title.
pub fn find_window(title: &str) -> Result<HWND, ScanError> {
    let hwnd = unsafe { FindWindowW(PCWSTR::null(), &HSTRING::from(title)) }
        .ok()
        .filter(|h| !h.is_invalid());

    match hwnd {
        Some(hwnd) => {
            crate::log(&format!("Found window \"{}\": {:?}", title, hwnd));
            Ok(hwnd)
        }
        None => {
            crate::log(&format!("Window \"{}\" not found. Visible windows:", title));
            for name in list_visible_window_titles() {
                crate::log(&format!("  \"{}\"", name));
            }
            Err(ScanError::WindowNotFound(title.to_string()))
        }
    }
}

/// Picks the child window that receives mouse input.
///
/// With a class hint the first visible child of that class (case-insensitive)
/// is used. In automatic mode the first enabled visible child is used. Without
/// either, input goes to the top-level window itself.
pub fn resolve_input_window(
    parent: HWND,
    class_hint: Option<&str>,
    auto_child: bool,
) -> Result<HWND, ScanError> {
    if class_hint.is_none() && !auto_child {
        return Ok(parent);
    }

    let children = list_child_windows(parent);
    let found = match class_hint {
        Some(class) => children
            .iter()
            .find(|c| c.class_name.eq_ignore_ascii_case(class)),
        None => children.iter().find(|c| c.enabled),
    };

    match found {
        Some(child) => {
            crate::log(&format!(
                "Input window: {:?} (class \"{}\")",
                child.hwnd, child.class_name
            ));
            Ok(child.hwnd)
        }
        None => {
            for child in &children {
                crate::log(&format!(
                    "  child {:?} class=\"{}\" enabled={}",
                    child.hwnd, child.class_name, child.enabled
                ));
            }
            Err(ScanError::WindowNotFound(format!(
                "input child window{}",
                class_hint
                    .map(|c| format!(" of class \"{}\"", c))
                    .unwrap_or_default()
            )))
        }
    }
}

/// Lists visible child windows of `parent`.
pub fn list_child_windows(parent: HWND) -> Vec<ChildWindow> {
    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let children = &mut *(lparam.0 as *mut Vec<ChildWindow>);
            if IsWindowVisible(hwnd).as_bool() {
                let mut class_buf = [0u16; 256];
                let len = GetClassNameW(hwnd, &mut class_buf).max(0) as usize;
                children.push(ChildWindow {
                    hwnd,
                    class_name: String::from_utf16_lossy(&class_buf[..len]),
                    enabled: IsWindowEnabled(hwnd).as_bool(),
                });
            }
            TRUE
        }
    }

    let mut children: Vec<ChildWindow> = Vec::new();
    unsafe {
        let _ = EnumChildWindows(
            parent,
            Some(enum_callback),
            LPARAM(&mut children as *mut _ as isize),
        );
    }
    children
}

/// Titles of all visible top-level windows, for diagnostics.
pub fn list_visible_window_titles() -> Vec<String> {
    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let titles = &mut *(lparam.0 as *mut Vec<String>);
            if !IsWindowVisible(hwnd).as_bool() {
                return TRUE;
            }
            let title_len = GetWindowTextLengthW(hwnd);
            if title_len > 0 {
                let mut title_buf: Vec<u16> = vec![0; (title_len + 1) as usize];
                GetWindowTextW(hwnd, &mut title_buf);
                titles.push(
                    OsString::from_wide(&title_buf[..title_len as usize])
                        .to_string_lossy()
                        .to_string(),
                );
            }
            TRUE
        }
    }

    let mut titles: Vec<String> = Vec::new();
    unsafe {
        let _ = EnumWindows(Some(enum_callback), LPARAM(&mut titles as *mut _ as isize));
    }
    titles
}

/// Returns true if the window has a non-empty client area.
pub fn has_client_area(hwnd: HWND) -> bool {
    let mut rect = RECT::default();
    unsafe { GetClientRect(hwnd, &mut rect) }.is_ok()
        && rect.right > rect.left
        && rect.bottom > rect.top
}
