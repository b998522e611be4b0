//! Raw Win32 enumeration callbacks.

use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{NativeId, WindowInfo};
use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, BOOL, HWND, LPARAM, RECT};
use windows::Win32::Graphics::Gdi::{
    EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO, MONITORINFOEXW,
};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetWindowRect, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
    IsIconic, IsWindowVisible,
};

use crate::Monitor;

const MONITORINFOF_PRIMARY: u32 = 0x1;

pub(crate) fn enumerate_monitors() -> ScreenrecResult<Vec<Monitor>> {
    let mut monitors: Vec<Monitor> = Vec::new();

    let ok = unsafe {
        EnumDisplayMonitors(
            HDC::default(),
            None,
            Some(enum_monitor_callback),
            LPARAM(&mut monitors as *mut Vec<Monitor> as isize),
        )
    };
    if !ok.as_bool() {
        return Err(ScreenrecError::platform("EnumDisplayMonitors failed"));
    }

    tracing::debug!(count = monitors.len(), "Enumerated monitors");
    Ok(monitors)
}

unsafe extern "system" fn enum_monitor_callback(
    hmonitor: HMONITOR,
    _hdc: HDC,
    _rect: *mut RECT,
    lparam: LPARAM,
) -> BOOL {
    let monitors = &mut *(lparam.0 as *mut Vec<Monitor>);

    let mut info = MONITORINFOEXW::default();
    info.monitorInfo.cbSize = std::mem::size_of::<MONITORINFOEXW>() as u32;

    if GetMonitorInfoW(hmonitor, &mut info.monitorInfo as *mut MONITORINFO).as_bool() {
        let rc = info.monitorInfo.rcMonitor;
        let width = (rc.right - rc.left).max(0) as u32;
        let height = (rc.bottom - rc.top).max(0) as u32;
        if width > 0 && height > 0 {
            monitors.push(Monitor {
                handle: hmonitor.0 as isize,
                device: utf16_until_nul(&info.szDevice),
                width,
                height,
                primary: info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
            });
        }
    }

    BOOL::from(true)
}

pub(crate) fn enumerate_windows() -> ScreenrecResult<Vec<WindowInfo>> {
    let mut windows: Vec<WindowInfo> = Vec::new();

    unsafe {
        EnumWindows(
            Some(enum_window_callback),
            LPARAM(&mut windows as *mut Vec<WindowInfo> as isize),
        )
        .map_err(|e| ScreenrecError::platform(format!("EnumWindows failed: {e}")))?;
    }

    tracing::debug!(count = windows.len(), "Enumerated windows");
    Ok(windows)
}

unsafe extern "system" fn enum_window_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let windows = &mut *(lparam.0 as *mut Vec<WindowInfo>);

    if !IsWindowVisible(hwnd).as_bool() || IsIconic(hwnd).as_bool() {
        return BOOL::from(true);
    }

    let title_length = GetWindowTextLengthW(hwnd);
    if title_length <= 0 {
        return BOOL::from(true);
    }
    let mut title_buffer: Vec<u16> = vec![0; (title_length + 1) as usize];
    let actual_length = GetWindowTextW(hwnd, &mut title_buffer);
    if actual_length <= 0 {
        return BOOL::from(true);
    }
    let title = String::from_utf16_lossy(&title_buffer[..actual_length as usize]);
    if title.trim().is_empty() {
        return BOOL::from(true);
    }

    let mut rect = RECT::default();
    if GetWindowRect(hwnd, &mut rect).is_err() {
        return BOOL::from(true);
    }

    let mut process_id: u32 = 0;
    GetWindowThreadProcessId(hwnd, Some(&mut process_id));

    windows.push(WindowInfo {
        id: NativeId::Numeric(hwnd.0 as usize as u64),
        name: Some(title),
        width: (rect.right - rect.left).max(0) as u32,
        height: (rect.bottom - rect.top).max(0) as u32,
        owner: process_image_name(process_id),
    });
    BOOL::from(true)
}

fn process_image_name(pid: u32) -> Option<String> {
    if pid == 0 {
        return None;
    }
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
        let mut buffer = [0u16; 260];
        let mut size = buffer.len() as u32;
        let queried = QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_WIN32,
            PWSTR(buffer.as_mut_ptr()),
            &mut size,
        );
        let _ = CloseHandle(handle);
        queried.ok()?;

        let path = String::from_utf16_lossy(&buffer[..size as usize]);
        path.rsplit('\\').next().map(str::to_string)
    }
}

fn utf16_until_nul(buffer: &[u16]) -> String {
    let end = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..end])
}
