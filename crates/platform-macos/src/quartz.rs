//! CoreGraphics and CoreFoundation calls.

use std::ffi::{c_void, CStr};

use core_foundation::base::{CFType, TCFType};
use core_foundation::dictionary::{CFDictionary, CFDictionaryGetTypeID, CFDictionaryRef};
use core_foundation::number::CFNumber;
use core_foundation::string::{CFString, CFStringRef};
use core_graphics::display::CGDisplay;
use core_graphics::window::{
    copy_window_info, kCGNullWindowID, kCGWindowBounds, kCGWindowLayer,
    kCGWindowListExcludeDesktopElements, kCGWindowListOptionOnScreenOnly, kCGWindowName,
    kCGWindowNumber, kCGWindowOwnerName,
};
use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{NativeId, WindowInfo};

use crate::Display;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGDisplayCreateUUIDFromDisplayID(display: u32) -> *const c_void;
    fn CGPreflightScreenCaptureAccess() -> bool;
    fn CGRequestScreenCaptureAccess() -> bool;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFUUIDCreateString(allocator: *const c_void, uuid: *const c_void) -> *const c_void;
    fn CFStringGetCString(
        string: *const c_void,
        buffer: *mut i8,
        buffer_size: i64,
        encoding: u32,
    ) -> bool;
    fn CFRelease(cf: *const c_void);
}

const K_CF_STRING_ENCODING_UTF8: u32 = 0x0800_0100;

pub(crate) fn active_displays() -> ScreenrecResult<Vec<Display>> {
    let ids = CGDisplay::active_displays()
        .map_err(|code| ScreenrecError::platform(format!("CGGetActiveDisplayList failed: {code}")))?;

    let displays = ids
        .into_iter()
        .enumerate()
        .map(|(index, cg_id)| {
            let display = CGDisplay::new(cg_id);
            Display {
                cg_id,
                index,
                uuid: display_uuid(cg_id),
                width: display.pixels_wide() as u32,
                height: display.pixels_high() as u32,
                main: display.is_main(),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(count = displays.len(), "Enumerated displays");
    Ok(displays)
}

fn display_uuid(cg_id: u32) -> Option<String> {
    unsafe {
        let uuid_ref = CGDisplayCreateUUIDFromDisplayID(cg_id);
        if uuid_ref.is_null() {
            return None;
        }
        let uuid_string = CFUUIDCreateString(std::ptr::null(), uuid_ref);
        CFRelease(uuid_ref);
        if uuid_string.is_null() {
            return None;
        }

        let mut buffer = [0i8; 64];
        let copied = CFStringGetCString(
            uuid_string,
            buffer.as_mut_ptr(),
            buffer.len() as i64,
            K_CF_STRING_ENCODING_UTF8,
        );
        CFRelease(uuid_string);
        if !copied {
            return None;
        }
        CStr::from_ptr(buffer.as_ptr())
            .to_str()
            .ok()
            .map(str::to_string)
    }
}

pub(crate) fn on_screen_windows() -> Vec<WindowInfo> {
    let Some(list) = copy_window_info(
        kCGWindowListOptionOnScreenOnly | kCGWindowListExcludeDesktopElements,
        kCGNullWindowID,
    ) else {
        tracing::debug!("CGWindowListCopyWindowInfo returned nothing");
        return Vec::new();
    };

    let windows = list
        .iter()
        .filter_map(|item| {
            let dict: CFDictionary<CFString, CFType> =
                unsafe { CFDictionary::wrap_under_get_rule(*item as CFDictionaryRef) };
            window_from_dict(&dict)
        })
        .collect::<Vec<_>>();

    tracing::debug!(count = windows.len(), "Enumerated windows");
    windows
}

fn window_from_dict(dict: &CFDictionary<CFString, CFType>) -> Option<WindowInfo> {
    // Layer 0 holds ordinary application windows; menus, docks and overlays
    // live above it.
    if number_value(dict, unsafe { kCGWindowLayer })?.to_i64()? != 0 {
        return None;
    }
    let name = string_value(dict, unsafe { kCGWindowName }).filter(|n| !n.trim().is_empty())?;
    let number = number_value(dict, unsafe { kCGWindowNumber })?.to_i64()?;

    let (width, height) = dict
        .find(&key(unsafe { kCGWindowBounds }))
        .filter(|bounds| bounds.type_of() == unsafe { CFDictionaryGetTypeID() })
        .and_then(|bounds| {
            let bounds: CFDictionary<CFString, CFType> = unsafe {
                CFDictionary::wrap_under_get_rule(bounds.as_CFTypeRef() as CFDictionaryRef)
            };
            let width = bounds
                .find(&CFString::from_static_string("Width"))?
                .downcast::<CFNumber>()?
                .to_f64()?;
            let height = bounds
                .find(&CFString::from_static_string("Height"))?
                .downcast::<CFNumber>()?
                .to_f64()?;
            Some((width.max(0.0) as u32, height.max(0.0) as u32))
        })
        .unwrap_or((0, 0));

    Some(WindowInfo {
        id: NativeId::Numeric(number as u64),
        name: Some(name),
        width,
        height,
        owner: string_value(dict, unsafe { kCGWindowOwnerName }),
    })
}

fn key(raw: CFStringRef) -> CFString {
    unsafe { CFString::wrap_under_get_rule(raw) }
}

fn string_value(dict: &CFDictionary<CFString, CFType>, raw: CFStringRef) -> Option<String> {
    dict.find(&key(raw))?
        .downcast::<CFString>()
        .map(|s| s.to_string())
}

fn number_value(dict: &CFDictionary<CFString, CFType>, raw: CFStringRef) -> Option<CFNumber> {
    dict.find(&key(raw))?.downcast::<CFNumber>()
}

pub(crate) fn preflight_screen_capture() -> bool {
    unsafe { CGPreflightScreenCaptureAccess() }
}

pub(crate) fn request_screen_capture() -> bool {
    let granted = unsafe { CGRequestScreenCaptureAccess() };
    tracing::info!(granted, "Requested screen recording access");
    granted
}
