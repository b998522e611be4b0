//! Permission detection and guidance for Linux.
//!
//! X11 has no screen-recording consent: any client connected to the display
//! may read it. Wayland compositors gate capture behind the ScreenCast
//! portal, which this crate does not drive, so a Wayland session is
//! capturable only through XWayland.

use screenrec_platform_core::DisplayServer;

use crate::display::{detect_display_server, x11_available};

/// A system capability that screenrec may need.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Whether this process can capture the screen right now.
pub fn check_screen_permission() -> bool {
    x11_available()
}

/// X11 has no consent prompt, so requesting is the same as checking.
pub fn request_screen_permission() -> bool {
    let granted = check_screen_permission();
    if !granted {
        tracing::warn!(
            display_server = ?detect_display_server(),
            "Screen capture requires an X server (DISPLAY is not set)"
        );
    }
    granted
}

/// Check all capabilities and report status.
pub fn check_capabilities() -> Vec<Capability> {
    vec![
        check_x11_access(),
        check_tool("xrandr", "Display enumeration through RandR", "x11-xserver-utils"),
        check_tool("wmctrl", "Window enumeration through EWMH", "wmctrl"),
    ]
}

fn check_x11_access() -> Capability {
    let server = detect_display_server();
    let available = x11_available();

    Capability {
        name: "X11 Display".to_string(),
        description: "X server connection for ximagesrc screen capture".to_string(),
        available,
        required: true,
        fix_instructions: match server {
            _ if available => None,
            DisplayServer::Wayland => Some(
                "Log into an X11 session, or run under XWayland with DISPLAY set".to_string(),
            ),
            _ => Some("Ensure you are running a graphical desktop session".to_string()),
        },
    }
}

fn check_tool(program: &str, description: &str, package: &str) -> Capability {
    let available = find_in_path(program);

    Capability {
        name: program.to_string(),
        description: description.to_string(),
        available,
        required: false,
        fix_instructions: if available {
            None
        } else {
            Some(format!("Install {program}: sudo apt install {package}"))
        },
    }
}

fn find_in_path(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("screenrec System Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}
