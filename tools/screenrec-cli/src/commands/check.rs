//! Check system capabilities.

use screenrec_capture_engine::backend::get_backend;
use screenrec_capture_engine::engine::{Engine, GstEngine};
use screenrec_capture_engine::permission::{PermissionGate, SystemPermissions};
use screenrec_platform_core::DisplayServer;

pub fn run() -> anyhow::Result<()> {
    println!("screenrec System Check");
    println!("{}", "=".repeat(50));

    match GstEngine::new().version() {
        Some(version) => println!("[OK] Engine: {version}"),
        None => println!("[MISSING] Engine: GStreamer failed to initialize"),
    }

    let backend = get_backend();
    match backend.display_server() {
        DisplayServer::Unknown => println!("[WARN] Display server: Unknown"),
        server => println!("[OK] Display server: {server:?}"),
    }

    if SystemPermissions.check() {
        println!("[OK] Screen recording permission granted");
    } else {
        println!("[MISSING] Screen recording permission not granted");
    }

    let displays = backend.list_displays();
    println!("[OK] Displays detected: {}", displays.len());
    for display in &displays {
        println!(
            "     {} {}x{} (id {})",
            display.name.as_deref().unwrap_or("unnamed"),
            display.width,
            display.height,
            display.id
        );
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let capabilities = screenrec_platform_linux::permissions::check_capabilities();
        println!();
        screenrec_platform_linux::permissions::print_capability_report(&capabilities);

        let all_required_ok = capabilities
            .iter()
            .filter(|c| c.required)
            .all(|c| c.available);

        println!();
        if all_required_ok {
            println!("All required capabilities are available. screenrec is ready.");
        } else {
            println!("Some required capabilities are missing. See above for fixes.");
        }
    }

    Ok(())
}
