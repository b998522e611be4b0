//! List capturable displays.

use screenrec_capture_engine::backend::get_backend;

pub fn run(json: bool) -> anyhow::Result<()> {
    let displays = get_backend().list_displays();

    if json {
        println!("{}", serde_json::to_string_pretty(&displays)?);
        return Ok(());
    }

    if displays.is_empty() {
        println!("No displays found.");
        return Ok(());
    }
    for display in &displays {
        println!(
            "  {:<40} {}x{}  {}",
            display.id.to_string(),
            display.width,
            display.height,
            display.name.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
