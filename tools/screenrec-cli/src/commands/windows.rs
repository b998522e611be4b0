//! List capturable windows.

use screenrec_capture_engine::backend::get_backend;

pub fn run(json: bool) -> anyhow::Result<()> {
    let windows = get_backend().list_windows();

    if json {
        println!("{}", serde_json::to_string_pretty(&windows)?);
        return Ok(());
    }

    if windows.is_empty() {
        println!("No windows found.");
        return Ok(());
    }
    for window in &windows {
        println!(
            "  {:<12} {:>5}x{:<5} {} {}",
            window.id.to_string(),
            window.width,
            window.height,
            window.name.as_deref().unwrap_or(""),
            window
                .owner
                .as_deref()
                .map(|owner| format!("({owner})"))
                .unwrap_or_default()
        );
    }
    Ok(())
}
