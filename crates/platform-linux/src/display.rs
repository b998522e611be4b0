//! Display and window discovery for X11 sessions.
//!
//! Outputs come from `xrandr --query`, top-level windows from the window
//! manager's client list via `wmctrl -lpG`. Both tools are optional: when
//! either is missing or fails, the corresponding listing is empty.

use std::process::Command;

use screenrec_common::error::{ScreenrecError, ScreenrecResult};
use screenrec_platform_core::{DisplayInfo, DisplayServer, NativeId, WindowInfo};
use serde::{Deserialize, Serialize};

/// An active RandR output with its position in the X screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandrOutput {
    /// Connector name, e.g. `HDMI-1`.
    pub name: String,

    /// Resolution in physical pixels.
    pub width: u32,
    pub height: u32,

    /// Position in the X screen (pixels).
    pub x: i32,
    pub y: i32,

    /// Whether RandR reports this output as primary.
    pub primary: bool,
}

impl RandrOutput {
    pub fn to_display_info(&self, index: usize) -> DisplayInfo {
        DisplayInfo {
            id: NativeId::Numeric(index as u64),
            name: Some(self.name.clone()),
            width: self.width,
            height: self.height,
        }
    }
}

/// Detect the current display server.
pub fn detect_display_server() -> DisplayServer {
    if std::env::var("WAYLAND_DISPLAY").is_ok() {
        DisplayServer::Wayland
    } else if std::env::var("DISPLAY").is_ok() {
        DisplayServer::X11
    } else {
        DisplayServer::Unknown
    }
}

/// Whether an X server is reachable, natively or through XWayland.
///
/// Capture goes through `ximagesrc`, which only needs `DISPLAY`; a Wayland
/// session that also exports `DISPLAY` is capturable.
pub fn x11_available() -> bool {
    x11_display_set(std::env::var("DISPLAY").ok().as_deref())
}

/// `x11_available` over an explicit `DISPLAY` value.
pub fn x11_display_set(display: Option<&str>) -> bool {
    display.is_some_and(|display| !display.trim().is_empty())
}

/// Query connected outputs that currently drive a mode.
///
/// The index of an output in the returned vector is its display id.
pub fn detect_outputs() -> ScreenrecResult<Vec<RandrOutput>> {
    tracing::debug!("Detecting RandR outputs");
    let stdout = run_tool("xrandr", &["--query"])?;
    Ok(parse_xrandr_query(&stdout))
}

/// List active displays. Empty when RandR is unreachable.
pub fn list_displays() -> Vec<DisplayInfo> {
    match detect_outputs() {
        Ok(outputs) => outputs
            .iter()
            .enumerate()
            .map(|(idx, output)| output.to_display_info(idx))
            .collect(),
        Err(e) => {
            tracing::debug!(error = %e, "Display enumeration unavailable");
            Vec::new()
        }
    }
}

/// List named top-level windows. Empty when no EWMH window manager answers.
pub fn list_windows() -> Vec<WindowInfo> {
    let stdout = match run_tool("wmctrl", &["-lpG"]) {
        Ok(stdout) => stdout,
        Err(e) => {
            tracing::debug!(error = %e, "Window enumeration unavailable");
            return Vec::new();
        }
    };

    parse_wmctrl_listing(&stdout)
        .into_iter()
        .map(|client| WindowInfo {
            id: NativeId::Numeric(client.xid),
            name: Some(client.title),
            width: client.width,
            height: client.height,
            owner: process_name(client.pid),
        })
        .collect()
}

fn run_tool(program: &str, args: &[&str]) -> ScreenrecResult<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ScreenrecError::platform(format!("failed to run {program}: {e}")))?;
    if !output.status.success() {
        return Err(ScreenrecError::platform(format!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `xrandr --query` output into active outputs, primary first.
///
/// Connected outputs without a geometry token have no mode set and are
/// skipped, as are disconnected ones. The sort is stable, so non-primary
/// outputs keep the RandR order.
pub fn parse_xrandr_query(stdout: &str) -> Vec<RandrOutput> {
    let mut outputs: Vec<RandrOutput> = stdout
        .lines()
        .filter(|line| !line.starts_with(char::is_whitespace))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let name = tokens.next()?;
            if tokens.next()? != "connected" {
                return None;
            }
            let mut primary = false;
            let mut geometry = None;
            for token in tokens {
                if token == "primary" {
                    primary = true;
                    continue;
                }
                geometry = parse_geometry(token);
                break;
            }
            let (width, height, x, y) = geometry?;
            Some(RandrOutput {
                name: name.to_string(),
                width,
                height,
                x,
                y,
                primary,
            })
        })
        .collect();
    outputs.sort_by_key(|output| !output.primary);
    outputs
}

/// Parse an X geometry token like `1920x1080+0+0` or `1920x1080+-1920+0`.
fn parse_geometry(token: &str) -> Option<(u32, u32, i32, i32)> {
    let (width, rest) = token.split_once('x')?;
    let mut parts = rest.split('+');
    let height = parts.next()?;
    let x = parts.next()?;
    let y = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let width: u32 = width.parse().ok()?;
    let height: u32 = height.parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height, x.parse().ok()?, y.parse().ok()?))
}

/// A window-manager client as reported by `wmctrl -lpG`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WmClient {
    pub xid: u64,
    pub pid: u32,
    pub width: u32,
    pub height: u32,
    pub title: String,
}

/// Parse `wmctrl -lpG` output.
///
/// Columns: id, desktop, pid, x, y, width, height, host, title. Untitled and
/// zero-sized clients are dropped.
pub fn parse_wmctrl_listing(stdout: &str) -> Vec<WmClient> {
    stdout
        .lines()
        .filter_map(|line| {
            let (fields, title) = split_leading_fields(line, 8)?;
            let xid = u64::from_str_radix(fields[0].trim_start_matches("0x"), 16).ok()?;
            let pid = fields[2].parse().unwrap_or(0);
            let width: u32 = fields[5].parse().ok()?;
            let height: u32 = fields[6].parse().ok()?;
            let title = title.trim();
            if title.is_empty() || width == 0 || height == 0 {
                return None;
            }
            Some(WmClient {
                xid,
                pid,
                width,
                height,
                title: title.to_string(),
            })
        })
        .collect()
}

/// Split off `n` whitespace-separated fields and return the untouched rest.
fn split_leading_fields(line: &str, n: usize) -> Option<(Vec<&str>, &str)> {
    let mut fields = Vec::with_capacity(n);
    let mut rest = line;
    for _ in 0..n {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        fields.push(&rest[..end]);
        rest = &rest[end..];
    }
    Some((fields, rest))
}

fn process_name(pid: u32) -> Option<String> {
    if pid == 0 {
        return None;
    }
    std::fs::read_to_string(format!("/proc/{pid}/comm"))
        .ok()
        .map(|comm| comm.trim().to_string())
        .filter(|comm| !comm.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const XRANDR_DUAL: &str = "\
Screen 0: minimum 8 x 8, current 4480 x 1440, maximum 32767 x 32767
DP-1 connected primary 2560x1440+0+0 (normal left inverted right x axis y axis) 597mm x 336mm
   2560x1440     59.95*+
   1920x1080     60.00
HDMI-1 connected 1920x1080+2560+0 (normal left inverted right x axis y axis) 527mm x 296mm
   1920x1080     60.00*+
DP-2 disconnected (normal left inverted right x axis y axis)
DP-3 connected (normal left inverted right x axis y axis)
";

    #[test]
    fn xrandr_keeps_only_active_outputs() {
        let outputs = parse_xrandr_query(XRANDR_DUAL);
        assert_eq!(outputs.len(), 2);
        assert_eq!(
            outputs[0],
            RandrOutput {
                name: "DP-1".to_string(),
                width: 2560,
                height: 1440,
                x: 0,
                y: 0,
                primary: true,
            }
        );
        assert_eq!(outputs[1].name, "HDMI-1");
        assert_eq!(outputs[1].x, 2560);
        assert!(!outputs[1].primary);
    }

    #[test]
    fn xrandr_handles_negative_offsets() {
        let outputs =
            parse_xrandr_query("eDP-1 connected 1920x1080+-1920+0 (normal) 344mm x 194mm\n");
        assert_eq!(outputs[0].x, -1920);
        assert_eq!(outputs[0].y, 0);
    }

    #[test]
    fn xrandr_headless_output_yields_nothing() {
        assert!(parse_xrandr_query("").is_empty());
        assert!(parse_xrandr_query("Can't open display\n").is_empty());
    }

    #[test]
    fn wmctrl_listing_keeps_titles_with_spaces() {
        let listing = "\
0x03a00003  0 4242   0    0    1920 1080 devbox Terminal - ~/src
0x04000001 -1 1001   0    0    1920 32   devbox
0x05200007  1 0      100  100  800  600  devbox Untitled   Document
";
        let clients = parse_wmctrl_listing(listing);
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].xid, 0x03a0_0003);
        assert_eq!(clients[0].pid, 4242);
        assert_eq!(clients[0].title, "Terminal - ~/src");
        assert_eq!(clients[1].title, "Untitled   Document");
        assert_eq!((clients[1].width, clients[1].height), (800, 600));
    }

    #[test]
    fn x11_reachability_follows_display_variable() {
        assert!(x11_display_set(Some(":0")));
        assert!(x11_display_set(Some("localhost:10.0")));
        assert!(!x11_display_set(Some("")));
        assert!(!x11_display_set(Some("  ")));
        assert!(!x11_display_set(None));
    }

    #[test]
    fn xrandr_primary_output_gets_id_zero() {
        let query = "\
eDP-1 connected 1920x1080+0+0 (normal) 344mm x 194mm
HDMI-1 connected primary 2560x1440+1920+0 (normal) 597mm x 336mm
DP-1 connected 1280x1024+4480+0 (normal) 376mm x 301mm
";
        let outputs = parse_xrandr_query(query);
        let names: Vec<&str> = outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["HDMI-1", "eDP-1", "DP-1"]);
        assert!(outputs[0].primary);
    }

    #[test]
    fn display_ids_follow_enumeration_order() {
        let outputs = parse_xrandr_query(XRANDR_DUAL);
        let info = outputs[1].to_display_info(1);
        assert_eq!(info.id, NativeId::Numeric(1));
        assert_eq!(info.name.as_deref(), Some("HDMI-1"));
    }
}
