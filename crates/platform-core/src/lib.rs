//! screenrec platform core contracts.
//!
//! This crate contains cross-platform display/window data structures used
//! by the capture engine and platform crates without coupling to a concrete
//! OS backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A platform-native object identifier.
///
/// Displays and windows are addressed by integer handles on most platforms;
/// macOS displays use an opaque UUID string instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NativeId {
    Numeric(u64),
    Opaque(String),
}

impl NativeId {
    /// The numeric handle, if this id is numeric.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            NativeId::Numeric(n) => Some(*n),
            NativeId::Opaque(_) => None,
        }
    }
}

impl Default for NativeId {
    fn default() -> Self {
        NativeId::Numeric(0)
    }
}

impl From<u64> for NativeId {
    fn from(value: u64) -> Self {
        NativeId::Numeric(value)
    }
}

impl From<String> for NativeId {
    fn from(value: String) -> Self {
        NativeId::Opaque(value)
    }
}

impl From<&str> for NativeId {
    fn from(value: &str) -> Self {
        NativeId::Opaque(value.to_string())
    }
}

impl FromStr for NativeId {
    type Err = std::convert::Infallible;

    /// Decimal and `0x`-prefixed hex strings become numeric handles,
    /// anything else is kept as an opaque identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let numeric = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => trimmed.parse::<u64>().ok(),
        };
        Ok(numeric
            .map(NativeId::Numeric)
            .unwrap_or_else(|| NativeId::Opaque(trimmed.to_string())))
    }
}

impl fmt::Display for NativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeId::Numeric(n) => write!(f, "{n}"),
            NativeId::Opaque(s) => f.write_str(s),
        }
    }
}

/// What a recording session captures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CaptureTarget {
    Display(NativeId),
    Window(NativeId),
}

impl CaptureTarget {
    /// The primary display.
    pub fn primary_display() -> Self {
        CaptureTarget::Display(NativeId::default())
    }

    pub fn id(&self) -> &NativeId {
        match self {
            CaptureTarget::Display(id) | CaptureTarget::Window(id) => id,
        }
    }

    pub fn is_window(&self) -> bool {
        matches!(self, CaptureTarget::Window(_))
    }
}

impl Default for CaptureTarget {
    fn default() -> Self {
        Self::primary_display()
    }
}

/// Snapshot of a connected, active display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayInfo {
    /// Identifier accepted as a display capture target.
    pub id: NativeId,
    /// Human-readable name, when the platform provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resolution in physical pixels.
    pub width: u32,
    pub height: u32,
}

/// Snapshot of a viewable top-level window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Identifier accepted as a window capture target.
    pub id: NativeId,
    /// Window title. Untitled windows are never enumerated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Owning application or process name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Display server / platform family used for capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayServer {
    Wayland,
    X11,
    Windows,
    MacOS,
    #[default]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_id_accepts_number_or_string_in_json() {
        let n: NativeId = serde_json::from_str("42").unwrap();
        assert_eq!(n, NativeId::Numeric(42));

        let s: NativeId =
            serde_json::from_str("\"37D8832A-2D66-02CA-B9F7-8F30A301B230\"").unwrap();
        assert_eq!(
            s,
            NativeId::Opaque("37D8832A-2D66-02CA-B9F7-8F30A301B230".to_string())
        );
    }

    #[test]
    fn native_id_parses_decimal_hex_and_opaque() {
        assert_eq!("7".parse::<NativeId>().unwrap(), NativeId::Numeric(7));
        assert_eq!(
            "0x03a00003".parse::<NativeId>().unwrap(),
            NativeId::Numeric(0x03a0_0003)
        );
        assert_eq!(
            "main-display".parse::<NativeId>().unwrap(),
            NativeId::Opaque("main-display".to_string())
        );
    }

    #[test]
    fn default_target_is_primary_display() {
        let target = CaptureTarget::default();
        assert!(!target.is_window());
        assert_eq!(target.id(), &NativeId::Numeric(0));
    }
}
