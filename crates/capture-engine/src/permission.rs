//! Screen-recording capability gate.

/// Answers whether this process may capture the screen.
pub trait PermissionGate: Send + Sync {
    /// Current authorization. Never prompts.
    fn check(&self) -> bool;

    /// Prompt if the platform has a prompt, then report the authorization.
    fn request(&self) -> bool;
}

/// Delegates to the current platform's capability service.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPermissions;

impl PermissionGate for SystemPermissions {
    fn check(&self) -> bool {
        #[cfg(target_os = "macos")]
        {
            screenrec_platform_macos::check_screen_permission()
        }
        #[cfg(target_os = "windows")]
        {
            screenrec_platform_windows::check_screen_permission()
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            screenrec_platform_linux::permissions::check_screen_permission()
        }
    }

    fn request(&self) -> bool {
        #[cfg(target_os = "macos")]
        {
            screenrec_platform_macos::request_screen_permission()
        }
        #[cfg(target_os = "windows")]
        {
            screenrec_platform_windows::request_screen_permission()
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            screenrec_platform_linux::permissions::request_screen_permission()
        }
    }
}

/// A fixed answer, for tests and dry runs.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissions(pub bool);

impl PermissionGate for StaticPermissions {
    fn check(&self) -> bool {
        self.0
    }

    fn request(&self) -> bool {
        self.0
    }
}
