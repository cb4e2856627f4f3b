// glspace/build.rs
//
//! The `glspace` build script.

use cfg_aliases::cfg_aliases;

fn main() {
    // Setup aliases for #[cfg] checks
    cfg_aliases! {
        // Platforms
        macos: { target_os = "macos" },
        android: { target_os = "android" },
        linux: { all(unix, not(any(macos, android, target_env = "ohos"))) },

        // Features:
        // Backends that are only valid on certain platforms get aliases that include the
        // platform check.
        x11: { all(linux, feature = "sm-x11") },
    }
}
