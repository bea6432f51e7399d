// ── Safety policy ────────────────────────────────────────────────────────────
// Unsafe code is forbidden everywhere except:
//   • `platform::win32` – Win32 FFI and runtime-resolved entry points
// Each unsafe block in that module MUST carry a `// SAFETY:` comment.
#![deny(unsafe_code)]

//! Windows-native backend for a portable virtual filesystem layer.
//!
//! The portable layers (path lexing, UTF-8 ⇄ UTF-16 conversion, buffer
//! growth, offset and time arithmetic) live at the crate root and build on
//! every host.  Everything that talks to the OS is confined to
//! [`platform::win32`], compiled only for Windows targets.

pub mod buffer;
pub mod cache;
pub mod capability;
pub mod config;
pub mod encoding;
pub mod error;
pub mod path;
pub mod platform;
pub mod time;
pub mod units;

pub use config::BackendConfig;
pub use error::{BackendError, Result};
pub use platform::{OpenMode, Platform, PlatformFile, PlatformMutex};

#[cfg(windows)]
pub use platform::win32::Win32Backend;
