//! Native enumeration sources.
//!
//! | Source              | API                                        |
//! |---------------------|--------------------------------------------|
//! | `GdiMonitorSource`  | `EnumDisplayMonitors` + `GetMonitorInfoW`  |
//! | `DxgiAdapterSource` | `IDXGIFactory1::EnumAdapters1` / `EnumOutputs` |
//!
//! # Platform
//!
//! Both sources are **Windows-only**. On other platforms the types are
//! still defined but every enumeration fails with a descriptive error.
//! The vendor and VR sources have no native implementation here; they
//! are supplied by the embedding application.

pub mod dxgi;
pub mod gdi;

pub use dxgi::DxgiAdapterSource;
pub use gdi::GdiMonitorSource;

/// Decode a NUL-terminated UTF-16 device name (`\\.\DISPLAY1`).
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}
