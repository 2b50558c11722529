//! GDI monitor enumeration.

use crate::error::SourceError;
use crate::topology::source::{MonitorDesc, MonitorSource};

/// Lists physical monitors through `EnumDisplayMonitors`.
///
/// Each monitor's name is its GDI device name (`\\.\DISPLAY1`), which is
/// also what DXGI reports as an output's device name.
#[derive(Debug, Default)]
pub struct GdiMonitorSource;

impl GdiMonitorSource {
    pub fn new() -> Self {
        Self
    }
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use crate::platform::wide_to_string;
    use crate::rect::Rect;
    use windows::Win32::Foundation::{BOOL, LPARAM, RECT, TRUE};
    use windows::Win32::Graphics::Gdi::{
        EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO, MONITORINFOEXW,
        MONITORINFOF_PRIMARY,
    };

    unsafe extern "system" fn collect(
        monitor: HMONITOR,
        _hdc: HDC,
        _clip: *mut RECT,
        data: LPARAM,
    ) -> BOOL {
        // `data` points at the Vec owned by `enumerate` for the whole call.
        let monitors = unsafe { &mut *(data.0 as *mut Vec<HMONITOR>) };
        monitors.push(monitor);
        TRUE
    }

    fn describe(monitor: HMONITOR) -> Result<MonitorDesc, SourceError> {
        let mut info = MONITORINFOEXW::default();
        info.monitorInfo.cbSize = std::mem::size_of::<MONITORINFOEXW>() as u32;
        let ok = unsafe {
            GetMonitorInfoW(monitor, &mut info as *mut MONITORINFOEXW as *mut MONITORINFO)
        };
        if !ok.as_bool() {
            let e = windows::core::Error::from_win32();
            return Err(SourceError::new(
                "GetMonitorInfoW",
                e.code().0 as i64,
                e.message(),
            ));
        }
        let r = info.monitorInfo.rcMonitor;
        Ok(MonitorDesc {
            name: wide_to_string(&info.szDevice),
            rect: Rect::from_edges(r.left, r.top, r.right, r.bottom),
            primary: info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
        })
    }

    impl MonitorSource for GdiMonitorSource {
        fn monitors(&mut self) -> Result<Vec<Result<MonitorDesc, SourceError>>, SourceError> {
            let mut handles: Vec<HMONITOR> = Vec::new();
            let ok = unsafe {
                EnumDisplayMonitors(
                    HDC::default(),
                    None,
                    Some(collect),
                    LPARAM(&mut handles as *mut Vec<HMONITOR> as isize),
                )
            };
            if !ok.as_bool() {
                let e = windows::core::Error::from_win32();
                return Err(SourceError::new(
                    "EnumDisplayMonitors",
                    e.code().0 as i64,
                    e.message(),
                ));
            }
            Ok(handles.into_iter().map(describe).collect())
        }
    }
}

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
impl MonitorSource for GdiMonitorSource {
    fn monitors(&mut self) -> Result<Vec<Result<MonitorDesc, SourceError>>, SourceError> {
        Err(SourceError::new(
            "EnumDisplayMonitors",
            0,
            "GDI monitor enumeration is only available on Windows",
        ))
    }
}
