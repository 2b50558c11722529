//! DXGI adapter/output enumeration.

use crate::error::SourceError;
use crate::topology::source::{AdapterDesc, AdapterSource};

/// Lists graphics adapters and their outputs through DXGI.
///
/// Adapters are returned in `EnumAdapters1` order, which is the order
/// the resolver uses as the logical GPU index.
#[derive(Debug, Default)]
pub struct DxgiAdapterSource;

impl DxgiAdapterSource {
    pub fn new() -> Self {
        Self
    }
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use super::*;
    use crate::platform::wide_to_string;
    use windows::Win32::Graphics::Dxgi::{
        CreateDXGIFactory1, DXGI_ERROR_NOT_FOUND, IDXGIAdapter1, IDXGIFactory1,
    };

    /// Upper bound on adapter/output indices probed when the driver keeps
    /// failing without ever reporting `DXGI_ERROR_NOT_FOUND`.
    const MAX_PROBES: u32 = 16;

    fn source_error(call: &str, e: &windows::core::Error) -> SourceError {
        SourceError::new(call, e.code().0 as i64, e.message())
    }

    fn describe(adapter: &IDXGIAdapter1) -> Result<AdapterDesc, SourceError> {
        let desc = unsafe { adapter.GetDesc1() }.map_err(|e| source_error("GetDesc1", &e))?;

        let mut outputs = Vec::new();
        for j in 0..MAX_PROBES {
            let output = match unsafe { adapter.EnumOutputs(j) } {
                Ok(output) => output,
                Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
                Err(e) => {
                    outputs.push(Err(source_error("EnumOutputs", &e)));
                    continue;
                }
            };
            outputs.push(
                unsafe { output.GetDesc() }
                    .map(|d| wide_to_string(&d.DeviceName))
                    .map_err(|e| source_error("IDXGIOutput::GetDesc", &e)),
            );
        }

        Ok(AdapterDesc {
            description: wide_to_string(&desc.Description),
            outputs,
        })
    }

    impl AdapterSource for DxgiAdapterSource {
        fn adapters(&mut self) -> Result<Vec<Result<AdapterDesc, SourceError>>, SourceError> {
            let factory: IDXGIFactory1 = unsafe { CreateDXGIFactory1() }
                .map_err(|e| source_error("CreateDXGIFactory1", &e))?;

            let mut adapters = Vec::new();
            for i in 0..MAX_PROBES {
                match unsafe { factory.EnumAdapters1(i) } {
                    Ok(adapter) => adapters.push(describe(&adapter)),
                    Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
                    Err(e) => adapters.push(Err(source_error("EnumAdapters1", &e))),
                }
            }
            Ok(adapters)
        }
    }
}

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
impl AdapterSource for DxgiAdapterSource {
    fn adapters(&mut self) -> Result<Vec<Result<AdapterDesc, SourceError>>, SourceError> {
        Err(SourceError::new(
            "CreateDXGIFactory1",
            0,
            "DXGI adapter enumeration is only available on Windows",
        ))
    }
}
