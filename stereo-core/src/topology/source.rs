//! Enumeration sources correlated by the resolver.
//!
//! Each trait is one independent, partially overlapping view of the
//! machine. Outer `Result`s are wholesale failures; inner `Result`s are
//! individual entries the source could not describe.

use serde::{Deserialize, Serialize};

use crate::display::{LogicalGpuHandle, VendorDisplayHandle};
use crate::error::SourceError;
use crate::rect::Rect;

/// One monitor as the windowing system reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorDesc {
    pub name: String,
    pub rect: Rect,
    pub primary: bool,
}

/// Windowing-system monitor list.
pub trait MonitorSource {
    fn monitors(&mut self) -> Result<Vec<Result<MonitorDesc, SourceError>>, SourceError>;
}

/// One graphics adapter and its outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterDesc {
    pub description: String,
    /// Association names of the outputs, in output order.
    pub outputs: Vec<Result<String, SourceError>>,
}

/// Graphics adapter/output list. Adapters come back in stable index
/// order; an entry's position is its logical GPU index.
pub trait AdapterSource {
    fn adapters(&mut self) -> Result<Vec<Result<AdapterDesc, SourceError>>, SourceError>;
}

/// A vendor display group ("mosaic grid").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayGroup {
    pub members: Vec<u32>,
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
    #[serde(default)]
    pub rows: u32,
    #[serde(default)]
    pub columns: u32,
}

impl DisplayGroup {
    /// Number of displays in the grid. Falls back to the member count
    /// when the vendor leaves the row/column counts empty.
    pub fn size(&self) -> u32 {
        match self.rows * self.columns {
            0 => self.members.len() as u32,
            n => n,
        }
    }
}

/// Vendor multi-display API.
pub trait VendorSource {
    fn logical_gpus(&mut self) -> Result<Vec<LogicalGpuHandle>, SourceError>;
    fn display_handles(&mut self) -> Result<Vec<VendorDisplayHandle>, SourceError>;
    fn association_name(&mut self, display: VendorDisplayHandle) -> Result<String, SourceError>;
    fn display_id(&mut self, display: VendorDisplayHandle) -> Result<u32, SourceError>;
    fn physical_gpu_count(&mut self, display_id: u32) -> Result<u32, SourceError>;
    fn logical_gpu(&mut self, display_id: u32) -> Result<LogicalGpuHandle, SourceError>;
    /// `None` when grouping is disabled.
    fn display_groups(&mut self) -> Result<Option<Vec<DisplayGroup>>, SourceError>;
}

/// How the VR runtime drives the headset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VrMode {
    /// The headset is an ordinary desktop display region.
    Extended,
    /// The compositor owns the headset; nothing shows on the desktop.
    Direct,
}

/// Discovery side of the VR runtime.
pub trait VrProbe {
    fn is_present(&mut self) -> bool;
    fn output_device(&mut self) -> Result<String, SourceError>;
    fn mode(&mut self) -> Result<VrMode, SourceError>;
    /// Headset window bounds in extended mode. The origin is unreliable.
    fn window_bounds(&mut self) -> Result<Rect, SourceError>;
    /// Recommended per-eye render-target size.
    fn recommended_render_size(&mut self) -> Result<(u32, u32), SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_size_prefers_grid_shape() {
        let g = DisplayGroup {
            members: vec![1, 2],
            width: 5760,
            height: 1080,
            refresh_rate: 60,
            rows: 1,
            columns: 3,
        };
        assert_eq!(g.size(), 3);
        let g = DisplayGroup {
            rows: 0,
            columns: 0,
            ..g
        };
        assert_eq!(g.size(), 2);
    }
}
