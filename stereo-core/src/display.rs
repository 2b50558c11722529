//! Per-display records built by the topology resolver.
//!
//! A [`Display`] is created during monitor enumeration and filled in by
//! the adapter and vendor correlation passes. Once resolution completes
//! it is frozen behind an `Arc` and only read.

use serde::Serialize;

use crate::error::ResolveError;
use crate::rect::Rect;

// ── Handles ──────────────────────────────────────────────────────

/// Opaque vendor handle for one display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VendorDisplayHandle(pub u64);

/// Opaque vendor handle for one logical GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LogicalGpuHandle(pub u64);

// ── GPU index ────────────────────────────────────────────────────

/// Which enumeration pass assigned a display's logical GPU index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuIndexSource {
    Adapter,
    Vendor,
}

/// Logical GPU index plus the pass that set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GpuIndex {
    pub index: u32,
    pub source: GpuIndexSource,
}

// ── Vendor data ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
struct VendorInfo {
    display_id: Option<u32>,
    display_handle: Option<VendorDisplayHandle>,
    physical_gpu_count: Option<u32>,
    group_size: u32,
}

// ── Display ──────────────────────────────────────────────────────

/// One physical monitor and everything learned about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Display {
    name: String,
    association_name: String,
    virtual_screen_rect: Rect,
    render_resolution: (u32, u32),
    refresh_rate: u32,
    gpu: Option<GpuIndex>,
    vendor: VendorInfo,
}

impl Display {
    /// Create a display whose association name equals its name.
    pub fn new(name: impl Into<String>, rect: Rect) -> Result<Self, ResolveError> {
        let name = name.into();
        let association_name = name.clone();
        Self::with_association(name, association_name, rect)
    }

    /// Create a display matched against adapters and the vendor API by
    /// `association_name` instead of its own name.
    pub fn with_association(
        name: impl Into<String>,
        association_name: impl Into<String>,
        rect: Rect,
    ) -> Result<Self, ResolveError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ResolveError::InvalidDisplay {
                name,
                reason: "empty name",
            });
        }
        if rect.is_degenerate() {
            return Err(ResolveError::InvalidDisplay {
                name,
                reason: "degenerate virtual-screen rect",
            });
        }
        Ok(Self {
            name,
            association_name: association_name.into(),
            virtual_screen_rect: rect,
            render_resolution: rect.size(),
            refresh_rate: 0,
            gpu: None,
            vendor: VendorInfo::default(),
        })
    }

    /// A distinct display sharing this one's rect, refresh rate and GPU,
    /// with its own name and render resolution. Used for a VR headset
    /// that is also on desktop duty.
    pub fn clone_as(&self, name: impl Into<String>, render_resolution: (u32, u32)) -> Self {
        Self {
            name: name.into(),
            association_name: self.association_name.clone(),
            virtual_screen_rect: self.virtual_screen_rect,
            render_resolution,
            refresh_rate: self.refresh_rate,
            gpu: self.gpu,
            vendor: VendorInfo::default(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn association_name(&self) -> &str {
        &self.association_name
    }

    pub fn virtual_screen_rect(&self) -> Rect {
        self.virtual_screen_rect
    }

    pub fn render_resolution(&self) -> (u32, u32) {
        self.render_resolution
    }

    /// Refresh rate in Hz; 0 until the vendor grouping pass reports it.
    pub fn refresh_rate(&self) -> u32 {
        self.refresh_rate
    }

    pub fn gpu(&self) -> Option<GpuIndex> {
        self.gpu
    }

    pub fn logical_gpu_index(&self) -> Option<u32> {
        self.gpu.map(|g| g.index)
    }

    pub fn vendor_display_id(&self) -> Option<u32> {
        self.vendor.display_id
    }

    pub fn vendor_display_handle(&self) -> Option<VendorDisplayHandle> {
        self.vendor.display_handle
    }

    pub fn vendor_physical_gpu_count(&self) -> Option<u32> {
        self.vendor.physical_gpu_count
    }

    /// Number of displays ganged into this display's vendor grid.
    pub fn vendor_group_size(&self) -> u32 {
        self.vendor.group_size
    }

    /// Vendor identity is complete and the display heads a grid of at
    /// least two displays.
    pub fn valid_mosaic(&self) -> bool {
        self.vendor.display_id.is_some()
            && self.vendor.display_handle.is_some()
            && self.vendor.physical_gpu_count.is_some_and(|n| n >= 1)
            && self.vendor.group_size >= 2
    }

    // ── Mutation during resolution ───────────────────────────────

    /// Record the logical GPU index. The first writer wins; returns
    /// `false` when an index was already set.
    pub fn assign_gpu_index(&mut self, index: u32, source: GpuIndexSource) -> bool {
        if self.gpu.is_some() {
            return false;
        }
        self.gpu = Some(GpuIndex { index, source });
        true
    }

    pub fn set_render_resolution(&mut self, resolution: (u32, u32)) {
        self.render_resolution = resolution;
    }

    pub fn set_vendor_identity(&mut self, handle: VendorDisplayHandle, display_id: u32) {
        self.vendor.display_handle = Some(handle);
        self.vendor.display_id = Some(display_id);
    }

    pub fn set_physical_gpu_count(&mut self, count: u32) {
        self.vendor.physical_gpu_count = Some(count);
    }

    pub fn set_grouping(&mut self, refresh_rate: u32, group_size: u32) {
        self.refresh_rate = refresh_rate;
        self.vendor.group_size = group_size;
    }
}
