//! Declarative enumeration sources.
//!
//! A [`Fixture`] describes a machine in TOML: its monitors, adapters,
//! vendor displays and groups, and VR headset. It implements every
//! source trait, so the resolver can run against it without hardware.
//!
//! ```toml
//! [[monitor]]
//! name = "\\\\.\\DISPLAY1"
//! rect = { x = 0, y = 0, width = 1920, height = 1080 }
//! primary = true
//!
//! [[adapter]]
//! description = "GPU 0"
//! outputs = ["\\\\.\\DISPLAY1"]
//!
//! [vendor]
//! logical_gpus = 1
//! grouping_enabled = true
//!
//! [[vendor.display]]
//! name = "\\\\.\\DISPLAY1"
//! id = 4096
//! logical_gpu = 0
//! physical_gpus = 1
//!
//! [vr]
//! mode = "direct"
//! bounds = { x = 0, y = 0, width = 2160, height = 1200 }
//! render_size = [1080, 1200]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::display::{LogicalGpuHandle, VendorDisplayHandle};
use crate::error::{ResolveError, SourceError};
use crate::rect::Rect;
use crate::topology::Topology;
use crate::topology::resolver::{ResolverOptions, TopologyResolver};
use crate::topology::source::{
    AdapterDesc, AdapterSource, DisplayGroup, MonitorDesc, MonitorSource, VendorSource, VrMode,
    VrProbe,
};

/// Status code used for every simulated failure.
const FIXTURE_FAILURE: i64 = -1;

const VENDOR_DISPLAY_BASE: u64 = 0x1000;
const LOGICAL_GPU_BASE: u64 = 0x100;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("cannot read fixture: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid fixture: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Description ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    #[serde(rename = "monitor")]
    pub monitors: Vec<MonitorFixture>,
    /// Make the monitor enumeration call itself fail.
    pub monitor_enumeration_fails: bool,
    #[serde(rename = "adapter")]
    pub adapters: Vec<AdapterFixture>,
    /// Make connecting to the adapter API fail.
    pub adapter_api_down: bool,
    pub vendor: Option<VendorFixture>,
    pub vr: Option<VrFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorFixture {
    pub name: String,
    /// `None` models a monitor the OS cannot describe.
    pub rect: Option<Rect>,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterFixture {
    pub description: String,
    pub outputs: Vec<String>,
    /// The adapter fails to describe itself.
    pub broken: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorFixture {
    pub logical_gpus: u32,
    #[serde(rename = "display")]
    pub displays: Vec<VendorDisplayFixture>,
    pub grouping_enabled: bool,
    pub grouping_query_fails: bool,
    #[serde(rename = "group")]
    pub groups: Vec<DisplayGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorDisplayFixture {
    pub name: String,
    /// `None` makes the display-id lookup fail.
    pub id: Option<u32>,
    #[serde(default)]
    pub logical_gpu: u32,
    /// `None` makes the physical-GPU lookup fail.
    pub physical_gpus: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VrFixture {
    #[serde(default = "present")]
    pub present: bool,
    pub mode: VrMode,
    pub bounds: Rect,
    pub render_size: (u32, u32),
    #[serde(default = "device")]
    pub device: String,
    /// Every runtime query fails.
    #[serde(default)]
    pub fails: bool,
}

fn present() -> bool {
    true
}

fn device() -> String {
    "fixture-hmd".into()
}

impl Fixture {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_toml(&text)?)
    }

    pub fn sources(&self) -> FixtureSources<'_> {
        FixtureSources {
            monitors: FixtureMonitors(self),
            adapters: FixtureAdapters(self),
            vendor: self.vendor.as_ref().map(FixtureVendor),
            vr: self.vr.as_ref().map(FixtureVr),
        }
    }

    pub fn resolve(&self, options: ResolverOptions) -> Result<Topology, ResolveError> {
        self.sources().resolve(options)
    }
}

// ── Sources ──────────────────────────────────────────────────────

/// The four sources of one [`Fixture`], borrowed separately so the
/// resolver can hold them all at once.
pub struct FixtureSources<'a> {
    pub monitors: FixtureMonitors<'a>,
    pub adapters: FixtureAdapters<'a>,
    pub vendor: Option<FixtureVendor<'a>>,
    pub vr: Option<FixtureVr<'a>>,
}

impl FixtureSources<'_> {
    pub fn resolve(&mut self, options: ResolverOptions) -> Result<Topology, ResolveError> {
        TopologyResolver::new(options).resolve(
            &mut self.monitors,
            &mut self.adapters,
            self.vendor.as_mut().map(|v| v as &mut dyn VendorSource),
            self.vr.as_mut().map(|v| v as &mut dyn VrProbe),
        )
    }
}

fn failure(call: &str) -> SourceError {
    SourceError::new(call, FIXTURE_FAILURE, "simulated failure")
}

pub struct FixtureMonitors<'a>(&'a Fixture);

impl MonitorSource for FixtureMonitors<'_> {
    fn monitors(&mut self) -> Result<Vec<Result<MonitorDesc, SourceError>>, SourceError> {
        if self.0.monitor_enumeration_fails {
            return Err(failure("EnumDisplayMonitors"));
        }
        Ok(self
            .0
            .monitors
            .iter()
            .map(|m| -> Result<MonitorDesc, SourceError> {
                let rect = m.rect.ok_or_else(|| failure("GetMonitorInfo"))?;
                Ok(MonitorDesc {
                    name: m.name.clone(),
                    rect,
                    primary: m.primary,
                })
            })
            .collect())
    }
}

pub struct FixtureAdapters<'a>(&'a Fixture);

impl AdapterSource for FixtureAdapters<'_> {
    fn adapters(&mut self) -> Result<Vec<Result<AdapterDesc, SourceError>>, SourceError> {
        if self.0.adapter_api_down {
            return Err(failure("CreateDXGIFactory1"));
        }
        Ok(self
            .0
            .adapters
            .iter()
            .map(|a| {
                if a.broken {
                    return Err(failure("GetDesc1"));
                }
                Ok(AdapterDesc {
                    description: a.description.clone(),
                    outputs: a.outputs.iter().cloned().map(Ok).collect(),
                })
            })
            .collect())
    }
}

pub struct FixtureVendor<'a>(&'a VendorFixture);

impl FixtureVendor<'_> {
    fn display(&self, handle: VendorDisplayHandle) -> Result<&VendorDisplayFixture, SourceError> {
        handle
            .0
            .checked_sub(VENDOR_DISPLAY_BASE)
            .and_then(|i| self.0.displays.get(i as usize))
            .ok_or_else(|| failure("invalid display handle"))
    }

    fn by_id(&self, display_id: u32) -> Result<&VendorDisplayFixture, SourceError> {
        self.0
            .displays
            .iter()
            .find(|d| d.id == Some(display_id))
            .ok_or_else(|| failure("invalid display id"))
    }
}

impl VendorSource for FixtureVendor<'_> {
    fn logical_gpus(&mut self) -> Result<Vec<LogicalGpuHandle>, SourceError> {
        Ok((0..self.0.logical_gpus as u64)
            .map(|i| LogicalGpuHandle(LOGICAL_GPU_BASE + i))
            .collect())
    }

    fn display_handles(&mut self) -> Result<Vec<VendorDisplayHandle>, SourceError> {
        Ok((0..self.0.displays.len() as u64)
            .map(|i| VendorDisplayHandle(VENDOR_DISPLAY_BASE + i))
            .collect())
    }

    fn association_name(&mut self, display: VendorDisplayHandle) -> Result<String, SourceError> {
        Ok(self.display(display)?.name.clone())
    }

    fn display_id(&mut self, display: VendorDisplayHandle) -> Result<u32, SourceError> {
        self.display(display)?
            .id
            .ok_or_else(|| failure("GetDisplayIdByDisplayName"))
    }

    fn physical_gpu_count(&mut self, display_id: u32) -> Result<u32, SourceError> {
        self.by_id(display_id)?
            .physical_gpus
            .ok_or_else(|| failure("GetPhysicalGPUsFromDisplay"))
    }

    fn logical_gpu(&mut self, display_id: u32) -> Result<LogicalGpuHandle, SourceError> {
        let display = self.by_id(display_id)?;
        Ok(LogicalGpuHandle(LOGICAL_GPU_BASE + display.logical_gpu as u64))
    }

    fn display_groups(&mut self) -> Result<Option<Vec<DisplayGroup>>, SourceError> {
        if self.0.grouping_query_fails {
            return Err(failure("GetDisplayGrids"));
        }
        if !self.0.grouping_enabled {
            return Ok(None);
        }
        Ok(Some(self.0.groups.clone()))
    }
}

pub struct FixtureVr<'a>(&'a VrFixture);

impl FixtureVr<'_> {
    fn check(&self, call: &str) -> Result<(), SourceError> {
        if self.0.fails {
            return Err(failure(call));
        }
        Ok(())
    }
}

impl VrProbe for FixtureVr<'_> {
    fn is_present(&mut self) -> bool {
        self.0.present
    }

    fn output_device(&mut self) -> Result<String, SourceError> {
        self.check("GetOutputDevice")?;
        Ok(self.0.device.clone())
    }

    fn mode(&mut self) -> Result<VrMode, SourceError> {
        self.check("IsDisplayOnDesktop")?;
        Ok(self.0.mode)
    }

    fn window_bounds(&mut self) -> Result<Rect, SourceError> {
        self.check("GetWindowBounds")?;
        Ok(self.0.bounds)
    }

    fn recommended_render_size(&mut self) -> Result<(u32, u32), SourceError> {
        self.check("GetRecommendedRenderTargetSize")?;
        Ok(self.0.render_size)
    }
}
