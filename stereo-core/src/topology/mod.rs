//! # Display topology
//!
//! Correlates three independent enumeration sources into one record per
//! physical display and assigns each display a role.
//!
//! | Module     | Purpose                                              |
//! |------------|------------------------------------------------------|
//! | `source`   | Traits for the monitor, adapter, vendor and VR views  |
//! | `resolver` | The five resolution passes                           |
//! | `fixture`  | Declarative sources for tests and dry runs           |
//!
//! Resolution runs once, single-threaded, at startup. The resulting
//! [`Topology`] is immutable and may be shared across threads.

pub mod fixture;
pub mod resolver;
pub mod source;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::display::Display;
use crate::error::TopologyWarning;
use crate::rect::Rect;

pub use fixture::{Fixture, FixtureError, FixtureSources};
pub use resolver::{ResolverOptions, TopologyResolver};
pub use source::{
    AdapterDesc, AdapterSource, DisplayGroup, MonitorDesc, MonitorSource, VendorSource, VrMode,
    VrProbe,
};

// ── Role ─────────────────────────────────────────────────────────

/// Functional role a display plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary,
    Control,
    Mosaic,
    Vr,
}

// ── VrHeadset ────────────────────────────────────────────────────

/// What the VR runtime reported about the headset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VrHeadset {
    pub mode: VrMode,
    /// Window bounds in extended mode; the primary rect in direct mode.
    pub rect: Rect,
    /// Recommended render-target size for both eyes side by side.
    pub render_resolution: (u32, u32),
    pub output_device: String,
}

// ── Topology ─────────────────────────────────────────────────────

/// Resolved display topology.
#[derive(Debug, Clone)]
pub struct Topology {
    displays: Vec<Arc<Display>>,
    primary: Arc<Display>,
    control: Arc<Display>,
    mosaic: Option<Arc<Display>>,
    vr: Option<Arc<Display>>,
    headset: Option<VrHeadset>,
    warnings: Vec<TopologyWarning>,
}

impl Topology {
    pub(crate) fn new(
        displays: Vec<Arc<Display>>,
        primary: Arc<Display>,
        control: Arc<Display>,
        mosaic: Option<Arc<Display>>,
        vr: Option<Arc<Display>>,
        headset: Option<VrHeadset>,
        warnings: Vec<TopologyWarning>,
    ) -> Self {
        Self {
            displays,
            primary,
            control,
            mosaic,
            vr,
            headset,
            warnings,
        }
    }

    /// All displays, in enumeration order. The synthetic VR clone is
    /// not listed here; it is only reachable through [`vr`](Self::vr).
    pub fn displays(&self) -> &[Arc<Display>] {
        &self.displays
    }

    pub fn primary(&self) -> &Arc<Display> {
        &self.primary
    }

    pub fn control(&self) -> &Arc<Display> {
        &self.control
    }

    pub fn mosaic(&self) -> Option<&Arc<Display>> {
        self.mosaic.as_ref()
    }

    pub fn vr(&self) -> Option<&Arc<Display>> {
        self.vr.as_ref()
    }

    pub fn headset(&self) -> Option<&VrHeadset> {
        self.headset.as_ref()
    }

    /// `true` when the headset is driven in direct mode.
    pub fn direct_mode(&self) -> bool {
        self.headset
            .as_ref()
            .is_some_and(|h| h.mode == VrMode::Direct)
    }

    pub fn warnings(&self) -> &[TopologyWarning] {
        &self.warnings
    }

    pub fn display_by_name(&self, name: &str) -> Option<&Arc<Display>> {
        self.displays.iter().find(|d| d.name() == name)
    }

    /// Roles held by `display`, compared by identity.
    pub fn roles_of(&self, display: &Arc<Display>) -> Vec<Role> {
        let mut roles = Vec::new();
        if Arc::ptr_eq(display, &self.primary) {
            roles.push(Role::Primary);
        }
        if Arc::ptr_eq(display, &self.control) {
            roles.push(Role::Control);
        }
        if self.mosaic.as_ref().is_some_and(|m| Arc::ptr_eq(display, m)) {
            roles.push(Role::Mosaic);
        }
        if self.vr.as_ref().is_some_and(|v| Arc::ptr_eq(display, v)) {
            roles.push(Role::Vr);
        }
        roles
    }

    /// Re-enumerate monitors and compare against the resolved set.
    ///
    /// Live reconfiguration is unsupported: a difference is logged and
    /// reported as `false`, nothing else happens.
    pub fn verify_unchanged(&self, source: &mut dyn MonitorSource) -> bool {
        let entries = match source.monitors() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cannot re-check display topology: {e}");
                return false;
            }
        };
        let now: BTreeSet<(String, Rect)> = entries
            .into_iter()
            .filter_map(Result::ok)
            .filter(|m| !m.name.is_empty() && !m.rect.is_degenerate())
            .map(|m| (m.name, m.rect))
            .collect();
        let then: BTreeSet<(String, Rect)> = self
            .displays
            .iter()
            .map(|d| (d.name().to_string(), d.virtual_screen_rect()))
            .collect();
        if now != then {
            warn!(
                "display topology changed after initialization ({} -> {} displays); \
                 reconfiguration is unsupported, keeping the startup topology",
                then.len(),
                now.len()
            );
            return false;
        }
        true
    }

    /// Serialisable snapshot of displays, roles and warnings.
    pub fn report(&self) -> TopologyReport {
        let mut displays: Vec<DisplayReport> = self
            .displays
            .iter()
            .map(|d| DisplayReport::new(d, self.roles_of(d)))
            .collect();
        if let Some(vr) = &self.vr {
            if !self.displays.iter().any(|d| Arc::ptr_eq(d, vr)) {
                displays.push(DisplayReport::new(vr, vec![Role::Vr]));
            }
        }
        TopologyReport {
            displays,
            headset: self.headset.clone(),
            warnings: self.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

// ── TopologyReport ───────────────────────────────────────────────

/// One display in a [`TopologyReport`].
#[derive(Debug, Clone, Serialize)]
pub struct DisplayReport {
    #[serde(flatten)]
    pub display: Display,
    pub valid_mosaic: bool,
    pub roles: Vec<Role>,
}

impl DisplayReport {
    fn new(display: &Display, roles: Vec<Role>) -> Self {
        Self {
            display: display.clone(),
            valid_mosaic: display.valid_mosaic(),
            roles,
        }
    }
}

/// Serialisable view of a resolved [`Topology`].
#[derive(Debug, Clone, Serialize)]
pub struct TopologyReport {
    pub displays: Vec<DisplayReport>,
    pub headset: Option<VrHeadset>,
    pub warnings: Vec<String>,
}

impl TopologyReport {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
