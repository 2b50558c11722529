//! Topology resolution passes.
//!
//! ```text
//!  1. monitors   ── OS monitor list           → one Display per monitor, primary
//!  2. adapters   ── adapter/output list       → logical GPU index (adapter)
//!  3. vendor     ── vendor display list       → vendor identity, GPU index (vendor),
//!                                              grouping: refresh rate + group size
//!  4. vr         ── VR runtime                → headset rect, VR candidate / clone
//!  5. roles      ── all of the above          → primary, control, mosaic, vr
//! ```
//!
//! Each pass returns `Err` on a fatal condition and records non-fatal
//! mismatches as [`TopologyWarning`]s before moving on.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::display::{Display, GpuIndexSource};
use crate::error::{ResolveError, SourceError, TopologyWarning};
use crate::topology::source::{AdapterSource, MonitorSource, VendorSource, VrMode, VrProbe};
use crate::topology::{Topology, VrHeadset};

// ── ResolverOptions ──────────────────────────────────────────────

/// Knobs for [`TopologyResolver`].
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Give the headset its own `Display` identity when it is found in
    /// extended mode, leaving the matched desktop display free for
    /// desktop duty.
    pub clone_vr_identity: bool,
    /// Let missing mosaic/control roles fall back to the primary display
    /// instead of failing. Meant for single-GPU development machines.
    pub debug_fallback: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            clone_vr_identity: false,
            debug_fallback: cfg!(debug_assertions),
        }
    }
}

// ── TopologyResolver ─────────────────────────────────────────────

/// Runs the resolution passes and produces a [`Topology`].
#[derive(Debug)]
pub struct TopologyResolver {
    options: ResolverOptions,
    displays: Vec<Display>,
    primary: Option<usize>,
    headset: Option<VrHeadset>,
    vr_candidate: Option<usize>,
    vr_matches: usize,
    vr_clone: Option<Display>,
    warnings: Vec<TopologyWarning>,
}

impl TopologyResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self {
            options,
            displays: Vec::new(),
            primary: None,
            headset: None,
            vr_candidate: None,
            vr_matches: 0,
            vr_clone: None,
            warnings: Vec::new(),
        }
    }

    /// Run every pass. `vendor` and `vr` are optional: a machine without
    /// the vendor driver or a VR runtime simply skips those passes.
    pub fn resolve(
        mut self,
        monitors: &mut dyn MonitorSource,
        adapters: &mut dyn AdapterSource,
        vendor: Option<&mut dyn VendorSource>,
        vr: Option<&mut dyn VrProbe>,
    ) -> Result<Topology, ResolveError> {
        self.enumerate_monitors(monitors)?;
        self.correlate_adapters(adapters)?;
        match vendor {
            Some(vendor) => self.correlate_vendor(vendor)?,
            None => info!("no vendor display source; skipping vendor correlation"),
        }
        match vr {
            Some(vr) => self.identify_vr(vr),
            None => debug!("no VR runtime probe; skipping headset identification"),
        }
        self.assign_roles()
    }

    /// Displays discovered so far, in enumeration order.
    pub fn displays(&self) -> &[Display] {
        &self.displays
    }

    pub fn warnings(&self) -> &[TopologyWarning] {
        &self.warnings
    }

    // ── Pass 1: monitors ─────────────────────────────────────────

    /// Build one `Display` per fully described OS monitor.
    pub fn enumerate_monitors(&mut self, source: &mut dyn MonitorSource) -> Result<(), ResolveError> {
        let entries = source.monitors().map_err(ResolveError::MonitorEnumeration)?;

        for (index, entry) in entries.into_iter().enumerate() {
            let desc = match entry {
                Ok(desc) => desc,
                Err(error) => {
                    self.warn(TopologyWarning::IncompleteMonitor { index, error });
                    continue;
                }
            };
            if self.find(&desc.name).is_some() {
                self.warn(TopologyWarning::RejectedMonitor {
                    name: desc.name,
                    reason: "duplicate name",
                });
                continue;
            }
            let monitor = match Display::new(desc.name, desc.rect) {
                Ok(monitor) => monitor,
                Err(ResolveError::InvalidDisplay { name, reason }) => {
                    self.warn(TopologyWarning::RejectedMonitor { name, reason });
                    continue;
                }
                Err(e) => return Err(e),
            };
            debug!(
                "monitor {:?} at {:?}{}",
                monitor.name(),
                monitor.virtual_screen_rect(),
                if desc.primary { " (primary)" } else { "" }
            );
            if desc.primary {
                match self.primary {
                    None => self.primary = Some(self.displays.len()),
                    Some(_) => debug!("ignoring second primary flag on {:?}", monitor.name()),
                }
            }
            self.displays.push(monitor);
        }

        if self.primary.is_none() {
            return Err(ResolveError::NoPrimaryDisplay);
        }
        info!("{} monitor(s) enumerated", self.displays.len());
        Ok(())
    }

    // ── Pass 2: adapters ─────────────────────────────────────────

    /// Assign logical GPU indices from the adapter/output list.
    pub fn correlate_adapters(&mut self, source: &mut dyn AdapterSource) -> Result<(), ResolveError> {
        let adapters = source.adapters().map_err(ResolveError::AdapterConnection)?;

        for (index, adapter) in adapters.into_iter().enumerate() {
            let index = index as u32;
            let adapter = match adapter {
                Ok(adapter) => adapter,
                Err(error) => {
                    self.warn(TopologyWarning::AdapterSkipped {
                        adapter: index,
                        error,
                    });
                    continue;
                }
            };
            debug!("adapter {index}: {}", adapter.description);

            for (output, name) in adapter.outputs.into_iter().enumerate() {
                let name = match name {
                    Ok(name) => name,
                    Err(error) => {
                        self.warn(TopologyWarning::OutputSkipped {
                            adapter: index,
                            output,
                            error,
                        });
                        continue;
                    }
                };
                match self.find(&name) {
                    Some(i) => {
                        if self.displays[i].assign_gpu_index(index, GpuIndexSource::Adapter) {
                            debug!("{name:?} driven by adapter {index}");
                        }
                    }
                    None => self.warn(TopologyWarning::UnmatchedOutput {
                        adapter: index,
                        name,
                    }),
                }
            }
        }
        Ok(())
    }

    // ── Pass 3: vendor ───────────────────────────────────────────

    /// Attach vendor identity to displays, fill in missing GPU indices
    /// and read the grouping topology.
    pub fn correlate_vendor(&mut self, vendor: &mut dyn VendorSource) -> Result<(), ResolveError> {
        let gpus = vendor
            .logical_gpus()
            .map_err(ResolveError::VendorEnumeration)?;
        let handles = vendor
            .display_handles()
            .map_err(ResolveError::VendorEnumeration)?;
        debug!(
            "vendor reports {} logical GPU(s), {} display(s)",
            gpus.len(),
            handles.len()
        );

        for handle in handles {
            let name = match vendor.association_name(handle) {
                Ok(name) => name,
                Err(error) => {
                    self.warn(TopologyWarning::VendorDisplaySkipped {
                        handle: handle.0,
                        error,
                    });
                    continue;
                }
            };
            let Some(i) = self.find(&name) else {
                self.warn(TopologyWarning::UnmatchedVendorDisplay { name });
                continue;
            };
            let display_id = match vendor.display_id(handle) {
                Ok(id) => id,
                Err(error) => {
                    self.warn(TopologyWarning::VendorDisplaySkipped {
                        handle: handle.0,
                        error,
                    });
                    continue;
                }
            };

            // From here on the vendor API has already vouched for this
            // display; any further failure is an inconsistency.
            let inconsistent = |source: SourceError| ResolveError::VendorInconsistency {
                display: name.clone(),
                source,
            };
            let count = vendor.physical_gpu_count(display_id).map_err(inconsistent)?;

            let display = &mut self.displays[i];
            display.set_vendor_identity(handle, display_id);
            display.set_physical_gpu_count(count);

            if display.gpu().is_none() {
                let gpu = vendor.logical_gpu(display_id).map_err(inconsistent)?;
                let index = gpus.iter().position(|g| *g == gpu).ok_or_else(|| {
                    ResolveError::UnknownLogicalGpu {
                        display: name.clone(),
                        handle: gpu.0,
                    }
                })?;
                display.assign_gpu_index(index as u32, GpuIndexSource::Vendor);
            }
            debug!("{name:?}: vendor display id {display_id:#x}, {count} physical GPU(s)");
        }

        self.correlate_groups(vendor)
    }

    fn correlate_groups(&mut self, vendor: &mut dyn VendorSource) -> Result<(), ResolveError> {
        let Some(groups) = vendor
            .display_groups()
            .map_err(ResolveError::VendorGrouping)?
        else {
            info!("vendor display grouping is disabled");
            return Ok(());
        };

        for (group, desc) in groups.iter().enumerate() {
            let member = desc.members.iter().find_map(|id| {
                self.displays
                    .iter()
                    .position(|d| d.vendor_display_id() == Some(*id))
            });
            match member {
                Some(i) => {
                    let size = desc.size();
                    self.displays[i].set_grouping(desc.refresh_rate, size);
                    info!(
                        "display group {group}: {}x{} @ {} Hz, {} display(s), headed by {:?}",
                        desc.width,
                        desc.height,
                        desc.refresh_rate,
                        size,
                        self.displays[i].name()
                    );
                }
                None => self.warn(TopologyWarning::UnknownGroup {
                    group,
                    members: desc.members.clone(),
                }),
            }
        }
        Ok(())
    }

    // ── Pass 4: VR ───────────────────────────────────────────────

    /// Find the headset's display. Failures degrade to "no VR display".
    pub fn identify_vr(&mut self, probe: &mut dyn VrProbe) {
        if !probe.is_present() {
            info!("no VR headset present");
            return;
        }
        if let Err(error) = self.probe_headset(probe) {
            self.headset = None;
            self.vr_candidate = None;
            self.vr_matches = 0;
            self.vr_clone = None;
            self.warn(TopologyWarning::VrUnavailable { error });
        }
    }

    fn probe_headset(&mut self, probe: &mut dyn VrProbe) -> Result<(), SourceError> {
        let output_device = probe.output_device()?;
        let mode = probe.mode()?;
        let (eye_width, eye_height) = probe.recommended_render_size()?;
        let side_by_side = eye_width.checked_mul(2).ok_or_else(|| {
            SourceError::new(
                "GetRecommendedRenderTargetSize",
                0,
                format!("eye width {eye_width} overflows a side-by-side target"),
            )
        })?;
        let render_resolution = (side_by_side, eye_height);

        let rect = match mode {
            VrMode::Extended => probe.window_bounds()?,
            VrMode::Direct => match self.primary {
                Some(p) => self.displays[p].virtual_screen_rect(),
                None => Default::default(),
            },
        };
        info!(
            "VR headset {output_device:?} in {mode:?} mode, {}x{}, render {}x{}",
            rect.width, rect.height, render_resolution.0, render_resolution.1
        );

        if mode == VrMode::Extended {
            // The mosaic never doubles as the headset, even at headset size.
            let mosaic = self.mosaic_index();
            let matches: Vec<usize> = self
                .displays
                .iter()
                .enumerate()
                .filter(|(i, d)| Some(*i) != mosaic && d.virtual_screen_rect().same_size(&rect))
                .map(|(i, _)| i)
                .collect();
            self.vr_matches = matches.len();
            self.vr_candidate = matches.first().copied();
            match self.vr_candidate {
                None => self.warn(TopologyWarning::UnmatchedHeadset {
                    width: rect.width,
                    height: rect.height,
                }),
                // Rejected when roles are assigned.
                Some(_) if matches.len() > 1 => {
                    debug!("{} displays match the headset size", matches.len())
                }
                Some(i) if self.options.clone_vr_identity => {
                    let source = &self.displays[i];
                    let name = format!("{} [HMD]", source.name());
                    self.vr_clone = Some(source.clone_as(name, render_resolution));
                }
                Some(i) => self.displays[i].set_render_resolution(render_resolution),
            }
        }

        self.headset = Some(VrHeadset {
            mode,
            rect,
            render_resolution,
            output_device,
        });
        Ok(())
    }

    // ── Pass 5: roles ────────────────────────────────────────────

    /// Assign primary, mosaic, VR and control roles.
    pub fn assign_roles(mut self) -> Result<Topology, ResolveError> {
        let primary = self.primary.ok_or(ResolveError::NoPrimaryDisplay)?;

        let mut mosaic = self.mosaic_index();

        // VR: the clone, or the single candidate found by the VR pass.
        if let Some(headset) = self.headset.as_ref().filter(|_| self.vr_matches > 1) {
            return Err(ResolveError::AmbiguousVrDisplay {
                count: self.vr_matches,
                width: headset.rect.width,
                height: headset.rect.height,
            });
        }
        let vr_listed = match self.vr_clone {
            Some(_) => None,
            None => self.vr_candidate,
        };
        let has_vr = vr_listed.is_some() || self.vr_clone.is_some() || self.direct_mode();

        if mosaic.is_none() && !has_vr {
            if !self.options.debug_fallback {
                return Err(ResolveError::NoPresentationDisplay);
            }
            self.warn(TopologyWarning::DebugFallback {
                role: "mosaic",
                display: self.displays[primary].name().to_string(),
            });
            mosaic = Some(primary);
        }

        // Control: prefer a display on a GPU of its own.
        let mosaic_gpu = mosaic.and_then(|m| self.displays[m].logical_gpu_index());
        let vr_gpu = match (&self.vr_clone, vr_listed) {
            (Some(clone), _) => clone.logical_gpu_index(),
            (None, Some(v)) => self.displays[v].logical_gpu_index(),
            (None, None) => None,
        };
        let taken = |i: usize| Some(i) == mosaic || Some(i) == vr_listed;
        let own_gpu = |d: &Display| {
            let gpu = d.logical_gpu_index();
            (mosaic_gpu.is_none() || gpu != mosaic_gpu) && (vr_gpu.is_none() || gpu != vr_gpu)
        };
        let control = (0..self.displays.len())
            .find(|&i| !taken(i) && own_gpu(&self.displays[i]))
            .or_else(|| (0..self.displays.len()).find(|&i| !taken(i)));

        let control = match control {
            Some(c) => c,
            None if self.options.debug_fallback => {
                self.warn(TopologyWarning::DebugFallback {
                    role: "control",
                    display: self.displays[primary].name().to_string(),
                });
                primary
            }
            None => return Err(ResolveError::NoControlDisplay),
        };

        if let Some(gpu) = self.displays[control].logical_gpu_index() {
            let shared = [(mosaic, mosaic_gpu), (vr_listed, vr_gpu)]
                .into_iter()
                .find(|(slot, slot_gpu)| *slot != Some(control) && *slot_gpu == Some(gpu));
            if let Some((slot, _)) = shared {
                let other = match slot {
                    Some(i) => self.displays[i].name().to_string(),
                    None => self
                        .vr_clone
                        .as_ref()
                        .map(|c| c.name().to_string())
                        .unwrap_or_default(),
                };
                self.warn(TopologyWarning::ControlSharesGpu {
                    control: self.displays[control].name().to_string(),
                    other,
                    gpu,
                });
            }
        }

        let unassigned: Vec<String> = self
            .displays
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != control && !taken(i))
            .map(|(_, d)| d.name().to_string())
            .collect();
        for display in unassigned {
            self.warn(TopologyWarning::Unassigned { display });
        }

        let displays: Vec<Arc<Display>> = self.displays.into_iter().map(Arc::new).collect();
        let vr = match self.vr_clone {
            Some(clone) => Some(Arc::new(clone)),
            None => vr_listed.map(|v| Arc::clone(&displays[v])),
        };
        let topology = Topology::new(
            displays.clone(),
            Arc::clone(&displays[primary]),
            Arc::clone(&displays[control]),
            mosaic.map(|m| Arc::clone(&displays[m])),
            vr,
            self.headset,
            self.warnings,
        );

        info!(
            "roles: primary={:?} control={:?} mosaic={:?} vr={:?}",
            topology.primary().name(),
            topology.control().name(),
            topology.mosaic().map(|d| d.name().to_string()),
            topology.vr().map(|d| d.name().to_string()),
        );
        Ok(topology)
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Largest valid group; strict `>` keeps the first on ties.
    fn mosaic_index(&self) -> Option<usize> {
        let mut mosaic: Option<usize> = None;
        for (i, display) in self.displays.iter().enumerate() {
            if !display.valid_mosaic() {
                continue;
            }
            let larger = match mosaic {
                None => true,
                Some(m) => display.vendor_group_size() > self.displays[m].vendor_group_size(),
            };
            if larger {
                mosaic = Some(i);
            }
        }
        mosaic
    }

    fn find(&self, association_name: &str) -> Option<usize> {
        self.displays
            .iter()
            .position(|d| d.association_name() == association_name)
    }

    fn direct_mode(&self) -> bool {
        self.headset
            .as_ref()
            .is_some_and(|h| h.mode == VrMode::Direct)
    }

    fn warn(&mut self, warning: TopologyWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }
}

// ── Tests ────────────────────────────────────────────────────────
