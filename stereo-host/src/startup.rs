//! Topology resolution at startup.
//!
//! With a fixture, every enumeration source comes from the fixture file.
//! Without one, monitors and adapters are enumerated live through GDI and
//! DXGI; the vendor and VR passes are skipped since no native source for
//! them is linked into the host.

use std::path::Path;

use tracing::{info, warn};

use stereo_core::platform::{DxgiAdapterSource, GdiMonitorSource};
use stereo_core::{Fixture, Topology, TopologyResolver};

use crate::config::HostConfig;

/// Resolve the display topology, from `fixture` when given.
pub fn resolve_topology(
    config: &HostConfig,
    fixture: Option<&Path>,
) -> Result<Topology, Box<dyn std::error::Error>> {
    let options = config.to_resolver_options();
    let topology = match fixture {
        Some(path) => {
            info!("resolving topology from fixture {}", path.display());
            Fixture::load(path)?.resolve(options)?
        }
        None => {
            info!("resolving topology from the live system");
            TopologyResolver::new(options).resolve(
                &mut GdiMonitorSource::new(),
                &mut DxgiAdapterSource::new(),
                None,
                None,
            )?
        }
    };

    info!(
        primary = topology.primary().name(),
        control = topology.control().name(),
        mosaic = topology.mosaic().map(|d| d.name()).unwrap_or("-"),
        vr = topology.vr().map(|d| d.name()).unwrap_or("-"),
        warnings = topology.warnings().len(),
        "display topology resolved"
    );
    Ok(topology)
}

/// Re-enumerate monitors and log if the topology moved underneath us.
pub fn verify_topology(topology: &Topology, fixture: Option<&Path>) -> bool {
    match fixture {
        Some(path) => match Fixture::load(path) {
            Ok(fixture) => topology.verify_unchanged(&mut fixture.sources().monitors),
            Err(e) => {
                warn!("cannot re-read fixture {}: {e}", path.display());
                false
            }
        },
        None => topology.verify_unchanged(&mut GdiMonitorSource::new()),
    }
}
