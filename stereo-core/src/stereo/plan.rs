//! Backend selection from a resolved topology.

use std::sync::Arc;

use tracing::info;

use super::backend::BackendKind;
use crate::display::Display;
use crate::error::ResolveError;
use crate::topology::Topology;

/// Where and how stereo frames will be presented.
#[derive(Debug, Clone)]
pub struct PresentationPlan {
    pub backend: BackendKind,
    /// Display the window backend draws on. `None` for a direct-mode
    /// headset, which has no desktop display.
    pub display: Option<Arc<Display>>,
    /// Size of the render target covering both eyes.
    pub render_size: (u32, u32),
}

impl PresentationPlan {
    /// Pick a backend. `requested` overrides the automatic choice but
    /// must still be possible on this topology.
    ///
    /// | Topology                 | Automatic choice |
    /// |--------------------------|------------------|
    /// | direct-mode headset      | `Compositor`     |
    /// | mosaic display           | `Window` on it   |
    /// | extended-mode VR display | `Window` on it   |
    pub fn select(
        topology: &Topology,
        requested: Option<BackendKind>,
    ) -> Result<Self, ResolveError> {
        let surface = topology.mosaic().or(topology.vr()).cloned();
        let headset_size = topology.headset().map(|h| h.render_resolution);

        let plan = match requested {
            Some(BackendKind::Compositor) => {
                let size = headset_size.ok_or(ResolveError::BackendUnavailable {
                    backend: BackendKind::Compositor.as_str(),
                    reason: "no VR headset detected",
                })?;
                Self {
                    backend: BackendKind::Compositor,
                    display: topology.vr().cloned(),
                    render_size: size,
                }
            }
            Some(BackendKind::Wrapper) => {
                let display = topology.vr().or(topology.mosaic()).cloned();
                let render_size = headset_size
                    .or_else(|| display.as_ref().map(|d| d.render_resolution()))
                    .ok_or(ResolveError::BackendUnavailable {
                        backend: BackendKind::Wrapper.as_str(),
                        reason: "no headset or presentation display",
                    })?;
                Self {
                    backend: BackendKind::Wrapper,
                    display,
                    render_size,
                }
            }
            Some(BackendKind::Window) => {
                let display = surface.ok_or(ResolveError::BackendUnavailable {
                    backend: BackendKind::Window.as_str(),
                    reason: "no mosaic or VR display",
                })?;
                Self::window(display)
            }
            None if topology.direct_mode() => Self {
                backend: BackendKind::Compositor,
                display: None,
                render_size: headset_size.unwrap_or_default(),
            },
            None => Self::window(surface.ok_or(ResolveError::NoPresentationDisplay)?),
        };

        info!(
            backend = %plan.backend,
            display = plan.display.as_ref().map(|d| d.name()).unwrap_or("-"),
            width = plan.render_size.0,
            height = plan.render_size.1,
            "presentation plan selected"
        );
        Ok(plan)
    }

    fn window(display: Arc<Display>) -> Self {
        Self {
            backend: BackendKind::Window,
            render_size: display.render_resolution(),
            display: Some(display),
        }
    }
}
