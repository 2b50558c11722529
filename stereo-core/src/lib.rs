//! # stereo-core
//!
//! Display topology resolution and stereo render-target handoff for
//! multi-monitor, multi-GPU machines with an optional VR headset and a
//! vendor multi-display ("mosaic") extension.
//!
//! This crate contains:
//! - **Geometry**: `Rect`
//! - **Topology**: `Display`, `TopologyResolver`, `Topology` and the
//!   enumeration-source traits it correlates
//! - **Platform**: GDI monitor and DXGI adapter/output sources (Windows)
//! - **Fixture**: declarative enumeration sources for tests and dry runs
//! - **Handoff**: `OwnershipGate`, `StereoDisplay`, `StereoDrawable`
//! - **Monitoring**: `DeadlineMarker` and `InstantDeadline`
//! - **Error**: `ResolveError`, `StereoError` and friends (`thiserror`)

pub mod context;
pub mod deadline;
pub mod display;
pub mod error;
pub mod gate;
pub mod platform;
pub mod rect;
pub mod stereo;
pub mod topology;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use context::{CurrentContext, GpuContext};
pub use deadline::{DeadlineMarker, InstantDeadline};
pub use display::{Display, GpuIndex, GpuIndexSource, LogicalGpuHandle, VendorDisplayHandle};
pub use error::{
    EyeFailure, EyeSlot, ResolveError, SourceError, StereoError, SubmitFailure, SurfaceError,
    TopologyWarning,
};
pub use gate::{Acquire, OwnershipGate};
pub use rect::Rect;
pub use stereo::{
    Backend, BackendKind, ColorSpace, Eye, FramebufferId, HeadsetPose, PresentConfig,
    PresentationPlan, RenderTarget, StereoDisplay, StereoDrawable, SubmitFlags, TextureHandle,
};
pub use topology::{
    Fixture, ResolverOptions, Role, Topology, TopologyReport, TopologyResolver, VrHeadset, VrMode,
};
