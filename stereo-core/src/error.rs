//! Error types for topology resolution and stereo presentation.
//!
//! Fatal conditions are typed errors returned through `Result`.
//! Non-fatal correlation mismatches are [`TopologyWarning`]s: the
//! resolver logs them, collects them and carries on.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

// ── External call failures ───────────────────────────────────────

/// A failed call into an enumeration source (OS, adapter API, vendor
/// API or VR runtime).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{call} failed: {description} (code {code:#x})")]
pub struct SourceError {
    /// Name of the call that failed, e.g. `"EnumAdapters1"`.
    pub call: String,
    /// Raw status code reported by the source.
    pub code: i64,
    /// Human-readable description of `code`.
    pub description: String,
}

impl SourceError {
    pub fn new(call: impl Into<String>, code: i64, description: impl Into<String>) -> Self {
        Self {
            call: call.into(),
            code,
            description: description.into(),
        }
    }
}

/// A presentation surface (window, compositor, wrapper, GPU context)
/// reported a backend-specific error code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{description} (code {code})")]
pub struct SurfaceError {
    pub code: i32,
    pub description: String,
}

impl SurfaceError {
    pub fn new(code: i32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}

// ── ResolveError ─────────────────────────────────────────────────

/// Fatal topology resolution errors. Any of these aborts startup.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The OS monitor enumeration call itself failed.
    #[error("monitor enumeration failed: {0}")]
    MonitorEnumeration(#[source] SourceError),

    /// No monitor was flagged as the system primary.
    #[error("primary display not found")]
    NoPrimaryDisplay,

    /// A display record was rejected at construction.
    #[error("invalid display {name:?}: {reason}")]
    InvalidDisplay { name: String, reason: &'static str },

    /// Could not connect to the adapter/output API at all.
    #[error("adapter API connection failed: {0}")]
    AdapterConnection(#[source] SourceError),

    /// The vendor API could not enumerate its GPUs or displays.
    #[error("vendor enumeration failed: {0}")]
    VendorEnumeration(#[source] SourceError),

    /// A vendor call failed after the display id was already resolved
    /// from the same API.
    #[error("vendor API inconsistent for display {display:?}: {source}")]
    VendorInconsistency {
        display: String,
        #[source]
        source: SourceError,
    },

    /// The vendor reported a logical GPU it never enumerated.
    #[error("vendor logical GPU {handle:#x} of display {display:?} was never enumerated")]
    UnknownLogicalGpu { display: String, handle: u64 },

    /// The vendor grouping (mosaic) topology query failed.
    #[error("vendor grouping query failed: {0}")]
    VendorGrouping(#[source] SourceError),

    /// More than one display matches the headset size.
    #[error("{count} displays match the {width}x{height} headset; VR display is ambiguous")]
    AmbiguousVrDisplay { count: usize, width: i32, height: i32 },

    /// Neither a mosaic display nor a VR display could be assigned.
    #[error("no mosaic or VR display available for stereo presentation")]
    NoPresentationDisplay,

    /// No display is left over for the control console.
    #[error("no control display could be assigned")]
    NoControlDisplay,

    /// The requested presentation backend cannot run on this topology.
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: &'static str,
    },
}

// ── TopologyWarning ──────────────────────────────────────────────

/// Non-fatal findings gathered while resolving the topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyWarning {
    /// The OS listed a monitor it could not describe fully.
    IncompleteMonitor { index: usize, error: SourceError },
    /// A monitor description was rejected (empty name, degenerate rect).
    RejectedMonitor { name: String, reason: &'static str },
    /// An adapter failed to describe itself and was skipped.
    AdapterSkipped { adapter: u32, error: SourceError },
    /// An adapter output failed to describe itself and was skipped.
    OutputSkipped { adapter: u32, output: usize, error: SourceError },
    /// An adapter output has no matching OS display.
    UnmatchedOutput { adapter: u32, name: String },
    /// A vendor display could not be described and was skipped.
    VendorDisplaySkipped { handle: u64, error: SourceError },
    /// A vendor display has no matching OS display.
    UnmatchedVendorDisplay { name: String },
    /// A vendor display group has no member known to the OS.
    UnknownGroup { group: usize, members: Vec<u32> },
    /// The VR runtime is installed but could not be queried.
    VrUnavailable { error: SourceError },
    /// The headset size matched no display.
    UnmatchedHeadset { width: i32, height: i32 },
    /// The control display shares a GPU with a presentation display.
    ControlSharesGpu { control: String, other: String, gpu: u32 },
    /// A display was not assigned to any role.
    Unassigned { display: String },
    /// A role fell back to the primary display (debug builds only).
    DebugFallback { role: &'static str, display: String },
}

impl fmt::Display for TopologyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompleteMonitor { index, error } => {
                write!(f, "monitor #{index} could not be described: {error}")
            }
            Self::RejectedMonitor { name, reason } => {
                write!(f, "monitor {name:?} rejected: {reason}")
            }
            Self::AdapterSkipped { adapter, error } => {
                write!(f, "adapter {adapter} skipped: {error}")
            }
            Self::OutputSkipped {
                adapter,
                output,
                error,
            } => write!(f, "adapter {adapter} output {output} skipped: {error}"),
            Self::UnmatchedOutput { adapter, name } => {
                write!(f, "adapter {adapter} output {name:?} matches no OS display")
            }
            Self::VendorDisplaySkipped { handle, error } => {
                write!(f, "vendor display {handle:#x} skipped: {error}")
            }
            Self::UnmatchedVendorDisplay { name } => {
                write!(f, "vendor display {name:?} matches no OS display")
            }
            Self::UnknownGroup { group, members } => {
                write!(f, "display group {group} has no known members {members:?}")
            }
            Self::VrUnavailable { error } => write!(f, "VR runtime unavailable: {error}"),
            Self::UnmatchedHeadset { width, height } => {
                write!(f, "no display matches the {width}x{height} headset")
            }
            Self::ControlSharesGpu {
                control,
                other,
                gpu,
            } => write!(
                f,
                "control display {control:?} shares GPU {gpu} with {other:?}; expect contention"
            ),
            Self::Unassigned { display } => write!(f, "display {display:?} has no role"),
            Self::DebugFallback { role, display } => {
                write!(f, "{role} role falls back to primary display {display:?}")
            }
        }
    }
}

// ── Presentation failures ────────────────────────────────────────

/// Which part of a stereo frame a presentation call covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeSlot {
    Left,
    Right,
    /// A single call presenting both eyes.
    Both,
}

impl fmt::Display for EyeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left eye"),
            Self::Right => write!(f, "right eye"),
            Self::Both => write!(f, "both eyes"),
        }
    }
}

/// One failed presentation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EyeFailure {
    pub slot: EyeSlot,
    pub error: SurfaceError,
}

/// Everything that went wrong during one `submit()`, aggregated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitFailure {
    pub failures: Vec<EyeFailure>,
    /// The GPU context refused to flush after presenting.
    pub flush: Option<SurfaceError>,
    pub deadline_missed: bool,
    pub deadline: Duration,
}

impl fmt::Display for SubmitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stereo submit failed")?;
        let mut sep = ": ";
        for failure in &self.failures {
            write!(f, "{sep}{}: {}", failure.slot, failure.error)?;
            sep = "; ";
        }
        if let Some(error) = &self.flush {
            write!(f, "{sep}flush: {error}")?;
            sep = "; ";
        }
        if self.deadline_missed {
            write!(f, "{sep}presentation deadline of {:?} missed", self.deadline)?;
        }
        Ok(())
    }
}

impl std::error::Error for SubmitFailure {}

// ── StereoError ──────────────────────────────────────────────────

/// Errors raised by the render-target handoff.
#[derive(Debug, Error)]
pub enum StereoError {
    /// The gate was released by a thread that does not own it.
    #[error("ownership gate released by a thread that does not own it")]
    NotOwner,

    /// The calling thread already holds the outstanding drawable.
    #[error("calling thread already holds an outstanding drawable")]
    DrawableOutstanding,

    /// Presentation failed for one or both eyes, or missed its deadline.
    #[error(transparent)]
    Submit(#[from] SubmitFailure),

    /// The headset pose query failed.
    #[error("pose query failed: {0}")]
    Pose(#[source] SurfaceError),

    /// The GPU context could not be made current.
    #[error("GPU context unavailable: {0}")]
    Context(#[source] SurfaceError),
}
