//! GPU context ownership.
//!
//! The render loop owns its GPU context and lends it to presentation for
//! the length of one submit. [`CurrentContext`] makes the context current
//! on entry and releases it on drop, so an early return never leaves a
//! context bound to the wrong thread.

use tracing::warn;

use crate::error::{StereoError, SurfaceError};

/// A graphics API context that can be bound to the calling thread.
pub trait GpuContext: Send {
    fn make_current(&mut self) -> Result<(), SurfaceError>;

    fn release_current(&mut self);

    /// Push all queued commands to the GPU.
    fn flush(&mut self) -> Result<(), SurfaceError>;
}

/// Scoped make-current. Released on drop.
pub struct CurrentContext<'a> {
    context: &'a mut dyn GpuContext,
}

impl<'a> CurrentContext<'a> {
    pub fn enter(context: &'a mut dyn GpuContext) -> Result<Self, StereoError> {
        context.make_current().map_err(StereoError::Context)?;
        Ok(Self { context })
    }

    /// Flush queued commands. A failure is logged and returned.
    pub fn flush(&mut self) -> Result<(), SurfaceError> {
        self.context.flush().inspect_err(|e| warn!(error = %e, "GPU flush failed"))
    }
}

impl Drop for CurrentContext<'_> {
    fn drop(&mut self) {
        self.context.release_current();
    }
}
