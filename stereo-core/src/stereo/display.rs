//! Hands out drawables for the shared render target.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace};

use super::backend::{Backend, BackendKind};
use super::drawable::{Presenter, Stage, StereoDrawable};
use super::projection::Mat4;
use super::surface::HeadsetPose;
use super::target::{Eye, RenderTarget};
use crate::context::GpuContext;
use crate::deadline::{DeadlineMarker, InstantDeadline};
use crate::error::StereoError;
use crate::gate::Acquire;

/// Presentation timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentConfig {
    /// Budget for the presentation calls of one submit.
    pub deadline: Duration,
    /// Slice used by [`StereoDisplay::wait_next_drawable`] between
    /// acquisition attempts.
    pub acquire_poll: Duration,
}

impl Default for PresentConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_millis(11),
            acquire_poll: Duration::from_millis(100),
        }
    }
}

/// The stereo output. Cheap to clone; clones share one render target
/// and one ownership gate, so a pose thread can hold its own handle.
#[derive(Clone)]
pub struct StereoDisplay {
    presenter: Arc<Presenter>,
    config: PresentConfig,
}

impl StereoDisplay {
    pub fn new(
        backend: Backend,
        target: RenderTarget,
        context: Box<dyn GpuContext>,
        marker: Box<dyn DeadlineMarker>,
        config: PresentConfig,
    ) -> Self {
        info!(
            backend = %backend.kind(),
            width = target.size().0,
            height = target.size().1,
            deadline_ms = config.deadline.as_millis() as u64,
            "stereo display ready"
        );
        let presenter = Presenter {
            gate: Default::default(),
            stage: std::sync::Mutex::new(Stage {
                backend,
                marker,
                context,
            }),
            target: Arc::new(target),
            deadline: config.deadline,
        };
        Self {
            presenter: Arc::new(presenter),
            config,
        }
    }

    /// [`new`](Self::new) with a wall-clock deadline marker.
    pub fn with_instant_deadline(
        backend: Backend,
        target: RenderTarget,
        context: Box<dyn GpuContext>,
        config: PresentConfig,
    ) -> Self {
        Self::new(
            backend,
            target,
            context,
            Box::new(InstantDeadline::new()),
            config,
        )
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.presenter.stage().backend.kind()
    }

    pub fn render_size(&self) -> (u32, u32) {
        self.presenter.target.size()
    }

    pub fn config(&self) -> PresentConfig {
        self.config
    }

    /// Whether the calling thread holds an outstanding drawable.
    pub fn owns_drawable(&self) -> bool {
        self.presenter.gate.owned_by_calling_thread()
    }

    /// Wait up to `timeout` for the render target.
    ///
    /// `Ok(None)` means the wait timed out; that is a normal outcome and
    /// the caller simply tries again.
    pub fn wait_next_drawable_for(
        &self,
        timeout: Duration,
    ) -> Result<Option<StereoDrawable>, StereoError> {
        match self.presenter.gate.try_acquire_for(timeout) {
            Acquire::Ok => {
                trace!("drawable acquired");
                Ok(Some(StereoDrawable::new(Arc::clone(&self.presenter))))
            }
            Acquire::AlreadyOwned => Err(StereoError::DrawableOutstanding),
            Acquire::TryFailed => Ok(None),
        }
    }

    /// Block until the render target is free.
    pub fn wait_next_drawable(&self) -> Result<StereoDrawable, StereoError> {
        loop {
            if let Some(drawable) = self.wait_next_drawable_for(self.config.acquire_poll)? {
                return Ok(drawable);
            }
            debug!(
                poll_ms = self.config.acquire_poll.as_millis() as u64,
                "render target still busy"
            );
        }
    }

    /// Headset pose for the coming frame. Window backends have no
    /// tracking and report [`HeadsetPose::UNTRACKED`].
    pub fn wait_get_poses(&self) -> Result<HeadsetPose, StereoError> {
        self.presenter
            .stage()
            .backend
            .wait_get_poses()
            .map_err(StereoError::Pose)
    }

    pub fn projection(&self, eye: Eye, near: f32, far: f32) -> Mat4 {
        self.presenter.stage().backend.projection(eye, near, far)
    }

    pub fn eye_to_head(&self, eye: Eye) -> Mat4 {
        self.presenter.stage().backend.eye_to_head(eye)
    }
}

impl std::fmt::Debug for StereoDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StereoDisplay")
            .field("backend", &self.backend_kind())
            .field("render_size", &self.render_size())
            .field("config", &self.config)
            .finish()
    }
}
