//! One frame's claim on the render target.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use super::backend::Backend;
use super::target::{Eye, FramebufferId, RenderTarget, TextureHandle};
use crate::context::{CurrentContext, GpuContext};
use crate::deadline::DeadlineMarker;
use crate::error::{EyeFailure, StereoError, SubmitFailure, SurfaceError};
use crate::gate::OwnershipGate;
use crate::rect::Rect;

const SUBMIT_MARKER: &str = "stereo-submit";

/// Everything presentation touches, locked as one unit.
pub(crate) struct Stage {
    pub(crate) backend: Backend,
    pub(crate) marker: Box<dyn DeadlineMarker>,
    pub(crate) context: Box<dyn GpuContext>,
}

/// State shared by a `StereoDisplay` and the drawables it hands out.
pub(crate) struct Presenter {
    pub(crate) gate: OwnershipGate,
    pub(crate) stage: Mutex<Stage>,
    pub(crate) target: Arc<RenderTarget>,
    pub(crate) deadline: Duration,
}

impl Presenter {
    pub(crate) fn stage(&self) -> std::sync::MutexGuard<'_, Stage> {
        self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm, present, flush, reset. Returns whatever went wrong, with no
    /// failures and no miss meaning success.
    fn present(&self, target: &RenderTarget) -> Result<Presented, StereoError> {
        let mut stage = self.stage();
        let Stage {
            backend,
            marker,
            context,
        } = &mut *stage;

        let mut current = CurrentContext::enter(context.as_mut())?;
        marker.arm(SUBMIT_MARKER, self.deadline);
        let failures = backend.present(target);
        let flush = current.flush().err();
        drop(current);
        let deadline_missed = marker.reset();
        Ok(Presented {
            failures,
            flush,
            deadline_missed,
        })
    }
}

struct Presented {
    failures: Vec<EyeFailure>,
    flush: Option<SurfaceError>,
    deadline_missed: bool,
}

enum TargetCell {
    Live(Arc<RenderTarget>),
    Retired,
}

/// A live claim on the render target, valid until [`submit`](Self::submit).
///
/// The drawable holds the ownership gate for the thread that obtained it
/// and cannot be sent to another thread. After `submit` it is retired:
/// framebuffer queries return [`FramebufferId::INVALID`], viewports
/// return `Rect::default()` and further submits do nothing.
///
/// Dropping a live drawable releases the gate without presenting.
pub struct StereoDrawable {
    cell: RefCell<TargetCell>,
    presenter: Arc<Presenter>,
    _thread_bound: PhantomData<*const ()>,
}

impl StereoDrawable {
    pub(crate) fn new(presenter: Arc<Presenter>) -> Self {
        Self {
            cell: RefCell::new(TargetCell::Live(Arc::clone(&presenter.target))),
            presenter,
            _thread_bound: PhantomData,
        }
    }

    fn with_target<R>(&self, f: impl FnOnce(&RenderTarget) -> R, retired: R) -> R {
        match &*self.cell.borrow() {
            TargetCell::Live(target) => f(target),
            TargetCell::Retired => retired,
        }
    }

    fn retire(&self) -> Option<Arc<RenderTarget>> {
        match self.cell.replace(TargetCell::Retired) {
            TargetCell::Live(target) => Some(target),
            TargetCell::Retired => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(&*self.cell.borrow(), TargetCell::Live(_))
    }

    pub fn framebuffer(&self, eye: Eye) -> FramebufferId {
        self.with_target(|t| t.framebuffer(eye), FramebufferId::INVALID)
    }

    pub fn viewport(&self, eye: Eye) -> Rect {
        self.with_target(|t| t.viewport(eye), Rect::default())
    }

    pub fn color(&self, eye: Eye) -> TextureHandle {
        self.with_target(|t| t.color(eye), TextureHandle::default())
    }

    /// Present the frame and release the render target.
    ///
    /// The gate is released whatever happens during presentation. Eye
    /// failures and a missed deadline come back together as one
    /// [`StereoError::Submit`]. Calling this again is a no-op.
    pub fn submit(&self) -> Result<(), StereoError> {
        let Some(target) = self.retire() else {
            debug!("submit on a retired drawable ignored");
            return Ok(());
        };

        let presented = self.presenter.present(&target);
        drop(target);
        self.presenter.gate.release()?;

        let Presented {
            failures,
            flush,
            deadline_missed,
        } = presented?;
        if failures.is_empty() && flush.is_none() && !deadline_missed {
            return Ok(());
        }
        for failure in &failures {
            warn!(eye = %failure.slot, error = %failure.error, "presentation failed");
        }
        Err(SubmitFailure {
            failures,
            flush,
            deadline_missed,
            deadline: self.presenter.deadline,
        }
        .into())
    }
}

impl Drop for StereoDrawable {
    fn drop(&mut self) {
        if self.retire().is_some() {
            warn!("drawable dropped without submit; releasing render target");
            // A failed release has already been logged by the gate.
            let _ = self.presenter.gate.release();
        }
    }
}

impl std::fmt::Debug for StereoDrawable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StereoDrawable")
            .field("live", &self.is_live())
            .finish()
    }
}
