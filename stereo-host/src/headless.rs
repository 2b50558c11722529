//! Headless presentation surfaces.
//!
//! These stand in for a desktop window, a VR compositor and a wrapper
//! runtime so the host can run the full acquire/submit cycle without a
//! GPU or headset: topology dry runs, CI, fixture-driven demos.

use std::f32::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use stereo_core::stereo::projection::{self, FovTangents, Mat4};
use stereo_core::stereo::{
    CompositorBackend, EyeSubmission, VrCompositor, WindowBackend, WindowSurface, WrapperBackend,
    WrapperRuntime,
};
use stereo_core::{
    Backend, BackendKind, Eye, FramebufferId, GpuContext, HeadsetPose, PresentationPlan,
    RenderTarget, StereoDisplay, SubmitFlags, SurfaceError, TextureHandle,
};

use crate::config::HostConfig;

const IPD: f32 = 0.064;
/// Vertical field of view of the simulated headset, in radians.
const FOV_Y: f32 = 1.75;

// ── Stats ────────────────────────────────────────────────────────

/// Counters shared by every headless surface.
#[derive(Debug, Default)]
pub struct HeadlessStats {
    pub presented: AtomicU64,
    pub eye_submits: AtomicU64,
    pub poses: AtomicU64,
}

impl HeadlessStats {
    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }

    pub fn poses(&self) -> u64 {
        self.poses.load(Ordering::Relaxed)
    }
}

/// A pose slowly turning about the vertical axis.
fn turning_pose(frame: u64) -> HeadsetPose {
    let yaw = (frame % 720) as f32 * PI / 360.0;
    HeadsetPose {
        position: [0.0, 1.7, 0.0],
        orientation: [0.0, (yaw * 0.5).sin(), 0.0, (yaw * 0.5).cos()],
        valid: true,
    }
}

// ── Surfaces ─────────────────────────────────────────────────────

pub struct HeadlessWindow {
    stats: Arc<HeadlessStats>,
}

impl WindowSurface for HeadlessWindow {
    fn blit(&mut self, target: &RenderTarget) -> Result<(), SurfaceError> {
        if !target.framebuffer(Eye::Left).is_valid() {
            return Err(SurfaceError::new(0x0506, "invalid framebuffer operation"));
        }
        trace!(size = ?target.size(), "blit");
        Ok(())
    }

    fn swap_buffers(&mut self) -> Result<(), SurfaceError> {
        self.stats.presented.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

pub struct HeadlessCompositor {
    stats: Arc<HeadlessStats>,
    frame: u64,
}

impl VrCompositor for HeadlessCompositor {
    fn submit(&mut self, submission: &EyeSubmission) -> Result<(), SurfaceError> {
        if submission.texture == TextureHandle::default() {
            return Err(SurfaceError::new(107, "invalid texture"));
        }
        self.stats.eye_submits.fetch_add(1, Ordering::Relaxed);
        if submission.eye == Eye::Right {
            self.stats.presented.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn wait_get_poses(&mut self) -> Result<HeadsetPose, SurfaceError> {
        self.frame += 1;
        self.stats.poses.fetch_add(1, Ordering::Relaxed);
        Ok(turning_pose(self.frame))
    }

    fn projection_raw(&self, _eye: Eye) -> FovTangents {
        FovTangents::symmetric(FOV_Y, 0.9)
    }

    fn eye_to_head(&self, eye: Eye) -> Mat4 {
        projection::eye_offset(eye, IPD)
    }
}

pub struct HeadlessWrapper {
    stats: Arc<HeadlessStats>,
    frame: u64,
}

impl WrapperRuntime for HeadlessWrapper {
    fn submit_frame(
        &mut self,
        left: TextureHandle,
        right: TextureHandle,
    ) -> Result<(), SurfaceError> {
        if left == TextureHandle::default() || right == TextureHandle::default() {
            return Err(SurfaceError::new(-1, "missing color attachment"));
        }
        self.stats.presented.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn projection(&self, _eye: Eye, near: f32, far: f32) -> Mat4 {
        FovTangents::symmetric(FOV_Y, 0.9).frustum(near, far)
    }

    fn eye_to_head(&self, eye: Eye) -> Mat4 {
        projection::eye_offset(eye, IPD)
    }

    fn headset_pose(&mut self) -> Result<HeadsetPose, SurfaceError> {
        self.frame += 1;
        self.stats.poses.fetch_add(1, Ordering::Relaxed);
        Ok(turning_pose(self.frame))
    }
}

/// A GPU context with nothing behind it.
#[derive(Debug, Default)]
pub struct HeadlessContext;

impl GpuContext for HeadlessContext {
    fn make_current(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn release_current(&mut self) {}

    fn flush(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

// ── Assembly ─────────────────────────────────────────────────────

/// Build the headless backend the plan asks for.
pub fn backend_for(
    plan: &PresentationPlan,
    config: &HostConfig,
    stats: &Arc<HeadlessStats>,
) -> Backend {
    let stats = Arc::clone(stats);
    match plan.backend {
        BackendKind::Window => {
            let (w, h) = plan.render_size;
            let aspect = (w.max(2) / 2) as f32 / h.max(1) as f32;
            Backend::Window(WindowBackend {
                surface: Box::new(HeadlessWindow { stats }),
                fov: FovTangents::symmetric(FOV_Y, aspect),
                ipd: IPD,
            })
        }
        BackendKind::Compositor => Backend::Compositor(CompositorBackend {
            runtime: Box::new(HeadlessCompositor { stats, frame: 0 }),
            color_space: config.presentation.color_space,
            flags: SubmitFlags::GL_RENDER_BUFFER,
        }),
        BackendKind::Wrapper => Backend::Wrapper(WrapperBackend {
            runtime: Box::new(HeadlessWrapper { stats, frame: 0 }),
        }),
    }
}

/// Render target for `plan`: one shared framebuffer for a window, one
/// per eye for the VR runtimes.
pub fn target_for(plan: &PresentationPlan) -> RenderTarget {
    let (w, h) = plan.render_size;
    match plan.backend {
        BackendKind::Window => RenderTarget::side_by_side(FramebufferId(1), TextureHandle(1), w, h),
        BackendKind::Compositor | BackendKind::Wrapper => RenderTarget::per_eye(
            (FramebufferId(1), TextureHandle(1)),
            (FramebufferId(2), TextureHandle(2)),
            w / 2,
            h,
        ),
    }
}

pub fn build_display(
    plan: &PresentationPlan,
    config: &HostConfig,
    stats: &Arc<HeadlessStats>,
) -> StereoDisplay {
    StereoDisplay::with_instant_deadline(
        backend_for(plan, config, stats),
        target_for(plan),
        Box::new(HeadlessContext),
        config.to_present_config(),
    )
}
