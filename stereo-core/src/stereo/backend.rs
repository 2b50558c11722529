//! The closed set of presentation backends.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::projection::{self, FovTangents, Mat4};
use super::surface::{
    ColorSpace, EyeSubmission, HeadsetPose, SubmitFlags, VrCompositor, WindowSurface,
    WrapperRuntime,
};
use super::target::{Eye, RenderTarget};
use crate::error::{EyeFailure, EyeSlot, SurfaceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Window,
    Compositor,
    Wrapper,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Window => "window",
            BackendKind::Compositor => "compositor",
            BackendKind::Wrapper => "wrapper",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side-by-side image in a desktop window; projection computed locally.
pub struct WindowBackend {
    pub surface: Box<dyn WindowSurface>,
    pub fov: FovTangents,
    /// Interpupillary distance in metres.
    pub ipd: f32,
}

/// Direct per-eye submission to the VR compositor.
pub struct CompositorBackend {
    pub runtime: Box<dyn VrCompositor>,
    pub color_space: ColorSpace,
    pub flags: SubmitFlags,
}

pub struct WrapperBackend {
    pub runtime: Box<dyn WrapperRuntime>,
}

/// Chosen once at startup, never switched while running.
pub enum Backend {
    Window(WindowBackend),
    Compositor(CompositorBackend),
    Wrapper(WrapperBackend),
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Backend").field(&self.kind()).finish()
    }
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Window(_) => BackendKind::Window,
            Backend::Compositor(_) => BackendKind::Compositor,
            Backend::Wrapper(_) => BackendKind::Wrapper,
        }
    }

    /// Issue the presentation call(s) for one frame and collect every
    /// failure. A failing eye does not stop the other eye's call.
    pub(crate) fn present(&mut self, target: &RenderTarget) -> Vec<EyeFailure> {
        let both = |error: SurfaceError| {
            vec![EyeFailure {
                slot: EyeSlot::Both,
                error,
            }]
        };

        match self {
            Backend::Window(window) => {
                let shown = window
                    .surface
                    .blit(target)
                    .and_then(|()| window.surface.swap_buffers());
                shown.err().map(both).unwrap_or_default()
            }
            Backend::Compositor(compositor) => Eye::BOTH
                .into_iter()
                .filter_map(|eye| {
                    let submission = EyeSubmission {
                        eye,
                        texture: target.color(eye),
                        bounds: target.uv_bounds(eye),
                        color_space: compositor.color_space,
                        flags: compositor.flags,
                    };
                    debug!(?eye, texture = submission.texture.0, "compositor submit");
                    compositor
                        .runtime
                        .submit(&submission)
                        .err()
                        .map(|error| EyeFailure {
                            slot: eye.slot(),
                            error,
                        })
                })
                .collect(),
            Backend::Wrapper(wrapper) => wrapper
                .runtime
                .submit_frame(target.color(Eye::Left), target.color(Eye::Right))
                .err()
                .map(both)
                .unwrap_or_default(),
        }
    }

    pub(crate) fn wait_get_poses(&mut self) -> Result<HeadsetPose, SurfaceError> {
        match self {
            Backend::Window(_) => Ok(HeadsetPose::UNTRACKED),
            Backend::Compositor(compositor) => compositor.runtime.wait_get_poses(),
            Backend::Wrapper(wrapper) => wrapper.runtime.headset_pose(),
        }
    }

    pub(crate) fn projection(&self, eye: Eye, near: f32, far: f32) -> Mat4 {
        match self {
            Backend::Window(window) => window.fov.frustum(near, far),
            Backend::Compositor(compositor) => {
                compositor.runtime.projection_raw(eye).frustum(near, far)
            }
            Backend::Wrapper(wrapper) => wrapper.runtime.projection(eye, near, far),
        }
    }

    pub(crate) fn eye_to_head(&self, eye: Eye) -> Mat4 {
        match self {
            Backend::Window(window) => projection::eye_offset(eye, window.ipd),
            Backend::Compositor(compositor) => compositor.runtime.eye_to_head(eye),
            Backend::Wrapper(wrapper) => wrapper.runtime.eye_to_head(eye),
        }
    }
}
