//! Presentation surfaces: the external collaborators a backend drives.
//!
//! | Trait            | Backend      | Presents by                          |
//! |------------------|--------------|--------------------------------------|
//! | `WindowSurface`  | `Window`     | blit into a desktop window + swap    |
//! | `VrCompositor`   | `Compositor` | per-eye texture submit to VR runtime |
//! | `WrapperRuntime` | `Wrapper`    | forwarding both color attachments    |
//!
//! Every call that can fail returns a [`SurfaceError`] carrying the
//! backend's own error code and a readable description of it.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::projection::{FovTangents, Mat4};
use super::target::{Eye, RenderTarget, TextureHandle, UvBounds};
use crate::error::SurfaceError;

/// A visible desktop window the render target is copied into.
pub trait WindowSurface: Send {
    fn blit(&mut self, target: &RenderTarget) -> Result<(), SurfaceError>;

    fn swap_buffers(&mut self) -> Result<(), SurfaceError>;
}

/// How the compositor should interpret submitted texel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Auto,
    Gamma,
    Linear,
}

bitflags! {
    /// Per-submit hints for the VR compositor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SubmitFlags: u32 {
        const LENS_DISTORTION_APPLIED = 0x01;
        const GL_RENDER_BUFFER        = 0x02;
        const TEXTURE_WITH_POSE       = 0x08;
    }
}

/// One eye's texture as handed to the compositor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeSubmission {
    pub eye: Eye,
    pub texture: TextureHandle,
    pub bounds: UvBounds,
    pub color_space: ColorSpace,
    pub flags: SubmitFlags,
}

/// Headset position (metres) and orientation (unit quaternion `xyzw`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadsetPose {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
    /// `false` when tracking is lost or there is no headset at all.
    pub valid: bool,
}

impl HeadsetPose {
    pub const UNTRACKED: HeadsetPose = HeadsetPose {
        position: [0.0; 3],
        orientation: [0.0, 0.0, 0.0, 1.0],
        valid: false,
    };
}

impl Default for HeadsetPose {
    fn default() -> Self {
        Self::UNTRACKED
    }
}

/// The VR runtime's compositor.
pub trait VrCompositor: Send {
    fn submit(&mut self, submission: &EyeSubmission) -> Result<(), SurfaceError>;

    /// Block until the runtime hands out the pose for the next frame.
    fn wait_get_poses(&mut self) -> Result<HeadsetPose, SurfaceError>;

    fn projection_raw(&self, eye: Eye) -> FovTangents;

    fn eye_to_head(&self, eye: Eye) -> Mat4;
}

/// A third-party VR wrapper that owns projection and tracking itself.
pub trait WrapperRuntime: Send {
    fn submit_frame(
        &mut self,
        left: TextureHandle,
        right: TextureHandle,
    ) -> Result<(), SurfaceError>;

    fn projection(&self, eye: Eye, near: f32, far: f32) -> Mat4;

    fn eye_to_head(&self, eye: Eye) -> Mat4;

    fn headset_pose(&mut self) -> Result<HeadsetPose, SurfaceError>;
}
