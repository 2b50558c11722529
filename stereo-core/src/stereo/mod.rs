//! Stereo render-target handoff.
//!
//! | Type                | Role                                                |
//! |---------------------|-----------------------------------------------------|
//! | `StereoDisplay`     | owns the render target, hands out drawables         |
//! | `StereoDrawable`    | one frame's claim: framebuffers, viewports, submit  |
//! | `Backend`           | window / compositor / wrapper presentation          |
//! | `PresentationPlan`  | picks the backend from the resolved topology        |
//! | `RenderTarget`      | per-eye framebuffers, textures and viewports        |
//!
//! ```text
//!  render thread                     StereoDisplay
//!  ─────────────                     ─────────────
//!  wait_next_drawable() ───────────► gate acquired, drawable (live)
//!  draw eyes into framebuffer(eye)
//!  submit() ───────────────────────► arm deadline → present → flush
//!                                    → reset deadline → gate released
//!                                    drawable retired
//! ```

pub mod backend;
pub mod display;
pub mod drawable;
pub mod plan;
pub mod projection;
pub mod surface;
pub mod target;

pub use backend::{Backend, BackendKind, CompositorBackend, WindowBackend, WrapperBackend};
pub use display::{PresentConfig, StereoDisplay};
pub use drawable::StereoDrawable;
pub use plan::PresentationPlan;
pub use projection::{FovTangents, Mat4};
pub use surface::{
    ColorSpace, EyeSubmission, HeadsetPose, SubmitFlags, VrCompositor, WindowSurface,
    WrapperRuntime,
};
pub use target::{Eye, EyeTarget, FramebufferId, RenderTarget, TextureHandle, UvBounds};
