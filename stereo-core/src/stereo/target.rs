//! The stereo render target: framebuffers, color attachments and
//! per-eye viewports.

use serde::{Deserialize, Serialize};

use crate::error::EyeSlot;
use crate::rect::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    pub fn slot(self) -> EyeSlot {
        match self {
            Eye::Left => EyeSlot::Left,
            Eye::Right => EyeSlot::Right,
        }
    }

    fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

/// Graphics API framebuffer name. `0` is never a drawable framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FramebufferId(pub u32);

impl FramebufferId {
    pub const INVALID: FramebufferId = FramebufferId(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Opaque native texture handle handed to compositors and wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

/// Normalised texture sub-rectangle submitted for one eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvBounds {
    pub u_min: f32,
    pub v_min: f32,
    pub u_max: f32,
    pub v_max: f32,
}

impl UvBounds {
    pub const FULL: UvBounds = UvBounds {
        u_min: 0.0,
        v_min: 0.0,
        u_max: 1.0,
        v_max: 1.0,
    };
    pub const LEFT_HALF: UvBounds = UvBounds {
        u_min: 0.0,
        v_min: 0.0,
        u_max: 0.5,
        v_max: 1.0,
    };
    pub const RIGHT_HALF: UvBounds = UvBounds {
        u_min: 0.5,
        v_min: 0.0,
        u_max: 1.0,
        v_max: 1.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeTarget {
    pub framebuffer: FramebufferId,
    pub color: TextureHandle,
    pub viewport: Rect,
}

/// Two eye targets. They may share one framebuffer (side by side), in
/// which case the viewports split it in half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    eyes: [EyeTarget; 2],
    width: u32,
    height: u32,
    shared: bool,
}

impl RenderTarget {
    /// One `width`×`height` framebuffer, left eye in the left half.
    pub fn side_by_side(
        framebuffer: FramebufferId,
        color: TextureHandle,
        width: u32,
        height: u32,
    ) -> Self {
        let (left, right) = Rect::new(0, 0, width as i32, height as i32).split_side_by_side();
        let eye = |viewport| EyeTarget {
            framebuffer,
            color,
            viewport,
        };
        Self {
            eyes: [eye(left), eye(right)],
            width,
            height,
            shared: true,
        }
    }

    /// Separate framebuffers, each `eye_width`×`eye_height`.
    pub fn per_eye(
        left: (FramebufferId, TextureHandle),
        right: (FramebufferId, TextureHandle),
        eye_width: u32,
        eye_height: u32,
    ) -> Self {
        let viewport = Rect::new(0, 0, eye_width as i32, eye_height as i32);
        let eye = |(framebuffer, color)| EyeTarget {
            framebuffer,
            color,
            viewport,
        };
        Self {
            eyes: [eye(left), eye(right)],
            width: eye_width * 2,
            height: eye_height,
            shared: false,
        }
    }

    pub fn eye(&self, eye: Eye) -> &EyeTarget {
        &self.eyes[eye.index()]
    }

    pub fn framebuffer(&self, eye: Eye) -> FramebufferId {
        self.eye(eye).framebuffer
    }

    pub fn viewport(&self, eye: Eye) -> Rect {
        self.eye(eye).viewport
    }

    pub fn color(&self, eye: Eye) -> TextureHandle {
        self.eye(eye).color
    }

    /// Region of the eye's color texture holding that eye's image.
    pub fn uv_bounds(&self, eye: Eye) -> UvBounds {
        match (self.shared, eye) {
            (false, _) => UvBounds::FULL,
            (true, Eye::Left) => UvBounds::LEFT_HALF,
            (true, Eye::Right) => UvBounds::RIGHT_HALF,
        }
    }

    pub fn is_side_by_side(&self) -> bool {
        self.shared
    }

    /// Combined size of both eyes.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
