//! The render loop: acquire, draw, submit, pace.
//!
//! Runs on a dedicated blocking thread. Each frame waits for the headset
//! pose, claims the render target, hands it to the frame painter and
//! submits it. Presentation failures are logged and the loop moves on to
//! the next frame; only contract errors end it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use stereo_core::{Eye, HeadsetPose, StereoDisplay, StereoDrawable, StereoError};

/// Draws one frame into a live drawable.
pub trait FramePainter: Send {
    fn paint(&mut self, frame: u64, pose: &HeadsetPose, drawable: &StereoDrawable);
}

/// Painter that only checks the drawable is usable.
#[derive(Debug, Default)]
pub struct ClearPainter;

impl FramePainter for ClearPainter {
    fn paint(&mut self, frame: u64, pose: &HeadsetPose, drawable: &StereoDrawable) {
        for eye in Eye::BOTH {
            debug!(
                frame,
                ?eye,
                framebuffer = drawable.framebuffer(eye).0,
                viewport = ?drawable.viewport(eye),
                tracked = pose.valid,
                "clear"
            );
        }
    }
}

/// Totals for one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames: u64,
    pub failed_submits: u64,
    pub deadline_misses: u64,
    pub pose_failures: u64,
}

pub struct RenderLoop<P: FramePainter> {
    display: StereoDisplay,
    painter: P,
    running: Arc<AtomicBool>,
    /// 0 = until stopped.
    frame_limit: u64,
    frame_interval: Duration,
}

impl<P: FramePainter> RenderLoop<P> {
    pub fn new(
        display: StereoDisplay,
        painter: P,
        frame_limit: u64,
        frame_interval: Duration,
    ) -> Self {
        Self {
            display,
            painter,
            running: Arc::new(AtomicBool::new(true)),
            frame_limit,
            frame_interval,
        }
    }

    /// Handle that stops the loop when set to `false`, including before
    /// [`run`](Self::run) is called.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run until stopped or the frame limit is reached.
    pub fn run(mut self) -> Result<RenderStats, StereoError> {
        let mut stats = RenderStats::default();
        let poll = self.display.config().acquire_poll;
        info!(
            backend = %self.display.backend_kind(),
            limit = self.frame_limit,
            "render loop started"
        );

        while self.running.load(Ordering::SeqCst)
            && (self.frame_limit == 0 || stats.frames < self.frame_limit)
        {
            let started = Instant::now();

            let pose = match self.display.wait_get_poses() {
                Ok(pose) => pose,
                Err(e) => {
                    warn!("{e}");
                    stats.pose_failures += 1;
                    HeadsetPose::UNTRACKED
                }
            };

            // Bounded wait so a stop request is noticed promptly.
            let Some(drawable) = self.display.wait_next_drawable_for(poll)? else {
                debug!("render target busy; retrying");
                continue;
            };
            self.painter.paint(stats.frames, &pose, &drawable);

            match drawable.submit() {
                Ok(()) => {}
                Err(StereoError::Submit(failure)) => {
                    warn!("frame {}: {failure}", stats.frames);
                    stats.failed_submits += 1;
                    if failure.deadline_missed {
                        stats.deadline_misses += 1;
                    }
                }
                Err(e) => return Err(e),
            }
            stats.frames += 1;

            if let Some(rest) = self.frame_interval.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(
            frames = stats.frames,
            failed = stats.failed_submits,
            deadline_misses = stats.deadline_misses,
            "render loop stopped"
        );
        Ok(stats)
    }
}
