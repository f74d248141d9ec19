//! Per-frame driver that re-arms itself until stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::controls::PointerState;
use crate::frame::{Clock, FpsCounter, FrameInfo};
use crate::host::{LoadOutcome, SceneHost};
use crate::renderer::RenderSurface;

/// Asks the platform for another frame callback
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

/// Cancels a render loop from anywhere
#[derive(Debug, Clone, Default)]
pub struct LoopHandle {
    stopped: Arc<AtomicBool>,
}

impl LoopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickStatus {
    Stopped,
    Rendered(FrameInfo),
}

pub struct RenderLoop<F: FrameScheduler> {
    scheduler: F,
    handle: LoopHandle,
    clock: Clock,
    fps: FpsCounter,
}

impl<F: FrameScheduler> RenderLoop<F> {
    pub fn new(scheduler: F) -> Self {
        Self {
            scheduler,
            handle: LoopHandle::default(),
            clock: Clock::new(),
            fps: FpsCounter::default(),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }

    /// One frame: re-arm, apply a finished load, draw, then advance controls
    pub fn tick<S: RenderSurface>(&mut self, host: &mut SceneHost<S>, pointer: &PointerState) -> anyhow::Result<TickStatus> {
        if self.handle.is_stopped() {
            return Ok(TickStatus::Stopped);
        }
        self.scheduler.request_frame();
        let frame = self.clock.tick();

        if let Some(LoadOutcome::Replaced { .. }) = host.poll_load() {
            if let Some(active) = host.active_model() {
                log::info!("Now showing {}", active.metadata.display_name());
            }
        }

        host.render()?;
        host.update_controls(pointer);

        if let Some(fps) = self.fps.record(frame.delta) {
            log::debug!("FPS: {:.1}", fps);
        }
        Ok(TickStatus::Rendered(frame))
    }
}
