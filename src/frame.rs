use std::time::Instant;

const FPS_UPDATE_INTERVAL: f32 = 1.0;

/// Frame metadata - carries frame number and timing info
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub number: u64,
    pub time: f32,
    pub delta: f32,
}

impl FrameInfo {
    pub fn new(number: u64, time: f32, delta: f32) -> Self {
        Self { number, time, delta }
    }
}

/// Frame clock for the render loop
#[derive(Debug)]
pub struct Clock {
    frame_number: u64,
    start: Instant,
    last_tick: Instant,
}

impl Clock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            frame_number: 0,
            start: now,
            last_tick: now,
        }
    }

    /// Advance one frame
    pub fn tick(&mut self) -> FrameInfo {
        let now = Instant::now();
        let info = FrameInfo::new(
            self.frame_number,
            now.duration_since(self.start).as_secs_f32(),
            now.duration_since(self.last_tick).as_secs_f32(),
        );
        self.frame_number += 1;
        self.last_tick = now;
        info
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Averages frame rate over one-second windows
#[derive(Debug, Default)]
pub struct FpsCounter {
    frames: u32,
    elapsed: f32,
}

impl FpsCounter {
    /// Count a frame; returns the new average when a window closes
    pub fn record(&mut self, delta: f32) -> Option<f32> {
        self.frames += 1;
        self.elapsed += delta;

        if self.elapsed < FPS_UPDATE_INTERVAL {
            return None;
        }
        let fps = self.frames as f32 / self.elapsed;
        self.frames = 0;
        self.elapsed = 0.0;
        Some(fps)
    }
}
