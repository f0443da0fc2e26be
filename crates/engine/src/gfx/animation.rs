use std::fmt;
use std::rc::Rc;

use crate::clock::Clock;

/// Delay value that keeps an animation parked on its current frame.
pub const FROZEN_DELAY: i64 = -1;

/// Steps a cursor through a fixed frame sequence, one frame per elapsed
/// `delay` milliseconds of clock time. A single `update` advances at most one
/// frame; missed frames are not caught up.
pub struct Animation<S> {
    frames: Vec<S>,
    current_frame: usize,
    start_time: i64,
    delay: i64,
    num_times_played: u32,
    clock: Rc<dyn Clock>,
}

impl<S> Animation<S> {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        let start_time = clock.now_millis();
        Self {
            frames: Vec::new(),
            current_frame: 0,
            start_time,
            delay: FROZEN_DELAY,
            num_times_played: 0,
            clock,
        }
    }

    pub fn update(&mut self) {
        if self.delay < 0 {
            return;
        }

        let elapsed = self.clock.now_millis() - self.start_time;
        if elapsed > self.delay {
            self.current_frame += 1;
            self.start_time = self.clock.now_millis();
        }
        if self.current_frame >= self.frames.len() {
            self.current_frame = 0;
            self.num_times_played = self.num_times_played.saturating_add(1);
        }
    }

    pub fn restart(&mut self) {
        self.current_frame = 0;
        self.start_time = self.clock.now_millis();
        self.num_times_played = 0;
    }

    /// Replaces the frame sequence and restarts.
    pub fn set_frames(&mut self, frames: impl Into<Vec<S>>) {
        self.frames = frames.into();
        self.restart();
    }

    /// Negative delays freeze the animation without resetting it.
    pub fn set_delay(&mut self, delay_millis: i64) {
        self.delay = delay_millis;
    }

    /// Moves the cursor without a range check; [`Animation::sprite`] returns
    /// `None` while the cursor points past the last frame.
    pub fn set_frame(&mut self, frame: usize) {
        self.current_frame = frame;
    }

    pub fn frame(&self) -> usize {
        self.current_frame
    }

    pub fn sprite(&self) -> Option<&S> {
        self.frames.get(self.current_frame)
    }

    pub fn frames(&self) -> &[S] {
        &self.frames
    }

    pub fn delay(&self) -> i64 {
        self.delay
    }

    pub fn num_times_played(&self) -> u32 {
        self.num_times_played
    }

    pub fn has_played_once(&self) -> bool {
        self.num_times_played > 0
    }
}

impl<S: fmt::Debug> fmt::Debug for Animation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("frames", &self.frames)
            .field("current_frame", &self.current_frame)
            .field("start_time", &self.start_time)
            .field("delay", &self.delay)
            .field("num_times_played", &self.num_times_played)
            .finish()
    }
}
