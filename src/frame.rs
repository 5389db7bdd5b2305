/// Per-frame values handed to every `update` hook.
///
/// The frame driver builds one of these per iteration, so entity logic never
/// reads a process-wide clock.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameContext {
    /// Seconds elapsed since the previous iteration. Not clamped.
    pub delta_time: f32,
    /// Seconds elapsed since the driver started.
    pub elapsed: f64,
    /// Zero-based iteration counter.
    pub frame: u64,
}

impl FrameContext {
    pub const fn new(delta_time: f32, elapsed: f64, frame: u64) -> Self {
        Self {
            delta_time,
            elapsed,
            frame,
        }
    }

    /// Context for driving a single entity with a fixed step.
    pub fn with_delta(delta_time: f32) -> Self {
        Self::new(delta_time, delta_time as f64, 0)
    }
}
