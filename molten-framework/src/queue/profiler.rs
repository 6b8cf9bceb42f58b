/// Counters accumulated by a `GraphicsQueue` while it records. Reset them once per frame (or
/// whenever a fresh measurement is wanted) with `reset`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsQueueProfiler {
    pub draw_calls: u64,
    pub dispatch_calls: u64,
    pub primitives: u64,
    /// Bind commands recorded while reconciling state. Redundant binds never reach this number.
    pub bind_commands: u64,
    pub skipped_draws: u64,
    pub state_pushes: u64,
    pub command_lists_submitted: u64,
}

impl GraphicsQueueProfiler {
    pub fn reset(&mut self) {
        *self = Default::default();
    }

    /// Adds `other`'s counters into this one
    pub fn accumulate(
        &mut self,
        other: &GraphicsQueueProfiler,
    ) {
        self.draw_calls += other.draw_calls;
        self.dispatch_calls += other.dispatch_calls;
        self.primitives += other.primitives;
        self.bind_commands += other.bind_commands;
        self.skipped_draws += other.skipped_draws;
        self.state_pushes += other.state_pushes;
        self.command_lists_submitted += other.command_lists_submitted;
    }
}
