use std::time::Duration;

/// Auto-scroll timing and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPolicy {
    pub distance_px: u32,
    pub interval: Duration,
    pub max_steps: u32,
    /// Pause after the loop so trailing lazy loads can finish.
    pub settle: Duration,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            distance_px: 100,
            interval: Duration::from_millis(100),
            max_steps: 200,
            settle: Duration::from_secs(2),
        }
    }
}

/// Page geometry sampled just before a scroll step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollMetrics {
    pub scroll_height: u64,
    pub viewport_height: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDecision {
    Continue,
    ReachedBottom,
    StepLimit,
}

/// Tracks cumulative scroll distance against the page's scrollable height.
///
/// The height is re-read every step, so content appended by lazy loading
/// extends the run until the step cap.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    policy: ScrollPolicy,
    total_px: u64,
    steps: u32,
}

impl ScrollTracker {
    pub fn new(policy: ScrollPolicy) -> Self {
        Self {
            policy,
            total_px: 0,
            steps: 0,
        }
    }

    /// Record one step of `distance_px` taken with the given pre-scroll metrics.
    pub fn record_step(&mut self, metrics: ScrollMetrics) -> ScrollDecision {
        self.total_px += u64::from(self.policy.distance_px);
        self.steps += 1;

        let scrollable = metrics
            .scroll_height
            .saturating_sub(metrics.viewport_height);
        if self.total_px >= scrollable {
            ScrollDecision::ReachedBottom
        } else if self.steps >= self.policy.max_steps {
            ScrollDecision::StepLimit
        } else {
            ScrollDecision::Continue
        }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn total_px(&self) -> u64 {
        self.total_px
    }
}
