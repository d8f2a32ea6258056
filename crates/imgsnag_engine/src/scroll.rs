use imgsnag_core::{ScrollDecision, ScrollPolicy, ScrollTracker};
use snag_logging::{snag_debug, snag_info, snag_warn};

use crate::browser::PageSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    pub steps: u32,
    pub total_px: u64,
    /// `None` when scrolling was skipped or a step failed.
    pub decision: Option<ScrollDecision>,
}

/// Scroll the page to the bottom in fixed steps so lazy-loaded images get
/// requested, then wait the settle delay.
///
/// A failing step ends the loop early; it never fails the run.
pub async fn auto_scroll(session: &mut dyn PageSession, policy: ScrollPolicy) -> ScrollOutcome {
    let mut tracker = ScrollTracker::new(policy);
    let mut decision = None;

    if !session.needs_scrolling() || policy.max_steps == 0 {
        return ScrollOutcome {
            steps: 0,
            total_px: 0,
            decision,
        };
    }

    snag_info!("Scrolling page...");
    loop {
        tokio::time::sleep(policy.interval).await;
        let metrics = match session.scroll_step(policy.distance_px).await {
            Ok(metrics) => metrics,
            Err(err) => {
                snag_warn!("Scroll step failed after {} steps: {}", tracker.steps(), err);
                break;
            }
        };
        match tracker.record_step(metrics) {
            ScrollDecision::Continue => continue,
            done => {
                decision = Some(done);
                break;
            }
        }
    }
    snag_debug!(
        "Scrolled {} px in {} steps ({:?})",
        tracker.total_px(),
        tracker.steps(),
        decision
    );

    tokio::time::sleep(policy.settle).await;

    ScrollOutcome {
        steps: tracker.steps(),
        total_px: tracker.total_px(),
        decision,
    }
}
