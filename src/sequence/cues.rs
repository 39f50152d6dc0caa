//! Class-pulse effects.
//!
//! Glitch, shake, slash and burst are fire-and-forget: a class goes on
//! immediately and a spawned timer takes it off again. The timer races a
//! cancellation token; on cancel the class is removed at once, so teardown
//! never leaves an effect class stuck on an element.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::stage::Element;

/// Title class for RGB-split glitch pulses.
pub const GLITCH_CLASS: &str = "glitch";
/// Page-root class for the screen shake.
pub const SHAKE_CLASS: &str = "shake";
/// Slash-line class for the forward slash.
pub const SLASH_CLASS: &str = "slash-active";
/// Slash-line class for the reversed, differently angled slash.
pub const SLASH_REVERSE_CLASS: &str = "slash-reverse";
/// Burst-overlay class.
pub const BURST_CLASS: &str = "burst-active";
/// Looping title pulse set during settle and never removed.
pub const PULSE_CLASS: &str = "pulse";
/// Marker added to text elements once their reveal has finished.
pub const REVEALED_CLASS: &str = "revealed";

/// How long a slash class stays on.
pub const SLASH_HOLD: Duration = Duration::from_millis(600);
/// How long the burst class stays on.
pub const BURST_HOLD: Duration = Duration::from_millis(800);

/// Adds `class` to `element` now and removes it after `hold`.
///
/// Overlapping pulses of the same class end when the first timer fires.
pub fn pulse_class(
    element: Arc<dyn Element>,
    class: &'static str,
    hold: Duration,
    cancel: CancellationToken,
) {
    element.add_class(class);
    tokio::spawn(async move {
        tokio::select! {
            () = cancel.cancelled() => {}
            () = tokio::time::sleep(hold) => {}
        }
        element.remove_class(class);
    });
}

/// Runs `effect` after `delay` unless cancelled first.
pub fn deferred(
    delay: Duration,
    cancel: CancellationToken,
    effect: impl FnOnce() + Send + 'static,
) {
    tokio::spawn(async move {
        tokio::select! {
            () = cancel.cancelled() => {}
            () = tokio::time::sleep(delay) => effect(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{Role, StyleNode};

    fn node() -> Arc<dyn Element> {
        Arc::new(StyleNode::new(Some(Role::Title)))
    }

    #[tokio::test(start_paused = true)]
    async fn class_is_removed_after_hold() {
        let el = node();
        pulse_class(
            Arc::clone(&el),
            GLITCH_CLASS,
            Duration::from_millis(150),
            CancellationToken::new(),
        );
        assert!(el.has_class(GLITCH_CLASS));

        tokio::time::sleep(Duration::from_millis(149)).await;
        assert!(el.has_class(GLITCH_CLASS));
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!el.has_class(GLITCH_CLASS));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_removes_class_immediately() {
        let el = node();
        let cancel = CancellationToken::new();
        pulse_class(Arc::clone(&el), BURST_CLASS, BURST_HOLD, cancel.clone());
        cancel.cancel();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!el.has_class(BURST_CLASS));
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_effect_runs_once_delay_elapses() {
        let el = node();
        let target = Arc::clone(&el);
        deferred(Duration::from_secs(2), CancellationToken::new(), move || {
            target.add_class(GLITCH_CLASS);
        });
        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert!(!el.has_class(GLITCH_CLASS));
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(el.has_class(GLITCH_CLASS));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_deferred_effect_never_runs() {
        let el = node();
        let target = Arc::clone(&el);
        let cancel = CancellationToken::new();
        deferred(Duration::from_secs(2), cancel.clone(), move || {
            target.add_class(GLITCH_CLASS);
        });
        cancel.cancel();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!el.has_class(GLITCH_CLASS));
    }
}
