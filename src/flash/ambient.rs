//! Ambient flash loop.
//!
//! After the entrance has played, the lightning overlay keeps flashing at
//! long random intervals. The loop runs on its own task and is stopped
//! through [`AmbientLoop::stop`], which is synchronous and idempotent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::observability::metrics;
use crate::stage::{Element, ElementStyle};

use super::{FlashEngine, Intensity};

/// Timing of the ambient loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientTiming {
    /// Shortest wait between effects.
    pub min_interval: Duration,
    /// Longest wait between effects.
    pub max_interval: Duration,
    /// Probability that an effect is a flicker rather than a subtle flash.
    pub flicker_chance: f64,
}

impl Default for AmbientTiming {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(8),
            max_interval: Duration::from_secs(12),
            flicker_chance: 0.3,
        }
    }
}

/// The overlay as the loop task sees it. Once closed, writes are dropped,
/// so an effect caught between awaits cannot relight a reset overlay.
#[derive(Debug)]
struct GatedOverlay {
    inner: Arc<dyn Element>,
    open: Mutex<bool>,
}

impl GatedOverlay {
    fn close(&self) {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

impl Element for GatedOverlay {
    fn style(&self) -> ElementStyle {
        self.inner.style()
    }

    fn update(&self, mutate: &mut dyn FnMut(&mut ElementStyle)) {
        let open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        if *open {
            self.inner.update(mutate);
        }
    }
}

/// Handle to a running ambient loop.
pub struct AmbientLoop {
    overlay: Arc<dyn Element>,
    gate: Arc<GatedOverlay>,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AmbientLoop {
    /// Spawns the loop on the current tokio runtime.
    #[must_use]
    pub fn start(engine: FlashEngine, overlay: Arc<dyn Element>, timing: AmbientTiming) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();
        let gate = Arc::new(GatedOverlay {
            inner: Arc::clone(&overlay),
            open: Mutex::new(true),
        });

        let task = tokio::spawn(run_loop(
            engine,
            Arc::clone(&gate) as Arc<dyn Element>,
            timing,
            Arc::clone(&running),
            cancel.clone(),
        ));

        Self {
            overlay,
            gate,
            running,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Whether the loop is still scheduling effects.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Halts scheduling, cancels the pending timer and resets the overlay.
    ///
    /// The reset happens on every call, so the overlay ends dark and
    /// untinted even if an effect was mid-strike.
    pub fn stop(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        // waits out a write already in progress on another worker
        self.gate.close();
        self.cancel.cancel();
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        reset(self.overlay.as_ref());
        if was_running {
            debug!("ambient loop stopped");
        }
    }
}

impl Drop for AmbientLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for AmbientLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmbientLoop")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Puts an overlay back into its neutral state.
pub fn reset(overlay: &dyn Element) {
    overlay.set_opacity(0.0);
    overlay.set_tint(None);
}

async fn run_loop(
    engine: FlashEngine,
    overlay: Arc<dyn Element>,
    timing: AmbientTiming,
    running: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    loop {
        let wait = engine
            .chance()
            .between(timing.min_interval, timing.max_interval);

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(wait) => {}
        }

        if !running.load(Ordering::SeqCst) {
            break;
        }

        let flicker = engine.chance().hit(timing.flicker_chance);
        let kind = if flicker { "flicker" } else { "flash" };
        trace!(kind, wait_ms = wait.as_millis(), "ambient pulse");
        metrics::record_ambient_pulse(kind);

        let effect = async {
            if flicker {
                engine.flicker(overlay.as_ref()).await;
            } else {
                engine.flash(overlay.as_ref(), Intensity::Subtle).await;
            }
        };

        tokio::select! {
            () = cancel.cancelled() => break,
            () = effect => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chance::ScriptedChance;
    use crate::flash::LIGHTNING_TINT;
    use crate::motion::MotionSetting;
    use crate::stage::{Role, StyleNode};

    fn engine(samples: Vec<f64>) -> FlashEngine {
        FlashEngine::new(
            Arc::new(MotionSetting::new(false)),
            Arc::new(ScriptedChance::new(samples, 0.99)),
        )
    }

    fn overlay() -> Arc<dyn Element> {
        let node = StyleNode::new(Some(Role::Lightning));
        node.set_opacity(0.0);
        Arc::new(node)
    }

    #[tokio::test(start_paused = true)]
    async fn first_effect_waits_for_the_drawn_interval() {
        let overlay = overlay();
        // wait sample 0.0 -> 8s; effect sample 0.99 -> subtle flash
        let ambient = AmbientLoop::start(
            engine(vec![0.0, 0.99]),
            Arc::clone(&overlay),
            AmbientTiming::default(),
        );

        tokio::time::sleep(Duration::from_millis(7_999)).await;
        assert!(overlay.style().opacity.abs() < f32::EPSILON);

        tokio::time::sleep(Duration::from_millis(2)).await;
        let peak = Intensity::Subtle.preset().peak_opacity;
        assert!((overlay.style().opacity - peak).abs() < f32::EPSILON);

        ambient.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_mid_flash_resets_overlay() {
        let overlay = overlay();
        let ambient = AmbientLoop::start(
            engine(vec![0.0, 0.99]),
            Arc::clone(&overlay),
            AmbientTiming::default(),
        );

        tokio::time::sleep(Duration::from_millis(8_010)).await;
        assert!(overlay.style().opacity > 0.0);
        overlay.set_tint(Some(LIGHTNING_TINT));

        ambient.stop();
        assert!(!ambient.is_running());
        let style = overlay.style();
        assert!(style.opacity.abs() < f32::EPSILON);
        assert!(style.tint.is_none());

        // Nothing fires afterwards.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(overlay.style().opacity.abs() < f32::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_twice_is_harmless() {
        let overlay = overlay();
        let ambient =
            AmbientLoop::start(engine(vec![]), Arc::clone(&overlay), AmbientTiming::default());
        ambient.stop();
        ambient.stop();
        assert!(!ambient.is_running());
        assert!(overlay.style().opacity.abs() < f32::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_reschedules_after_each_effect() {
        let overlay = overlay();
        // 8s wait, flash (150ms), 8s wait, flicker
        let ambient = AmbientLoop::start(
            engine(vec![0.0, 0.99, 0.0, 0.1, 0.9]),
            Arc::clone(&overlay),
            AmbientTiming::default(),
        );

        // first flash ends at 8.15s; second effect starts at 16.15s
        tokio::time::sleep(Duration::from_millis(16_155)).await;
        assert!((overlay.style().opacity - 0.5).abs() < f32::EPSILON);
        assert!(ambient.is_running());

        ambient.stop();
    }

    /// Signals when a lit write begins, then stalls before applying it.
    #[derive(Debug)]
    struct SlowOverlay {
        node: StyleNode,
        lit: std::sync::mpsc::SyncSender<()>,
    }

    impl Element for SlowOverlay {
        fn style(&self) -> ElementStyle {
            self.node.style()
        }

        fn update(&self, mutate: &mut dyn FnMut(&mut ElementStyle)) {
            let mut next = self.node.style();
            mutate(&mut next);
            if next.opacity > 0.0 {
                let _ = self.lit.try_send(());
                std::thread::sleep(Duration::from_millis(50));
            }
            self.node.update(mutate);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_during_a_write_on_another_worker_leaves_overlay_dark() {
        let (lit, entered) = std::sync::mpsc::sync_channel(1);
        let overlay: Arc<dyn Element> = Arc::new(SlowOverlay {
            node: StyleNode::new(Some(Role::Lightning)),
            lit,
        });
        overlay.set_opacity(0.0);
        let timing = AmbientTiming {
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_millis(10),
            flicker_chance: 0.0,
        };
        let ambient = AmbientLoop::start(engine(vec![]), Arc::clone(&overlay), timing);

        tokio::task::spawn_blocking(move || entered.recv())
            .await
            .unwrap()
            .unwrap();
        ambient.stop();

        assert!(overlay.style().opacity.abs() < f32::EPSILON);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(overlay.style().opacity.abs() < f32::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_after_stop_never_reach_the_overlay() {
        let overlay = overlay();
        let ambient =
            AmbientLoop::start(engine(vec![]), Arc::clone(&overlay), AmbientTiming::default());
        ambient.stop();

        ambient.gate.set_opacity(0.9);
        ambient.gate.set_tint(Some(LIGHTNING_TINT));
        let style = overlay.style();
        assert!(style.opacity.abs() < f32::EPSILON);
        assert!(style.tint.is_none());
    }
}
