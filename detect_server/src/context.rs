//! Shared state of the detection pipeline.
use std::sync::Mutex;
use std::time::Instant;

use log::warn;
use tokio::sync::broadcast;

use crate::controls::{diff_controls, ControlDiff, ControlPanel};
use crate::filter::FilteredDetection;
use crate::labels::LabelMap;
use crate::presence::PresenceTracker;

/// Snapshot of control names pushed to subscribers after a change.
pub type ControlsUpdate = Vec<String>;

/// Everything the pipeline mutates, bundled behind one handle.
///
/// The inference task feeds observations in, the reconciler turns them
/// into control changes, and the HTTP endpoints read the result. No part
/// of the pipeline touches global state.
pub struct DetectContext {
    pub labels: LabelMap,
    presence: Mutex<PresenceTracker>,
    panel: Mutex<ControlPanel>,
    updates_tx: broadcast::Sender<ControlsUpdate>,
}

impl DetectContext {
    pub fn new(labels: LabelMap, panel: ControlPanel) -> Self {
        let (updates_tx, _) = broadcast::channel(8);
        Self {
            labels,
            presence: Mutex::new(PresenceTracker::new()),
            panel: Mutex::new(panel),
            updates_tx,
        }
    }

    /// Feed one frame's filtered detections into the presence tracker.
    pub fn observe_detections(&self, detections: &[FilteredDetection], now: Instant) {
        let mut presence = self.presence.lock().unwrap();
        presence.observe(detections.iter().map(|det| det.class_name.as_str()), now);
    }

    /// Run one reconciliation pass.
    ///
    /// Expires stale presence records, diffs confirmed classes against the
    /// control set and applies the changes. Subscribers get a fresh name
    /// snapshot whenever something changed. Returns `None` only when the
    /// shared state is unavailable; the pass is skipped instead of failing.
    pub fn reconcile(&self, now: Instant) -> Option<ControlDiff> {
        let Ok(mut presence) = self.presence.lock() else {
            warn!("Presence tracker unavailable, skipping reconcile pass");
            return None;
        };
        let Ok(mut panel) = self.panel.lock() else {
            warn!("Control panel unavailable, skipping reconcile pass");
            return None;
        };

        presence.expire(now);
        let diff = diff_controls(&presence.confirmed_names(), &panel.names());
        if !diff.is_empty() {
            panel.apply(&diff);
            self.updates_tx.send(panel.names()).ok();
        }
        Some(diff)
    }

    pub fn control_names(&self) -> Vec<String> {
        self.panel.lock().unwrap().names()
    }

    pub fn activate_control(&self, name: &str) -> bool {
        self.panel.lock().unwrap().activate(name)
    }

    pub fn subscribe_controls(&self) -> broadcast::Receiver<ControlsUpdate> {
        self.updates_tx.subscribe()
    }

    pub fn presence_count(&self, name: &str) -> Option<u32> {
        self.presence.lock().unwrap().get(name).map(|rec| rec.count)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgb;
    use std::time::Duration;

    fn det(name: &str) -> FilteredDetection {
        FilteredDetection {
            class_name: name.to_owned(),
            score: 0.9,
            color: Rgb([255, 0, 0]),
            x_min: 0,
            y_min: 0,
            x_max: 10,
            y_max: 10,
        }
    }

    fn context() -> DetectContext {
        DetectContext::new(
            LabelMap::from_names(&["cola", "chips"]),
            ControlPanel::new(),
        )
    }

    #[test]
    fn reconcile_publishes_control_changes() {
        let ctx = context();
        let mut updates = ctx.subscribe_controls();
        let start = Instant::now();

        for frame in 0..11u64 {
            ctx.observe_detections(&[det("cola")], start + Duration::from_millis(frame * 30));
        }
        let diff = ctx
            .reconcile(start + Duration::from_millis(400))
            .expect("reconcile pass");

        assert_eq!(diff.to_add, vec!["cola".to_string()]);
        assert_eq!(ctx.control_names(), vec!["cola".to_string()]);
        assert_eq!(updates.try_recv().ok(), Some(vec!["cola".to_string()]));
    }

    #[test]
    fn unchanged_reconcile_stays_quiet() {
        let ctx = context();
        let start = Instant::now();

        for frame in 0..11u64 {
            ctx.observe_detections(&[det("cola")], start + Duration::from_millis(frame * 30));
        }
        ctx.reconcile(start + Duration::from_millis(400));

        let mut updates = ctx.subscribe_controls();
        let diff = ctx
            .reconcile(start + Duration::from_millis(416))
            .expect("reconcile pass");

        assert!(diff.is_empty());
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn expiry_clears_control_and_count() {
        let ctx = context();
        let start = Instant::now();

        for frame in 0..11u64 {
            ctx.observe_detections(&[det("cola")], start + Duration::from_millis(frame * 30));
        }
        ctx.reconcile(start + Duration::from_millis(400));

        let diff = ctx
            .reconcile(start + Duration::from_millis(1500))
            .expect("reconcile pass");

        assert_eq!(diff.to_remove, vec!["cola".to_string()]);
        assert!(ctx.control_names().is_empty());
        assert_eq!(ctx.presence_count("cola"), None);
    }

    #[test]
    fn activation_of_unknown_control_is_rejected() {
        let ctx = context();
        assert!(!ctx.activate_control("cola"));
    }
}
