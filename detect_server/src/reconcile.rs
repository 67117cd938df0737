//! Periodic reconciliation of presence state into controls.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{task::JoinHandle, time::interval};

use crate::context::DetectContext;

/// Cadence of reconciliation passes, roughly one display refresh.
pub const RECONCILE_INTERVAL: Duration = Duration::from_millis(16);

/// Spawn the task that keeps the control set in sync with confirmed classes.
pub fn spawn_reconciler(ctx: Arc<DetectContext>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick_interval = interval(RECONCILE_INTERVAL);

        loop {
            tick_interval.tick().await;

            let Some(diff) = ctx.reconcile(Instant::now()) else {
                continue;
            };
            for name in &diff.to_add {
                log::info!("Confirmed '{name}', control added");
            }
            for name in &diff.to_remove {
                log::info!("'{name}' expired, control removed");
            }
        }
    })
}
