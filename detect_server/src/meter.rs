use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use tokio::{task::JoinHandle, time::interval};

pub static METER: Meter = Meter::new();

#[derive(Default)]
pub struct Meter {
    raw_frames: AtomicU64,
    processed_frames: AtomicU64,
    detected_objects: AtomicU64,
}

impl Meter {
    pub const fn new() -> Meter {
        Meter {
            raw_frames: AtomicU64::new(0),
            processed_frames: AtomicU64::new(0),
            detected_objects: AtomicU64::new(0),
        }
    }

    pub fn tick_raw(&self) {
        self.raw_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tick_processed(&self) {
        self.processed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_objects(&self, count: u64) {
        self.detected_objects.fetch_add(count, Ordering::Relaxed);
    }

    pub fn get_reset_raw(&self) -> u64 {
        self.raw_frames.swap(0, Ordering::Relaxed)
    }

    pub fn get_reset_processed(&self) -> u64 {
        self.processed_frames.swap(0, Ordering::Relaxed)
    }

    pub fn get_reset_objects(&self) -> u64 {
        self.detected_objects.swap(0, Ordering::Relaxed)
    }
}

pub fn spawn_meter_logger() -> JoinHandle<()> {
    tokio::spawn(async {
        let mut log_interval = interval(Duration::from_secs(2));
        log_interval.tick().await;

        loop {
            let start = Instant::now();
            log_interval.tick().await;

            let raw_frames = METER.get_reset_raw();
            let processed_frames = METER.get_reset_processed();
            let objects = METER.get_reset_objects();
            let elapsed = start.elapsed().as_secs_f32();
            let fps_raw = raw_frames as f32 / elapsed;
            let fps_processed = processed_frames as f32 / elapsed;

            if raw_frames > 0 {
                log::info!("Incoming frames per second: {fps_raw:.2}")
            }
            if processed_frames > 0 {
                log::info!("Detection frames per second: {fps_processed:.2} ({objects} objects)")
            }
        }
    })
}
