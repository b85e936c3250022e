//! Request and inference statistics, logged periodically while the server is busy.
//!
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use tokio::{task::JoinHandle, time::interval};

pub static METER: Meter = Meter::new();

/// Interval between two statistics log lines.
const LOG_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Default)]
pub struct Meter {
    uploads: AtomicU64,
    decode_failures: AtomicU64,
    inference_failures: AtomicU64,
    inferences: AtomicU64,
    inference_micros: AtomicU64,
}

/// Counts accumulated since the previous reset.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MeterSnapshot {
    pub uploads: u64,
    pub decode_failures: u64,
    pub inference_failures: u64,
    pub inferences: u64,
    pub inference_time: Duration,
}

impl MeterSnapshot {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    /// Mean duration of successful inferences, if there were any.
    pub fn mean_inference_time(&self) -> Option<Duration> {
        match self.inferences {
            0 => None,
            n => Some(self.inference_time / n as u32),
        }
    }
}

impl Meter {
    pub const fn new() -> Meter {
        Meter {
            uploads: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            inference_failures: AtomicU64::new(0),
            inferences: AtomicU64::new(0),
            inference_micros: AtomicU64::new(0),
        }
    }

    pub fn tick_upload(&self) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tick_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tick_inference_failure(&self) {
        self.inference_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one successful inference and how long the model took.
    pub fn record_inference(&self, elapsed: Duration) {
        self.inferences.fetch_add(1, Ordering::Relaxed);
        self.inference_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot_reset(&self) -> MeterSnapshot {
        MeterSnapshot {
            uploads: self.uploads.swap(0, Ordering::Relaxed),
            decode_failures: self.decode_failures.swap(0, Ordering::Relaxed),
            inference_failures: self.inference_failures.swap(0, Ordering::Relaxed),
            inferences: self.inferences.swap(0, Ordering::Relaxed),
            inference_time: Duration::from_micros(self.inference_micros.swap(0, Ordering::Relaxed)),
        }
    }
}

/// Log the global statistics every few seconds, staying quiet while idle.
pub fn spawn_meter_logger() -> JoinHandle<()> {
    tokio::spawn(async {
        let mut log_interval = interval(LOG_INTERVAL);
        log_interval.tick().await;
        let mut last = Instant::now();

        loop {
            log_interval.tick().await;
            let elapsed = last.elapsed().as_secs_f32();
            last = Instant::now();

            let snapshot = METER.snapshot_reset();
            if snapshot.is_idle() {
                continue;
            }

            let mean_ms = snapshot
                .mean_inference_time()
                .map(|t| t.as_secs_f32() * 1000.0)
                .unwrap_or_default();
            log::info!(
                "{} uploads, {} classified ({:.2}/s, mean inference {:.1} ms), {} undecodable, {} failed inferences",
                snapshot.uploads,
                snapshot.inferences,
                snapshot.inferences as f32 / elapsed,
                mean_ms,
                snapshot.decode_failures,
                snapshot.inference_failures,
            );
        }
    })
}
