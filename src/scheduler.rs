//! Periodic rescan
//!
//! Re-runs [`analyze`] on a fixed interval and publishes the latest result
//! on a watch channel. The first run happens immediately.

use crate::alerts::MIN_SCAN_INTERVAL;
use crate::pipeline::{analyze, Analysis, Settings, Snapshot};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Running rescan task. Dropping the handle stops it.
pub struct RescanHandle {
    task: Option<JoinHandle<()>>,
    results: watch::Receiver<Option<Arc<Analysis>>>,
}

impl RescanHandle {
    /// Latest published analysis, `None` until the first scan lands
    pub fn latest(&self) -> Option<Arc<Analysis>> {
        self.results.borrow().clone()
    }

    /// Receiver for change notifications
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Analysis>>> {
        self.results.clone()
    }

    /// Stop future scans and wait for the task to wind down
    pub async fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        log::info!("Rescan cancelled");
    }
}

impl Drop for RescanHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawn a rescan of `snapshot` every `every`, never more often than
/// [`MIN_SCAN_INTERVAL`]. Must be called inside a tokio runtime.
pub fn spawn_rescan(snapshot: Arc<Snapshot>, settings: Settings, every: Duration) -> RescanHandle {
    let every = every.max(MIN_SCAN_INTERVAL);
    let (tx, rx) = watch::channel(None);

    let task = tokio::spawn(async move {
        log::info!("Rescan started (interval: {:?})", every);
        let mut timer = interval(every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            let analysis = analyze(&snapshot, &settings, Utc::now());
            log::debug!("Rescan published {} alerts", analysis.alerts.len());
            if tx.send(Some(Arc::new(analysis))).is_err() {
                log::debug!("No rescan subscribers left, stopping");
                break;
            }
        }
    });

    RescanHandle {
        task: Some(task),
        results: rx,
    }
}

/// Convenience wrapper using the interval from the alert settings
pub fn spawn_configured_rescan(snapshot: Arc<Snapshot>, settings: Settings) -> RescanHandle {
    let every = settings.alerts.scan_interval();
    spawn_rescan(snapshot, settings, every)
}
