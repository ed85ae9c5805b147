//! A metrics recorder that periodically logs all captured gauges.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_util::registry::{AtomicStorage, Registry};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A metrics recorder that keeps gauges in memory and logs them with `tracing::info!`.
pub struct LoggingRecorder {
    registry: Arc<Registry<Key, AtomicStorage>>,
}

impl LoggingRecorder {
    /// Creates a new `LoggingRecorder` and starts a background task to log metrics.
    ///
    /// # Arguments
    /// * `aggregation_interval` - The interval at which to log the metrics.
    /// * `shutdown_rx` - Stops the logging task when it fires or closes.
    pub fn new(
        aggregation_interval: Duration,
        mut shutdown_rx: watch::Receiver<()>,
    ) -> (Self, JoinHandle<()>) {
        let registry = Arc::new(Registry::new(AtomicStorage));
        let recorder = Self {
            registry: registry.clone(),
        };

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(aggregation_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        for line in render_gauges(&registry) {
                            tracing::info!("{}", line);
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Metrics logging task received shutdown signal.");
                        break;
                    }
                }
            }
        });

        (recorder, handle)
    }
}

/// One `[Gauge] name{k="v"}: value` line per gauge, sorted by name.
fn render_gauges(registry: &Registry<Key, AtomicStorage>) -> Vec<String> {
    let mut lines: Vec<String> = registry
        .get_gauge_handles()
        .into_iter()
        .map(|(key, gauge)| {
            let value = f64::from_bits(gauge.load(Ordering::Relaxed));
            let labels: Vec<String> = key
                .labels()
                .map(|label| format!("{}=\"{}\"", label.key(), label.value()))
                .collect();
            if labels.is_empty() {
                format!("[Gauge] {}: {}", key.name(), value)
            } else {
                format!("[Gauge] {}{{{}}}: {}", key.name(), labels.join(","), value)
            }
        })
        .collect();
    lines.sort();
    lines
}

impl Recorder for LoggingRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {
        // Not implemented for this simple recorder
    }

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {
        // Not implemented for this simple recorder
    }

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {
        // Not implemented for this simple recorder
    }

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        self.registry.get_or_create_counter(key, |c| c.clone().into())
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        self.registry.get_or_create_gauge(key, |g| g.clone().into())
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        self.registry.get_or_create_histogram(key, |h| h.clone().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gauges_render_with_labels() {
        let (tx, rx) = watch::channel(());
        let (recorder, handle) = LoggingRecorder::new(Duration::from_secs(3600), rx);

        metrics::with_local_recorder(&recorder, || {
            metrics::gauge!("process_open_fds", "service" => "api").set(12.0);
            metrics::gauge!("process_cpu_usage").set(37.5);
        });

        let lines = render_gauges(&recorder.registry);
        assert_eq!(
            lines,
            vec![
                "[Gauge] process_cpu_usage: 37.5".to_string(),
                "[Gauge] process_open_fds{service=\"api\"}: 12".to_string(),
            ]
        );

        // Cleanly shut down the task to avoid test warnings.
        drop(tx);
        let _ = handle.await;
    }

    #[tokio::test]
    async fn gauge_keeps_latest_value() {
        let (_tx, rx) = watch::channel(());
        let (recorder, handle) = LoggingRecorder::new(Duration::from_secs(3600), rx);

        metrics::with_local_recorder(&recorder, || {
            metrics::gauge!("process_resident_memory_bytes").set(1.0);
            metrics::gauge!("process_resident_memory_bytes").set(2048.0);
        });

        assert_eq!(
            render_gauges(&recorder.registry),
            vec!["[Gauge] process_resident_memory_bytes: 2048".to_string()]
        );
        handle.abort();
    }
}
