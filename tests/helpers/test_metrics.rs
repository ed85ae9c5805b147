//! A simple in-memory metrics recorder for testing.

use metrics::{Counter, Gauge, GaugeFn, Histogram, Key, KeyName, Metadata, Recorder, Unit};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// One `Gauge::set` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSet {
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TestMetrics {
    gauges: Arc<Mutex<HashMap<String, Vec<GaugeSet>>>>,
}

impl TestMetrics {
    /// Installs one shared recorder for the whole test binary.
    ///
    /// Tests sharing it should use distinct metric prefixes.
    pub fn global() -> TestMetrics {
        static GLOBAL: OnceLock<TestMetrics> = OnceLock::new();
        GLOBAL
            .get_or_init(|| {
                let metrics = TestMetrics::default();
                if metrics::set_global_recorder(metrics.clone()).is_err() {
                    panic!("another recorder is already installed");
                }
                metrics
            })
            .clone()
    }

    /// Every value set on `name`, oldest first.
    pub fn gauge_sets(&self, name: &str) -> Vec<GaugeSet> {
        self.gauges
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Names of all gauges starting with `prefix`.
    pub fn gauge_names(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .gauges
            .lock()
            .unwrap()
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl Recorder for TestMetrics {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: metrics::SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: metrics::SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: metrics::SharedString) {}

    fn register_counter(&self, _key: &Key, _metadata: &Metadata) -> Counter {
        // Not implemented for this test helper
        Counter::noop()
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata) -> Gauge {
        Gauge::from_arc(Arc::new(MetricGauge {
            name: key.name().to_string(),
            labels: key
                .labels()
                .map(|l| (l.key().to_string(), l.value().to_string()))
                .collect(),
            gauges: self.gauges.clone(),
        }))
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata) -> Histogram {
        // Not implemented for this test helper
        Histogram::noop()
    }
}

#[derive(Debug)]
struct MetricGauge {
    name: String,
    labels: Vec<(String, String)>,
    gauges: Arc<Mutex<HashMap<String, Vec<GaugeSet>>>>,
}

impl GaugeFn for MetricGauge {
    fn increment(&self, _value: f64) {
        // Not implemented
    }

    fn decrement(&self, _value: f64) {
        // Not implemented
    }

    fn set(&self, value: f64) {
        self.gauges
            .lock()
            .unwrap()
            .entry(self.name.clone())
            .or_default()
            .push(GaugeSet {
                labels: self.labels.clone(),
                value,
            });
    }
}
