//! CPU usage between two consecutive samples.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct Baseline {
    ticks_since_boot: u64,
    cpu_ticks: u64,
}

/// Turns cumulative wall-clock and CPU counters into an instantaneous rate.
///
/// Both counters must use the same unit. The first call only records a
/// baseline and reports `0.0`; every later call reports usage since the
/// call before it, never an average since process start.
#[derive(Debug, Default)]
pub struct CpuUsageCalculator {
    previous: Mutex<Option<Baseline>>,
}

impl CpuUsageCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Percentage of one core used since the previous call (`100.0` per busy core).
    ///
    /// Returns `0.0` on the first call and whenever `ticks_since_boot` did
    /// not advance.
    pub fn usage_percent(&self, ticks_since_boot: u64, cpu_ticks: u64) -> f64 {
        // The baseline is replaced wholesale, so a poisoned guard is still usable.
        let mut previous = self
            .previous
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let usage = match *previous {
            Some(prev) if ticks_since_boot > prev.ticks_since_boot => {
                let delta_boot = ticks_since_boot - prev.ticks_since_boot;
                let delta_cpu = cpu_ticks.saturating_sub(prev.cpu_ticks);
                delta_cpu as f64 * 100.0 / delta_boot as f64
            }
            _ => 0.0,
        };

        *previous = Some(Baseline {
            ticks_since_boot,
            cpu_ticks,
        });
        usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn first_call_has_no_baseline() {
        assert_eq!(CpuUsageCalculator::new().usage_percent(500, 400), 0.0);
        assert_eq!(CpuUsageCalculator::new().usage_percent(0, 0), 0.0);
        assert_eq!(CpuUsageCalculator::new().usage_percent(1, u64::MAX), 0.0);
    }

    #[test]
    fn steady_delta() {
        let calc = CpuUsageCalculator::new();
        assert_eq!(calc.usage_percent(0, 0), 0.0);
        assert_eq!(calc.usage_percent(20, 10), 50.0);
    }

    #[test]
    fn diffs_against_the_latest_call() {
        let calc = CpuUsageCalculator::new();
        calc.usage_percent(100, 0);
        assert_eq!(calc.usage_percent(200, 100), 100.0);
        assert_eq!(calc.usage_percent(300, 125), 25.0);
        // Two busy cores.
        assert_eq!(calc.usage_percent(400, 325), 200.0);
    }

    #[test]
    fn clock_going_backwards_reports_zero() {
        let calc = CpuUsageCalculator::new();
        calc.usage_percent(100, 10);
        assert_eq!(calc.usage_percent(100, 50), 0.0);
        assert_eq!(calc.usage_percent(90, 60), 0.0);
        // The baseline moved to (90, 60) even though nothing was reported.
        assert_eq!(calc.usage_percent(100, 65), 50.0);
    }

    #[test]
    fn cpu_counter_going_backwards_reports_zero() {
        let calc = CpuUsageCalculator::new();
        calc.usage_percent(100, 50);
        let usage = calc.usage_percent(200, 10);
        assert_eq!(usage, 0.0);
        assert!(!usage.is_nan());
    }

    #[test]
    fn concurrent_callers_never_see_a_torn_baseline() {
        let calc = Arc::new(CpuUsageCalculator::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let calc = Arc::clone(&calc);
                thread::spawn(move || {
                    (0..1_000u64)
                        .map(|i| {
                            let boot = (i * 8 + t) * 2;
                            calc.usage_percent(boot, boot / 2)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            for usage in handle.join().unwrap() {
                assert!(usage.is_finite());
                assert!(usage >= 0.0);
            }
        }
    }
}
