//! Lightweight frame counters for diagnostics

use std::time::{Duration, Instant};

/// Accumulates a per-frame value (a count or a duration in milliseconds)
/// and keeps min/max/average statistics across frames.
///
/// A frame is opened with `fetch_new_frame`, values are added with
/// `add_count`, and the statistics are folded in when `add_count` is called
/// with `fetch_result = true` or when `end_monitoring` closes a timed span.
#[derive(Debug, Clone)]
pub struct PerfCounter {
    /// Enables or disables accumulation
    pub enabled: bool,
    min: f64,
    max: f64,
    average: f64,
    last_sec_average: f64,
    current: f64,
    total_accumulated: f64,
    total_value_count: u64,
    last_sec_accumulated: f64,
    last_sec_value_count: u64,
    last_sec_time: Instant,
    start_monitoring_time: Option<Instant>,
}

impl Default for PerfCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PerfCounter {
    pub fn new() -> Self {
        Self {
            enabled: true,
            min: f64::MAX,
            max: f64::MIN,
            average: 0.0,
            last_sec_average: 0.0,
            current: 0.0,
            total_accumulated: 0.0,
            total_value_count: 0,
            last_sec_accumulated: 0.0,
            last_sec_value_count: 0,
            last_sec_time: Instant::now(),
            start_monitoring_time: None,
        }
    }

    /// Smallest value seen (0 before any frame has been fetched)
    pub fn min(&self) -> f64 {
        if self.total_value_count == 0 {
            0.0
        } else {
            self.min
        }
    }

    /// Largest value seen (0 before any frame has been fetched)
    pub fn max(&self) -> f64 {
        if self.total_value_count == 0 {
            0.0
        } else {
            self.max
        }
    }

    /// Average over every fetched frame
    pub fn average(&self) -> f64 {
        self.average
    }

    /// Average over the frames of the last full second
    pub fn last_sec_average(&self) -> f64 {
        self.last_sec_average
    }

    /// Value accumulated in the current frame
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Sum of all folded values
    pub fn total(&self) -> f64 {
        self.total_accumulated
    }

    /// Number of frames fetched so far
    pub fn count(&self) -> u64 {
        self.total_value_count
    }

    /// Start a new frame: the current value goes back to zero
    pub fn fetch_new_frame(&mut self) {
        self.total_value_count += 1;
        self.current = 0.0;
        self.last_sec_value_count += 1;
    }

    /// Add `new_count` to the current frame, optionally folding it into the stats
    pub fn add_count(&mut self, new_count: f64, fetch_result: bool) {
        if !self.enabled {
            return;
        }
        self.current += new_count;
        if fetch_result {
            self.fetch_result();
        }
    }

    /// Start timing a span
    pub fn begin_monitoring(&mut self) {
        if !self.enabled {
            return;
        }
        self.start_monitoring_time = Some(Instant::now());
    }

    /// Stop timing a span; the elapsed milliseconds become the current value
    pub fn end_monitoring(&mut self, new_frame: bool) {
        if !self.enabled {
            return;
        }
        let Some(start) = self.start_monitoring_time.take() else {
            return;
        };
        if new_frame {
            self.fetch_new_frame();
        }
        self.current = duration_ms(start.elapsed());
        if new_frame {
            self.fetch_result();
        }
    }

    fn fetch_result(&mut self) {
        self.total_accumulated += self.current;
        self.last_sec_accumulated += self.current;

        self.min = self.min.min(self.current);
        self.max = self.max.max(self.current);
        if self.total_value_count > 0 {
            self.average = self.total_accumulated / self.total_value_count as f64;
        }

        if self.last_sec_time.elapsed() > Duration::from_secs(1) {
            if self.last_sec_value_count > 0 {
                self.last_sec_average = self.last_sec_accumulated / self.last_sec_value_count as f64;
            }
            self.last_sec_time = Instant::now();
            self.last_sec_accumulated = 0.0;
            self.last_sec_value_count = 0;
        }
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
