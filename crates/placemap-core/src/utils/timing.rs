use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Operations slower than this are reported at warn level.
pub const SLOW_OPERATION_MS: u128 = 1000;

/// Measures one named operation and logs its duration when finished.
#[derive(Debug)]
pub struct Stopwatch {
    name: &'static str,
    started: Instant,
}

impl Stopwatch {
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Log the elapsed time and return it
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        let ms = elapsed.as_millis();
        if ms > SLOW_OPERATION_MS {
            warn!(operation = self.name, elapsed_ms = ms as u64, "Slow operation");
        } else {
            debug!(operation = self.name, elapsed_ms = ms as u64, "Operation finished");
        }
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwatch_measures_forward() {
        let watch = Stopwatch::start("test");
        std::thread::sleep(Duration::from_millis(2));
        assert!(watch.finish() >= Duration::from_millis(2));
    }
}
