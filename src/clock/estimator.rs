use std::collections::VecDeque;

/// Samples kept in the ring.
pub const MAX_SAMPLES: usize = 16;
/// Size of the centered window averaged once enough samples exist.
pub const USE_SAMPLES: usize = 8;
/// Samples needed before round trips are compared against the median.
const GATE_MIN_SAMPLES: usize = 4;
/// A round trip above `median * GATE_FACTOR + GATE_SLACK_MS` is discarded.
const GATE_FACTOR: f64 = 3.0;
const GATE_SLACK_MS: f64 = 100.0;
/// Consecutive discards after which the next sample is taken anyway.
const GATE_MAX_REJECTS: u32 = 8;

/// Wall clock in fractional milliseconds since the Unix epoch.
pub fn local_now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
        * 1000.0
}

/// One ping round trip: when the server saw the ping, in both clocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSample {
    /// Local midpoint of the round trip.
    pub local: f64,
    pub remote: f64,
    /// Local milliseconds between sending the ping and reading the echo.
    pub round_trip: f64,
}

impl ClockSample {
    pub fn from_echo(sent: f64, server_time: f64, received: f64) -> Self {
        Self {
            local: (sent + received) / 2.0,
            remote: server_time,
            round_trip: received - sent,
        }
    }

    pub fn offset(&self) -> f64 {
        self.remote - self.local
    }
}

/// Estimates `server clock - local clock` from recent ping samples.
#[derive(Debug, Clone, Default)]
pub struct ClockEstimator {
    samples: VecDeque<ClockSample>,
    recorded: u64,
    rejected_run: u32,
}

impl ClockEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sample to the ring.
    ///
    /// Echoes that sat in a queue on either side carry a stale server time.
    /// Their round trip is far above the recent median, so they are dropped
    /// unless latency has stayed high for `GATE_MAX_REJECTS` samples in a
    /// row. Returns whether the sample was kept.
    pub fn record(&mut self, sample: ClockSample) -> bool {
        let delayed = self
            .round_trip_limit()
            .is_some_and(|limit| sample.round_trip > limit);
        if delayed && self.rejected_run < GATE_MAX_REJECTS {
            self.rejected_run += 1;
            return false;
        }
        self.rejected_run = 0;
        if self.samples.len() == MAX_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.recorded += 1;
        true
    }

    fn round_trip_limit(&self) -> Option<f64> {
        if self.samples.len() < GATE_MIN_SAMPLES {
            return None;
        }
        let mut trips: Vec<f64> = self.samples.iter().map(|s| s.round_trip).collect();
        trips.sort_by(f64::total_cmp);
        let median = trips[trips.len() / 2];
        Some(median.max(0.0) * GATE_FACTOR + GATE_SLACK_MS)
    }

    /// Samples kept since creation, including evicted ones.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Trimmed mean of the sample offsets; zero without samples.
    pub fn offset(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut offsets: Vec<f64> = self.samples.iter().map(ClockSample::offset).collect();
        offsets.sort_by(f64::total_cmp);

        let window = if offsets.len() > USE_SAMPLES {
            let start = (offsets.len() - USE_SAMPLES) / 2;
            &offsets[start..start + USE_SAMPLES]
        } else {
            &offsets[..]
        };
        window.iter().sum::<f64>() / window.len() as f64
    }

    pub fn synchronized(&self, local_now: f64) -> f64 {
        local_now + self.offset()
    }

    /// Shared virtual clock as seen from this process.
    pub fn synchronized_now(&self) -> f64 {
        self.synchronized(local_now_ms())
    }
}
