use std::{fmt, time::Duration};

/// Final counts and timing of a completed run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub success: u64,
    pub failure: u64,

    /// Number of addresses dispatched
    pub total: u64,

    pub elapsed: Duration,
}

impl Report {
    /// Share of failed calls, in `[0, 1]`. `None` for an empty run
    pub fn failure_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.failure as f64 / self.total as f64)
    }

    /// Addresses processed per second
    pub fn throughput(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0).then(|| self.total as f64 / secs)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "success / failure: {} / {}", self.success, self.failure)?;
        match self.failure_rate() {
            Some(rate) => writeln!(f, " (failure rate {:.2}%)", rate * 100.0)?,
            None => writeln!(f, " (failure rate n/a)")?,
        }

        write!(f, "reading {} addresses took {:?}", self.total, self.elapsed)?;
        if let Some(throughput) = self.throughput() {
            write!(f, " ({:.2} addresses/s)", throughput)?;
        }

        Ok(())
    }
}
