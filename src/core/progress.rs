//! Byte progress of an artifact transfer

use std::time::{Duration, Instant};

/// Progress of one artifact being written to disk
#[derive(Debug, Clone)]
pub struct TransferProgress {
    /// Task whose artifact is being saved
    pub task_id: String,
    /// Declared body length, if the server sent one
    pub total: Option<u64>,
    /// Bytes written so far
    pub written: u64,
    /// Average rate since the transfer started, bytes per second
    pub speed: Option<f64>,
    started: Instant,
}

impl TransferProgress {
    pub fn new(task_id: impl Into<String>, total: Option<u64>) -> Self {
        Self {
            task_id: task_id.into(),
            total: total.filter(|t| *t > 0),
            written: 0,
            speed: None,
            started: Instant::now(),
        }
    }

    /// Record that `bytes` more have been written
    pub fn advance(&mut self, bytes: u64) {
        self.written += bytes;
        let elapsed = self.started.elapsed();
        if elapsed.as_millis() > 0 {
            self.speed = Some(self.written as f64 / elapsed.as_secs_f64());
        }
    }

    /// Percent complete when the total is known
    pub fn percent(&self) -> Option<f64> {
        self.total
            .map(|total| (self.written as f64 / total as f64 * 100.0).min(100.0))
    }

    /// Estimated time remaining when total and speed are known
    pub fn eta(&self) -> Option<Duration> {
        let total = self.total?;
        let speed = self.speed.filter(|s| *s > 0.0)?;
        let remaining = total.saturating_sub(self.written);
        Some(Duration::from_secs_f64(remaining as f64 / speed))
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exp = (bytes_f64.ln() / THRESHOLD.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f64 / THRESHOLD.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.1} {}", value, UNITS[exp])
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else if total_seconds < 3600 {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        if seconds == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, seconds)
        }
    } else {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}
