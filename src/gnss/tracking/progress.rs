
use log::{debug, info};

/// Told about every finished integration period.  Purely observational.
pub trait ProgressReporter {
	fn period_done(&mut self, period:usize, total:usize);
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
	fn period_done(&mut self, _period:usize, _total:usize) { }
}

/// Logs every period at debug level and every `info_every` periods at info level
pub struct LogProgress {
	pub info_every:usize,
}

impl Default for LogProgress {
	fn default() -> Self { Self{ info_every: 1000 } }
}

impl ProgressReporter for LogProgress {
	fn period_done(&mut self, period:usize, total:usize) {
		debug!("Finished period {} of {}", period, total);
		if self.info_every > 0 && (period % self.info_every == 0 || period == total) {
			info!("Tracking {:5.1}% complete ({}/{})", 100.0 * (period as f64) / (total as f64), period, total);
		}
	}
}

/// Adapts a closure into a reporter
pub struct Callback<F: FnMut(usize, usize)>(pub F);

impl<F: FnMut(usize, usize)> ProgressReporter for Callback<F> {
	fn period_done(&mut self, period:usize, total:usize) { (self.0)(period, total) }
}
