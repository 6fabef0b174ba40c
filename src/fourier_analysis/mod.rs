
use std::sync::Arc;

use num_complex::Complex;
use num_traits::Zero;
use rustfft::{Fft, FftPlanner};

use crate::TrackErr;
use crate::utils::{conj_in_place, mul_in_place};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Forward,
	Inverse,
}

/// Planned transform of a fixed length.  The inverse is scaled by 1/n so that a forward/inverse pair is the identity.
pub struct FFT {
	n:usize,
	direction:Direction,
	plan:Arc<dyn Fft<f64>>,
	scratch:Vec<Complex<f64>>,
}

impl FFT {

	pub fn new(n:usize, direction:Direction) -> Self {
		let mut planner = FftPlanner::new();
		let plan = match direction {
			Direction::Forward => planner.plan_fft_forward(n),
			Direction::Inverse => planner.plan_fft_inverse(n),
		};
		let scratch = vec![Complex::zero(); plan.get_inplace_scratch_len()];
		Self{ n, direction, plan, scratch }
	}

	pub fn len(&self) -> usize { self.n }

	pub fn execute(&mut self, x:&[Complex<f64>]) -> Vec<Complex<f64>> {
		let mut buffer:Vec<Complex<f64>> = x.to_vec();
		self.execute_in_place(&mut buffer);
		buffer
	}

	pub fn execute_in_place(&mut self, buffer:&mut [Complex<f64>]) {
		self.plan.process_with_scratch(buffer, &mut self.scratch);
		if self.direction == Direction::Inverse {
			let scale:f64 = 1.0 / (self.n as f64);
			for x in buffer.iter_mut() { *x *= scale; }
		}
	}

}

/// Circular cross-correlation r[k] = sum_j x[j+k] conj(y[j]) evaluated through the frequency domain
pub struct CircularCorrelator {
	fwd:FFT,
	inv:FFT,
}

impl CircularCorrelator {

	pub fn new(n:usize) -> Self {
		Self{ fwd: FFT::new(n, Direction::Forward), inv: FFT::new(n, Direction::Inverse) }
	}

	pub fn len(&self) -> usize { self.fwd.len() }

	pub fn correlate(&mut self, x:&[Complex<f64>], y:&[Complex<f64>]) -> Result<Vec<Complex<f64>>, TrackErr> {
		let n = self.len();
		if x.len() != n {
			return Err(TrackErr::LengthMismatch{ field: "correlation input", expected: n, actual: x.len() });
		}
		if y.len() != n {
			return Err(TrackErr::LengthMismatch{ field: "correlation reference", expected: n, actual: y.len() });
		}

		let mut product:Vec<Complex<f64>> = self.fwd.execute(x);
		let mut y_freq:Vec<Complex<f64>> = self.fwd.execute(y);
		conj_in_place(&mut y_freq);
		mul_in_place(&mut product, &y_freq)?;

		self.inv.execute_in_place(&mut product);
		Ok(product)
	}

}

/// One-shot form of `CircularCorrelator::correlate`
pub fn circular_correlate(x:&[Complex<f64>], y:&[Complex<f64>]) -> Result<Vec<Complex<f64>>, TrackErr> {
	CircularCorrelator::new(x.len()).correlate(x, y)
}

#[cfg(test)]
mod tests {

	use super::*;

	fn test_sequence(n:usize) -> Vec<Complex<f64>> {
		let mut state:u64 = 0x2545F491;
		(0..n).map(|_| {
			state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
			let bits = state >> 60;
			Complex{ re: if bits & 1 == 0 { 1.0 } else { -1.0 }, im: if bits & 2 == 0 { 1.0 } else { -1.0 } }
		}).collect()
	}

	#[test]
	fn forward_inverse_identity() {
		let x = test_sequence(40);
		let mut fwd = FFT::new(40, Direction::Forward);
		let mut inv = FFT::new(40, Direction::Inverse);
		let y = inv.execute(&fwd.execute(&x));
		for (a, b) in x.iter().zip(y.iter()) {
			assert!((a - b).norm() < 1.0e-12);
		}
	}

	#[test]
	fn autocorrelation_peaks_at_zero_lag() {
		let x = test_sequence(64);
		let r = circular_correlate(&x, &x).unwrap();
		let energy:f64 = x.iter().map(|c| c.norm_sqr()).sum();
		assert!((r[0].re - energy).abs() < 1.0e-9);
		assert!(r[0].im.abs() < 1.0e-9);
		for k in 1..64 { assert!(r[k].norm() <= r[0].norm() + 1.0e-9); }
	}

	#[test]
	fn shifted_copy_peaks_at_shift() {
		let y = test_sequence(50);
		let shift = 13;
		let x:Vec<Complex<f64>> = (0..50).map(|j| y[(j + 50 - shift) % 50]).collect();

		let mut corr = CircularCorrelator::new(50);
		let r = corr.correlate(&x, &y).unwrap();
		let (peak_idx, _) = r.iter().enumerate()
			.max_by(|a, b| a.1.norm().partial_cmp(&b.1.norm()).unwrap())
			.unwrap();
		assert_eq!(peak_idx, shift);
	}

	#[test]
	fn length_mismatch() {
		let mut corr = CircularCorrelator::new(8);
		match corr.correlate(&test_sequence(8), &test_sequence(7)) {
			Err(TrackErr::LengthMismatch{ expected: 8, actual: 7, .. }) => (),
			other => panic!("unexpected result {:?}", other.map(|v| v.len())),
		}
	}

}
