
use std::f64::consts::PI;

use num_complex::Complex;
use num_traits::Zero;
use rayon::prelude::*;
use serde::Serialize;

use crate::TrackErr;
use crate::utils::wrap_index;

// Periods shorter than this are summed on the calling thread
const PARALLEL_THRESHOLD:usize = 16384;

/// Local carrier used to wipe one integration period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarrierEstimate {
	pub intermediate_freq_hz:f64,
	pub doppler_hz:f64,
	pub doppler_rate_hz_s:f64,
	/// Phase at the first sample of the period [rad]
	pub phase_rad:f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrelatorTriple {
	pub early:Complex<f64>,
	pub prompt:Complex<f64>,
	pub late:Complex<f64>,
}

impl CorrelatorTriple {

	fn zero() -> Self { Self{ early: Complex::zero(), prompt: Complex::zero(), late: Complex::zero() } }

	fn merge(self, other:Self) -> Self {
		Self{ early: self.early + other.early, prompt: self.prompt + other.prompt, late: self.late + other.late }
	}

}

fn check_period(len:usize, period_index:usize, n:usize) -> Result<usize, TrackErr> {
	let start = period_index * n;
	if n == 0 || start + n > len {
		return Err(TrackErr::config(format!("period {} of {} samples runs past the end of {} samples", period_index, n, len)));
	}
	Ok(start)
}

/// Removes the estimated carrier from period `period_index`.  Sample times are taken relative to the first sample
/// of the period.
pub fn wipe_carrier(samples:&[Complex<f64>], time:&[f64], period_index:usize, n:usize, carrier:&CarrierEstimate) -> Result<Vec<Complex<f64>>, TrackErr> {
	if time.len() != samples.len() {
		return Err(TrackErr::LengthMismatch{ field: "time", expected: samples.len(), actual: time.len() });
	}
	let start = check_period(samples.len(), period_index, n)?;
	let t0:f64 = time[start];
	let freq:f64 = carrier.intermediate_freq_hz + carrier.doppler_hz;

	Ok(samples[start..start+n].iter().zip(time[start..start+n].iter()).map(|(x, t)| {
		let tau:f64 = t - t0;
		let theta:f64 = 2.0*PI*freq*tau + PI*carrier.doppler_rate_hz_s*tau*tau + carrier.phase_rad;
		x * Complex::from_polar(1.0, -theta)
	}).collect())
}

/// Early, prompt and late sums of already wiped samples against one period of replica.  The replica is treated as
/// circular so the early and late taps wrap around the period.
pub fn correlate_wiped(wiped:&[Complex<f64>], replica:&[Complex<f64>], tap_spacing:usize) -> Result<CorrelatorTriple, TrackErr> {
	let n = wiped.len();
	if replica.len() != n {
		return Err(TrackErr::LengthMismatch{ field: "replica", expected: n, actual: replica.len() });
	}
	if tap_spacing < 1 || tap_spacing >= n {
		return Err(TrackErr::config(format!("tap spacing {} must be in [1, {})", tap_spacing, n)));
	}
	let d = tap_spacing as isize;

	let accumulate = |mut acc:CorrelatorTriple, j:usize| {
		let x = wiped[j];
		acc.early  += x * replica[wrap_index(j,  d, n)].conj();
		acc.prompt += x * replica[j].conj();
		acc.late   += x * replica[wrap_index(j, -d, n)].conj();
		acc
	};

	let sum:CorrelatorTriple = if n < PARALLEL_THRESHOLD {
		(0..n).fold(CorrelatorTriple::zero(), accumulate)
	} else {
		(0..n).into_par_iter()
			.fold(CorrelatorTriple::zero, accumulate)
			.reduce(CorrelatorTriple::zero, CorrelatorTriple::merge)
	};

	let scale:f64 = 1.0 / (n as f64);
	Ok(CorrelatorTriple{ early: sum.early * scale, prompt: sum.prompt * scale, late: sum.late * scale })
}

pub fn correlate(samples:&[Complex<f64>], time:&[f64], replica:&[Complex<f64>], period_index:usize, n:usize,
	carrier:&CarrierEstimate, tap_spacing:usize) -> Result<CorrelatorTriple, TrackErr> {
	let wiped = wipe_carrier(samples, time, period_index, n, carrier)?;
	correlate_wiped(&wiped, replica, tap_spacing)
}

#[cfg(test)]
mod tests {

	use super::*;

	fn pn(n:usize) -> Vec<Complex<f64>> {
		let mut state:u32 = 0xACE1;
		(0..n).map(|_| {
			let bit = (state ^ (state >> 2) ^ (state >> 3) ^ (state >> 5)) & 1;
			state = (state >> 1) | (bit << 15);
			Complex{ re: if bit == 1 { 1.0 } else { -1.0 }, im: 0.0 }
		}).collect()
	}

	fn still() -> CarrierEstimate {
		CarrierEstimate{ intermediate_freq_hz: 0.0, doppler_hz: 0.0, doppler_rate_hz_s: 0.0, phase_rad: 0.0 }
	}

	#[test]
	fn aligned_replica_gives_unit_prompt_and_equal_sides() {
		let r = pn(1000);
		let t:Vec<f64> = (0..2000).map(|k| k as f64 * 1.0e-6).collect();
		let samples:Vec<Complex<f64>> = r.iter().chain(r.iter()).cloned().collect();

		let triple = correlate(&samples, &t, &r, 1, 1000, &still(), 2).unwrap();
		assert!((triple.prompt - Complex{ re: 1.0, im: 0.0 }).norm() < 1.0e-12);
		assert!((triple.early.norm() - triple.late.norm()).abs() < 1.0e-12);
	}

	#[test]
	fn carrier_is_removed() {
		let r = pn(500);
		let carrier = CarrierEstimate{ intermediate_freq_hz: 2.0e3, doppler_hz: 350.0, doppler_rate_hz_s: 40.0, phase_rad: 1.1 };
		let t:Vec<f64> = (0..500).map(|k| k as f64 * 2.0e-6).collect();
		let samples:Vec<Complex<f64>> = r.iter().zip(t.iter()).map(|(c, tau)| {
			let theta = 2.0*PI*2350.0*tau + PI*40.0*tau*tau + 1.1;
			c * Complex::from_polar(1.0, theta)
		}).collect();

		let triple = correlate(&samples, &t, &r, 0, 500, &carrier, 1).unwrap();
		assert!((triple.prompt.re - 1.0).abs() < 1.0e-12);
		assert!(triple.prompt.im.abs() < 1.0e-12);
	}

	#[test]
	fn early_tap_wins_when_signal_leads() {
		let r = pn(800);
		// Signal two samples ahead of the replica
		let samples:Vec<Complex<f64>> = (0..800).map(|j| r[(j + 2) % 800]).collect();
		let triple = correlate_wiped(&samples, &r, 2).unwrap();
		assert!(triple.early.norm() > 0.99);
		assert!(triple.early.norm() > triple.late.norm());
	}

	#[test]
	fn parallel_sum_matches_serial() {
		let r = pn(40000);
		let samples:Vec<Complex<f64>> = (0..40000).map(|j| r[(j + 1) % 40000] * Complex{ re: 0.6, im: 0.8 }).collect();
		let parallel = correlate_wiped(&samples, &r, 3).unwrap();

		let mut serial = CorrelatorTriple::zero();
		for j in 0..40000 {
			serial.early  += samples[j] * r[(j + 3) % 40000];
			serial.prompt += samples[j] * r[j];
			serial.late   += samples[j] * r[(j + 40000 - 3) % 40000];
		}
		assert!((parallel.early  - serial.early  / 40000.0).norm() < 1.0e-9);
		assert!((parallel.prompt - serial.prompt / 40000.0).norm() < 1.0e-9);
		assert!((parallel.late   - serial.late   / 40000.0).norm() < 1.0e-9);
	}

	#[test]
	fn rejects_bad_geometry() {
		let r = pn(100);
		let t = vec![0.0; 150];
		let samples = vec![Complex::zero(); 150];
		assert!(correlate(&samples, &t, &r, 1, 100, &still(), 1).is_err());
		assert!(correlate_wiped(&samples[..100], &r, 0).is_err());
		assert!(correlate_wiped(&samples[..100], &r, 100).is_err());
		assert!(correlate_wiped(&samples[..99], &r, 1).is_err());
	}

}
