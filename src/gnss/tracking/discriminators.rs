
use num_complex::Complex;

use crate::TrackErr;

/// Normalized early-minus-late envelope [chips].  Positive when the signal leads the prompt replica.
pub fn dll_z4(early:Complex<f64>, late:Complex<f64>) -> Result<f64, TrackErr> {
	let (e, l) = (early.norm(), late.norm());
	let total = e + l;
	if !(total > 0.0) {
		return Err(TrackErr::degenerate("early and late correlators carry no energy"));
	}
	Ok(0.5 * (e - l) / total)
}

/// Carrier phase error of the prompt correlator, in (-pi, pi]
pub fn pll_atan2(prompt:Complex<f64>) -> f64 {
	prompt.im.atan2(prompt.re)
}
