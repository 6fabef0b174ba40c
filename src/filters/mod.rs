
use log::warn;
use serde::{Serialize, Deserialize};

use crate::TrackErr;

pub mod kalman;

pub trait ScalarFilter {

	fn apply(&mut self, x:f64) -> f64;
	fn initialize(&mut self);

}

pub(crate) fn check_positive(name:&str, x:f64) -> Result<(), TrackErr> {
	// Written this way so NaN is rejected too
	if x > 0.0 { Ok(()) } else { Err(TrackErr::config(format!("{} must be positive, got {}", name, x))) }
}

/// Code discriminator tags.  Only the formula's identity is carried, the formula itself lives in the tracking discriminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeDiscriminator {
	/// Normalized early-minus-late envelope
	Z4,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DllSpec {
	t:f64,
	bandwidth_hz:f64,
	tap_spacing:usize,
	discriminator:CodeDiscriminator,
}

impl DllSpec {

	pub fn integration_time(&self) -> f64 { self.t }
	pub fn bandwidth_hz(&self) -> f64 { self.bandwidth_hz }
	pub fn tap_spacing(&self) -> usize { self.tap_spacing }
	pub fn discriminator(&self) -> CodeDiscriminator { self.discriminator }

	/// Smoothing gain of the first-order code filter
	pub fn gain(&self) -> f64 { 4.0 * self.t * self.bandwidth_hz }

	pub fn smoother(&self) -> FirstOrderSmoother { FirstOrderSmoother::new(self.gain()) }

}

pub fn design_dll(t:f64, bandwidth_hz:f64, tap_spacing:usize) -> Result<DllSpec, TrackErr> {
	check_positive("integration time", t)?;
	check_positive("DLL noise bandwidth", bandwidth_hz)?;
	if tap_spacing < 1 { return Err(TrackErr::config("early/late tap spacing must be at least one sample")); }

	let spec = DllSpec{ t, bandwidth_hz, tap_spacing, discriminator: CodeDiscriminator::Z4 };
	if spec.gain() >= 2.0 {
		warn!("DLL gain 4*T*B = {:.3} is not a contraction, the code filter will not settle", spec.gain());
	}
	Ok(spec)
}

/// Second-order loop filter, bilinear transform of H(s) = (2*zeta*wn*s + wn^2) / (s^2 + 2*zeta*wn*s + wn^2)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PllSpec {
	t:f64,
	bandwidth_hz:f64,
	damping:f64,
	wn:f64,
	a:[f64; 3],
	b:[f64; 3],
}

impl PllSpec {

	pub fn integration_time(&self) -> f64 { self.t }
	pub fn bandwidth_hz(&self) -> f64 { self.bandwidth_hz }
	pub fn damping(&self) -> f64 { self.damping }
	pub fn natural_freq(&self) -> f64 { self.wn }

	/// Denominator coefficients (a0, a1, a2)
	pub fn a(&self) -> [f64; 3] { self.a }
	/// Numerator coefficients (b0, b1, b2)
	pub fn b(&self) -> [f64; 3] { self.b }

	pub fn iir(&self) -> SecondOrderIIR { SecondOrderIIR::new(*self) }

}

pub fn design_pll(t:f64, bandwidth_hz:f64, damping:f64) -> Result<PllSpec, TrackErr> {
	check_positive("integration time", t)?;
	check_positive("PLL noise bandwidth", bandwidth_hz)?;
	check_positive("PLL damping ratio", damping)?;

	let wn:f64 = 4.0 * bandwidth_hz / (2.0*damping + 1.0/(2.0*damping));
	let wt2:f64 = (wn * t).powi(2);
	let zwt4:f64 = 4.0 * damping * wn * t;

	let a = [wt2 + zwt4 + 4.0, 2.0*wt2 - 8.0, wt2 - zwt4 + 4.0];
	let b = [wt2 + zwt4,       2.0*wt2,       wt2 - zwt4      ];

	Ok(PllSpec{ t, bandwidth_hz, damping, wn, a, b })
}

/// One step of the carrier loop filter.  `meas` holds the current and two previous discriminator outputs,
/// `filt` the two previous filter outputs, both newest first.
pub fn pll_iir(spec:&PllSpec, meas:[f64; 3], filt:[f64; 2]) -> f64 {
	let [a0, a1, a2] = spec.a;
	let [b0, b1, b2] = spec.b;
	(b0*meas[0] + b1*meas[1] + b2*meas[2] - a1*filt[0] - a2*filt[1]) / a0
}

/// Exponential smoother used on the code-phase error.  The first input passes through unfiltered.
#[derive(Debug, Clone)]
pub struct FirstOrderSmoother {
	pub gain:f64,
	last:Option<f64>,
}

impl FirstOrderSmoother {

	pub fn new(gain:f64) -> Self { Self{ gain, last: None } }

}

impl ScalarFilter for FirstOrderSmoother {

	fn apply(&mut self, x:f64) -> f64 {
		let y = match self.last {
			Some(prev) => prev + self.gain*(x - prev),
			None       => x,
		};
		self.last = Some(y);
		y
	}

	fn initialize(&mut self) {
		self.last = None;
	}

}

#[derive(Debug, Clone)]
pub struct SecondOrderIIR { spec:PllSpec,
						   x1: f64, x2: f64,
						   y1: f64, y2: f64 }

impl SecondOrderIIR {

	pub fn new(spec:PllSpec) -> Self { Self{ spec, x1: 0.0, x2: 0.0, y1: 0.0, y2: 0.0 } }

}

impl ScalarFilter for SecondOrderIIR {

	fn apply(&mut self, x:f64) -> f64 {
		let y = pll_iir(&self.spec, [x, self.x1, self.x2], [self.y1, self.y2]);
		self.x2 = self.x1;
		self.x1 = x;
		self.y2 = self.y1;
		self.y1 = y;
		y
	}

	fn initialize(&mut self) {
		self.x1 = 0.0;
		self.x2 = 0.0;
		self.y1 = 0.0;
		self.y2 = 0.0;
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn pll_coefficients_match_bilinear_design() {
		let (b, zeta, t) = (15.0, 1.4, 0.001);
		let spec = design_pll(t, b, zeta).unwrap();

		let wn = 4.0*b / (2.0*zeta + 1.0/(2.0*zeta));
		assert!((spec.natural_freq() - wn).abs() < 1.0e-9);

		let expected_a = [wn*wn*t*t + 4.0*zeta*t*wn + 4.0, 2.0*wn*wn*t*t - 8.0, wn*wn*t*t - 4.0*zeta*t*wn + 4.0];
		let expected_b = [wn*wn*t*t + 4.0*zeta*t*wn,       2.0*wn*wn*t*t,       wn*wn*t*t - 4.0*zeta*t*wn      ];
		for k in 0..3 {
			assert!((spec.a()[k] - expected_a[k]).abs() < 1.0e-9, "a{} = {}", k, spec.a()[k]);
			assert!((spec.b()[k] - expected_b[k]).abs() < 1.0e-9, "b{} = {}", k, spec.b()[k]);
		}
	}

	#[test]
	fn pll_rejects_zero_damping() {
		match design_pll(0.001, 15.0, 0.0) {
			Err(TrackErr::InvalidConfiguration(_)) => (),
			other => panic!("expected InvalidConfiguration, got {:?}", other),
		}
		assert!(design_pll(-0.001, 15.0, 0.7).is_err());
		assert!(design_pll(0.001, f64::NAN, 0.7).is_err());
	}

	#[test]
	fn dll_validation() {
		let spec = design_dll(0.001, 1.0, 2).unwrap();
		assert!((spec.gain() - 0.004).abs() < 1.0e-15);
		assert_eq!(spec.discriminator(), CodeDiscriminator::Z4);
		assert!(design_dll(0.001, 1.0, 0).is_err());
		assert!(design_dll(0.0, 1.0, 1).is_err());
		assert!(design_dll(0.001, -2.0, 1).is_err());
	}

	#[test]
	fn smoother_passes_first_sample_and_converges() {
		let c = 0.3;
		let mut f = design_dll(0.001, 20.0, 1).unwrap().smoother();
		assert_eq!(f.apply(1.0), 1.0);

		let mut last_gap = (1.0f64 - c).abs();
		for _ in 0..500 {
			let y = f.apply(c);
			let gap = (y - c).abs();
			assert!(gap <= last_gap);
			last_gap = gap;
		}
		assert!(last_gap < 1.0e-6);

		f.initialize();
		assert_eq!(f.apply(-4.0), -4.0);
	}

	#[test]
	fn iir_state_matches_pure_function() {
		let spec = design_pll(0.001, 15.0, 0.7).unwrap();
		let mut iir = spec.iir();
		let inputs = [0.1, -0.05, 0.2, 0.0, 0.03];

		let mut meas = [0.0; 3];
		let mut filt = [0.0; 2];
		for x in inputs.iter() {
			meas = [*x, meas[0], meas[1]];
			let expected = pll_iir(&spec, meas, filt);
			filt = [expected, filt[0]];
			assert!((iir.apply(*x) - expected).abs() < 1.0e-15);
		}
	}

	#[test]
	fn iir_has_unity_dc_gain() {
		// H(1) = sum(b) / sum(a) = 1 for the closed-loop transfer function
		let spec = design_pll(0.001, 15.0, 0.7).unwrap();
		let mut iir = spec.iir();
		let mut y = 0.0;
		for _ in 0..20000 { y = iir.apply(1.0); }
		assert!((y - 1.0).abs() < 1.0e-6);
	}

}
