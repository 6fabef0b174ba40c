
use nalgebra::DVector;

use crate::TrackErr;
use crate::filters::kalman::{KalmanModel, steady_state_gain};

/// How the phase innovation is turned into a state correction.  Chosen once before the loop starts.
pub trait GainPolicy {

	/// Gain to apply this period, given the time-varying Kalman gain just computed from the covariance
	fn gain<'a>(&'a self, kalman_gain:&'a DVector<f64>) -> &'a DVector<f64>;

	fn name(&self) -> &'static str;

	fn correct(&self, x_prior:&DVector<f64>, kalman_gain:&DVector<f64>, phase_err:f64) -> DVector<f64> {
		x_prior + self.gain(kalman_gain) * phase_err
	}

}

pub struct AdaptiveGain;

impl GainPolicy for AdaptiveGain {
	fn gain<'a>(&'a self, kalman_gain:&'a DVector<f64>) -> &'a DVector<f64> { kalman_gain }
	fn name(&self) -> &'static str { "adaptive" }
}

/// Steady-state gain from the Riccati equation.  It multiplies the phase innovation only, the same way the
/// adaptive gain does.
pub struct FixedGain {
	k:DVector<f64>,
}

impl FixedGain {

	pub fn new(model:&KalmanModel, r:f64) -> Result<Self, TrackErr> {
		Ok(Self{ k: steady_state_gain(model, r)? })
	}

	pub fn steady_state(&self) -> &DVector<f64> { &self.k }

}

impl GainPolicy for FixedGain {
	fn gain<'a>(&'a self, _kalman_gain:&'a DVector<f64>) -> &'a DVector<f64> { &self.k }
	fn name(&self) -> &'static str { "fixed" }
}

#[cfg(test)]
mod tests {

	use super::*;

	use crate::filters::kalman::{design_kalman, measurement_noise_from_cn0};

	#[test]
	fn policies_pick_their_gain() {
		let model = design_kalman(0.001, 2.0e-19, 2.0e-20, 1.0, 1.57542e9, 2).unwrap();
		let r = measurement_noise_from_cn0(45.0, 0.001);
		let fixed = FixedGain::new(&model, r).unwrap();
		let k_i = DVector::from_vec(vec![0.9, 30.0]);
		let x = DVector::from_vec(vec![1.0, 2.0]);

		assert_eq!(AdaptiveGain.correct(&x, &k_i, 0.1), DVector::from_vec(vec![1.0 + 0.9*0.1, 2.0 + 30.0*0.1]));

		let corrected = fixed.correct(&x, &k_i, 0.1);
		assert_eq!(corrected, &x + fixed.steady_state() * 0.1);
		// No frequency term rides along with a zero phase error
		assert_eq!(fixed.correct(&x, &k_i, 0.0), x);
		assert_eq!(fixed.name(), "fixed");
	}

}
