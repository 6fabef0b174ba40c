
use std::f64::consts::PI;

use log::trace;
use nalgebra::{DMatrix, DVector, RowDVector};
use serde::Serialize;

use crate::TrackErr;
use crate::filters::check_positive;
use crate::gnss::constants::SPEED_OF_LIGHT;

const SDA_MAX_ITER:usize = 100;
const SDA_TOLERANCE:f64 = 1.0e-12;

fn check_state_count(state_count:usize) -> Result<(), TrackErr> {
	match state_count {
		2 | 3 => Ok(()),
		n     => Err(TrackErr::config(format!("Kalman state count must be 2 or 3, got {}", n))),
	}
}

/// State transition for a constant-velocity (2) or constant-acceleration (3) carrier phase model
pub fn calc_a(t:f64, state_count:usize) -> Result<DMatrix<f64>, TrackErr> {
	check_state_count(state_count)?;
	Ok(match state_count {
		2 => DMatrix::from_row_slice(2, 2, &[1.0,   t,
		                                     0.0, 1.0]),
		_ => DMatrix::from_row_slice(3, 3, &[1.0,   t, t*t/2.0,
		                                     0.0, 1.0,       t,
		                                     0.0, 0.0,     1.0]),
	})
}

/// Maps the state at the start of an integration period onto the phase averaged over that period
pub fn calc_c(t:f64, state_count:usize) -> Result<RowDVector<f64>, TrackErr> {
	check_state_count(state_count)?;
	Ok(match state_count {
		2 => RowDVector::from_row_slice(&[1.0, t/2.0]),
		_ => RowDVector::from_row_slice(&[1.0, t/2.0, t*t/6.0]),
	})
}

/// Process noise from the oscillator phase (h0) and frequency random walk (h_2) PSD coefficients.  The 3-state
/// model adds white jerk with PSD `qa` [m^2/s^5], normalized by c^2 to get [s^2/s^5] before the carrier scaling.
pub fn calc_q(t:f64, h0:f64, h_2:f64, qa:f64, carrier_freq_hz:f64, state_count:usize) -> Result<DMatrix<f64>, TrackErr> {
	check_state_count(state_count)?;

	// Oscillator terms are in [s^2], scaled to [rad^2] by the carrier
	let scale:f64 = (2.0 * PI * carrier_freq_hz).powi(2);
	let pi_sq:f64 = PI * PI;
	let q_phase:f64 = (h0 / 2.0)*t + 2.0*pi_sq*h_2*t.powi(3)/3.0;
	let q_cross:f64 = pi_sq*h_2*t.powi(2);
	let q_freq:f64  = 2.0*pi_sq*h_2*t;

	let q = match state_count {
		2 => DMatrix::from_row_slice(2, 2, &[q_phase, q_cross,
		                                     q_cross, q_freq ]),
		_ => {
			let qd:f64 = qa / SPEED_OF_LIGHT.powi(2);
			DMatrix::from_row_slice(3, 3, &[
				q_phase + qd*t.powi(5)/20.0, q_cross + qd*t.powi(4)/8.0, qd*t.powi(3)/6.0,
				q_cross + qd*t.powi(4)/8.0,  q_freq  + qd*t.powi(3)/3.0, qd*t.powi(2)/2.0,
				qd*t.powi(3)/6.0,            qd*t.powi(2)/2.0,           qd*t            ])
		},
	};

	Ok(q * scale)
}

/// Stationary carrier-tracking model.  States are [phase rad, frequency rad/s (, frequency rate rad/s^2)].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KalmanModel {
	pub state_count:usize,
	pub t:f64,
	pub a:DMatrix<f64>,
	pub c:RowDVector<f64>,
	pub q:DMatrix<f64>,
}

pub fn design_kalman(t:f64, h0:f64, h_2:f64, qa:f64, carrier_freq_hz:f64, state_count:usize) -> Result<KalmanModel, TrackErr> {
	check_state_count(state_count)?;
	check_positive("integration time", t)?;
	check_positive("carrier frequency", carrier_freq_hz)?;
	for (name, x) in [("h0", h0), ("h_2", h_2), ("qa", qa)].iter() {
		if !(*x >= 0.0) { return Err(TrackErr::config(format!("{} must be non-negative, got {}", name, x))); }
	}

	Ok(KalmanModel {
		state_count, t,
		a: calc_a(t, state_count)?,
		c: calc_c(t, state_count)?,
		q: calc_q(t, h0, h_2, qa, carrier_freq_hz, state_count)?,
	})
}

impl KalmanModel {

	/// P- = A P+ A' + Q
	pub fn predict_covariance(&self, p_post:&DMatrix<f64>) -> DMatrix<f64> {
		&self.a * p_post * self.a.transpose() + &self.q
	}

	/// K = P- C' / (C P- C' + R)
	pub fn gain(&self, p_prior:&DMatrix<f64>, r:f64) -> DVector<f64> {
		let ct:DVector<f64> = self.c.transpose();
		let pct:DVector<f64> = p_prior * &ct;
		let innovation_var:f64 = ct.dot(&pct) + r;
		pct / innovation_var
	}

	/// P+ = (I - K C) P-
	pub fn update_covariance(&self, p_prior:&DMatrix<f64>, k:&DVector<f64>) -> DMatrix<f64> {
		let eye = DMatrix::<f64>::identity(self.state_count, self.state_count);
		(eye - k * &self.c) * p_prior
	}

}

/// Steady-state Kalman gain.  Solves the filter Riccati equation
///
///   P = A P A' - A P C' (C P C' + R)^-1 C P A' + Q
///
/// for the a-priori covariance with the structured doubling algorithm, then forms K from P.
pub fn steady_state_gain(model:&KalmanModel, r:f64) -> Result<DVector<f64>, TrackErr> {
	check_positive("measurement noise", r)?;

	let n = model.state_count;
	let eye = DMatrix::<f64>::identity(n, n);
	let ct:DVector<f64> = model.c.transpose();

	// Dual of the control-form iteration: A -> A', B -> C'
	let mut a_k:DMatrix<f64> = model.a.transpose();
	let mut g_k:DMatrix<f64> = (&ct * &model.c) / r;
	let mut h_k:DMatrix<f64> = model.q.clone();

	for iter in 0..SDA_MAX_ITER {
		let w:DMatrix<f64> = (&eye + &g_k * &h_k).try_inverse()
			.ok_or_else(|| TrackErr::degenerate("singular matrix while solving the Riccati equation"))?;

		let a_next = &a_k * &w * &a_k;
		let g_next = &g_k + &a_k * &w * &g_k * a_k.transpose();
		let h_next = &h_k + a_k.transpose() * &h_k * &w * &a_k;

		let change:f64 = (&h_next - &h_k).norm() / h_next.norm().max(f64::MIN_POSITIVE);
		trace!("Riccati doubling step {}: relative change {:.3e}", iter, change);

		a_k = a_next;
		g_k = g_next;
		h_k = h_next;

		if !change.is_finite() { break; }
		if change < SDA_TOLERANCE { return Ok(model.gain(&h_k, r)); }
	}

	Err(TrackErr::degenerate("Riccati equation did not converge"))
}

/// Variance of the PLL phase discriminator [rad^2] for a given C/N0, including the squaring loss term
pub fn measurement_noise_from_cn0(cn0_dbhz:f64, t:f64) -> f64 {
	let cn0:f64 = 10.0_f64.powf(cn0_dbhz / 10.0);
	let x:f64 = 1.0 / (2.0 * t * cn0);
	x * (1.0 + x)
}
