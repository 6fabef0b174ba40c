
use nalgebra::{DMatrix, DVector};
use num_complex::Complex;
use serde::Serialize;

use crate::TrackErr;
use crate::filters::{DllSpec, PllSpec};
use crate::filters::kalman::KalmanModel;
use crate::gnss::signal::SignalType;
use crate::gnss::source::Provenance;
use crate::gnss::tracking::config::{GainMode, InitialEstimate};

/// Filter internals for one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KalmanRecord {
	pub k:DVector<f64>,
	pub p_prior:DMatrix<f64>,
	pub p_post:DMatrix<f64>,
	pub x_prior:DVector<f64>,
	pub x_post:DVector<f64>,
}

/// Everything recorded for one integration period
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodRecord {
	pub code_err_meas:f64,
	pub code_err_filt:f64,
	pub code_phase_meas:f64,
	pub code_phase_filt:f64,
	pub code_index:f64,
	pub carrier_err_meas:f64,
	pub carrier_phase:f64,
	pub doppler_rate_correction:f64,
	pub doppler_hz:f64,
	pub prompt:Complex<f64>,
	pub snr_db:f64,
	pub data_bit:u8,
	pub kalman:KalmanRecord,
}

/// Run-level values that do not change from period to period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
	pub prn:usize,
	pub signal:SignalType,
	pub signal_name:String,
	pub provenance:Provenance,
	pub initial:InitialEstimate,
	pub sample_rate_sps:f64,
	pub intermediate_freq_hz:f64,
	pub adc_bits:Option<u8>,
	pub samples_per_period:usize,
	pub integration_time_s:f64,
	pub gain_mode:GainMode,
	pub measurement_noise:f64,
	pub dll:DllSpec,
	pub pll:PllSpec,
	pub model:KalmanModel,
}

/// Staging area for the per-period series.  `build` checks that every series covers every period.
#[derive(Debug, Clone, Default)]
pub struct TrackResultBuilder {
	pub code_err_meas:Vec<f64>,
	pub code_err_filt:Vec<f64>,
	pub code_phase_meas:Vec<f64>,
	pub code_phase_filt:Vec<f64>,
	pub code_index:Vec<f64>,
	pub carrier_err_meas:Vec<f64>,
	pub carrier_phase:Vec<f64>,
	pub doppler_rate_correction:Vec<f64>,
	pub doppler_hz:Vec<f64>,
	pub prompt:Vec<Complex<f64>>,
	pub snr_db:Vec<f64>,
	pub data_bits:Vec<u8>,
	pub kalman:Vec<KalmanRecord>,
}

impl TrackResultBuilder {

	pub fn with_capacity(m:usize) -> Self {
		Self {
			code_err_meas: Vec::with_capacity(m),
			code_err_filt: Vec::with_capacity(m),
			code_phase_meas: Vec::with_capacity(m),
			code_phase_filt: Vec::with_capacity(m),
			code_index: Vec::with_capacity(m),
			carrier_err_meas: Vec::with_capacity(m),
			carrier_phase: Vec::with_capacity(m),
			doppler_rate_correction: Vec::with_capacity(m),
			doppler_hz: Vec::with_capacity(m),
			prompt: Vec::with_capacity(m),
			snr_db: Vec::with_capacity(m),
			data_bits: Vec::with_capacity(m),
			kalman: Vec::with_capacity(m),
		}
	}

	pub fn push(&mut self, p:PeriodRecord) {
		self.code_err_meas.push(p.code_err_meas);
		self.code_err_filt.push(p.code_err_filt);
		self.code_phase_meas.push(p.code_phase_meas);
		self.code_phase_filt.push(p.code_phase_filt);
		self.code_index.push(p.code_index);
		self.carrier_err_meas.push(p.carrier_err_meas);
		self.carrier_phase.push(p.carrier_phase);
		self.doppler_rate_correction.push(p.doppler_rate_correction);
		self.doppler_hz.push(p.doppler_hz);
		self.prompt.push(p.prompt);
		self.snr_db.push(p.snr_db);
		self.data_bits.push(p.data_bit);
		self.kalman.push(p.kalman);
	}

	pub fn build(self, metadata:RunMetadata, period_count:usize) -> Result<TrackResult, TrackErr> {
		let lengths:[(&'static str, usize); 13] = [
			("code_err_meas", self.code_err_meas.len()),
			("code_err_filt", self.code_err_filt.len()),
			("code_phase_meas", self.code_phase_meas.len()),
			("code_phase_filt", self.code_phase_filt.len()),
			("code_index", self.code_index.len()),
			("carrier_err_meas", self.carrier_err_meas.len()),
			("carrier_phase", self.carrier_phase.len()),
			("doppler_rate_correction", self.doppler_rate_correction.len()),
			("doppler_hz", self.doppler_hz.len()),
			("prompt", self.prompt.len()),
			("snr_db", self.snr_db.len()),
			("data_bits", self.data_bits.len()),
			("kalman", self.kalman.len()),
		];
		for (field, actual) in lengths.iter() {
			if *actual != period_count {
				return Err(TrackErr::LengthMismatch{ field: *field, expected: period_count, actual: *actual });
			}
		}

		Ok(TrackResult {
			metadata,
			period_count,
			code_err_meas: self.code_err_meas,
			code_err_filt: self.code_err_filt,
			code_phase_meas: self.code_phase_meas,
			code_phase_filt: self.code_phase_filt,
			code_index: self.code_index,
			carrier_err_meas: self.carrier_err_meas,
			carrier_phase: self.carrier_phase,
			doppler_rate_correction: self.doppler_rate_correction,
			doppler_hz: self.doppler_hz,
			prompt: self.prompt,
			snr_db: self.snr_db,
			data_bits: self.data_bits,
			kalman: self.kalman,
		})
	}

}

/// Output of one tracking run.  Code quantities are in chips, carrier quantities in radians except where the
/// name says otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct TrackResult {
	metadata:RunMetadata,
	period_count:usize,
	code_err_meas:Vec<f64>,
	code_err_filt:Vec<f64>,
	code_phase_meas:Vec<f64>,
	code_phase_filt:Vec<f64>,
	code_index:Vec<f64>,
	carrier_err_meas:Vec<f64>,
	carrier_phase:Vec<f64>,
	doppler_rate_correction:Vec<f64>,
	doppler_hz:Vec<f64>,
	prompt:Vec<Complex<f64>>,
	snr_db:Vec<f64>,
	data_bits:Vec<u8>,
	kalman:Vec<KalmanRecord>,
}

impl TrackResult {

	pub fn metadata(&self) -> &RunMetadata { &self.metadata }
	pub fn period_count(&self) -> usize { self.period_count }

	pub fn code_err_meas(&self) -> &[f64] { &self.code_err_meas }
	pub fn code_err_filt(&self) -> &[f64] { &self.code_err_filt }
	pub fn code_phase_meas(&self) -> &[f64] { &self.code_phase_meas }
	pub fn code_phase_filt(&self) -> &[f64] { &self.code_phase_filt }
	/// Code phase index n0 at the start of each period
	pub fn code_index(&self) -> &[f64] { &self.code_index }
	pub fn carrier_err_meas(&self) -> &[f64] { &self.carrier_err_meas }
	/// Accumulated carrier phase excluding the intermediate frequency
	pub fn carrier_phase(&self) -> &[f64] { &self.carrier_phase }
	/// Phase error divided by the integration time [rad/s]
	pub fn doppler_rate_correction(&self) -> &[f64] { &self.doppler_rate_correction }
	pub fn doppler_hz(&self) -> &[f64] { &self.doppler_hz }
	pub fn prompt(&self) -> &[Complex<f64>] { &self.prompt }
	pub fn snr_db(&self) -> &[f64] { &self.snr_db }
	pub fn data_bits(&self) -> &[u8] { &self.data_bits }
	pub fn kalman(&self) -> &[KalmanRecord] { &self.kalman }

}
