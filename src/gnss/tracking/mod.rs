
use std::f64::consts::PI;

use log::{info, warn};
use nalgebra::{DMatrix, DVector};

use crate::TrackErr;
use crate::filters::{DllSpec, PllSpec, FirstOrderSmoother, ScalarFilter, design_dll, design_pll};
use crate::filters::kalman::{KalmanModel, design_kalman, measurement_noise_from_cn0};
use crate::fourier_analysis::CircularCorrelator;
use crate::gnss::replica::{ReplicaGenerator, ReplicaParams};
use crate::gnss::source::SampleSource;
use crate::utils::{snr_db, wrap_phase};

pub mod config;
pub mod correlator;
pub mod discriminators;
pub mod gain;
pub mod progress;
pub mod result;


pub use self::config::{GainMode, InitialEstimate, TrackingConfig};
pub use self::correlator::{CarrierEstimate, CorrelatorTriple};
pub use self::gain::{AdaptiveGain, FixedGain, GainPolicy};
pub use self::progress::{Callback, LogProgress, NoProgress, ProgressReporter};
pub use self::result::{KalmanRecord, PeriodRecord, RunMetadata, TrackResult, TrackResultBuilder};

// Relative tolerance on |P - P'| before the covariance is declared broken
const SYMMETRY_TOLERANCE:f64 = 1.0e-6;

/// Sizes and designs shared by both gain policies
struct Setup {
	n:usize,
	m:usize,
	t:f64,
	fs:f64,
	intermediate_freq:f64,
	dll:DllSpec,
	pll:PllSpec,
	model:KalmanModel,
	r:f64,
}

impl Setup {

	fn new<S, R>(config:&TrackingConfig, source:&S, replica:&R) -> Result<Self, TrackErr>
		where S: SampleSource + ?Sized, R: ReplicaGenerator + ?Sized {
		config.validate()?;

		if replica.signal_type() != config.signal || replica.prn() != config.prn {
			return Err(TrackErr::config(format!("replica is {} PRN {} but the configuration asks for {} PRN {}",
				replica.signal_type(), replica.prn(), config.signal, config.prn)));
		}

		let fs:f64 = source.sample_rate_sps();
		if !(fs > 0.0) { return Err(TrackErr::config(format!("sample rate must be positive, got {}", fs))); }
		if (replica.sample_rate_sps() - fs).abs() > 1.0e-9 * fs {
			return Err(TrackErr::config(format!("replica is sampled at {} [samples/sec] but the source at {}", replica.sample_rate_sps(), fs)));
		}
		if source.time().len() != source.samples().len() {
			return Err(TrackErr::LengthMismatch{ field: "time", expected: source.samples().len(), actual: source.time().len() });
		}

		let n:usize = (fs * config.integration_time_s()).round() as usize;
		if n <= 2 {
			return Err(TrackErr::config(format!("{} samples per period is too few", n)));
		}
		if replica.sample_count() != n {
			return Err(TrackErr::config(format!("replica holds {} samples but a period is {}", replica.sample_count(), n)));
		}
		if config.tap_spacing >= n {
			return Err(TrackErr::config(format!("tap spacing {} must be less than the {} samples in a period", config.tap_spacing, n)));
		}

		let m:usize = source.samples().len() / n;
		if m < 1 {
			return Err(TrackErr::config(format!("source holds {} samples, less than one {}-sample period", source.samples().len(), n)));
		}

		// The sample grid sets the period actually integrated
		let t:f64 = (n as f64) / fs;
		if (t - config.integration_time_s()).abs() > 1.0e-9 {
			warn!("Period of {} samples lasts {:.9} [s] instead of {:.9} [s]", n, t, config.integration_time_s());
		}

		let dll = design_dll(t, config.dll_bandwidth_hz, config.tap_spacing)?;
		let pll = design_pll(t, config.pll_bandwidth_hz, config.pll_damping)?;
		let model = design_kalman(t, config.h0, config.h_2, config.qa, config.signal.carrier_freq_hz(), config.state_count)?;
		let r = match config.measurement_noise {
			Some(r) => r,
			None    => measurement_noise_from_cn0(config.assumed_cn0_dbhz, t),
		};

		Ok(Self{ n, m, t, fs, intermediate_freq: source.intermediate_freq_hz(), dll, pll, model, r })
	}

}

/// Closed-loop code and carrier tracker for one PRN.  State is [phase rad, Doppler rad/s (, Doppler rate rad/s^2)].
struct Tracking<G: GainPolicy> {
	setup:Setup,
	policy:G,
	code_filter:FirstOrderSmoother,
	snr_correlator:CircularCorrelator,
	tap_spacing:usize,
	period:usize,
	x_prior:DVector<f64>,
	p_post:DMatrix<f64>,
	code_index:f64,
	builder:TrackResultBuilder,
}

impl<G: GainPolicy> Tracking<G> {

	fn new(config:&TrackingConfig, setup:Setup, policy:G) -> Self {
		let init = &config.initial;
		let state:[f64; 3] = [init.carrier_phase_rad, 2.0*PI*init.doppler_hz, 2.0*PI*init.doppler_rate_hz_s];
		let sigma:[f64; 3] = [config.sigma_phase_rad, 2.0*PI*config.sigma_doppler_hz, 2.0*PI*config.sigma_doppler_rate_hz_s];

		let n_states = setup.model.state_count;
		let x_prior = DVector::from_row_slice(&state[..n_states]);
		let p_post = DMatrix::from_diagonal(&DVector::from_iterator(n_states, sigma[..n_states].iter().map(|s| s*s)));

		let code_filter = setup.dll.smoother();
		let snr_correlator = CircularCorrelator::new(setup.n);
		let builder = TrackResultBuilder::with_capacity(setup.m);
		let code_length = config.signal.code_length();

		Self{ setup, policy, code_filter, snr_correlator, tap_spacing: config.tap_spacing, period: 0,
			x_prior, p_post, code_index: wrap_phase(init.code_phase_chips, code_length), builder }
	}

	fn doppler(x:&DVector<f64>) -> (f64, f64) {
		let rate = if x.len() > 2 { x[2] / (2.0*PI) } else { 0.0 };
		(x[1] / (2.0*PI), rate)
	}

	/// Runs one integration period and records it
	fn step<S, R>(&mut self, source:&S, replica:&R) -> Result<(), TrackErr>
		where S: SampleSource + ?Sized, R: ReplicaGenerator + ?Sized {
		let (n, t) = (self.setup.n, self.setup.t);
		let code_length = replica.code_length();
		let start = self.period * n;

		// Current estimate and the replica it implies
		let x_prior = self.x_prior.clone();
		let (doppler_hz, doppler_rate) = Self::doppler(&x_prior);
		let code_rate = replica.chipping_rate_hz() * (1.0 + doppler_hz / replica.carrier_freq_hz());
		let code_start_idx = -self.code_index * self.setup.fs / code_rate;

		let local = replica.generate(&ReplicaParams{ doppler_hz, doppler_rate_hz_s: doppler_rate, carrier_phase_rad: x_prior[0],
			code_start_idx, include_carrier: false });
		if local.samples.len() != n {
			return Err(TrackErr::LengthMismatch{ field: "replica samples", expected: n, actual: local.samples.len() });
		}

		let time = source.time();
		let carrier = CarrierEstimate {
			intermediate_freq_hz: self.setup.intermediate_freq,
			doppler_hz,
			doppler_rate_hz_s: doppler_rate,
			phase_rad: x_prior[0] + 2.0*PI*self.setup.intermediate_freq*(time[start] - time[0]),
		};
		let wiped = correlator::wipe_carrier(source.samples(), time, self.period, n, &carrier)?;
		let triple = correlator::correlate_wiped(&wiped, &local.samples, self.tap_spacing)?;

		// Carrier loop
		let model = &self.setup.model;
		let p_prior = model.predict_covariance(&self.p_post);
		let carrier_err = discriminators::pll_atan2(triple.prompt);
		let dfd = carrier_err / t;

		let k = model.gain(&p_prior, self.setup.r);
		let p_post = check_symmetric(model.update_covariance(&p_prior, &k), self.period)?;
		let x_post = self.policy.correct(&x_prior, &k, carrier_err);

		// Code loop
		let code_err_meas = discriminators::dll_z4(triple.early, triple.late)
			.map_err(|_| TrackErr::degenerate(format!("period {}: early and late correlators carry no energy", self.period)))?;
		let code_err_filt = self.code_filter.apply(code_err_meas);

		let snr = snr_db(&self.snr_correlator.correlate(&wiped, &local.samples)?)?;
		let (doppler_post, _) = Self::doppler(&x_post);

		self.builder.push(PeriodRecord {
			code_err_meas,
			code_err_filt,
			code_phase_meas: wrap_phase(self.code_index + code_err_meas, code_length),
			code_phase_filt: wrap_phase(self.code_index + code_err_filt, code_length),
			code_index: self.code_index,
			carrier_err_meas: carrier_err,
			carrier_phase: x_post[0],
			doppler_rate_correction: dfd,
			doppler_hz: doppler_post,
			prompt: triple.prompt,
			snr_db: snr,
			data_bit: if triple.prompt.re > 0.0 { 1 } else { 0 },
			kalman: KalmanRecord{ k, p_prior, p_post: p_post.clone(), x_prior, x_post: x_post.clone() },
		});

		// Position the next period
		let code_rate_post = replica.chipping_rate_hz() * (1.0 + doppler_post / replica.carrier_freq_hz());
		self.code_index = wrap_phase(self.code_index + code_err_filt + code_rate_post * t, code_length);
		self.x_prior = &model.a * x_post;
		self.p_post = p_post;
		self.period += 1;

		Ok(())
	}

}

fn check_symmetric(p:DMatrix<f64>, period:usize) -> Result<DMatrix<f64>, TrackErr> {
	let scale = p.amax();
	let asymmetry = (&p - p.transpose()).amax();
	if !scale.is_finite() || !asymmetry.is_finite() || asymmetry > SYMMETRY_TOLERANCE * scale {
		return Err(TrackErr::degenerate(format!("period {}: covariance lost symmetry ({:.3e} against {:.3e})", period, asymmetry, scale)));
	}
	Ok((&p + p.transpose()) * 0.5)
}

fn run<G, S, R, P>(config:&TrackingConfig, setup:Setup, policy:G, source:&S, replica:&R, progress:&mut P) -> Result<TrackResult, TrackErr>
	where G: GainPolicy, S: SampleSource + ?Sized, R: ReplicaGenerator + ?Sized, P: ProgressReporter + ?Sized {
	let m = setup.m;
	let metadata = RunMetadata {
		prn: config.prn,
		signal: config.signal,
		signal_name: config.signal.display_name().to_string(),
		provenance: source.provenance(),
		initial: config.initial,
		sample_rate_sps: setup.fs,
		intermediate_freq_hz: setup.intermediate_freq,
		adc_bits: source.adc_bits(),
		samples_per_period: setup.n,
		integration_time_s: setup.t,
		gain_mode: config.gain_mode,
		measurement_noise: setup.r,
		dll: setup.dll,
		pll: setup.pll,
		model: setup.model.clone(),
	};

	info!("Tracking {} PRN {} over {} periods of {} samples with {} gain", config.signal, config.prn, m, setup.n, policy.name());

	let mut tracking = Tracking::new(config, setup, policy);
	for period in 0..m {
		tracking.step(source, replica)?;
		progress.period_done(period + 1, m);
	}

	let result = tracking.builder.build(metadata, m)?;
	if let Some(last) = result.doppler_hz().last() {
		info!("Finished {} PRN {}, final Doppler {:.3} [Hz]", config.signal, config.prn, last);
	}
	Ok(result)
}

/// Tracks `config.prn` through every whole period available in `source`
pub fn track<S, R, P>(config:&TrackingConfig, source:&S, replica:&R, progress:&mut P) -> Result<TrackResult, TrackErr>
	where S: SampleSource + ?Sized, R: ReplicaGenerator + ?Sized, P: ProgressReporter + ?Sized {
	let setup = Setup::new(config, source, replica)?;
	match config.gain_mode {
		GainMode::Adaptive => run(config, setup, AdaptiveGain, source, replica, progress),
		GainMode::Fixed    => {
			let policy = FixedGain::new(&setup.model, setup.r)?;
			run(config, setup, policy, source, replica, progress)
		},
	}
}
