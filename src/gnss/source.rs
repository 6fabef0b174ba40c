
use num_complex::Complex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Serialize, Deserialize};

use crate::TrackErr;
use crate::gnss::replica::{PrnReplica, ReplicaGenerator, ReplicaParams, code_rate_hz};

/// Bookkeeping that travels with the samples into the tracking result.  Each field is `None` when the source
/// has nothing meaningful to report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
	pub source_name:Option<String>,
	pub start_time_unix_s:Option<f64>,
	pub observer_location:Option<[f64; 3]>,
}

pub trait SampleProvenance {
	fn provenance(&self) -> Provenance;
}

/// A finite buffer of baseband samples with their sample times [s]
pub trait SampleSource: SampleProvenance {

	fn samples(&self) -> &[Complex<f64>];
	fn time(&self) -> &[f64];
	fn sample_rate_sps(&self) -> f64;
	fn intermediate_freq_hz(&self) -> f64;
	fn adc_bits(&self) -> Option<u8>;

	fn len(&self) -> usize { self.samples().len() }
	fn duration_s(&self) -> f64 { (self.len() as f64) / self.sample_rate_sps() }

}

/// Parameters of the simulated signal as it arrives at the antenna
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalTruth {
	pub code_phase_chips:f64,
	pub doppler_hz:f64,
	pub doppler_rate_hz_s:f64,
	pub carrier_phase_rad:f64,
}

/// One PRN at unit amplitude, optionally buried in complex white noise at a given C/N0
pub struct SimulatedSource {
	samples:Vec<Complex<f64>>,
	time:Vec<f64>,
	fs:f64,
	intermediate_freq:f64,
	label:String,
}

impl SimulatedSource {

	pub fn new(replica:&PrnReplica, truth:SignalTruth, sample_count:usize, cn0_dbhz:Option<f64>, seed:u64) -> Result<Self, TrackErr> {
		let fs:f64 = replica.sample_rate_sps();
		let code_rate:f64 = code_rate_hz(replica.signal_type(), truth.doppler_hz);

		let params = ReplicaParams {
			doppler_hz: truth.doppler_hz,
			doppler_rate_hz_s: truth.doppler_rate_hz_s,
			carrier_phase_rad: truth.carrier_phase_rad,
			code_start_idx: -truth.code_phase_chips * fs / code_rate,
			include_carrier: true,
		};
		let mut samples:Vec<Complex<f64>> = replica.synthesize(&params, 0, sample_count);

		if let Some(cn0) = cn0_dbhz {
			// Unit carrier power, so N0 = 1/(C/N0) and each quadrature gets half of N0*fs
			let sigma:f64 = (fs / (2.0 * 10.0_f64.powf(cn0 / 10.0))).sqrt();
			let normal = Normal::new(0.0, sigma).map_err(|e| TrackErr::config(format!("bad noise level: {}", e)))?;
			let mut rng = StdRng::seed_from_u64(seed);
			for s in samples.iter_mut() {
				*s += Complex{ re: normal.sample(&mut rng), im: normal.sample(&mut rng) };
			}
		}

		let time:Vec<f64> = (0..sample_count).map(|k| (k as f64) / fs).collect();
		let label = format!("simulated {} PRN {}", replica.signal_type(), replica.prn());

		Ok(Self{ samples, time, fs, intermediate_freq: replica.intermediate_freq_hz(), label })
	}

	/// Replaces the samples, keeping the timing.  Used to feed the tracker deliberately broken input.
	pub fn with_samples(mut self, samples:Vec<Complex<f64>>) -> Result<Self, TrackErr> {
		if samples.len() != self.samples.len() {
			return Err(TrackErr::LengthMismatch{ field: "samples", expected: self.samples.len(), actual: samples.len() });
		}
		self.samples = samples;
		Ok(self)
	}

	pub fn label(&self) -> &str { &self.label }

}

impl SampleProvenance for SimulatedSource {
	fn provenance(&self) -> Provenance { Provenance::default() }
}

impl SampleSource for SimulatedSource {
	fn samples(&self) -> &[Complex<f64>] { &self.samples }
	fn time(&self) -> &[f64] { &self.time }
	fn sample_rate_sps(&self) -> f64 { self.fs }
	fn intermediate_freq_hz(&self) -> f64 { self.intermediate_freq }
	fn adc_bits(&self) -> Option<u8> { None }
}

#[cfg(test)]
mod tests {

	use super::*;

	use crate::gnss::signal::SignalType;

	fn truth() -> SignalTruth {
		SignalTruth{ code_phase_chips: 200.25, doppler_hz: -1500.0, doppler_rate_hz_s: 0.0, carrier_phase_rad: 0.0 }
	}

	#[test]
	fn noise_free_source_is_the_replica() {
		let replica = PrnReplica::new(SignalType::GpsL1Ca, 9, 2.046e6, 0.0, 2046).unwrap();
		let src = SimulatedSource::new(&replica, truth(), 4092, None, 0).unwrap();
		assert_eq!(src.len(), 4092);
		assert!((src.duration_s() - 2.0e-3).abs() < 1.0e-12);
		assert!(src.samples().iter().all(|s| (s.norm() - 1.0).abs() < 1.0e-12));
		assert_eq!(src.time()[2046], 1.0e-3);
		assert_eq!(src.provenance(), Provenance::default());
		assert_eq!(src.adc_bits(), None);
	}

	#[test]
	fn seeded_noise_is_repeatable() {
		let replica = PrnReplica::new(SignalType::GpsL1Ca, 9, 2.046e6, 0.0, 2046).unwrap();
		let a = SimulatedSource::new(&replica, truth(), 2046, Some(45.0), 7).unwrap();
		let b = SimulatedSource::new(&replica, truth(), 2046, Some(45.0), 7).unwrap();
		let c = SimulatedSource::new(&replica, truth(), 2046, Some(45.0), 8).unwrap();
		assert_eq!(a.samples(), b.samples());
		assert!(a.samples() != c.samples());

		// Noise power per sample is fs/(C/N0) = 2.046e6 / 10^4.5, about 65, against unit signal power
		let power:f64 = a.samples().iter().map(|s| s.norm_sqr()).sum::<f64>() / 2046.0;
		assert!(power > 50.0 && power < 80.0, "power {}", power);
	}

	#[test]
	fn replacing_samples_checks_length() {
		let replica = PrnReplica::new(SignalType::GpsL1Ca, 9, 2.046e6, 0.0, 2046).unwrap();
		let src = SimulatedSource::new(&replica, truth(), 2046, None, 0).unwrap();
		assert!(src.with_samples(vec![Complex{ re: 0.0, im: 0.0 }; 10]).is_err());
	}

}
