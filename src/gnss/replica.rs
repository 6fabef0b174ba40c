
use std::f64::consts::PI;

use num_complex::Complex;

use crate::TrackErr;
use crate::filters::check_positive;
use crate::gnss::signal::SignalType;
use crate::gnss::{gps_l1_ca, gps_l2c};

/// Everything that positions one period of local replica.  `code_start_idx` is the (fractional) sample index at
/// which chip zero begins; it is negative when the period starts part way through the code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicaParams {
	pub doppler_hz:f64,
	pub doppler_rate_hz_s:f64,
	pub carrier_phase_rad:f64,
	pub code_start_idx:f64,
	pub include_carrier:bool,
}

#[derive(Debug, Clone)]
pub struct Replica {
	pub samples:Vec<Complex<f64>>,
	pub chipping_rate_hz:f64,
	pub carrier_freq_hz:f64,
	pub code_length:usize,
	pub sample_count:usize,
}

pub trait ReplicaGenerator {

	fn signal_type(&self) -> SignalType;
	fn prn(&self) -> usize;
	fn sample_rate_sps(&self) -> f64;
	fn intermediate_freq_hz(&self) -> f64;

	/// Samples per generated period
	fn sample_count(&self) -> usize;

	fn generate(&self, params:&ReplicaParams) -> Replica;

	fn chipping_rate_hz(&self) -> f64 { self.signal_type().chipping_rate_hz() }
	fn carrier_freq_hz(&self) -> f64 { self.signal_type().carrier_freq_hz() }
	fn code_length(&self) -> usize { self.signal_type().code_length() }

}

/// Chipping rate seen by the receiver once the carrier Doppler is scaled onto the code
pub fn code_rate_hz(signal:SignalType, doppler_hz:f64) -> f64 {
	signal.chipping_rate_hz() * (1.0 + doppler_hz / signal.carrier_freq_hz())
}

/// Sampled ranging code for a single PRN, stored as +1/-1
pub struct PrnReplica {
	signal:SignalType,
	prn:usize,
	fs:f64,
	intermediate_freq:f64,
	sample_count:usize,
	code:Vec<f64>,
}

impl PrnReplica {

	pub fn new(signal:SignalType, prn:usize, fs:f64, intermediate_freq:f64, sample_count:usize) -> Result<Self, TrackErr> {
		check_positive("sample rate", fs)?;
		if sample_count == 0 { return Err(TrackErr::config("replica must hold at least one sample")); }

		let bits:Vec<bool> = match signal {
			SignalType::GpsL1Ca => gps_l1_ca::signal_modulation::ca_code(prn)?,
			SignalType::GpsL2Cm => gps_l2c::signal_modulation::cm_code(prn)?,
		};
		let code:Vec<f64> = bits.into_iter().map(|b| if b { -1.0 } else { 1.0 }).collect();

		Ok(Self{ signal, prn, fs, intermediate_freq, sample_count, code })
	}

	/// Chip value in effect at sample `k`, counted from the same origin as `code_start_idx`
	pub fn chip_at(&self, k:f64, code_start_idx:f64, code_rate:f64) -> f64 {
		let chip:f64 = ((k - code_start_idx) * code_rate / self.fs).floor();
		self.code[chip.rem_euclid(self.code.len() as f64) as usize % self.code.len()]
	}

	/// Generates `count` samples starting at sample `first`.  Carrier time is measured from sample zero, so a
	/// source built from this and a tracker built from `generate` agree on phase when `first` is a period boundary.
	pub fn synthesize(&self, params:&ReplicaParams, first:usize, count:usize) -> Vec<Complex<f64>> {
		let code_rate:f64 = code_rate_hz(self.signal, params.doppler_hz);
		let carrier_hz:f64 = self.intermediate_freq + params.doppler_hz;

		(first..(first+count)).map(|k| {
			let chip:f64 = self.chip_at(k as f64, params.code_start_idx, code_rate);
			if params.include_carrier {
				let t:f64 = (k as f64) / self.fs;
				let theta:f64 = 2.0*PI*carrier_hz*t + PI*params.doppler_rate_hz_s*t*t + params.carrier_phase_rad;
				Complex::from_polar(chip, theta)
			} else {
				Complex{ re: chip, im: 0.0 }
			}
		}).collect()
	}

}

impl ReplicaGenerator for PrnReplica {

	fn signal_type(&self) -> SignalType { self.signal }
	fn prn(&self) -> usize { self.prn }
	fn sample_rate_sps(&self) -> f64 { self.fs }
	fn intermediate_freq_hz(&self) -> f64 { self.intermediate_freq }
	fn sample_count(&self) -> usize { self.sample_count }

	fn generate(&self, params:&ReplicaParams) -> Replica {
		Replica {
			samples: self.synthesize(params, 0, self.sample_count),
			chipping_rate_hz: code_rate_hz(self.signal, params.doppler_hz),
			carrier_freq_hz: self.signal.carrier_freq_hz(),
			code_length: self.code.len(),
			sample_count: self.sample_count,
		}
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	fn code_only(code_start_idx:f64) -> ReplicaParams {
		ReplicaParams{ doppler_hz: 0.0, doppler_rate_hz_s: 0.0, carrier_phase_rad: 0.0, code_start_idx, include_carrier: false }
	}

	#[test]
	fn one_sample_per_chip_reproduces_code() {
		let replica = PrnReplica::new(SignalType::GpsL1Ca, 1, 1.023e6, 0.0, 1023).unwrap();
		let r = replica.generate(&code_only(0.0));
		assert_eq!(r.sample_count, 1023);
		assert_eq!(r.code_length, 1023);

		let bits = gps_l1_ca::signal_modulation::ca_code(1).unwrap();
		for (s, b) in r.samples.iter().zip(bits.iter()) {
			assert_eq!(s.re, if *b { -1.0 } else { 1.0 });
		}
	}

	#[test]
	fn code_start_shifts_the_code() {
		let replica = PrnReplica::new(SignalType::GpsL1Ca, 3, 1.023e6, 0.0, 1023).unwrap();
		let aligned = replica.generate(&code_only(0.0));
		// Starting 100 chips into the code
		let shifted = replica.generate(&code_only(-100.0));
		for j in 0..923 {
			assert_eq!(shifted.samples[j], aligned.samples[j + 100]);
		}
		assert_eq!(shifted.samples[1000], aligned.samples[77]);
	}

	#[test]
	fn carrier_has_unit_magnitude_and_expected_phase() {
		let replica = PrnReplica::new(SignalType::GpsL2Cm, 5, 2.0e6, 10.0e3, 40000).unwrap();
		let params = ReplicaParams{ doppler_hz: 500.0, doppler_rate_hz_s: 0.0, carrier_phase_rad: 0.3, code_start_idx: 0.0, include_carrier: true };
		let r = replica.generate(&params);
		assert_eq!(r.samples.len(), 40000);
		assert!((r.chipping_rate_hz - 511.5e3*(1.0 + 500.0/1.2276e9)).abs() < 1.0e-6);

		let chip = replica.chip_at(0.0, 0.0, r.chipping_rate_hz);
		let expected = Complex::from_polar(chip, 0.3);
		assert!((r.samples[0] - expected).norm() < 1.0e-12);
		assert!(r.samples.iter().all(|c| (c.norm() - 1.0).abs() < 1.0e-12));
	}

	#[test]
	fn rejects_bad_prn() {
		assert!(PrnReplica::new(SignalType::GpsL1Ca, 0, 2.0e6, 0.0, 2000).is_err());
		assert!(PrnReplica::new(SignalType::GpsL2Cm, 40, 2.0e6, 0.0, 2000).is_err());
		assert!(PrnReplica::new(SignalType::GpsL1Ca, 1, 0.0, 0.0, 2000).is_err());
	}

}
