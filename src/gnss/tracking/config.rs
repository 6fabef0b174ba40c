
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::TrackErr;
use crate::filters::check_positive;
use crate::gnss::signal::SignalType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainMode {
	/// Time-varying Kalman gain recomputed every period
	Adaptive,
	/// Steady-state gain from the algebraic Riccati equation
	Fixed,
}

impl Default for GainMode {
	fn default() -> Self { GainMode::Adaptive }
}

/// Where acquisition left the signal
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialEstimate {
	pub code_phase_chips:f64,
	pub doppler_hz:f64,
	pub doppler_rate_hz_s:f64,
	pub carrier_phase_rad:f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
	pub signal:SignalType,
	pub prn:usize,
	pub initial:InitialEstimate,

	pub dll_bandwidth_hz:f64,
	pub tap_spacing:usize,
	pub pll_bandwidth_hz:f64,
	pub pll_damping:f64,

	pub state_count:usize,
	pub gain_mode:GainMode,
	pub h0:f64,
	pub h_2:f64,
	pub qa:f64,

	/// Phase discriminator variance [rad^2]; derived from `assumed_cn0_dbhz` when absent
	pub measurement_noise:Option<f64>,
	pub assumed_cn0_dbhz:f64,

	pub sigma_phase_rad:f64,
	pub sigma_doppler_hz:f64,
	pub sigma_doppler_rate_hz_s:f64,
}

impl Default for TrackingConfig {
	fn default() -> Self {
		Self {
			signal: SignalType::GpsL1Ca,
			prn: 1,
			initial: InitialEstimate::default(),
			dll_bandwidth_hz: 50.0,
			tap_spacing: 1,
			pll_bandwidth_hz: 15.0,
			pll_damping: 1.4,
			state_count: 3,
			gain_mode: GainMode::Adaptive,
			// TCXO class oscillator
			h0: 2.0e-19,
			h_2: 2.0e-20,
			qa: 1.0,
			measurement_noise: None,
			assumed_cn0_dbhz: 45.0,
			sigma_phase_rad: 0.5,
			sigma_doppler_hz: 5.0,
			sigma_doppler_rate_hz_s: 1.0,
		}
	}
}

impl TrackingConfig {

	pub fn from_json_str(s:&str) -> Result<Self, TrackErr> {
		let config:Self = serde_json::from_str(s)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_json<P: AsRef<Path>>(path:P) -> Result<Self, TrackErr> {
		let config:Self = serde_json::from_reader(BufReader::new(File::open(path)?))?;
		config.validate()?;
		Ok(config)
	}

	/// Integration time, always one code period
	pub fn integration_time_s(&self) -> f64 { self.signal.code_period_s() }

	/// Checks that do not depend on the sample source
	pub fn validate(&self) -> Result<(), TrackErr> {
		if self.state_count != 2 && self.state_count != 3 {
			return Err(TrackErr::config(format!("Kalman state count must be 2 or 3, got {}", self.state_count)));
		}
		if self.prn < 1 || self.prn > 32 {
			return Err(TrackErr::config(format!("PRN must be in 1..=32, got {}", self.prn)));
		}
		if self.tap_spacing < 1 {
			return Err(TrackErr::config("early/late tap spacing must be at least one sample"));
		}
		check_positive("DLL noise bandwidth", self.dll_bandwidth_hz)?;
		check_positive("PLL noise bandwidth", self.pll_bandwidth_hz)?;
		check_positive("PLL damping ratio", self.pll_damping)?;
		check_positive("phase sigma", self.sigma_phase_rad)?;
		check_positive("Doppler sigma", self.sigma_doppler_hz)?;
		check_positive("Doppler rate sigma", self.sigma_doppler_rate_hz_s)?;
		if let Some(r) = self.measurement_noise { check_positive("measurement noise", r)?; }
		if !self.assumed_cn0_dbhz.is_finite() {
			return Err(TrackErr::config("assumed C/N0 must be finite"));
		}
		let x = &self.initial;
		if ![x.code_phase_chips, x.doppler_hz, x.doppler_rate_hz_s, x.carrier_phase_rad].iter().all(|v| v.is_finite()) {
			return Err(TrackErr::config("initial estimates must be finite"));
		}
		Ok(())
	}

}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn defaults_are_valid() {
		TrackingConfig::default().validate().unwrap();
		assert_eq!(TrackingConfig::default().integration_time_s(), SignalType::GpsL1Ca.code_period_s());
	}

	#[test]
	fn partial_json_fills_defaults() {
		let config = TrackingConfig::from_json_str(r#"{
			"signal": "gps_l2_cm",
			"prn": 12,
			"gain_mode": "fixed",
			"state_count": 2,
			"initial": { "doppler_hz": -2200.5 }
		}"#).unwrap();

		assert_eq!(config.signal, SignalType::GpsL2Cm);
		assert_eq!(config.prn, 12);
		assert_eq!(config.gain_mode, GainMode::Fixed);
		assert_eq!(config.initial.doppler_hz, -2200.5);
		assert_eq!(config.initial.code_phase_chips, 0.0);
		assert_eq!(config.tap_spacing, 1);
	}

	#[test]
	fn rejects_bad_values() {
		assert!(matches!(TrackingConfig::from_json_str(r#"{ "state_count": 4 }"#), Err(TrackErr::InvalidConfiguration(_))));
		assert!(matches!(TrackingConfig::from_json_str(r#"{ "prn": 0 }"#), Err(TrackErr::InvalidConfiguration(_))));
		assert!(matches!(TrackingConfig::from_json_str(r#"{ "pll_damping": 0.0 }"#), Err(TrackErr::InvalidConfiguration(_))));
		assert!(matches!(TrackingConfig::from_json_str(r#"{ "gain_mode": "sometimes" }"#), Err(TrackErr::Json(_))));
	}

}
