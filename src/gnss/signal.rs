
use std::fmt;

use serde::{Serialize, Deserialize};

use crate::gnss::constants::*;

/// Ranging signals the tracking core knows how to replicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
	GpsL1Ca,
	GpsL2Cm,
}

impl SignalType {

	pub fn display_name(&self) -> &'static str { match self {
		SignalType::GpsL1Ca => "GPS L1 C/A",
		SignalType::GpsL2Cm => "GPS L2 CM",
	}}

	pub fn chipping_rate_hz(&self) -> f64 { match self {
		SignalType::GpsL1Ca => L1_CA_CHIPS_PER_SEC,
		SignalType::GpsL2Cm => L2_CM_CHIPS_PER_SEC,
	}}

	pub fn carrier_freq_hz(&self) -> f64 { match self {
		SignalType::GpsL1Ca => L1_CARRIER_HZ,
		SignalType::GpsL2Cm => L2_CARRIER_HZ,
	}}

	pub fn code_length(&self) -> usize { match self {
		SignalType::GpsL1Ca => L1_CA_CODE_LENGTH,
		SignalType::GpsL2Cm => L2_CM_CODE_LENGTH,
	}}

	/// One full code period; the tracking loop integrates over exactly this long
	pub fn code_period_s(&self) -> f64 { (self.code_length() as f64) / self.chipping_rate_hz() }

}

impl Default for SignalType {
	fn default() -> Self { SignalType::GpsL1Ca }
}

impl fmt::Display for SignalType {
	fn fmt(&self, f:&mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.display_name()) }
}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn code_periods() {
		assert!((SignalType::GpsL1Ca.code_period_s() - 1.0e-3).abs() < 1.0e-15);
		assert!((SignalType::GpsL2Cm.code_period_s() - 20.0e-3).abs() < 1.0e-15);
	}

	#[test]
	fn display_names_and_serde_tags() {
		assert_eq!(format!("{}", SignalType::GpsL1Ca), "GPS L1 C/A");
		assert_eq!(serde_json::to_string(&SignalType::GpsL2Cm).unwrap(), "\"gps_l2_cm\"");
	}

}
