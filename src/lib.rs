
use thiserror::Error;

pub mod filters;
pub mod fourier_analysis;
pub mod io;
pub mod gnss;

pub mod utils;

#[derive(Debug, Error)]
pub enum TrackErr {
	/// Rejected before any tracking state exists
	#[error("invalid configuration: {0}")]
	InvalidConfiguration(String),
	#[error("numerical degeneracy: {0}")]
	NumericalDegeneracy(String),
	#[error("series `{field}` has {actual} entries, expected {expected}")]
	LengthMismatch{ field:&'static str, expected:usize, actual:usize },
	#[error("unable to read samples: {0}")]
	Io(#[from] std::io::Error),
	#[error("unable to parse configuration: {0}")]
	Json(#[from] serde_json::Error),
}

impl TrackErr {

	pub fn config<S: Into<String>>(msg:S) -> Self { TrackErr::InvalidConfiguration(msg.into()) }
	pub fn degenerate<S: Into<String>>(msg:S) -> Self { TrackErr::NumericalDegeneracy(msg.into()) }

}
