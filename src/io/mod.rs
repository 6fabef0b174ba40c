
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use log::info;
use num_complex::Complex;

use crate::TrackErr;
use crate::filters::check_positive;
use crate::gnss::source::{Provenance, SampleProvenance, SampleSource};

/// On-disk layout of recorded samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
	/// Interleaved little-endian i16 I/Q pairs
	ComplexI16,
	/// Little-endian i16 real samples
	RealI16,
}

fn read_i16_or_eof<R: Read>(src:&mut R) -> Result<Option<i16>, TrackErr> {
	match src.read_i16::<LittleEndian>() {
		Ok(x) => Ok(Some(x)),
		Err(ref e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
		Err(e) => Err(e.into()),
	}
}

/// Reads samples until the source runs dry or `max_samples` have been read.  A trailing partial I/Q pair is dropped.
pub fn read_samples<R: Read>(src:&mut R, format:SampleFormat, max_samples:Option<usize>) -> Result<Vec<Complex<f64>>, TrackErr> {
	let mut samples:Vec<Complex<f64>> = vec![];
	while max_samples.map_or(true, |n| samples.len() < n) {
		let re = match read_i16_or_eof(src)? { Some(x) => x, None => break };
		let im = match format {
			SampleFormat::RealI16 => 0,
			SampleFormat::ComplexI16 => match read_i16_or_eof(src)? { Some(x) => x, None => break },
		};
		samples.push(Complex{ re: re as f64, im: im as f64 });
	}
	Ok(samples)
}

pub struct FileSource {
	samples:Vec<Complex<f64>>,
	time:Vec<f64>,
	fs:f64,
	intermediate_freq:f64,
	provenance:Provenance,
}

impl FileSource {

	pub fn from_reader<R: Read>(src:&mut R, format:SampleFormat, fs:f64, intermediate_freq:f64, max_samples:Option<usize>, provenance:Provenance) -> Result<Self, TrackErr> {
		check_positive("sample rate", fs)?;
		let samples = read_samples(src, format, max_samples)?;
		if samples.is_empty() { return Err(TrackErr::config("sample source is empty")); }

		let time:Vec<f64> = (0..samples.len()).map(|k| (k as f64) / fs).collect();
		Ok(Self{ samples, time, fs, intermediate_freq, provenance })
	}

	pub fn open<P: AsRef<Path>>(path:P, format:SampleFormat, fs:f64, intermediate_freq:f64, max_samples:Option<usize>) -> Result<Self, TrackErr> {
		let path = path.as_ref();
		let mut reader = BufReader::new(File::open(path)?);
		let provenance = Provenance{ source_name: Some(path.display().to_string()), ..Provenance::default() };

		let ans = Self::from_reader(&mut reader, format, fs, intermediate_freq, max_samples, provenance)?;
		info!("Read {} samples ({:.3} [s]) from {}", ans.samples.len(), ans.duration_s(), path.display());
		Ok(ans)
	}

	pub fn with_start_time(mut self, unix_s:f64) -> Self {
		self.provenance.start_time_unix_s = Some(unix_s);
		self
	}

	pub fn with_observer_location(mut self, ecef_m:[f64; 3]) -> Self {
		self.provenance.observer_location = Some(ecef_m);
		self
	}

}

impl SampleProvenance for FileSource {
	fn provenance(&self) -> Provenance { self.provenance.clone() }
}

impl SampleSource for FileSource {
	fn samples(&self) -> &[Complex<f64>] { &self.samples }
	fn time(&self) -> &[f64] { &self.time }
	fn sample_rate_sps(&self) -> f64 { self.fs }
	fn intermediate_freq_hz(&self) -> f64 { self.intermediate_freq }
	fn adc_bits(&self) -> Option<u8> { Some(16) }
}

#[cfg(test)]
mod tests {

	use super::*;

	use std::io::Cursor;

	fn bytes(values:&[i16]) -> Vec<u8> {
		values.iter().flat_map(|v| v.to_le_bytes().to_vec()).collect()
	}

	#[test]
	fn complex_pairs_and_partial_tail() {
		let mut cursor = Cursor::new(bytes(&[1, -2, 300, 4, -5]));
		let src = FileSource::from_reader(&mut cursor, SampleFormat::ComplexI16, 4.0e6, 0.0, None, Provenance::default()).unwrap();
		assert_eq!(src.samples(), &[Complex{ re: 1.0, im: -2.0 }, Complex{ re: 300.0, im: 4.0 }]);
		assert_eq!(src.time(), &[0.0, 0.25e-6]);
		assert_eq!(src.adc_bits(), Some(16));
	}

	#[test]
	fn real_samples_with_limit_and_provenance() {
		let mut cursor = Cursor::new(bytes(&[7, 8, 9, 10]));
		let src = FileSource::from_reader(&mut cursor, SampleFormat::RealI16, 1.0e6, 4.0e3, Some(3), Provenance::default()).unwrap()
			.with_start_time(1.6e9)
			.with_observer_location([1.0, 2.0, 3.0]);
		assert_eq!(src.len(), 3);
		assert_eq!(src.samples()[2], Complex{ re: 9.0, im: 0.0 });
		assert_eq!(src.intermediate_freq_hz(), 4.0e3);
		assert_eq!(src.provenance().start_time_unix_s, Some(1.6e9));
		assert_eq!(src.provenance().observer_location, Some([1.0, 2.0, 3.0]));
	}

	#[test]
	fn empty_or_missing_input() {
		let mut cursor = Cursor::new(vec![0u8]);
		assert!(matches!(FileSource::from_reader(&mut cursor, SampleFormat::RealI16, 1.0e6, 0.0, None, Provenance::default()),
			Err(TrackErr::InvalidConfiguration(_))));
		assert!(matches!(FileSource::open("/nonexistent/samples.bin", SampleFormat::ComplexI16, 1.0e6, 0.0, None),
			Err(TrackErr::Io(_))));
	}

}
