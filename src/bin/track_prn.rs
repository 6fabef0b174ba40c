
extern crate clap;
extern crate colored;
extern crate gnss_track;

use clap::{Arg, App};
use colored::*;
use log::warn;

use gnss_track::TrackErr;
use gnss_track::io::{FileSource, SampleFormat};
use gnss_track::gnss::signal::SignalType;
use gnss_track::gnss::replica::PrnReplica;
use gnss_track::gnss::source::{SampleSource, SignalTruth, SimulatedSource};
use gnss_track::gnss::tracking::{self, GainMode, LogProgress, TrackResult, TrackingConfig};

fn parse_arg<T: std::str::FromStr>(name:&str, value:Option<&str>) -> Result<Option<T>, TrackErr> {
	match value {
		Some(s) => s.parse().map(Some).map_err(|_| TrackErr::config(format!("could not parse --{} from {:?}", name, s))),
		None    => Ok(None),
	}
}

fn summarize(result:&TrackResult) {
	let m = result.metadata();
	eprintln!("{} PRN {}: {} periods of {:.3} [ms]", m.signal_name, m.prn, result.period_count(), m.integration_time_s * 1.0e3);

	let tail:usize = (result.period_count() / 10).max(1);
	let snr:&[f64] = result.snr_db();
	if snr.is_empty() {
		eprintln!("{}", "No whole periods available".red());
		return;
	}
	let mean_snr:f64 = snr[snr.len()-tail..].iter().sum::<f64>() / (tail as f64);
	let final_doppler:f64 = result.doppler_hz()[snr.len()-1];
	let final_code_err:f64 = result.code_err_filt()[snr.len()-1];

	let line = format!("SNR {:6.2} [dB], Doppler {:9.3} [Hz], code error {:+.4} [chips]", mean_snr, final_doppler, final_code_err);
	if mean_snr > 10.0 && final_code_err.abs() < 0.5 {
		eprintln!("{}", line.green());
	} else if mean_snr > 3.0 {
		eprintln!("{}", line.yellow());
	} else {
		eprintln!("{}", line.red());
	}
}

fn main() -> Result<(), TrackErr> {

	env_logger::init();

	let matches = App::new("GNSS PRN Tracking")
		.version("0.1.0")
		.author("John Stanford (johnwstanford@gmail.com)")
		.about("Tracks the code and carrier of one PRN and writes per-period results as JSON")
		.arg(Arg::with_name("config")
			.short("j").long("config")
			.help("JSON tracking configuration; command line values override it")
			.takes_value(true))
		.arg(Arg::with_name("filename")
			.short("f").long("filename")
			.help("Interleaved complex i16 input; a simulated signal is used when absent")
			.takes_value(true))
		.arg(Arg::with_name("sample_rate_sps")
			.short("s").long("sample_rate_sps")
			.takes_value(true).required(true))
		.arg(Arg::with_name("if_hz")
			.short("i").long("if_hz")
			.takes_value(true))
		.arg(Arg::with_name("signal")
			.long("signal")
			.possible_values(&["gps_l1_ca", "gps_l2_cm"])
			.takes_value(true))
		.arg(Arg::with_name("prn")
			.short("p").long("prn")
			.takes_value(true))
		.arg(Arg::with_name("doppler_hz")
			.short("d").long("doppler_hz")
			.takes_value(true))
		.arg(Arg::with_name("code_phase")
			.short("c").long("code_phase")
			.help("Code phase at the first sample [chips]")
			.takes_value(true))
		.arg(Arg::with_name("duration_s")
			.short("t").long("duration_s")
			.takes_value(true))
		.arg(Arg::with_name("gain_mode")
			.short("g").long("gain_mode")
			.possible_values(&["adaptive", "fixed"])
			.takes_value(true))
		.arg(Arg::with_name("state_count")
			.short("n").long("state_count")
			.takes_value(true))
		.arg(Arg::with_name("cn0_dbhz")
			.long("cn0_dbhz")
			.help("C/N0 of the simulated signal; noise free when absent")
			.takes_value(true))
		.arg(Arg::with_name("seed")
			.long("seed")
			.takes_value(true))
		.get_matches();

	let mut config:TrackingConfig = match matches.value_of("config") {
		Some(path) => TrackingConfig::from_json(path)?,
		None       => TrackingConfig::default(),
	};

	// Command line overrides
	if let Some(s) = matches.value_of("signal") {
		config.signal = if s == "gps_l2_cm" { SignalType::GpsL2Cm } else { SignalType::GpsL1Ca };
	}
	if let Some(g) = matches.value_of("gain_mode") {
		config.gain_mode = if g == "fixed" { GainMode::Fixed } else { GainMode::Adaptive };
	}
	if let Some(prn) = parse_arg("prn", matches.value_of("prn"))? { config.prn = prn; }
	if let Some(n) = parse_arg("state_count", matches.value_of("state_count"))? { config.state_count = n; }
	if let Some(fd) = parse_arg("doppler_hz", matches.value_of("doppler_hz"))? { config.initial.doppler_hz = fd; }
	if let Some(cp) = parse_arg("code_phase", matches.value_of("code_phase"))? { config.initial.code_phase_chips = cp; }
	config.validate()?;

	let fs:f64 = parse_arg("sample_rate_sps", matches.value_of("sample_rate_sps"))?.unwrap_or(0.0);
	let intermediate_freq:f64 = parse_arg("if_hz", matches.value_of("if_hz"))?.unwrap_or(0.0);
	let duration_s:f64 = parse_arg("duration_s", matches.value_of("duration_s"))?.unwrap_or(1.0);
	let cn0_dbhz:Option<f64> = parse_arg("cn0_dbhz", matches.value_of("cn0_dbhz"))?;
	let seed:u64 = parse_arg("seed", matches.value_of("seed"))?.unwrap_or(0);

	if !(fs > 0.0) || !(duration_s > 0.0) {
		return Err(TrackErr::config("sample rate and duration must be positive"));
	}

	let samples_per_period:usize = (fs * config.signal.code_period_s()).round() as usize;
	let total_samples:usize = (fs * duration_s).round() as usize;
	let replica = PrnReplica::new(config.signal, config.prn, fs, intermediate_freq, samples_per_period)?;

	let source:Box<dyn SampleSource> = match matches.value_of("filename") {
		Some(fname) => {
			eprintln!("Tracking {} PRN {} in {} at {} [samples/sec]", config.signal, config.prn, &fname, &fs);
			Box::new(FileSource::open(fname, SampleFormat::ComplexI16, fs, intermediate_freq, Some(total_samples))?)
		},
		None => {
			if cn0_dbhz.is_none() { warn!("Simulating a noise-free signal; pass --cn0_dbhz to add noise"); }
			let truth = SignalTruth {
				code_phase_chips: config.initial.code_phase_chips,
				doppler_hz: config.initial.doppler_hz,
				doppler_rate_hz_s: config.initial.doppler_rate_hz_s,
				carrier_phase_rad: 0.0,
			};
			let sim = SimulatedSource::new(&replica, truth, total_samples, cn0_dbhz, seed)?;
			eprintln!("Tracking {} at {} [samples/sec]", sim.label(), &fs);
			Box::new(sim)
		},
	};

	let result = tracking::track(&config, source.as_ref(), &replica, &mut LogProgress::default())?;
	summarize(&result);

	// Output data in JSON format
	println!("{}", serde_json::to_string_pretty(&result)?);
	Ok(())
}
