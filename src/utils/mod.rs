
use num_complex::Complex;
use rayon::prelude::*;

use crate::TrackErr;

pub fn conj_in_place(x:&mut [Complex<f64>]) {
	x.par_iter_mut().for_each(|c| *c = c.conj());
}

/// Elementwise product, result written into `a`
pub fn mul_in_place(a:&mut [Complex<f64>], b:&[Complex<f64>]) -> Result<(), TrackErr> {
	if a.len() != b.len() {
		return Err(TrackErr::LengthMismatch{ field: "multiplicand", expected: a.len(), actual: b.len() });
	}
	a.par_iter_mut().zip(b.par_iter()).for_each(|(x, y)| *x *= y);
	Ok(())
}

/// Peak-to-floor ratio of a correlation [dB].  The peak is assumed to occupy two bins and the
/// remaining N-2 bins are averaged into the noise floor.
pub fn snr_db(x:&[Complex<f64>]) -> Result<f64, TrackErr> {
	let n = x.len();
	if n <= 2 {
		return Err(TrackErr::config(format!("SNR needs more than two samples, got {}", n)));
	}

	let (peak_sq, total):(f64, f64) = x.par_iter()
		.map(|c| { let p = c.norm_sqr(); (p, p) })
		.reduce(|| (0.0, 0.0), |a, b| (a.0.max(b.0), a.1 + b.1));

	let ps:f64 = 2.0 * peak_sq;
	let pn:f64 = (total - ps) / ((n - 2) as f64);
	Ok(10.0 * (ps / pn).log10())
}

/// Reduces a code phase [chips] into [0, code_length)
pub fn wrap_phase(x:f64, code_length:usize) -> f64 {
	let len = code_length as f64;
	let y = x.rem_euclid(len);
	// rem_euclid can round up to exactly len for tiny negative inputs
	if y >= len { 0.0 } else { y }
}

/// Circular index j + offset into [0, n)
pub fn wrap_index(j:usize, offset:isize, n:usize) -> usize {
	(j as isize + offset).rem_euclid(n as isize) as usize
}

#[cfg(test)]
mod tests {

	use super::*;

	#[test]
	fn conj_and_mul() {
		let mut a:Vec<Complex<f64>> = (0..1000).map(|i| Complex{ re: i as f64, im: 1.0 }).collect();
		let b:Vec<Complex<f64>> = a.clone();

		conj_in_place(&mut a);
		assert_eq!(a[10], Complex{ re: 10.0, im: -1.0 });

		mul_in_place(&mut a, &b).unwrap();
		for (i, c) in a.iter().enumerate() {
			assert_eq!(*c, Complex{ re: (i*i) as f64 + 1.0, im: 0.0 });
		}

		assert!(mul_in_place(&mut a, &b[1..]).is_err());
	}

	#[test]
	fn snr_of_impulse_over_flat_floor() {
		let mut x = vec![Complex{ re: 1.0, im: 0.0 }; 102];
		x[7] = Complex{ re: 10.0, im: 0.0 };
		// PS = 200, PN = (100 + 101 - 200) / 100
		let expected = 10.0 * (200.0f64 / 0.01).log10();
		assert!((snr_db(&x).unwrap() - expected).abs() < 1.0e-9);

		assert!(snr_db(&x[..2]).is_err());
	}

	#[test]
	fn phase_wrapping() {
		assert_eq!(wrap_phase(1023.5, 1023), 0.5);
		assert_eq!(wrap_phase(-0.25, 1023), 1022.75);
		assert_eq!(wrap_phase(-1.0e-17, 1023), 0.0);
		assert!(wrap_phase(-1.0e-17, 1023) < 1023.0);

		assert_eq!(wrap_index(0, -1, 10), 9);
		assert_eq!(wrap_index(9, 3, 10), 2);
		assert_eq!(wrap_index(4, 0, 10), 4);
	}

}
