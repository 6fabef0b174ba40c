
use crate::TrackErr;
use crate::gnss::constants::L1_CA_CODE_LENGTH;

// G2 output taps (1-based stages) selecting the delay for each PRN, IS-GPS-200 Table 3-Ia
const G2_TAPS:[(usize, usize); 32] = [
	(2, 6),  (3, 7),  (4, 8),  (5, 9),  (1, 9),  (2, 10), (1, 8),  (2, 9),
	(3, 10), (2, 3),  (3, 4),  (5, 6),  (6, 7),  (7, 8),  (8, 9),  (9, 10),
	(1, 4),  (2, 5),  (3, 6),  (4, 7),  (5, 8),  (6, 9),  (1, 3),  (4, 6),
	(5, 7),  (6, 8),  (7, 9),  (8, 10), (1, 6),  (2, 7),  (3, 8),  (4, 9),
];

pub struct GoldCodeGenerator {
	g1: [bool; 10],
	g2: [bool; 10],
	taps: (usize, usize),
}

impl GoldCodeGenerator {

	pub fn new(prn:usize) -> Result<Self, TrackErr> {
		if prn < 1 || prn > 32 {
			return Err(TrackErr::config(format!("no C/A code for PRN {}", prn)));
		}
		Ok(Self{ g1: [true; 10], g2: [true; 10], taps: G2_TAPS[prn-1] })
	}

	pub fn shift(&mut self) -> bool {
		let (a, b) = self.taps;
		let current_output:bool = self.g1[9] ^ self.g2[a-1] ^ self.g2[b-1];

		// G1 = 1 + x^3 + x^10, G2 = 1 + x^2 + x^3 + x^6 + x^8 + x^9 + x^10
		let g1_feedback:bool = self.g1[2] ^ self.g1[9];
		let g2_feedback:bool = self.g2[1] ^ self.g2[2] ^ self.g2[5] ^ self.g2[7] ^ self.g2[8] ^ self.g2[9];

		self.g1.rotate_right(1);
		self.g2.rotate_right(1);
		self.g1[0] = g1_feedback;
		self.g2[0] = g2_feedback;

		current_output
	}

}

/// One period of the coarse/acquisition code for PRN 1-32, `true` where the chip is a logical one
pub fn ca_code(prn:usize) -> Result<Vec<bool>, TrackErr> {
	let mut generator = GoldCodeGenerator::new(prn)?;
	Ok((0..L1_CA_CODE_LENGTH).map(|_| generator.shift()).collect())
}
