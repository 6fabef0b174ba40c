
pub mod constants;
pub mod signal;

pub mod gps_l1_ca;
pub mod gps_l2c;

pub mod replica;
pub mod source;

/// Closed-loop code and carrier tracking of a single PRN
pub mod tracking;
