
pub const SPEED_OF_LIGHT:f64 = 2.99792458e8;			// [m/s]

pub const L1_CARRIER_HZ:f64 = 1.57542e9;
pub const L1_CA_CHIPS_PER_SEC:f64 = 1.023e6;
pub const L1_CA_CODE_LENGTH:usize = 1023;

// CM chips are time-multiplexed with CL chips on the air; on its own the CM code runs at half the L2C rate
pub const L2_CARRIER_HZ:f64 = 1.2276e9;
pub const L2_CM_CHIPS_PER_SEC:f64 = 511.5e3;
pub const L2_CM_CODE_LENGTH:usize = 10230;
