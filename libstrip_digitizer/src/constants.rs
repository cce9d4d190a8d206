/// Number of strips read out by a single APV chip
pub const APV_CHANNELS: usize = 128;

/// Speed of light used for the time-of-flight propagation delay, in cm/ns
pub const SPEED_OF_LIGHT_CM_PER_NS: f32 = 30.0;

/// Largest 10-bit ADC value (raw and premixing readout)
pub const ADC_MAX_RAW: u16 = 1023;

// 8-bit zero-suppressed readout compression
// 254 ADC: 254 <= charge < 1023
// 255 ADC: charge >= 1023
pub const ADC_ZS_OVERFLOW_LIMIT: i32 = 1022;
pub const ADC_ZS_SATURATION_LIMIT: i32 = 253;
pub const ADC_ZS_OVERFLOW: u16 = 255;
pub const ADC_ZS_SATURATED: u16 = 254;

// Saturation scaling factor is drawn uniformly in [SCALE_MIN, SCALE_MIN + SCALE_SPAN)
pub const SATURATION_SCALE_SPAN: f32 = 10.0 / 7.0;
pub const SATURATION_SCALE_MIN: f32 = -3.0 / 7.0;
