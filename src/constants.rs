//! Datasheet limits, frequencies in Hz

/// Minimum allowed REFin frequency
pub const REF_IN_FREQ_MIN: f64 = 10e6;

/// Maximum allowed REFin frequency
pub const REF_IN_FREQ_MAX: f64 = 250e6;

/// Maximum REFin with the reference doubler enabled
pub const REF_IN_DOUBLER_MAX: f64 = 30e6;

/// Max N divider output frequency, fractional-N mode
pub const PFD_FREQ_FRACN_MAX: f64 = 32e6;

/// Max PFD frequency with VCO band select enabled
pub const PFD_FREQ_BAND_SELECT_MAX: f64 = 45e6;

/// Max PFD frequency, integer-N with band select disabled
pub const PFD_FREQ_INTN_MAX: f64 = 90e6;

/// Fundamental VCO range
pub const VCO_FREQ_MIN: f64 = 2.2e9;
pub const VCO_FREQ_MAX: f64 = 4.4e9;

/// Above this the 8/9 prescaler is required
pub const PRESCALER_89_MIN_VCO_FREQ: f64 = 3.6e9;

/// 2.2 GHz fundamental through divide-by-64
pub const OUT_FREQ_MIN: f64 = VCO_FREQ_MIN / 64.0;

/// VCO output, no divider
pub const OUT_FREQ_MAX: f64 = VCO_FREQ_MAX;

pub const INT_MAX: u32 = 65535;
pub const MOD_MIN: u32 = 2;
pub const MOD_MAX: u32 = 4095;
pub const R_COUNTER_MAX: u32 = 1023;
pub const CLOCK_DIVIDER_MAX: u32 = 4095;

/// Band select clock ceiling, low mode
pub const BAND_SELECT_CLOCK_LOW_MAX: f64 = 125e3;

/// Band select clock ceiling, high mode
pub const BAND_SELECT_CLOCK_HIGH_MAX: f64 = 500e3;

/// Largest band select divider, per mode. The 8 bit field could hold 255,
/// the part is only specified up to 254.
pub const BAND_SELECT_DIV_LOW_MAX: u32 = 254;
pub const BAND_SELECT_DIV_HIGH_MAX: u32 = 254;

/// VCO frequency the chain is parked at before the first plan
pub const VCO_FREQ_DEFAULT: f64 = 3e9;
