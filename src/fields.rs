//! ADF4351 register layouts and typed fields.
//!
//! Bit positions follow the datasheet register maps (Figures 24-29). Each
//! register carries its own address in the three control bits [2:0].

use crate::constants::PRESCALER_89_MIN_VCO_FREQ;
use crate::errors::Error;
use crate::register::{FieldSpec, Register, RegisterMap, REGISTER_COUNT};

gen_register_marker!(R0, 0);
gen_register_marker!(R1, 1);
gen_register_marker!(R2, 2);
gen_register_marker!(R3, 3);
gen_register_marker!(R4, 4);
gen_register_marker!(R5, 5);

// Register 0

gen_bitfield_struct!(
    /// Integer part of the feedback division factor, 23..=65535 (4/5) or 75..=65535 (8/9)
    R0, "INT", Int, u16, 16, 15
);

gen_bitfield_struct!(
    /// Numerator of the fractional part, 0..MOD
    R0, "FRAC", Frac, u16, 12, 3
);

// Register 1

gen_bitfield_enum!(
    /// Phase adjust. When on, writing R0 does not start a VCO band selection,
    /// so the phase word can be changed without a relock.
    R1, "PHASE_ADJUST", PhaseAdjust, 1, 28 {
        Off = 0,
        On = 1,
    }
);

gen_bitfield_enum!(
    /// Dual-modulus prescaler in front of the N counter
    R1, "PRESCALER", Prescaler, 1, 27 {
        /// 4/5, VCO up to 3.6 GHz
        P45 = 0,
        /// 8/9, needed above 3.6 GHz
        P89 = 1,
    }
);

impl Prescaler {
    /// Smallest INT value usable with this prescaler
    #[inline]
    pub fn int_min(self) -> u32 {
        match self {
            Prescaler::P45 => 23,
            Prescaler::P89 => 75,
        }
    }

    /// Prescaler a VCO frequency needs
    #[inline]
    pub fn for_vco(vco_hz: f64) -> Self {
        if vco_hz > PRESCALER_89_MIN_VCO_FREQ {
            Prescaler::P89
        } else {
            Prescaler::P45
        }
    }
}

gen_bitfield_struct!(
    /// Phase word, must stay below MOD. Output phase offset is `PHASE / MOD * 360°`.
    R1, "PHASE", Phase, u16, 12, 15, double_buffered
);

gen_bitfield_struct!(
    /// Fractional modulus, 2..=4095. Sets the channel step `f_PFD / MOD`.
    R1, "MOD", Mod, u16, 12, 3, double_buffered
);

// Register 2

gen_bitfield_enum!(
    /// Low spur mode dithers the sigma-delta modulator, which raises in-band noise.
    R2, "NOISE_MODE", NoiseMode, 2, 29 {
        LowNoise = 0,
        LowSpur = 0b11,
    }
);

gen_bitfield_enum!(
    /// MUXOUT pin source. The N divider output stops VCO band selection from working.
    R2, "MUXOUT", Muxout, 3, 26 {
        ThreeState = 0,
        DVdd = 1,
        DGnd = 2,
        RCounterOutput = 3,
        NDividerOutput = 4,
        AnalogLockDetect = 5,
        DigitalLockDetect = 6,
    }
);

gen_bitfield_enum!(
    /// Reference doubler, REFin must stay at or below 30 MHz when enabled
    R2, "REF_DOUBLER", RefDoubler, 1, 25, double_buffered {
        Disabled = 0,
        Enabled = 1,
    }
);

gen_bitfield_enum!(
    /// Divide-by-2 flip-flop between the R counter and the PFD.
    /// Gives a 50% duty cycle, cycle slip reduction depends on it.
    R2, "RDIV2", Rdiv2, 1, 24, double_buffered {
        Disabled = 0,
        Enabled = 1,
    }
);

gen_bitfield_struct!(
    /// Reference division factor, 1..=1023
    R2, "R_COUNTER", RCounter, u16, 10, 14, double_buffered
);

gen_bitfield_enum!(
    /// Double buffering of the RF divider select bits in R4
    R2, "DOUBLE_BUFFER", DoubleBuffer, 1, 13 {
        Disabled = 0,
        Enabled = 1,
    }
);

gen_bitfield_struct!(
    /// Charge pump current code, `(code + 1) * 0.31 mA` with a 5.1 kΩ R_SET
    R2, "CP_CURRENT", ChargePumpCurrent, u8, 4, 9, double_buffered
);

impl ChargePumpCurrent {
    pub const MIN: ChargePumpCurrent = ChargePumpCurrent(0);
    pub const MAX: ChargePumpCurrent = ChargePumpCurrent(15);

    /// Nominal current, mA
    #[inline]
    pub fn milliamps(self) -> f64 {
        (self.0 as f64 + 1.0) * 0.3125
    }
}

gen_bitfield_enum!(
    /// Lock detect function, PFD cycles counted before lock is reported (40 or 5)
    R2, "LDF", Ldf, 1, 8 {
        FracN = 0,
        IntN = 1,
    }
);

gen_bitfield_enum!(
    /// Lock detect precision, comparison window
    R2, "LDP", Ldp, 1, 7 {
        Window10ns = 0,
        Window6ns = 1,
    }
);

gen_bitfield_enum!(
    /// Positive for passive or non-inverting active loop filters
    R2, "PD_POLARITY", PhaseDetectorPolarity, 1, 6 {
        Negative = 0,
        Positive = 1,
    }
);

gen_bitfield_enum!(
    /// Software power-down, register contents are kept
    R2, "POWER_DOWN", PowerDown, 1, 5 {
        Disabled = 0,
        Enabled = 1,
    }
);

gen_bitfield_enum!(
    R2, "CP_THREE_STATE", ChargePumpThreeState, 1, 4 {
        Disabled = 0,
        Enabled = 1,
    }
);

gen_bitfield_enum!(
    /// Holds the R and N counters in reset
    R2, "COUNTER_RESET", CounterReset, 1, 3 {
        Disabled = 0,
        Enabled = 1,
    }
);

// Register 3

gen_bitfield_enum!(
    /// High mode allows a band select clock up to 500 kHz, needed for PFD above 125 kHz * 254
    R3, "BAND_SELECT_CLOCK_MODE", BandSelectClockMode, 1, 23 {
        Low = 0,
        High = 1,
    }
);

gen_bitfield_enum!(
    /// Antibacklash pulse width, 3 ns only in integer-N mode
    R3, "ABP", AntiBacklashPulseWidth, 1, 22 {
        Width6ns = 0,
        Width3ns = 1,
    }
);

gen_bitfield_enum!(
    /// Charge cancellation, integer-N mode only
    R3, "CHARGE_CANCEL", ChargeCancellation, 1, 21 {
        Disabled = 0,
        Enabled = 1,
    }
);

gen_bitfield_enum!(
    /// Cycle slip reduction. Needs a 50% PFD duty cycle and the minimum charge pump current.
    R3, "CSR", CycleSlipReduction, 1, 18 {
        Disabled = 0,
        Enabled = 1,
    }
);

gen_bitfield_enum!(
    R3, "CLK_DIV_MODE", ClockDividerMode, 2, 15 {
        Off = 0,
        FastLock = 1,
        Resync = 2,
    }
);

gen_bitfield_struct!(
    /// 12 bit clock divider, timeout in PFD cycles for fast lock and resync
    R3, "CLK_DIV", ClockDivider, u16, 12, 3
);

// Register 4

gen_bitfield_enum!(
    /// Where the N counter is fed from
    R4, "FEEDBACK_SELECT", FeedbackSelect, 1, 23 {
        /// RF divider output
        Divided = 0,
        /// VCO output
        Fundamental = 1,
    }
);

gen_bitfield_struct!(
    /// RF output divider as a log2 code, 0 => /1 .. 6 => /64
    R4, "RF_DIVIDER_SELECT", RfDividerSelect, u8, 3, 20, double_buffered
);

gen_bitfield_struct!(
    /// Divides the PFD down to the band select logic clock, 1..=255 (254 used)
    R4, "BAND_SELECT_CLOCK_DIV", BandSelectClockDivider, u8, 8, 12
);

gen_bitfield_enum!(
    R4, "VCO_POWER_DOWN", VcoPowerDown, 1, 11 {
        PoweredUp = 0,
        PoweredDown = 1,
    }
);

gen_bitfield_enum!(
    /// Keeps RF outputs off until digital lock detect
    R4, "MTLD", MuteTillLockDetect, 1, 10 {
        Disabled = 0,
        Enabled = 1,
    }
);

gen_bitfield_enum!(
    R4, "AUX_OUTPUT_SELECT", AuxOutputSelect, 1, 9 {
        Divided = 0,
        Fundamental = 1,
    }
);

gen_bitfield_enum!(
    R4, "AUX_OUTPUT_ENABLE", AuxOutputEnable, 1, 8 {
        Disabled = 0,
        Enabled = 1,
    }
);

gen_bitfield_enum!(
    R4, "AUX_OUTPUT_POWER", AuxOutputPower, 2, 6 {
        Minus4dBm = 0,
        Minus1dBm = 1,
        Plus2dBm = 2,
        Plus5dBm = 3,
    }
);

gen_bitfield_enum!(
    R4, "RF_OUTPUT_ENABLE", RfOutputEnable, 1, 5 {
        Disabled = 0,
        Enabled = 1,
    }
);

gen_bitfield_enum!(
    R4, "OUTPUT_POWER", OutputPower, 2, 3 {
        Minus4dBm = 0,
        Minus1dBm = 1,
        Plus2dBm = 2,
        Plus5dBm = 3,
    }
);

macro_rules! impl_dbm {
    ($($n:ident),+) => {
        $(impl $n {
            /// Nominal level into 50 Ω
            pub fn dbm(self) -> i8 {
                match self {
                    $n::Minus4dBm => -4,
                    $n::Minus1dBm => -1,
                    $n::Plus2dBm => 2,
                    $n::Plus5dBm => 5,
                }
            }
        })+
    };
}

impl_dbm!(OutputPower, AuxOutputPower);

// Register 5

gen_bitfield_enum!(
    R5, "LD_PIN_MODE", LockDetectPin, 2, 22 {
        Low = 0,
        DigitalLockDetect = 1,
        Low1 = 2,
        High = 3,
    }
);

static R0_FIELDS: [FieldSpec; 4] = [
    FieldSpec::ro("R0_RESERVED_31", 31, 1),
    FieldSpec::of::<Int, R0>(),
    FieldSpec::of::<Frac, R0>(),
    FieldSpec::ro("R0_CONTROL", 0, 3),
];

static R1_FIELDS: [FieldSpec; 6] = [
    FieldSpec::ro("R1_RESERVED_29", 29, 3),
    FieldSpec::of::<PhaseAdjust, R1>(),
    FieldSpec::of::<Prescaler, R1>(),
    FieldSpec::of::<Phase, R1>(),
    FieldSpec::of::<Mod, R1>(),
    FieldSpec::ro("R1_CONTROL", 0, 3),
];

static R2_FIELDS: [FieldSpec; 15] = [
    FieldSpec::ro("R2_RESERVED_31", 31, 1),
    FieldSpec::of::<NoiseMode, R2>(),
    FieldSpec::of::<Muxout, R2>(),
    FieldSpec::of::<RefDoubler, R2>(),
    FieldSpec::of::<Rdiv2, R2>(),
    FieldSpec::of::<RCounter, R2>(),
    FieldSpec::of::<DoubleBuffer, R2>(),
    FieldSpec::of::<ChargePumpCurrent, R2>(),
    FieldSpec::of::<Ldf, R2>(),
    FieldSpec::of::<Ldp, R2>(),
    FieldSpec::of::<PhaseDetectorPolarity, R2>(),
    FieldSpec::of::<PowerDown, R2>(),
    FieldSpec::of::<ChargePumpThreeState, R2>(),
    FieldSpec::of::<CounterReset, R2>(),
    FieldSpec::ro("R2_CONTROL", 0, 3),
];

static R3_FIELDS: [FieldSpec; 10] = [
    FieldSpec::ro("R3_RESERVED_24", 24, 8),
    FieldSpec::of::<BandSelectClockMode, R3>(),
    FieldSpec::of::<AntiBacklashPulseWidth, R3>(),
    FieldSpec::of::<ChargeCancellation, R3>(),
    FieldSpec::ro("R3_RESERVED_19", 19, 2),
    FieldSpec::of::<CycleSlipReduction, R3>(),
    FieldSpec::ro("R3_RESERVED_17", 17, 1),
    FieldSpec::of::<ClockDividerMode, R3>(),
    FieldSpec::of::<ClockDivider, R3>(),
    FieldSpec::ro("R3_CONTROL", 0, 3),
];

static R4_FIELDS: [FieldSpec; 12] = [
    FieldSpec::ro("R4_RESERVED_24", 24, 8),
    FieldSpec::of::<FeedbackSelect, R4>(),
    FieldSpec::of::<RfDividerSelect, R4>(),
    FieldSpec::of::<BandSelectClockDivider, R4>(),
    FieldSpec::of::<VcoPowerDown, R4>(),
    FieldSpec::of::<MuteTillLockDetect, R4>(),
    FieldSpec::of::<AuxOutputSelect, R4>(),
    FieldSpec::of::<AuxOutputEnable, R4>(),
    FieldSpec::of::<AuxOutputPower, R4>(),
    FieldSpec::of::<RfOutputEnable, R4>(),
    FieldSpec::of::<OutputPower, R4>(),
    FieldSpec::ro("R4_CONTROL", 0, 3),
];

static R5_FIELDS: [FieldSpec; 6] = [
    FieldSpec::ro("R5_RESERVED_24", 24, 8),
    FieldSpec::of::<LockDetectPin, R5>(),
    FieldSpec::ro("R5_RESERVED_21", 21, 1),
    FieldSpec::ro("R5_RESERVED_19", 19, 2),
    FieldSpec::ro("R5_RESERVED_3", 3, 16),
    FieldSpec::ro("R5_CONTROL", 0, 3),
];

/// Power-on image: everything zero except the address tags,
/// fundamental feedback in R4 and the reserved `0b11` in R5.
pub const DEFAULT_WORDS: [u32; REGISTER_COUNT] =
    [0x0000_0000, 0x0000_0001, 0x0000_0002, 0x0000_0003, 0x0080_0004, 0x0018_0005];

impl RegisterMap {
    /// The six ADF4351 control registers at their power-on defaults
    pub fn adf4351() -> Result<Self, Error> {
        RegisterMap::new(
            "ADF4351",
            [
                Register::new("REGISTER_0", 0, &R0_FIELDS, DEFAULT_WORDS[0]),
                Register::new("REGISTER_1", 1, &R1_FIELDS, DEFAULT_WORDS[1]),
                Register::new("REGISTER_2", 2, &R2_FIELDS, DEFAULT_WORDS[2]),
                Register::new("REGISTER_3", 3, &R3_FIELDS, DEFAULT_WORDS[3]),
                Register::new("REGISTER_4", 4, &R4_FIELDS, DEFAULT_WORDS[4]),
                Register::new("REGISTER_5", 5, &R5_FIELDS, DEFAULT_WORDS[5]),
            ],
        )
    }
}
