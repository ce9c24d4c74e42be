//! Device configuration

use crate::fields::*;

/// Settings applied by [`crate::chain::DividerChain::new`] and on every device reset.
///
/// The defaults describe the common evaluation setup: 25 MHz reference with
/// doubler and divide-by-2, giving a 25 MHz PFD.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// REFin, Hz
    pub reference_hz: f64,
    pub ref_doubler: RefDoubler,
    pub rdiv2: Rdiv2,
    /// 1..=1023
    pub r_counter: u16,

    pub noise_mode: NoiseMode,
    pub charge_pump_current: ChargePumpCurrent,
    pub pd_polarity: PhaseDetectorPolarity,
    pub cycle_slip_reduction: CycleSlipReduction,
    pub lock_detect_pin: LockDetectPin,
    pub muxout: Muxout,
    pub double_buffer: DoubleBuffer,

    pub band_select_clock_mode: BandSelectClockMode,
    /// Off disables VCO band selection
    pub phase_adjust: PhaseAdjust,
    pub phase_word: u16,
    pub clock_divider_mode: ClockDividerMode,
    /// 1..=4095
    pub clock_divider: u16,

    pub feedback_select: FeedbackSelect,
    pub output_power: OutputPower,
    pub rf_output_enable: RfOutputEnable,
    pub mute_till_lock: MuteTillLockDetect,
    pub aux_output_select: AuxOutputSelect,
    pub aux_output_enable: AuxOutputEnable,
    pub aux_output_power: AuxOutputPower,

    /// Channel step used when none is given, Hz
    pub channel_resolution_hz: f64,
    /// Largest accepted distance from the requested frequency, Hz
    pub tolerance_hz: f64,
    /// Programmed right after construction, Hz
    pub output_hz: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            reference_hz: 25e6,
            ref_doubler: RefDoubler::Enabled,
            rdiv2: Rdiv2::Enabled,
            r_counter: 1,

            noise_mode: NoiseMode::LowNoise,
            charge_pump_current: ChargePumpCurrent::MIN,
            pd_polarity: PhaseDetectorPolarity::Positive,
            cycle_slip_reduction: CycleSlipReduction::Enabled,
            lock_detect_pin: LockDetectPin::DigitalLockDetect,
            muxout: Muxout::ThreeState,
            double_buffer: DoubleBuffer::Enabled,

            band_select_clock_mode: BandSelectClockMode::High,
            phase_adjust: PhaseAdjust::Off,
            phase_word: 1,
            clock_divider_mode: ClockDividerMode::Off,
            clock_divider: 150,

            feedback_select: FeedbackSelect::Fundamental,
            output_power: OutputPower::Minus4dBm,
            rf_output_enable: RfOutputEnable::Enabled,
            mute_till_lock: MuteTillLockDetect::Disabled,
            aux_output_select: AuxOutputSelect::Fundamental,
            aux_output_enable: AuxOutputEnable::Disabled,
            aux_output_power: AuxOutputPower::Minus4dBm,

            channel_resolution_hz: 100e3,
            tolerance_hz: 1.0,
            output_hz: 1e9,
        }
    }
}

impl Config {
    pub fn with_reference_hz(mut self, hz: f64) -> Self {
        self.reference_hz = hz;
        self
    }

    pub fn with_doubler(mut self, enabled: bool) -> Self {
        self.ref_doubler = if enabled { RefDoubler::Enabled } else { RefDoubler::Disabled };
        self
    }

    pub fn with_ref_divider(mut self, enabled: bool) -> Self {
        self.rdiv2 = if enabled { Rdiv2::Enabled } else { Rdiv2::Disabled };
        self
    }

    pub fn with_r_counter(mut self, r: u16) -> Self {
        self.r_counter = r;
        self
    }

    pub fn with_noise_mode(mut self, mode: NoiseMode) -> Self {
        self.noise_mode = mode;
        self
    }

    pub fn with_charge_pump_current(mut self, current: ChargePumpCurrent) -> Self {
        self.charge_pump_current = current;
        self
    }

    pub fn with_cycle_slip_reduction(mut self, enabled: bool) -> Self {
        self.cycle_slip_reduction =
            if enabled { CycleSlipReduction::Enabled } else { CycleSlipReduction::Disabled };
        self
    }

    pub fn with_muxout(mut self, muxout: Muxout) -> Self {
        self.muxout = muxout;
        self
    }

    /// Band selection off means phase adjust on
    pub fn with_band_select(mut self, enabled: bool) -> Self {
        self.phase_adjust = if enabled { PhaseAdjust::Off } else { PhaseAdjust::On };
        self
    }

    pub fn with_feedback_select(mut self, select: FeedbackSelect) -> Self {
        self.feedback_select = select;
        self
    }

    pub fn with_output_power(mut self, power: OutputPower) -> Self {
        self.output_power = power;
        self
    }

    pub fn with_aux_output(mut self, enabled: bool, select: AuxOutputSelect, power: AuxOutputPower) -> Self {
        self.aux_output_enable = if enabled { AuxOutputEnable::Enabled } else { AuxOutputEnable::Disabled };
        self.aux_output_select = select;
        self.aux_output_power = power;
        self
    }

    pub fn with_channel_resolution_hz(mut self, hz: f64) -> Self {
        self.channel_resolution_hz = hz;
        self
    }

    pub fn with_tolerance_hz(mut self, hz: f64) -> Self {
        self.tolerance_hz = hz;
        self
    }

    pub fn with_output_hz(mut self, hz: f64) -> Self {
        self.output_hz = hz;
        self
    }
}
