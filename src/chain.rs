//! Divider chain: the register image read as a graph of stages.
//!
//! Every frequency read walks upstream to the reference and checks the
//! datasheet limits of each stage on the way, so a chain that answers
//! [`DividerChain::current_frequency`] without error is programmable.

use heapless::{LinearMap, Vec};
use libm::{ceil, floor};

use crate::config::Config;
use crate::constants::*;
use crate::divider::{node, NodeKind, Ratio, Stage, Upstream};
use crate::errors::{Error, Violation};
use crate::fields::*;
use crate::register::RegisterMap;

/// Band select clock divider programming
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BandSelect {
    pub mode: BandSelectClockMode,
    /// Divider needed to stay under the mode ceiling
    pub required: u32,
    /// Divider programmed
    pub divider: u32,
    /// `required` was out of range, band selection will run slower than it should
    pub degraded: bool,
}

/// One row of [`DividerChain::configuration`]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StageStatus {
    pub stage: Stage,
    pub kind: NodeKind,
    pub source: Option<Stage>,
    pub source_hz: Option<f64>,
    pub ratio: Ratio,
    pub is_integer: bool,
    pub frequency_hz: f64,
}

/// Control bits outside the divider ratios
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Controls {
    pub noise_mode: NoiseMode,
    pub muxout: Muxout,
    pub charge_pump_current: ChargePumpCurrent,
    pub cycle_slip_reduction: CycleSlipReduction,
    pub prescaler: Prescaler,
    pub feedback_select: FeedbackSelect,
    pub phase_adjust: PhaseAdjust,
    pub band_select_clock_mode: BandSelectClockMode,
    pub integer_mode: bool,
    pub power_down: PowerDown,
    pub rf_output_enable: RfOutputEnable,
    pub output_power: OutputPower,
    pub aux_output_enable: AuxOutputEnable,
    pub aux_output_select: AuxOutputSelect,
    pub aux_output_power: AuxOutputPower,
}

/// Stages reported by [`DividerChain::dividers`]
const DIVIDER_STAGES: [Stage; 8] = [
    Stage::RefDoubler,
    Stage::RCounter,
    Stage::RefDivider,
    Stage::Vco,
    Stage::RfDivider,
    Stage::BandSelectClock,
    Stage::ClockDivider,
    Stage::NDivider,
];

/// Register image plus the reference frequency it is driven from.
#[derive(Debug, Clone, PartialEq)]
pub struct DividerChain {
    ref_in_hz: f64,
    tolerance_hz: f64,
    map: RegisterMap,
}

impl DividerChain {
    /// Builds a chain from power-on defaults and `config`, with the VCO parked at 3 GHz.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let mut chain = DividerChain {
            ref_in_hz: config.reference_hz,
            tolerance_hz: config.tolerance_hz,
            map: RegisterMap::adf4351()?,
        };
        chain.apply(config)?;
        Ok(chain)
    }

    /// Writes every setting of `config` into the register image.
    pub fn apply(&mut self, config: &Config) -> Result<(), Error> {
        if !(config.tolerance_hz >= 0.0) {
            return Err(Error::InvalidFieldValue { field: "tolerance", value: 0 });
        }
        self.ref_in_hz = config.reference_hz;
        self.tolerance_hz = config.tolerance_hz;

        self.map
            .set(config.ref_doubler)
            .set(config.rdiv2)
            .set(config.noise_mode)
            .set(config.muxout)
            .set(config.pd_polarity)
            .set(config.double_buffer)
            .set(config.band_select_clock_mode)
            .set(config.clock_divider_mode)
            .set(config.cycle_slip_reduction)
            .set(config.feedback_select)
            .set(config.mute_till_lock)
            .set(config.rf_output_enable)
            .set(config.output_power)
            .set(config.aux_output_select)
            .set(config.aux_output_enable)
            .set(config.aux_output_power)
            .set(config.lock_detect_pin)
            .set(config.phase_adjust);
        self.set_charge_pump_current(config.charge_pump_current)?;
        self.set_ratio(Stage::RCounter, config.r_counter as u32)?;
        self.set_ratio(Stage::ClockDivider, config.clock_divider as u32)?;
        self.set_ratio(Stage::RfDivider, 2)?;

        let f_pfd = self.f_pfd()?;
        self.set_prescaler(Prescaler::for_vco(VCO_FREQ_DEFAULT));
        let modulus = modulus_for(f_pfd, config.channel_resolution_hz, ceil)?;
        let n = VCO_FREQ_DEFAULT / self.feedback_factor()? as f64 / f_pfd;
        self.map.set(Mod(modulus as u16));
        self.set_n_ratio(n)?;
        self.set_phase_word(config.phase_word)?;
        self.refresh_band_select()?;
        self.validate()
    }

    #[inline]
    pub fn map(&self) -> &RegisterMap {
        &self.map
    }

    #[inline]
    pub(crate) fn map_mut(&mut self) -> &mut RegisterMap {
        &mut self.map
    }

    #[inline]
    pub fn reference_hz(&self) -> f64 {
        self.ref_in_hz
    }

    /// Checked on the next frequency read
    pub fn set_reference_hz(&mut self, hz: f64) {
        self.ref_in_hz = hz;
    }

    #[inline]
    pub fn tolerance_hz(&self) -> f64 {
        self.tolerance_hz
    }

    pub fn set_tolerance_hz(&mut self, tolerance_hz: f64) -> Result<(), Error> {
        if !(tolerance_hz >= 0.0) {
            return Err(Error::InvalidFieldValue { field: "tolerance", value: 0 });
        }
        self.tolerance_hz = tolerance_hz;
        Ok(())
    }

    /// Runs `edit` on a copy and keeps the result only if it validates.
    pub fn try_edit<T, F>(&mut self, edit: F) -> Result<T, Error>
    where
        F: FnOnce(&mut DividerChain) -> Result<T, Error>,
    {
        let mut scratch = self.clone();
        let out = edit(&mut scratch)?;
        scratch.validate()?;
        *self = scratch;
        Ok(out)
    }

    /// Upstream stage, resolving the feedback and aux selectors
    pub fn source(&self, stage: Stage) -> Result<Option<Stage>, Error> {
        Ok(match node(stage).upstream {
            Upstream::None => None,
            Upstream::Fixed(s) => Some(s),
            Upstream::FeedbackSelect => Some(match self.map.get::<FeedbackSelect, R4>()? {
                FeedbackSelect::Fundamental => Stage::Vco,
                FeedbackSelect::Divided => Stage::RfDivider,
            }),
            Upstream::AuxSelect => Some(match self.map.get::<AuxOutputSelect, R4>()? {
                AuxOutputSelect::Fundamental => Stage::Vco,
                AuxOutputSelect::Divided => Stage::RfDivider,
            }),
        })
    }

    /// Ratio currently programmed for `stage`
    pub fn ratio(&self, stage: Stage) -> Result<Ratio, Error> {
        let node = node(stage);
        match stage {
            Stage::NDivider => Ok(self.n_ratio()),
            Stage::Vco => Ok(self.n_ratio().scale(self.feedback_factor()?)),
            _ => match node.field {
                None => Ok(Ratio::Integer(1)),
                Some(field) => {
                    let r = node.encoding.decode(self.map.field(field)?);
                    if node.range.contains(r) {
                        Ok(Ratio::Integer(r))
                    } else {
                        Err(Error::InvalidFieldValue { field: stage.name(), value: r as u64 })
                    }
                }
            },
        }
    }

    fn n_ratio(&self) -> Ratio {
        Ratio::Fractional {
            int: self.int(),
            frac: self.frac(),
            modulus: self.modulus(),
        }
    }

    /// `d_out` with divided feedback, 1 with fundamental feedback
    fn feedback_factor(&self) -> Result<u32, Error> {
        match self.map.get::<FeedbackSelect, R4>()? {
            FeedbackSelect::Fundamental => Ok(1),
            FeedbackSelect::Divided => self.output_divider(),
        }
    }

    /// Output frequency of `stage`, every stage upstream checked
    pub fn frequency(&self, stage: Stage) -> Result<f64, Error> {
        let node = node(stage);
        let input = match self.source(stage)? {
            Some(s) => self.frequency(s)?,
            None => self.ref_in_hz,
        };
        let ratio = self.ratio(stage)?.value();
        let f = match node.kind {
            NodeKind::Source | NodeKind::PassThrough => input,
            NodeKind::Multiplier | NodeKind::Derived => input * ratio,
            NodeKind::Divider => input / ratio,
        };
        self.check(stage, f)?;
        Ok(f)
    }

    fn check(&self, stage: Stage, f: f64) -> Result<(), Violation> {
        match stage {
            Stage::ReferenceInput => {
                if !(REF_IN_FREQ_MIN..=REF_IN_FREQ_MAX).contains(&f) {
                    return Err(Violation::ReferenceOutOfRange { freq_hz: f });
                }
            }
            Stage::RefDoubler => {
                if self.map.get::<RefDoubler, R2>() == Ok(RefDoubler::Enabled) {
                    if self.ref_in_hz > REF_IN_DOUBLER_MAX {
                        return Err(Violation::DoublerReferenceTooHigh { freq_hz: self.ref_in_hz });
                    }
                    if self.map.get::<NoiseMode, R2>() == Ok(NoiseMode::LowSpur)
                        && self.map.get::<Rdiv2, R2>() == Ok(Rdiv2::Disabled)
                    {
                        return Err(Violation::LowSpurWithoutDivider);
                    }
                }
            }
            Stage::RefDivider => {
                if self.map.get::<CycleSlipReduction, R3>() == Ok(CycleSlipReduction::Enabled) {
                    if self.map.get::<Rdiv2, R2>() == Ok(Rdiv2::Disabled) {
                        return Err(Violation::CycleSlipWithoutDivider);
                    }
                    if self.map.get::<ChargePumpCurrent, R2>() != Ok(ChargePumpCurrent::MIN) {
                        return Err(Violation::CycleSlipChargePump);
                    }
                }
            }
            Stage::PhaseFrequencyDetector => {
                if f > PFD_FREQ_INTN_MAX {
                    return Err(Violation::PfdTooHigh { freq_hz: f, max_hz: PFD_FREQ_INTN_MAX });
                }
                if f > PFD_FREQ_BAND_SELECT_MAX && self.band_select_enabled() {
                    return Err(Violation::PfdBandSelect { freq_hz: f });
                }
            }
            Stage::Vco => {
                if !(VCO_FREQ_MIN..=VCO_FREQ_MAX).contains(&f) {
                    return Err(Violation::VcoOutOfRange { freq_hz: f });
                }
                if self.prescaler() == Prescaler::P45 && f > PRESCALER_89_MIN_VCO_FREQ {
                    return Err(Violation::PrescalerTooSlow { freq_hz: f });
                }
            }
            Stage::NDivider => {
                check_n(self.int(), self.frac(), self.modulus(), self.prescaler())?;
                let max_hz = if self.integer_mode() { PFD_FREQ_INTN_MAX } else { PFD_FREQ_FRACN_MAX };
                if f > max_hz {
                    return Err(Violation::FeedbackTooHigh { freq_hz: f, max_hz });
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Checks every stage.
    pub fn validate(&self) -> Result<(), Error> {
        for stage in Stage::ALL {
            self.frequency(stage)?;
        }
        Ok(())
    }

    /// Phase Frequency Detector frequency, Hz
    /// f PFD = REF IN × [(1 + D)/(R × (1 + T))]
    ///
    /// where:
    /// D is the RF REF IN doubler bit (0 or 1).
    /// R is the RF reference division factor (1 to 1023).
    /// T is the reference divide-by-2 bit (0 or 1).
    #[inline]
    pub fn f_pfd(&self) -> Result<f64, Error> {
        self.frequency(Stage::PhaseFrequencyDetector)
    }

    /// Fundamental VCO frequency, 2.2 GHz to 4.4 GHz.
    /// f VCO = f PFD × N with fundamental feedback, f PFD × N × RF Divider with divided feedback.
    #[inline]
    pub fn vco_frequency(&self) -> Result<f64, Error> {
        self.frequency(Stage::Vco)
    }

    /// RF output frequency
    /// RF OUT = [INT + (FRAC/MOD)] × (f PFD /RF Divider)
    ///
    /// where:
    /// INT is the integer division factor.
    /// FRAC is the numerator of the fractional division (0 to MOD − 1).
    /// MOD is the preset fractional modulus (2 to 4095).
    #[inline]
    pub fn current_frequency(&self) -> Result<f64, Error> {
        self.frequency(Stage::RfOutput)
    }

    /// Output step for one FRAC count, f PFD / MOD at the VCO and divided by
    /// the RF divider at the output when feedback is taken from the VCO.
    pub fn frequency_resolution(&self) -> Result<f64, Error> {
        let f_pfd = self.f_pfd()?;
        let fundamental = self.map.get::<FeedbackSelect, R4>()? == FeedbackSelect::Fundamental;
        let d_out = if fundamental { self.output_divider()? } else { 1 };
        Ok(f_pfd / self.modulus() as f64 / d_out as f64)
    }

    /// Programs an integer ratio into `stage`.
    pub fn set_ratio(&mut self, stage: Stage, ratio: u32) -> Result<(), Error> {
        let node = node(stage);
        let code = node.encode(ratio)?;
        match node.field {
            Some(field) => self.map.set_field(field, code).map(|_| ()),
            None => Err(Error::InvalidFieldValue { field: stage.name(), value: ratio as u64 }),
        }
    }

    pub fn output_divider(&self) -> Result<u32, Error> {
        match self.ratio(Stage::RfDivider)? {
            Ratio::Integer(d) => Ok(d),
            Ratio::Fractional { int, .. } => Ok(int),
        }
    }

    #[inline]
    pub fn int(&self) -> u32 {
        self.map.get::<Int, R0>().map(|i| i.0 as u32).unwrap_or(0)
    }

    #[inline]
    pub fn frac(&self) -> u32 {
        self.map.get::<Frac, R0>().map(|f| f.0 as u32).unwrap_or(0)
    }

    #[inline]
    pub fn modulus(&self) -> u32 {
        self.map.get::<Mod, R1>().map(|m| m.0 as u32).unwrap_or(0)
    }

    #[inline]
    pub fn prescaler(&self) -> Prescaler {
        self.map.get::<Prescaler, R1>().unwrap_or(Prescaler::P45)
    }

    #[inline]
    pub fn set_prescaler(&mut self, p: Prescaler) {
        self.map.set(p);
    }

    /// `FRAC == 0`
    #[inline]
    /// FRAC = 0 puts the part in integer-N mode (LDF = 1 for lock detect).
    pub fn integer_mode(&self) -> bool {
        self.frac() == 0
    }

    /// Programs INT, FRAC and MOD together with the integer-N companion bits.
    ///
    /// INT is 23 to 65535 with the 4/5 prescaler and 75 to 65535 with 8/9,
    /// FRAC is 0 to MOD − 1 and MOD is 2 to 4095. A phase word left at or
    /// above the new MOD wraps around it.
    pub fn set_n_divider(&mut self, int: u32, frac: u32, modulus: u32) -> Result<(), Error> {
        check_n(int, frac, modulus, self.prescaler())?;
        self.map.set(Mod(modulus as u16)).set(Int(int as u16)).set(Frac(frac as u16));
        let phase = self.phase_word();
        if phase >= modulus {
            self.map.set(Phase((phase % modulus) as u16));
        }
        self.set_integer_mode(frac == 0);
        Ok(())
    }

    /// `INT = floor(n)`, `FRAC = floor(MOD * (n - INT))` with the programmed MOD.
    pub fn set_n_ratio(&mut self, n: f64) -> Result<(), Error> {
        if !(n.is_finite() && n >= 0.0) {
            return Err(Error::InvalidFieldValue { field: Stage::NDivider.name(), value: 0 });
        }
        let modulus = self.modulus().clamp(MOD_MIN, MOD_MAX);
        let int = floor(n);
        let frac = floor(modulus as f64 * (n - int)) as u32;
        self.set_n_divider(saturate_u32(int), frac.min(modulus - 1), modulus)
    }

    /// Moves the N divider by `steps` FRAC counts, carrying into INT.
    pub fn step(&mut self, steps: i32) -> Result<(), Error> {
        let modulus = self.modulus() as i64;
        if modulus < MOD_MIN as i64 {
            return Err(Violation::ModOutOfRange { modulus: modulus as u32 }.into());
        }
        let total = self.frac() as i64 + steps as i64;
        let int = self.int() as i64 + total.div_euclid(modulus);
        if int < 0 {
            return Err(Violation::IntBelowMinimum { int: 0, min: self.prescaler().int_min() as u64 }.into());
        }
        self.set_n_divider(saturate_u32(int as f64), total.rem_euclid(modulus) as u32, modulus as u32)
    }

    /// LDF, LDP, antibacklash width and charge cancellation move together.
    pub fn set_integer_mode(&mut self, integer: bool) {
        if integer {
            self.map
                .set(Ldf::IntN)
                .set(Ldp::Window6ns)
                .set(AntiBacklashPulseWidth::Width3ns)
                .set(ChargeCancellation::Enabled);
        } else {
            self.map
                .set(Ldf::FracN)
                .set(Ldp::Window10ns)
                .set(AntiBacklashPulseWidth::Width6ns)
                .set(ChargeCancellation::Disabled);
        }
    }

    /// Reprograms the band select clock divider for the current PFD.
    ///
    /// Switches to high mode when the low mode cannot reach 125 kHz with the
    /// largest divider. A divider that still leaves the clock above the mode
    /// ceiling is reported through [`BandSelect::degraded`].
    pub fn refresh_band_select(&mut self) -> Result<BandSelect, Error> {
        let f_pfd = self.f_pfd()?;
        if self.band_select_enabled() && self.map.get::<Muxout, R2>() == Ok(Muxout::NDividerOutput) {
            return Err(Violation::MuxoutBlocksBandSelect.into());
        }
        if f_pfd / BAND_SELECT_DIV_HIGH_MAX as f64 > BAND_SELECT_CLOCK_LOW_MAX {
            self.map.set(BandSelectClockMode::High);
        }
        let mode = self.map.get::<BandSelectClockMode, R3>()?;
        let (ceiling, max) = match mode {
            BandSelectClockMode::Low => (BAND_SELECT_CLOCK_LOW_MAX, BAND_SELECT_DIV_LOW_MAX),
            BandSelectClockMode::High => (BAND_SELECT_CLOCK_HIGH_MAX, BAND_SELECT_DIV_HIGH_MAX),
        };
        let required = saturate_u32(ceil(f_pfd / ceiling)).max(1);
        let divider = required.min(max);
        self.set_ratio(Stage::BandSelectClock, divider)?;
        Ok(BandSelect { mode, required, divider, degraded: required > max })
    }

    /// VCO band selection runs on every R0 write unless phase adjust is on.
    #[inline]
    pub fn band_select_enabled(&self) -> bool {
        self.map.get::<PhaseAdjust, R1>() == Ok(PhaseAdjust::Off)
    }

    pub fn set_band_select_enabled(&mut self, enabled: bool) {
        self.map.set(if enabled { PhaseAdjust::Off } else { PhaseAdjust::On });
    }

    #[inline]
    pub fn phase_word(&self) -> u32 {
        self.map.get::<Phase, R1>().map(|p| p.0 as u32).unwrap_or(0)
    }

    /// Phase word, must be below MOD.
    pub fn set_phase_word(&mut self, word: u16) -> Result<(), Error> {
        if word as u32 >= self.modulus() {
            return Err(Error::InvalidFieldValue { field: "PHASE", value: word as u64 });
        }
        self.map.set(Phase(word));
        Ok(())
    }

    /// Output phase offset, degrees. PHASE / MOD × 360.
    pub fn phase_degrees(&self) -> f64 {
        let modulus = self.modulus().max(1);
        (self.phase_word() % modulus) as f64 / modulus as f64 * 360.0
    }

    /// Smallest phase step, degrees
    pub fn phase_resolution(&self) -> f64 {
        360.0 / self.modulus().max(1) as f64
    }

    pub fn set_noise_mode(&mut self, mode: NoiseMode) {
        self.map.set(mode);
    }

    pub fn set_charge_pump_current(&mut self, current: ChargePumpCurrent) -> Result<(), Error> {
        if current.0 > ChargePumpCurrent::MAX.0 {
            return Err(Error::InvalidFieldValue { field: "CP_CURRENT", value: current.0 as u64 });
        }
        self.map.set(current);
        Ok(())
    }

    pub fn set_cycle_slip_reduction(&mut self, enabled: bool) {
        self.map.set(if enabled { CycleSlipReduction::Enabled } else { CycleSlipReduction::Disabled });
    }

    pub fn set_muxout(&mut self, muxout: Muxout) {
        self.map.set(muxout);
    }

    pub fn set_output_power(&mut self, power: OutputPower) {
        self.map.set(power);
    }

    pub fn set_aux_output(&mut self, enabled: bool, select: AuxOutputSelect, power: AuxOutputPower) {
        self.map
            .set(if enabled { AuxOutputEnable::Enabled } else { AuxOutputEnable::Disabled })
            .set(select)
            .set(power);
    }

    /// Powers the synthesizer up or down.
    pub fn enable_output(&mut self, enable: bool) {
        if enable {
            self.map
                .set(PowerDown::Disabled)
                .set(VcoPowerDown::PoweredUp)
                .set(ChargePumpThreeState::Disabled)
                .set(RfOutputEnable::Enabled)
                .set(CounterReset::Disabled);
        } else {
            self.map.set(PowerDown::Enabled).set(CounterReset::Enabled);
        }
    }

    /// Switches the N counter input, keeping the VCO where it is.
    pub fn set_feedback_select(&mut self, select: FeedbackSelect) -> Result<(), Error> {
        let vco = self.vco_frequency()?;
        self.map.set(select);
        let n = vco / self.feedback_factor()? as f64 / self.f_pfd()?;
        self.set_n_ratio(n)
    }

    /// Reference path and output divider for an integer-N ratio.
    ///
    /// Sets D, T and R, the RF divider and INT with FRAC = 0 and MOD = 2,
    /// then picks the prescaler for the resulting VCO frequency.
    pub fn set_dividers(
        &mut self,
        doubler: bool,
        ref_divider: bool,
        r_counter: u32,
        n: u32,
        output_divider: u32,
    ) -> Result<(), Error> {
        self.set_ratio(Stage::RefDoubler, if doubler { 2 } else { 1 })?;
        self.set_ratio(Stage::RefDivider, if ref_divider { 2 } else { 1 })?;
        self.set_ratio(Stage::RCounter, r_counter)?;
        self.set_ratio(Stage::RfDivider, output_divider)?;
        let f_pfd = self.f_pfd()?;
        let vco = f_pfd * n as f64 * self.feedback_factor()? as f64;
        self.set_prescaler(Prescaler::for_vco(vco));
        self.set_n_divider(n, 0, MOD_MIN)?;
        self.refresh_band_select()?;
        Ok(())
    }

    /// Programmable ratios keyed by stage name
    pub fn dividers(&self) -> Result<LinearMap<&'static str, Ratio, 8>, Error> {
        let mut out = LinearMap::new();
        for stage in DIVIDER_STAGES {
            out.insert(stage.name(), self.ratio(stage)?).ok();
        }
        Ok(out)
    }

    /// Every stage with its input, ratio and output
    pub fn configuration(&self) -> Result<Vec<StageStatus, 12>, Error> {
        let mut out = Vec::new();
        for stage in Stage::ALL {
            let source = self.source(stage)?;
            let source_hz = match source {
                Some(s) => Some(self.frequency(s)?),
                None => None,
            };
            let ratio = self.ratio(stage)?;
            let status = StageStatus {
                stage,
                kind: node(stage).kind,
                source,
                source_hz,
                ratio,
                is_integer: ratio.is_integer(),
                frequency_hz: self.frequency(stage)?,
            };
            out.push(status).ok();
        }
        Ok(out)
    }

    pub fn controls(&self) -> Result<Controls, Error> {
        let m = &self.map;
        Ok(Controls {
            noise_mode: m.get::<NoiseMode, R2>()?,
            muxout: m.get::<Muxout, R2>()?,
            charge_pump_current: m.get::<ChargePumpCurrent, R2>()?,
            cycle_slip_reduction: m.get::<CycleSlipReduction, R3>()?,
            prescaler: m.get::<Prescaler, R1>()?,
            feedback_select: m.get::<FeedbackSelect, R4>()?,
            phase_adjust: m.get::<PhaseAdjust, R1>()?,
            band_select_clock_mode: m.get::<BandSelectClockMode, R3>()?,
            integer_mode: self.integer_mode(),
            power_down: m.get::<PowerDown, R2>()?,
            rf_output_enable: m.get::<RfOutputEnable, R4>()?,
            output_power: m.get::<OutputPower, R4>()?,
            aux_output_enable: m.get::<AuxOutputEnable, R4>()?,
            aux_output_select: m.get::<AuxOutputSelect, R4>()?,
            aux_output_power: m.get::<AuxOutputPower, R4>()?,
        })
    }
}

fn check_n(int: u32, frac: u32, modulus: u32, prescaler: Prescaler) -> Result<(), Violation> {
    if !(MOD_MIN..=MOD_MAX).contains(&modulus) {
        return Err(Violation::ModOutOfRange { modulus });
    }
    if frac >= modulus {
        return Err(Violation::FracNotBelowMod { frac, modulus });
    }
    if int < prescaler.int_min() {
        return Err(Violation::IntBelowMinimum { int: int as u64, min: prescaler.int_min() as u64 });
    }
    if int > INT_MAX {
        return Err(Violation::IntAboveMaximum { int: int as u64 });
    }
    Ok(())
}

/// `MOD` for a channel step, rounded by `round` and clamped to 2..=4095
pub(crate) fn modulus_for(f_pfd: f64, resolution_hz: f64, round: fn(f64) -> f64) -> Result<u32, Error> {
    if !(resolution_hz > 0.0 && resolution_hz.is_finite()) {
        return Err(Error::InvalidFieldValue { field: "channel_resolution", value: 0 });
    }
    Ok(saturate_u32(round(f_pfd / resolution_hz)).clamp(MOD_MIN, MOD_MAX))
}

#[inline]
pub(crate) fn saturate_u32(x: f64) -> u32 {
    if x >= u32::MAX as f64 {
        u32::MAX
    } else if x > 0.0 {
        x as u32
    } else {
        0
    }
}
