//! Device pins and the driver surface

use embedded_hal::{
    blocking::{delay::DelayUs, spi::Write},
    digital::v2::OutputPin,
};
use heapless::{LinearMap, Vec};
use libm::floor;

use crate::chain::{Controls, DividerChain, StageStatus};
use crate::commit::{Bus, CommitProtocol};
use crate::config::Config;
use crate::divider::Ratio;
use crate::errors::Error;
use crate::fields::*;
use crate::observer::Observer;
use crate::planner::{FrequencyPlanner, IntegerNMatch, IntegerNSearch, Plan, Request, SearchSpace};

/// SPI wiring: `MOSI` => `DATA`, `SCK` => `CLK`, mode 0, plus the load enable pin.
pub struct SpiBus<SPI, LE, D> {
    spi: SPI,
    pin_le: LE,
    delay: D,
}

impl<SPI, LE, D> SpiBus<SPI, LE, D>
where
    SPI: Write<u8>,
    LE: OutputPin,
    D: DelayUs<u16>,
{
    pub fn new(spi: SPI, pin_le: LE, delay: D) -> Self {
        SpiBus { spi, pin_le, delay }
    }

    pub fn release(self) -> (SPI, LE, D) {
        (self.spi, self.pin_le, self.delay)
    }
}

impl<SPI, LE, D> Bus for SpiBus<SPI, LE, D>
where
    SPI: Write<u8>,
    LE: OutputPin,
    D: DelayUs<u16>,
{
    /// Shifts the word in MSB first, then pulses LE to latch it into the
    /// register named by the control bits.
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.spi.write(bytes).map_err(|_| Error::Spi)?;

        self.delay.delay_us(5);
        self.pin_le.set_high().map_err(|_| Error::Pin)?;
        self.delay.delay_us(10);
        self.pin_le.set_low().map_err(|_| Error::Pin)?;
        self.delay.delay_us(5);

        Ok(())
    }
}

/// Chip enable pin
pub struct ChipEnable<CE> {
    pin: CE,
}

impl<CE: OutputPin> ChipEnable<CE> {
    pub fn new(pin: CE) -> Self {
        ChipEnable { pin }
    }

    /// Powers up the device, subject to the power-down bits.
    #[inline(always)]
    pub fn enable(&mut self) -> Result<(), Error> {
        self.pin.set_high().map_err(|_| Error::Pin)
    }

    /// Powers down the device and three-states the charge pump.
    #[inline(always)]
    pub fn disable(&mut self) -> Result<(), Error> {
        self.pin.set_low().map_err(|_| Error::Pin)
    }

    pub fn release(self) -> CE {
        self.pin
    }
}

/// ADF4351 device
pub struct Adf4351<B, O = ()> {
    chain: DividerChain,
    config: Config,
    commit: CommitProtocol<B>,
    observer: O,
}

impl<B: Bus> Adf4351<B> {
    /// Configures the chip and tunes it to `config.output_hz`.
    pub fn new(bus: B, config: Config) -> Result<Self, Error> {
        Self::with_observer(bus, config, ())
    }
}

impl<B: Bus, O: Observer> Adf4351<B, O> {
    pub fn with_observer(bus: B, config: Config, observer: O) -> Result<Self, Error> {
        let chain = DividerChain::new(&config)?;
        let mut dev = Adf4351 { chain, config, commit: CommitProtocol::new(bus), observer };
        dev.write_all()?;
        dev.set_frequency(config.output_hz)?;
        Ok(dev)
    }

    /// Writes all six registers, R5 first.
    pub fn write_all(&mut self) -> Result<(), Error> {
        self.commit.write_all(self.chain.map_mut(), &mut self.observer)
    }

    /// Writes one register as it is in the image.
    pub fn write_register(&mut self, address: u8) -> Result<(), Error> {
        self.commit.write_register(self.chain.map(), address, &mut self.observer)
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.commit.flush(self.chain.map_mut(), &mut self.observer)
    }

    /// Edits the chain, keeps the edit only if the result validates, then
    /// sends what changed.
    fn edit<T, F>(&mut self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut DividerChain) -> Result<T, Error>,
    {
        let out = self.chain.try_edit(f)?;
        self.flush()?;
        Ok(out)
    }

    /// Tunes the RF output.
    ///
    /// Nothing is written until a plan is found. On failure the chip and the
    /// register image are unchanged.
    pub fn set_output_frequency(
        &mut self,
        freq_hz: f64,
        channel_resolution_hz: f64,
        fixed_output_divider: Option<u32>,
    ) -> Result<Plan, Error> {
        self.commit.disable_writes();
        let req = Request { target_hz: freq_hz, channel_resolution_hz, fixed_output_divider };
        match FrequencyPlanner::new(&mut self.observer).plan(&self.chain, &req) {
            Ok((chain, plan)) => {
                self.chain = chain;
                self.write_all()?;
                Ok(plan)
            }
            Err(e) => {
                self.commit.enable_writes();
                Err(e)
            }
        }
    }

    /// Tunes with the configured channel resolution.
    pub fn set_frequency(&mut self, freq_hz: f64) -> Result<Plan, Error> {
        self.set_output_frequency(freq_hz, self.config.channel_resolution_hz, None)
    }

    /// Changes the channel step and re-tunes to the current frequency.
    pub fn set_channel_resolution(&mut self, resolution_hz: f64) -> Result<Plan, Error> {
        let freq_hz = self.chain.current_frequency()?;
        let plan = self.set_output_frequency(freq_hz, resolution_hz, None)?;
        self.config.channel_resolution_hz = resolution_hz;
        Ok(plan)
    }

    /// Sets the output phase, returns the phase word programmed.
    pub fn set_phase(&mut self, degrees: f64) -> Result<u16, Error> {
        if !degrees.is_finite() {
            return Err(Error::InvalidFieldValue { field: "PHASE", value: 0 });
        }
        let mut d = degrees % 360.0;
        if d < 0.0 {
            d += 360.0;
        }
        let modulus = self.chain.modulus().max(1);
        let word = (floor(d / 360.0 * modulus as f64) as u32).min(modulus - 1) as u16;
        self.set_phase_word(word)?;
        Ok(word)
    }

    /// Raw phase word, must be below MOD.
    pub fn set_phase_word(&mut self, word: u16) -> Result<(), Error> {
        self.edit(|c| c.set_phase_word(word))
    }

    /// Powers the synthesizer and its RF output up or down.
    pub fn enable_output(&mut self, enable: bool) -> Result<(), Error> {
        self.chain.enable_output(enable);
        self.flush()?;
        self.commit.confirm_double_buffer(self.chain.map(), &mut self.observer)
    }

    /// Back to power-on defaults with the configuration applied again, then
    /// tuned to `config.output_hz` the same way construction does.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.chain = DividerChain::new(&self.config)?;
        self.write_all()?;
        self.set_frequency(self.config.output_hz).map(|_| ())
    }

    pub fn set_output_power(&mut self, power: OutputPower) -> Result<(), Error> {
        self.chain.set_output_power(power);
        self.flush()
    }

    pub fn set_aux_output(
        &mut self,
        enabled: bool,
        select: AuxOutputSelect,
        power: AuxOutputPower,
    ) -> Result<(), Error> {
        self.edit(|c| {
            c.set_aux_output(enabled, select, power);
            Ok(())
        })
    }

    pub fn set_muxout(&mut self, muxout: Muxout) -> Result<(), Error> {
        self.edit(|c| {
            c.set_muxout(muxout);
            c.refresh_band_select().map(|_| ())
        })
    }

    pub fn set_noise_mode(&mut self, mode: NoiseMode) -> Result<(), Error> {
        self.edit(|c| {
            c.set_noise_mode(mode);
            Ok(())
        })
    }

    pub fn set_charge_pump_current(&mut self, current: ChargePumpCurrent) -> Result<(), Error> {
        self.edit(|c| c.set_charge_pump_current(current))
    }

    pub fn set_cycle_slip_reduction(&mut self, enabled: bool) -> Result<(), Error> {
        self.edit(|c| {
            c.set_cycle_slip_reduction(enabled);
            Ok(())
        })
    }

    /// Disabling band selection turns phase adjust on and allows a PFD above 45 MHz.
    pub fn set_band_select_enabled(&mut self, enabled: bool) -> Result<(), Error> {
        self.edit(|c| {
            c.set_band_select_enabled(enabled);
            c.refresh_band_select().map(|_| ())
        })
    }

    /// Moves the output by `steps` channel steps, returns the new frequency.
    pub fn step(&mut self, steps: i32) -> Result<f64, Error> {
        self.edit(|c| {
            c.step(steps)?;
            c.current_frequency()
        })
    }

    /// Programs an integer-N setting, typically one found by
    /// [`Adf4351::find_integer_n_dividers`].
    pub fn set_dividers(&mut self, m: &IntegerNMatch) -> Result<f64, Error> {
        self.chain.try_edit(|c| {
            c.set_reference_hz(m.f_ref);
            c.set_dividers(m.doubler, m.ref_divider, m.r_counter, m.n, m.output_divider)
        })?;
        self.write_all()?;
        self.chain.current_frequency()
    }

    /// Lazily enumerates integer-N settings for `desired_hz`.
    /// Neither the register image nor the chip is touched.
    pub fn find_integer_n_dividers(&self, desired_hz: f64, space: &SearchSpace) -> Result<IntegerNSearch, Error> {
        IntegerNSearch::new(&self.chain, desired_hz, space)
    }

    pub fn current_frequency(&self) -> Result<f64, Error> {
        self.chain.current_frequency()
    }

    pub fn frequency_resolution(&self) -> Result<f64, Error> {
        self.chain.frequency_resolution()
    }

    /// Degrees
    pub fn current_phase(&self) -> f64 {
        self.chain.phase_degrees()
    }

    pub fn phase_resolution(&self) -> f64 {
        self.chain.phase_resolution()
    }

    pub fn current_dividers(&self) -> Result<LinearMap<&'static str, Ratio, 8>, Error> {
        self.chain.dividers()
    }

    pub fn current_configuration(&self) -> Result<(Vec<StageStatus, 12>, Controls), Error> {
        Ok((self.chain.configuration()?, self.chain.controls()?))
    }

    #[inline]
    pub fn chain(&self) -> &DividerChain {
        &self.chain
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn is_write_enabled(&self) -> bool {
        self.commit.is_write_enabled()
    }

    #[inline]
    pub fn observer(&mut self) -> &mut O {
        &mut self.observer
    }

    #[inline]
    pub fn bus(&mut self) -> &mut B {
        self.commit.bus()
    }

    pub fn into_inner(self) -> (B, O) {
        (self.commit.into_inner(), self.observer)
    }
}
