//! Event hooks

use crate::errors::Violation;
use crate::planner::Plan;

/// Receives driver events. Every method defaults to doing nothing.
pub trait Observer {
    /// A register word went out on the bus.
    fn register_written(&mut self, _address: u8, _word: u32) {}

    /// A register write was dropped because writes are disabled.
    fn write_suppressed(&mut self, _address: u8, _word: u32) {}

    /// Register 0 was written again to latch double buffered fields.
    fn double_buffer_confirmed(&mut self) {}

    /// The planner dropped the candidate using RF divider `output_divider`.
    fn candidate_rejected(&mut self, _output_divider: u32, _violation: &Violation) {}

    /// The band select clock stays above its ceiling with the largest divider.
    fn band_select_degraded(&mut self, _required: u32, _divider: u32) {}

    fn planned(&mut self, _plan: &Plan) {}
}

impl Observer for () {}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn register_written(&mut self, address: u8, word: u32) {
        (**self).register_written(address, word)
    }

    fn write_suppressed(&mut self, address: u8, word: u32) {
        (**self).write_suppressed(address, word)
    }

    fn double_buffer_confirmed(&mut self) {
        (**self).double_buffer_confirmed()
    }

    fn candidate_rejected(&mut self, output_divider: u32, violation: &Violation) {
        (**self).candidate_rejected(output_divider, violation)
    }

    fn band_select_degraded(&mut self, required: u32, divider: u32) {
        (**self).band_select_degraded(required, divider)
    }

    fn planned(&mut self, plan: &Plan) {
        (**self).planned(plan)
    }
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn register_written(&mut self, address: u8, word: u32) {
        log::trace!("R{} <- {:#010x}", address, word);
    }

    fn write_suppressed(&mut self, address: u8, word: u32) {
        log::trace!("R{} write suppressed ({:#010x})", address, word);
    }

    fn double_buffer_confirmed(&mut self) {
        log::trace!("double buffer confirmed");
    }

    fn candidate_rejected(&mut self, output_divider: u32, violation: &Violation) {
        log::debug!("RF divider /{} rejected: {}", output_divider, violation);
    }

    fn band_select_degraded(&mut self, required: u32, divider: u32) {
        log::warn!(
            "band select clock divider {} needed, {} programmed: band selection runs slow",
            required,
            divider
        );
    }

    fn planned(&mut self, plan: &Plan) {
        log::debug!(
            "{} Hz: VCO {} Hz /{}, N = {} + {}/{}",
            plan.achieved_hz,
            plan.vco_hz,
            plan.output_divider,
            plan.int,
            plan.frac,
            plan.modulus
        );
    }
}
