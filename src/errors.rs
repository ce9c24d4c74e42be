//! Errors

use thiserror::Error;

/// A datasheet bound broken by a derived frequency, a ratio or a mode combination.
#[derive(Debug, Copy, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("REFin {freq_hz} Hz is outside 10 MHz ..= 250 MHz")]
    ReferenceOutOfRange { freq_hz: f64 },

    #[error("reference doubler needs REFin <= 30 MHz, got {freq_hz} Hz")]
    DoublerReferenceTooHigh { freq_hz: f64 },

    #[error("low spur mode with the doubler enabled needs the reference divide-by-2")]
    LowSpurWithoutDivider,

    #[error("cycle slip reduction needs the reference divide-by-2")]
    CycleSlipWithoutDivider,

    #[error("cycle slip reduction needs the minimum charge pump current")]
    CycleSlipChargePump,

    #[error("PFD {freq_hz} Hz is above {max_hz} Hz")]
    PfdTooHigh { freq_hz: f64, max_hz: f64 },

    #[error("PFD {freq_hz} Hz is above 45 MHz while VCO band select is enabled")]
    PfdBandSelect { freq_hz: f64 },

    #[error("N divider output {freq_hz} Hz is above {max_hz} Hz")]
    FeedbackTooHigh { freq_hz: f64, max_hz: f64 },

    #[error("VCO {freq_hz} Hz is outside 2.2 GHz ..= 4.4 GHz")]
    VcoOutOfRange { freq_hz: f64 },

    #[error("VCO {freq_hz} Hz is above 3.6 GHz with the 4/5 prescaler")]
    PrescalerTooSlow { freq_hz: f64 },

    #[error("INT {int} is below the prescaler minimum {min}")]
    IntBelowMinimum { int: u64, min: u64 },

    #[error("INT {int} is above 65535")]
    IntAboveMaximum { int: u64 },

    #[error("FRAC {frac} is not below MOD {modulus}")]
    FracNotBelowMod { frac: u32, modulus: u32 },

    #[error("MOD {modulus} is outside 2 ..= 4095")]
    ModOutOfRange { modulus: u32 },

    #[error("N counter on MUXOUT prevents VCO band selection")]
    MuxoutBlocksBandSelect,

    #[error("output {achieved_hz} Hz misses {target_hz} Hz by more than {tolerance_hz} Hz")]
    OutsideTolerance {
        target_hz: f64,
        achieved_hz: f64,
        tolerance_hz: f64,
    },
}

/// Driver errors
#[derive(Debug, Copy, Clone, PartialEq, Error)]
pub enum Error {
    /// Recoverable by the planner: the candidate is dropped and the next one is tried.
    #[error("constraint violation: {0}")]
    ConstraintViolation(#[from] Violation),

    /// No candidate met the tolerance. Nothing was written to the bus.
    #[error("cannot reach {target_hz} Hz, last candidate RF divider /{last_output_divider}: {last_violation}")]
    PlanningExhausted {
        target_hz: f64,
        last_output_divider: u32,
        last_violation: Violation,
    },

    /// Rejected before any state was touched.
    #[error("invalid value {value} for {field}")]
    InvalidFieldValue { field: &'static str, value: u64 },

    #[error("no such register field")]
    UnknownField,

    #[error("no such register")]
    UnknownRegister,

    /// Two registers of one map share a name or an address.
    #[error("register {0} defined twice")]
    DuplicateRegister(&'static str),

    #[error("SPI write failed")]
    Spi,

    #[error("GPIO pin error")]
    Pin,
}

impl Error {
    /// Bound that was broken, if this is a constraint violation.
    pub fn violation(&self) -> Option<Violation> {
        match self {
            Error::ConstraintViolation(v) => Some(*v),
            Error::PlanningExhausted { last_violation, .. } => Some(*last_violation),
            _ => None,
        }
    }
}
