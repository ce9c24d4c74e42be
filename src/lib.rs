#![no_std]

//! [ADF4351](https://www.analog.com/en/products/adf4351.html) frequency planner and driver.
//!
//! The register image is a [`register::RegisterMap`]; [`chain::DividerChain`]
//! reads it as the synthesizer's divider graph and checks datasheet limits,
//! [`planner::FrequencyPlanner`] picks divider values for a target frequency
//! and [`commit::CommitProtocol`] gets the image onto the chip in an order
//! that respects R0 double buffering.
//!
//! ```no_run
//! # use adf435x_synth::{commit::Bus, config::Config, device::Adf4351, errors::Error};
//! # fn tune<B: Bus>(bus: B) -> Result<(), Error> {
//! let mut synth = Adf4351::new(bus, Config::default())?;
//! let plan = synth.set_output_frequency(1.5e9, 100e3, None)?;
//! assert_eq!(plan.output_divider, 2);
//! synth.set_phase(90.0)?;
//! # Ok(())
//! # }
//! ```

#[cfg(test)]
extern crate std;

pub mod constants;
#[macro_use]
pub mod register;
pub mod errors;
pub mod fields;
pub mod divider;
pub mod config;
pub mod chain;
pub mod planner;
pub mod commit;
pub mod observer;
pub mod device;
