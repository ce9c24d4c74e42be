#![allow(dead_code)]

use adf435x_synth::{commit::Bus, errors::Error, errors::Violation, observer::Observer, planner::Plan};

/// Keeps every word written, in order.
#[derive(Debug, Default)]
pub struct RecordingBus {
    pub words: Vec<u32>,
    /// Fail every write after this many
    pub fail_after: Option<usize>,
}

impl RecordingBus {
    pub fn addresses(&self) -> Vec<u32> {
        self.words.iter().map(|w| w & 0b111).collect()
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }
}

impl Bus for RecordingBus {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.fail_after.map_or(false, |n| self.words.len() >= n) {
            return Err(Error::Spi);
        }
        assert_eq!(bytes.len(), 4);
        self.words.push(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Events {
    pub written: usize,
    pub suppressed: usize,
    pub confirmed: usize,
    pub rejected: Vec<(u32, Violation)>,
    pub degraded: usize,
    pub plans: Vec<Plan>,
}

impl Observer for Events {
    fn register_written(&mut self, _: u8, _: u32) {
        self.written += 1;
    }

    fn write_suppressed(&mut self, _: u8, _: u32) {
        self.suppressed += 1;
    }

    fn double_buffer_confirmed(&mut self) {
        self.confirmed += 1;
    }

    fn candidate_rejected(&mut self, d: u32, v: &Violation) {
        self.rejected.push((d, *v));
    }

    fn band_select_degraded(&mut self, _: u32, _: u32) {
        self.degraded += 1;
    }

    fn planned(&mut self, plan: &Plan) {
        self.plans.push(*plan);
    }
}
