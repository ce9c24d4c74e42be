//! Getting the register image onto the chip.
//!
//! Registers go out highest address first so that register 0, which starts
//! VCO band selection and latches the double buffered fields of R1, R2 and
//! R4, is always written last.

use crate::errors::Error;
use crate::observer::Observer;
use crate::register::{RegisterMap, REGISTER_COUNT};

/// Something that can shift a register word into the chip.
pub trait Bus {
    /// `bytes` is one register word, most significant byte first.
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error>;
}

impl<B: Bus + ?Sized> Bus for &mut B {
    #[inline]
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        (**self).write(bytes)
    }
}

/// Write ordering, double buffer confirmation and the write gate.
///
/// While the gate is closed every write is dropped (and reported to the
/// observer) and the register map keeps its pending marks, so the next
/// flush with the gate open still sends everything.
#[derive(Debug)]
pub struct CommitProtocol<B> {
    bus: B,
    register_write_enabled: bool,
    suppressed: u32,
}

impl<B: Bus> CommitProtocol<B> {
    /// Starts with writes disabled; the first [`CommitProtocol::write_all`] opens the gate.
    pub fn new(bus: B) -> Self {
        CommitProtocol { bus, register_write_enabled: false, suppressed: 0 }
    }

    #[inline]
    pub fn is_write_enabled(&self) -> bool {
        self.register_write_enabled
    }

    #[inline]
    pub fn enable_writes(&mut self) {
        self.register_write_enabled = true;
    }

    #[inline]
    pub fn disable_writes(&mut self) {
        self.register_write_enabled = false;
    }

    /// Writes dropped by the gate so far
    #[inline]
    pub fn suppressed(&self) -> u32 {
        self.suppressed
    }

    /// Sends one register.
    pub fn write_register<O: Observer>(
        &mut self,
        map: &RegisterMap,
        address: u8,
        observer: &mut O,
    ) -> Result<(), Error> {
        let reg = map.at(address).ok_or(Error::UnknownRegister)?;
        if !self.register_write_enabled {
            self.suppressed = self.suppressed.saturating_add(1);
            observer.write_suppressed(address, reg.value());
            return Ok(());
        }
        self.bus.write(&reg.bytes())?;
        observer.register_written(address, reg.value());
        Ok(())
    }

    /// Opens the gate and sends R5 down to R0.
    pub fn write_all<O: Observer>(&mut self, map: &mut RegisterMap, observer: &mut O) -> Result<(), Error> {
        self.register_write_enabled = true;
        for address in (0..REGISTER_COUNT as u8).rev() {
            self.write_register(map, address, observer)?;
        }
        map.clear_pending();
        Ok(())
    }

    /// Sends only the registers changed since the last commit, in descending
    /// order. R0 goes last whenever it changed or a double buffered field did.
    pub fn flush<O: Observer>(&mut self, map: &mut RegisterMap, observer: &mut O) -> Result<(), Error> {
        let pending = map.pending();
        for address in (1..REGISTER_COUNT as u8).rev() {
            if pending & (1 << address) != 0 {
                self.write_register(map, address, observer)?;
            }
        }
        if pending & 1 != 0 {
            self.write_register(map, 0, observer)?;
        } else if map.confirmation_pending() {
            self.confirm_double_buffer(map, observer)?;
        }
        if self.register_write_enabled {
            map.clear_pending();
        }
        Ok(())
    }

    /// Writes R0 again, unchanged, to latch double buffered fields.
    pub fn confirm_double_buffer<O: Observer>(&mut self, map: &RegisterMap, observer: &mut O) -> Result<(), Error> {
        self.write_register(map, 0, observer)?;
        if self.register_write_enabled {
            observer.double_buffer_confirmed();
        }
        Ok(())
    }

    #[inline]
    pub fn bus(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_inner(self) -> B {
        self.bus
    }
}
